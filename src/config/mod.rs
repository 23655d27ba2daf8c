// ==========================================
// 指标数据处理系统 - 配置层
// ==========================================
// 职责: 应用配置（目录/端口/日志）与映射配置模型
// 存储: config.json + Models/*.json
// ==========================================

pub mod app_config;
pub mod mapping;

// 重导出核心配置类型
pub use app_config::{base_path, normalize_path, AppConfig, AppConfigFile};
pub use mapping::{
    config_display_name, ColumnMapping, MappingConfig, RawColumnMapping, RawExportSection,
    RawFileSection, RawMappingConfig, RawTableSection,
};
