// ==========================================
// 指标数据处理系统 - 导入层
// ==========================================
// 职责: 映射配置驱动的表格导入
// 流程: 配置校验 → 通配符展开 → 逐文件加载 → 合并 → 写库 → 可选删除源文件
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod batch_importer;
pub mod config_validator;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod orchestrator;
pub mod tabular_loader;

// 重导出核心类型
pub use batch_importer::BatchImporter;
pub use config_validator::ConfigValidator;
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper;
pub use file_parser::{CsvParser, ExcelParser, FileParser, RowGrid, SourceFormat, UniversalFileParser};
pub use orchestrator::{
    describe_failures, BatchOrchestrator, ConfigValidationFailure, NoopObserver, ProgressObserver,
};
pub use tabular_loader::TabularLoader;
