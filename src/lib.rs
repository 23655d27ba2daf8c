// ==========================================
// 指标数据处理系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 配置驱动的表格导入（Excel/CSV → SQLite）与数据浏览
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 数据集与结果模型
pub mod domain;

// 配置层 - 应用配置与映射配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/标识符转义）
pub mod db;

// 日志系统
pub mod logging;

// 导入层 - 映射配置驱动的导入引擎
pub mod importer;

// 数据仓储层 - 数据访问
pub mod repository;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装与后台任务
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::{AppConfig, MappingConfig};
pub use domain::{BatchReport, CellValue, ConfigOutcome, Dataset, ImportReport, WritePolicy};
pub use importer::{BatchImporter, BatchOrchestrator, ConfigValidator, ImportError, TabularLoader};
pub use repository::{SqliteTableWriter, TableBrowser, TableWriter};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "指标数据处理系统";
