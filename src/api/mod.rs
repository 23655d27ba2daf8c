// ==========================================
// 指标数据处理系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口，供命令行（或其他外壳）调用
// ==========================================

pub mod error;
pub mod file_api;
pub mod model_api;
pub mod table_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use file_api::{DataFileInfo, FileApi};
pub use model_api::{ModelApi, ModelSummary};
pub use table_api::{export_file_name, TableApi};
