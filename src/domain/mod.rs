// ==========================================
// 指标数据处理系统 - 领域模型层
// ==========================================
// 职责: 定义数据集、取值类型、导入结果
// 红线: 不含数据访问逻辑,不含文件读写
// ==========================================

pub mod dataset;
pub mod report;
pub mod types;

// 重导出核心类型
pub use dataset::{CellValue, Dataset};
pub use report::{BatchEntry, BatchReport, ConfigOutcome, ImportReport};
pub use types::{SheetSelector, TaskStatus, WritePolicy};
