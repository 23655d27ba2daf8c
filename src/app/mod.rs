// ==========================================
// 指标数据处理系统 - 应用层
// ==========================================
// 职责: 组装配置、API 与后台任务登记表
// ==========================================

pub mod state;
pub mod task_registry;

// 重导出
pub use state::AppState;
pub use task_registry::{
    RegistryObserver, TaskRecord, TaskRegistry, TaskSnapshot, DEFAULT_TASK_CAPACITY,
};
