// ==========================================
// 指标数据处理系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::Arc;

use crate::api::{FileApi, ModelApi, TableApi};
use crate::app::task_registry::{TaskRegistry, DEFAULT_TASK_CAPACITY};
use crate::config::AppConfig;

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 应用配置
    pub config: AppConfig,

    /// 模型（映射配置）API
    pub model_api: Arc<ModelApi>,

    /// 数据表API
    pub table_api: Arc<TableApi>,

    /// 待导入文件API
    pub file_api: Arc<FileApi>,

    /// 后台任务登记表
    pub task_registry: Arc<TaskRegistry>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 创建 Data/DB/Models/Scripts 目录
    /// 2. 创建任务登记表
    /// 3. 创建所有API实例
    pub fn new(config: AppConfig) -> Result<Self, String> {
        tracing::info!(db = %config.db_file_path().display(), "初始化AppState");

        config
            .ensure_directories()
            .map_err(|e| format!("无法创建应用目录: {}", e))?;

        let task_registry = Arc::new(TaskRegistry::new(DEFAULT_TASK_CAPACITY));

        let model_api = Arc::new(ModelApi::new(
            config.models_path.clone(),
            config.db_file_path(),
            task_registry.clone(),
        ));
        let table_api = Arc::new(
            TableApi::new(&config.db_file_path())
                .map_err(|e| format!("无法打开数据库: {}", e))?,
        );
        let file_api = Arc::new(FileApi::new(config.data_path.clone()));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            config,
            model_api,
            table_api,
            file_api,
            task_registry,
        })
    }
}
