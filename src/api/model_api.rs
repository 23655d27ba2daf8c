// ==========================================
// 指标数据处理系统 - 模型（映射配置）API
// ==========================================
// 职责: 模型目录、配置校验、同步/后台执行导入、任务状态查询
// 对外接口:
// - validate_config(path) -> (ok, reason)
// - process_config(path) -> 行数
// - process_many(paths) -> {path: 行数}
// - execute_models(paths) -> 任务ID（后台执行，先整批校验）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::app::task_registry::{RegistryObserver, TaskRegistry, TaskSnapshot};
use crate::config::RawMappingConfig;
use crate::domain::BatchReport;
use crate::importer::{BatchOrchestrator, ConfigValidator, ImportError, NoopObserver};
use crate::repository::SqliteTableWriter;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 模型目录项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSummary {
    /// 文件名（不含扩展名）
    pub name: String,
    pub path: PathBuf,
    pub file_pattern: String,
    pub table: String,
}

/// 模型API
pub struct ModelApi {
    models_path: PathBuf,
    orchestrator: Arc<BatchOrchestrator<SqliteTableWriter>>,
    registry: Arc<TaskRegistry>,
}

impl ModelApi {
    /// 创建新的ModelApi实例
    ///
    /// # 参数
    /// - models_path: 模型配置目录
    /// - db_path: 数据库文件路径
    /// - registry: 后台任务登记表（由应用层注入）
    pub fn new(models_path: PathBuf, db_path: PathBuf, registry: Arc<TaskRegistry>) -> Self {
        let writer = Arc::new(SqliteTableWriter::new(db_path));
        Self {
            models_path,
            orchestrator: Arc::new(BatchOrchestrator::new(writer)),
            registry,
        }
    }

    /// 列出模型目录下的全部 *.json（按文件名排序）
    ///
    /// 无法解析的文件仍然列出，文件模式/表名留空
    pub fn list_models(&self) -> ApiResult<Vec<ModelSummary>> {
        if !self.models_path.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.models_path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .and_then(|e| e.to_str())
                        .map(|e| e.eq_ignore_ascii_case("json"))
                        .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let models = paths
            .into_iter()
            .map(|path| {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let (file_pattern, table) = match Self::read_summary_fields(&path) {
                    Ok(fields) => fields,
                    Err(e) => {
                        warn!(config = %path.display(), error = %e, "模型配置无法解析");
                        (String::new(), String::new())
                    }
                };
                ModelSummary {
                    name,
                    path,
                    file_pattern,
                    table,
                }
            })
            .collect();

        Ok(models)
    }

    fn read_summary_fields(path: &Path) -> anyhow::Result<(String, String)> {
        let text = std::fs::read_to_string(path)?;
        let raw = RawMappingConfig::from_json_str(&text)?;
        let pattern = raw.file.and_then(|f| f.path).unwrap_or_default();
        let table = raw.export.and_then(|e| e.table).unwrap_or_default();
        Ok((pattern, table))
    }

    /// 校验单个配置
    ///
    /// # 返回
    /// (是否有效, 失败原因；有效时为空串)
    pub fn validate_config(&self, config_path: &Path) -> (bool, String) {
        match ConfigValidator::load(config_path) {
            Ok(_) => (true, String::new()),
            Err(ImportError::ConfigValidation { reason, .. }) => (false, reason),
            Err(e) => (false, format!("验证配置文件时出错: {}", e)),
        }
    }

    /// 同步执行单个配置
    ///
    /// # 返回
    /// 写入行数
    pub fn process_config(&self, config_path: &Path) -> ApiResult<usize> {
        Ok(self.orchestrator.run_one(config_path)?)
    }

    /// 同步执行多个配置（失败项记入结果，不中断）
    pub fn process_many(&self, config_paths: &[PathBuf]) -> BatchReport {
        self.orchestrator.run_all(config_paths, &NoopObserver)
    }

    /// 后台执行多个配置
    ///
    /// 先整批校验：任何一个配置无效则全部拒绝，并列出每个失败项
    ///
    /// # 返回
    /// 任务ID
    pub async fn execute_models(&self, config_paths: Vec<PathBuf>) -> ApiResult<String> {
        if config_paths.is_empty() {
            return Err(ApiError::InvalidInput("未选择任何模型配置".to_string()));
        }
        BatchOrchestrator::<SqliteTableWriter>::validate_all(&config_paths)
            .map_err(|failures| ApiError::ValidationFailed { failures })?;

        let task_id = self.registry.register(config_paths.len());
        info!(task_id = %task_id, total = config_paths.len(), "后台任务已启动");

        let orchestrator = Arc::clone(&self.orchestrator);
        let registry = Arc::clone(&self.registry);
        let worker_task_id = task_id.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let observer = RegistryObserver::new(Arc::clone(&registry), worker_task_id);
            orchestrator.run_all(&config_paths, &observer)
        });

        // 监视后台执行体，结束后写回最终状态
        let registry = Arc::clone(&self.registry);
        let watched_id = task_id.clone();
        tokio::spawn(async move {
            match handle.await {
                Ok(report) => registry.complete(&watched_id, report),
                Err(e) => {
                    error!(task_id = %watched_id, error = %e, "后台任务异常终止");
                    registry.fail(&watched_id, e.to_string());
                }
            }
        });

        Ok(task_id)
    }

    /// 查询任务状态
    pub fn get_task_status(&self, task_id: &str) -> ApiResult<TaskSnapshot> {
        self.registry
            .snapshot(task_id)
            .ok_or_else(|| ApiError::NotFound(format!("任务不存在: {}", task_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn api(dir: &Path) -> ModelApi {
        ModelApi::new(
            dir.join("Models"),
            dir.join("DB").join("Data.db"),
            Arc::new(TaskRegistry::default()),
        )
    }

    #[test]
    fn test_list_models_sorted_and_tolerant() {
        let dir = TempDir::new().unwrap();
        let models = dir.path().join("Models");
        std::fs::create_dir(&models).unwrap();
        std::fs::write(
            models.join("b.json"),
            r#"{"File":{"Path":"Data/*.csv"},"Export":{"Table":"指标"}}"#,
        )
        .unwrap();
        std::fs::write(models.join("a.json"), "{ broken").unwrap();
        std::fs::write(models.join("notes.txt"), "x").unwrap();

        let list = api(dir.path()).list_models().unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "a");
        assert_eq!(list[0].file_pattern, "");
        assert_eq!(list[1].name, "b");
        assert_eq!(list[1].file_pattern, "Data/*.csv");
        assert_eq!(list[1].table, "指标");
    }

    #[test]
    fn test_list_models_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(api(dir.path()).list_models().unwrap().is_empty());
    }

    #[test]
    fn test_validate_config_reason() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m.json");
        std::fs::write(&path, r#"{"Table":{"FieldRow":3,"StartRow":1}}"#).unwrap();

        let (ok, reason) = api(dir.path()).validate_config(&path);
        assert!(!ok);
        assert_eq!(reason, "StartRow (1) 必须大于 FieldRow (3)");
    }

    #[tokio::test]
    async fn test_execute_models_rejects_invalid_batch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m.json");
        std::fs::write(&path, "{}").unwrap();

        let err = api(dir.path()).execute_models(vec![path]).await.unwrap_err();
        assert!(matches!(err, ApiError::ValidationFailed { .. }));
    }
}
