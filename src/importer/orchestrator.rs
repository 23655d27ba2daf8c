// ==========================================
// 指标数据处理系统 - 批次编排器
// ==========================================
// 职责: 按提交顺序逐个执行映射配置，汇总批次结果
// 规则:
// - 严格串行，不做并行
// - 每个配置执行时重新从磁盘读取（不缓存）
// - 单个配置失败记入结果，继续执行其余配置
// - 进度通过观察者回调暴露给轮询方
// ==========================================

use crate::config::config_display_name;
use crate::domain::{BatchReport, ConfigOutcome};
use crate::importer::batch_importer::BatchImporter;
use crate::importer::config_validator::ConfigValidator;
use crate::importer::error::ImportError;
use crate::repository::TableWriter;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, instrument};

// ==========================================
// 进度观察者
// ==========================================
pub trait ProgressObserver: Send + Sync {
    /// 开始执行第 index 个配置（从 0 开始）
    fn on_config_started(&self, index: usize, total: usize, config: &Path);

    /// 第 index 个配置执行结束
    fn on_config_finished(&self, index: usize, config: &Path, outcome: &ConfigOutcome);
}

/// 不关心进度时使用
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_config_started(&self, _index: usize, _total: usize, _config: &Path) {}
    fn on_config_finished(&self, _index: usize, _config: &Path, _outcome: &ConfigOutcome) {}
}

/// 提交校验失败项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigValidationFailure {
    pub config: PathBuf,
    pub reason: String,
}

// ==========================================
// BatchOrchestrator
// ==========================================
pub struct BatchOrchestrator<W>
where
    W: TableWriter,
{
    importer: BatchImporter<W>,
}

impl<W> BatchOrchestrator<W>
where
    W: TableWriter,
{
    pub fn new(writer: Arc<W>) -> Self {
        Self {
            importer: BatchImporter::new(writer),
        }
    }

    /// 执行单个配置文件（读取 → 校验 → 导入）
    ///
    /// # 返回
    /// 写入行数
    pub fn run_one(&self, config_path: &Path) -> Result<usize, ImportError> {
        let config = ConfigValidator::load(config_path)?;
        let report = self.importer.run(&config)?;
        Ok(report.rows_imported)
    }

    /// 串行执行全部配置
    #[instrument(skip(self, config_paths, observer), fields(total = config_paths.len()))]
    pub fn run_all(
        &self,
        config_paths: &[PathBuf],
        observer: &dyn ProgressObserver,
    ) -> BatchReport {
        let total = config_paths.len();
        let mut report = BatchReport::new();
        info!("批次开始执行");

        for (index, path) in config_paths.iter().enumerate() {
            observer.on_config_started(index, total, path);

            let outcome = match self.run_one(path) {
                Ok(rows) => ConfigOutcome::Imported { rows },
                Err(e) => {
                    error!(config = %path.display(), error = %e, "配置执行失败");
                    ConfigOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };

            observer.on_config_finished(index, path, &outcome);
            report.record(path.clone(), outcome);
        }

        info!(
            total_rows = report.total_rows(),
            failed = report.failed_count(),
            "批次执行结束"
        );
        report
    }

    /// 提交前校验全部配置；任何一个失败则整批拒绝，并列出每个失败项
    pub fn validate_all(config_paths: &[PathBuf]) -> Result<(), Vec<ConfigValidationFailure>> {
        let failures: Vec<ConfigValidationFailure> = config_paths
            .iter()
            .filter_map(|path| match ConfigValidator::load(path) {
                Ok(_) => None,
                Err(e) => Some(ConfigValidationFailure {
                    config: path.clone(),
                    reason: match e {
                        ImportError::ConfigValidation { reason, .. } => reason,
                        ImportError::ConfigLoad { message, .. } => message,
                        other => other.to_string(),
                    },
                }),
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }
}

/// 失败项的可读描述（"名称: 原因"，逐行）
pub fn describe_failures(failures: &[ConfigValidationFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", config_display_name(&f.config), f.reason))
        .collect::<Vec<_>>()
        .join("\n")
}
