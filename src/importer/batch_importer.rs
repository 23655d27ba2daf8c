// ==========================================
// 指标数据处理系统 - 单配置批量导入器
// ==========================================
// 职责: 通配符 → 文件列表 → 逐文件加载 → 合并 → 一次写入 → 可选删除源文件
// 规则:
// - 通配符在调用时相对当前工作目录展开，结果按路径字典序处理
// - 单文件读取失败只记警告，不中断本批次
// - 仅在写入成功后删除“读出了数据”的文件；删除失败只记警告
// - 没有任何数据时不写库（表不存在也不会被创建）
// ==========================================

use crate::config::MappingConfig;
use crate::domain::{Dataset, ImportReport};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::tabular_loader::TabularLoader;
use crate::repository::TableWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct BatchImporter<W>
where
    W: TableWriter,
{
    loader: TabularLoader,
    writer: Arc<W>,
}

impl<W> BatchImporter<W>
where
    W: TableWriter,
{
    pub fn new(writer: Arc<W>) -> Self {
        Self {
            loader: TabularLoader::new(),
            writer,
        }
    }

    /// 执行一个映射配置
    ///
    /// # 返回
    /// - Ok(ImportReport): 匹配/成功文件与写入行数
    /// - Err(ImportError::Storage): 最终写入失败（此时不会删除任何源文件）
    #[instrument(skip(self, config), fields(config = %config.name(), table = %config.target_table))]
    pub fn run(&self, config: &MappingConfig) -> ImportResult<ImportReport> {
        let files = Self::resolve_files(&config.file_pattern)?;
        info!(pattern = %config.file_pattern, matched = files.len(), "开始处理配置");

        let mut report = ImportReport {
            files_matched: files.len(),
            ..ImportReport::default()
        };

        let mut combined: Option<Dataset> = None;
        for path in &files {
            let dataset = self.loader.load(path, config);
            if dataset.is_empty() {
                debug!(file_path = %path.display(), "文件未产生数据");
                continue;
            }
            report.files_succeeded.push(path.clone());
            match combined.as_mut() {
                Some(acc) => acc.concat(dataset),
                None => combined = Some(dataset),
            }
        }

        let Some(dataset) = combined else {
            info!("没有可导入的数据，跳过写入");
            return Ok(report);
        };

        report.rows_imported = self
            .writer
            .append(&config.target_table, &dataset, &config.write_policy)
            .map_err(ImportError::from)?;

        if config.delete_after_process {
            report.files_deleted = Self::delete_sources(&report.files_succeeded);
        }

        info!(
            files_succeeded = report.files_succeeded.len(),
            rows = report.rows_imported,
            "配置处理完成"
        );
        Ok(report)
    }

    /// 展开通配符（只保留普通文件，按路径排序）
    pub fn resolve_files(pattern: &str) -> ImportResult<Vec<PathBuf>> {
        let entries = glob::glob(pattern).map_err(|e| ImportError::ConfigValidation {
            config: pattern.to_string(),
            reason: format!("'File.Path' 通配符无效: {}", e),
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(error = %e, "通配符匹配项不可访问，已跳过");
                    None
                }
            })
            .filter(|path| path.is_file())
            .collect();
        files.sort();
        Ok(files)
    }

    /// 删除已导入的源文件，返回实际删除的路径
    fn delete_sources(paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut deleted = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::delete_one(path) {
                Ok(()) => {
                    debug!(file_path = %path.display(), "源文件已删除");
                    deleted.push(path.clone());
                }
                Err(e) => warn!(error = %e, "源文件删除失败"),
            }
        }
        deleted
    }

    fn delete_one(path: &Path) -> ImportResult<()> {
        std::fs::remove_file(path).map_err(|e| ImportError::FileDelete {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}
