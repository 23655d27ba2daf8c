// ==========================================
// 指标数据处理系统 - 待导入文件管理API
// ==========================================
// 职责: 数据目录（Data）中的源文件 列表/添加/删除
// 约束:
// - 仅接受 .xlsx/.xls/.csv（不区分大小写）
// - 重名文件自动改名为 name_1.ext、name_2.ext …
// - 删除时文件名不得包含路径分隔符或 ".."
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// 允许的扩展名
pub const ALLOWED_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv"];

/// 数据文件信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataFileInfo {
    pub name: String,
    pub size: u64,
    /// 修改时间（RFC 3339）
    pub modified: String,
}

/// 文件管理API
pub struct FileApi {
    data_path: PathBuf,
}

impl FileApi {
    pub fn new(data_path: PathBuf) -> Self {
        Self { data_path }
    }

    /// 列出数据目录中的文件（按名称排序）
    pub fn list_files(&self) -> ApiResult<Vec<DataFileInfo>> {
        if !self.data_path.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.data_path)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata
                .modified()
                .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
                .unwrap_or_default();
            files.push(DataFileInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: metadata.len(),
                modified,
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// 复制文件到数据目录
    ///
    /// # 返回
    /// 实际保存的文件名（可能因重名而改名）
    pub fn add_file(&self, source: &Path) -> ApiResult<String> {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ApiError::InvalidInput(format!("无效的文件路径: {}", source.display())))?;

        if !has_allowed_extension(&file_name) {
            return Err(ApiError::InvalidInput(format!(
                "不支持的文件类型: {}（仅支持 .xlsx/.xls/.csv）",
                file_name
            )));
        }
        if !source.is_file() {
            return Err(ApiError::NotFound(format!("文件不存在: {}", source.display())));
        }

        std::fs::create_dir_all(&self.data_path)?;
        let target = unique_target(&self.data_path, &file_name);
        std::fs::copy(source, &target)?;

        let saved = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or(file_name);
        info!(file = %saved, "文件已添加到数据目录");
        Ok(saved)
    }

    /// 删除数据目录中的文件
    pub fn delete_file(&self, name: &str) -> ApiResult<()> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(ApiError::InvalidInput(format!("无效的文件名: {}", name)));
        }

        let path = self.data_path.join(name);
        if !path.is_file() {
            return Err(ApiError::NotFound(format!("文件不存在: {}", name)));
        }
        std::fs::remove_file(&path)?;
        info!(file = %name, "文件已删除");
        Ok(())
    }
}

fn has_allowed_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// 目标目录中不冲突的文件路径
fn unique_target(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1;
    loop {
        let candidate = dir.join(format!("{}_{}{}", stem, counter, ext));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_add_file_renames_on_collision() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("报表.csv");
        std::fs::write(&src, "A\n1\n").unwrap();
        let api = FileApi::new(dir.path().join("Data"));

        assert_eq!(api.add_file(&src).unwrap(), "报表.csv");
        assert_eq!(api.add_file(&src).unwrap(), "报表_1.csv");
        assert_eq!(api.add_file(&src).unwrap(), "报表_2.csv");

        let names: Vec<_> = api.list_files().unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["报表.csv", "报表_1.csv", "报表_2.csv"]);
    }

    #[test]
    fn test_add_file_rejects_other_types() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("notes.txt");
        std::fs::write(&src, "x").unwrap();
        let api = FileApi::new(dir.path().join("Data"));

        let err = api.add_file(&src).unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_extension_check_is_case_insensitive() {
        assert!(has_allowed_extension("A.XLSX"));
        assert!(has_allowed_extension("b.Csv"));
        assert!(!has_allowed_extension("c.json"));
        assert!(!has_allowed_extension("noext"));
    }

    #[test]
    fn test_delete_file_rules() {
        let dir = TempDir::new().unwrap();
        let api = FileApi::new(dir.path().to_path_buf());
        std::fs::write(dir.path().join("a.csv"), "x").unwrap();

        assert_eq!(api.delete_file("../a.csv").unwrap_err().code(), "INVALID_INPUT");
        assert_eq!(api.delete_file("sub/a.csv").unwrap_err().code(), "INVALID_INPUT");
        assert_eq!(api.delete_file("missing.csv").unwrap_err().code(), "NOT_FOUND");

        api.delete_file("a.csv").unwrap();
        assert!(!dir.path().join("a.csv").exists());
    }
}
