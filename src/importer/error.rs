// ==========================================
// 指标数据处理系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 恢复边界:
// - ConfigValidation / ConfigLoad: 提交时拦截，不做任何文件 I/O
// - FileRead 及解析类错误: 单文件内恢复（跳过该文件）
// - Storage: 批次编排层恢复（记入该配置的失败结果）
// - FileDelete: 单文件内恢复（仅记录日志）
// ==========================================

use crate::repository::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 配置错误 =====
    #[error("配置文件校验失败 ({config}): {reason}")]
    ConfigValidation { config: String, reason: String },

    #[error("配置文件读取失败 ({config}): {message}")]
    ConfigLoad { config: String, message: String },

    // ===== 文件相关错误 =====
    #[error("文件读取失败 ({path}): {message}")]
    FileRead { path: String, message: String },

    #[error("工作表不存在: {0}")]
    SheetNotFound(String),

    #[error("表头行超出文件范围: FieldRow={header_row}, 文件共 {available} 行")]
    HeaderRowOutOfRange { header_row: usize, available: usize },

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 写入错误 =====
    #[error("数据写入失败: {0}")]
    Storage(String),

    // ===== 清理错误 =====
    #[error("源文件删除失败 ({path}): {message}")]
    FileDelete { path: String, message: String },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileRead {
            path: String::new(),
            message: err.to_string(),
        }
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Storage(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::ConfigLoad {
            config: String::new(),
            message: err.to_string(),
        }
    }
}

// 实现 From<RepositoryError>
impl From<RepositoryError> for ImportError {
    fn from(err: RepositoryError) -> Self {
        ImportError::Storage(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
