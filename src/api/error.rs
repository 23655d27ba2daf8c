// ==========================================
// 指标数据处理系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换导入层/仓储层错误为用户可读的错误消息
// 约束: 每个错误对应稳定的错误码（供上层界面区分处理）
// ==========================================

use crate::importer::{describe_failures, ConfigValidationFailure, ImportError};
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 请求错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    /// 提交的配置中有校验失败项（列出全部失败项）
    #[error("配置校验失败:\n{}", describe_failures(.failures))]
    ValidationFailed {
        failures: Vec<ConfigValidationFailure>,
    },

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("文件系统错误: {0}")]
    IoError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 稳定错误码
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::ValidationFailed { .. } => "VALIDATION_FAILED",
            ApiError::ImportError(_) => "IMPORT_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
            ApiError::IoError(_) => "IO_ERROR",
            ApiError::InternalError(_) | ApiError::Other(_) => "INTERNAL_ERROR",
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::TableNotFound(table) => {
                ApiError::NotFound(format!("数据表 {} 不存在", table))
            }
            RepositoryError::ColumnNotFound { table, column } => {
                ApiError::InvalidInput(format!("数据表 {} 中不存在字段 {}", table, column))
            }
            RepositoryError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::DatabaseQueryError(msg)
            | RepositoryError::UniqueConstraintViolation(msg) => ApiError::DatabaseError(msg),
            RepositoryError::Io(e) => ApiError::IoError(e.to_string()),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::ConfigValidation { config, reason } => ApiError::ValidationFailed {
                failures: vec![ConfigValidationFailure {
                    config: config.into(),
                    reason,
                }],
            },
            ImportError::ConfigLoad { config, message } => {
                ApiError::InvalidInput(format!("{}: {}", config, message))
            }
            ImportError::Other(err) => ApiError::Other(err),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            ApiError::NotFound(err.to_string())
        } else {
            ApiError::IoError(err.to_string())
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
