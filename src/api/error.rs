// ==========================================
// 课程权限与成绩汇总引擎 - API层错误类型
// ==========================================
// 职责: 将引擎/仓储错误转换为面向用户的错误
// 约束: 权限拒绝与提交拒绝必须带具体原因（本地化消息）
// ==========================================

use crate::engine::error::EngineError;
use crate::i18n;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 预期内的拒绝（面向用户）
    // ==========================================
    /// 权限拒绝
    #[error("{message}")]
    PermissionDenied { code: String, message: String },

    /// 提交被状态机拒绝（次数上限/截止/不允许重新提交/不可修改）
    #[error("{message}")]
    SubmissionRejected { code: String, message: String },

    /// 课次未解锁
    #[error("{message}")]
    LessonLocked {
        lesson_id: i64,
        blocked_by: i64,
        message: String,
    },

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("并发冲突: {0}")]
    Conflict(String),

    // ==========================================
    // 数据完整性错误（硬失败）
    // ==========================================
    #[error("数据完整性错误: {0}")]
    IntegrityViolation(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 稳定的错误码（供路由层映射状态码）
    pub fn code(&self) -> &str {
        match self {
            ApiError::PermissionDenied { code, .. } => code,
            ApiError::SubmissionRejected { code, .. } => code,
            ApiError::LessonLocked { .. } => "LESSON_LOCKED",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::IntegrityViolation(_) => "INTEGRITY_VIOLATION",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
            ApiError::DatabaseTransactionError(_) => "DATABASE_TRANSACTION_ERROR",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::ConfigError(_) => "CONFIG_ERROR",
            ApiError::InternalError(_) | ApiError::Other(_) => "INTERNAL_ERROR",
        }
    }

    fn rejected(code: &str, message: String) -> Self {
        ApiError::SubmissionRejected {
            code: code.to_string(),
            message,
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::PolicyDenied(reason) => ApiError::PermissionDenied {
                code: reason.code().to_string(),
                message: reason.localized_message(),
            },
            EngineError::AttemptLimitExceeded { limit } => ApiError::rejected(
                "ATTEMPT_LIMIT_EXCEEDED",
                i18n::t_with_args("submission.attempt_limit_exceeded", &[("limit", &limit.to_string())]),
            ),
            EngineError::PastDueDate { due_date } => ApiError::rejected(
                "PAST_DUE_DATE",
                i18n::t_with_args("submission.past_due_date", &[("due_date", &due_date.to_string())]),
            ),
            EngineError::ResubmissionNotAllowed => ApiError::rejected(
                "RESUBMISSION_NOT_ALLOWED",
                i18n::t("submission.resubmission_not_allowed"),
            ),
            EngineError::EditNotAllowed(detail) => ApiError::rejected(
                "EDIT_NOT_ALLOWED",
                i18n::t_with_args("submission.edit_not_allowed", &[("detail", &detail)]),
            ),
            EngineError::LessonLocked { lesson_id, blocked_by } => ApiError::LessonLocked {
                lesson_id,
                blocked_by,
                message: i18n::t_with_args(
                    "lesson.locked",
                    &[("blocked_by", &blocked_by.to_string())],
                ),
            },
            EngineError::ScopeNotFound(msg) => ApiError::NotFound(msg),
            EngineError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            EngineError::Conflict(msg) => ApiError::Conflict(msg),
            EngineError::InvariantViolation(msg) => ApiError::IntegrityViolation(msg),
            EngineError::Config(msg) => ApiError::ConfigError(msg),
            EngineError::Repository(e) => ApiError::from(e),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将Repository层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发控制错误
            RepositoryError::ConcurrentModification { message } => ApiError::Conflict(message),

            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => ApiError::DatabaseTransactionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
