// ==========================================
// 课程权限与成绩汇总引擎 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 数据不变量被破坏时硬失败，不做静默修复
// ==========================================

use crate::engine::policy::DenyReason;
use crate::repository::error::RepositoryError;
use chrono::NaiveDate;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 范围/记录缺失 =====
    #[error("范围不存在: {0}")]
    ScopeNotFound(String),

    // ===== 权限 =====
    #[error("权限拒绝: {0}")]
    PolicyDenied(DenyReason),

    // ===== 提交状态拒绝 =====
    #[error("提交次数已达上限: limit={limit}")]
    AttemptLimitExceeded { limit: i64 },

    #[error("当前提交已评分且未允许重新提交")]
    ResubmissionNotAllowed,

    #[error("已超过截止日期: due_date={due_date}")]
    PastDueDate { due_date: NaiveDate },

    #[error("提交不可修改: {0}")]
    EditNotAllowed(String),

    // ===== 课次解锁 =====
    #[error("课次未解锁: lesson_id={lesson_id}, blocked_by={blocked_by}")]
    LessonLocked { lesson_id: i64, blocked_by: i64 },

    // ===== 输入与并发 =====
    #[error("输入无效: {0}")]
    InvalidInput(String),

    #[error("并发冲突: {0}")]
    Conflict(String),

    // ===== 数据完整性 =====
    #[error("数据不变量被破坏: {0}")]
    InvariantViolation(String),

    // ===== 基础设施 =====
    #[error("配置读取失败: {0}")]
    Config(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for EngineError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::ConcurrentModification { message } => EngineError::Conflict(message),
            other => EngineError::Repository(other),
        }
    }
}

impl EngineError {
    /// 配置读取错误转换（配置 trait 返回 Box<dyn Error>）
    pub fn config(err: Box<dyn std::error::Error>) -> Self {
        EngineError::Config(err.to_string())
    }
}

/// 引擎层 Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
