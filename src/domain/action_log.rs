// ==========================================
// 课程权限与成绩汇总引擎 - 操作日志领域模型
// ==========================================
// 红线: 引擎的所有写入都要留痕（内容增删改、提交、评分）
// ==========================================

use crate::domain::types::TargetKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub action_type: ActionType,
    pub action_ts: DateTime<Utc>,
    pub actor_id: i64,
    pub target_type: TargetKind,
    pub target_id: Option<i64>,
    pub payload_json: Option<JsonValue>,
    pub detail: Option<String>,
}

impl ActionLog {
    /// 生成一条新日志（action_id 使用 UUID v4）
    pub fn new(
        action_type: ActionType,
        actor_id: i64,
        target_type: TargetKind,
        target_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type,
            action_ts: now,
            actor_id,
            target_type,
            target_id,
            payload_json: None,
            detail: None,
        }
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    CreateLesson,
    EditLesson,
    DeleteLesson,
    CreateAssignment,
    EditAssignment,
    DeleteAssignment,
    Submit,       // 新提交/重新提交
    EditSubmission,
    Grade,
    AllowResubmission,
    LessonCompleted,
}

impl ActionType {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ActionType::CreateLesson => "CREATE_LESSON",
            ActionType::EditLesson => "EDIT_LESSON",
            ActionType::DeleteLesson => "DELETE_LESSON",
            ActionType::CreateAssignment => "CREATE_ASSIGNMENT",
            ActionType::EditAssignment => "EDIT_ASSIGNMENT",
            ActionType::DeleteAssignment => "DELETE_ASSIGNMENT",
            ActionType::Submit => "SUBMIT",
            ActionType::EditSubmission => "EDIT_SUBMISSION",
            ActionType::Grade => "GRADE",
            ActionType::AllowResubmission => "ALLOW_RESUBMISSION",
            ActionType::LessonCompleted => "LESSON_COMPLETED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "CREATE_LESSON" => Some(ActionType::CreateLesson),
            "EDIT_LESSON" => Some(ActionType::EditLesson),
            "DELETE_LESSON" => Some(ActionType::DeleteLesson),
            "CREATE_ASSIGNMENT" => Some(ActionType::CreateAssignment),
            "EDIT_ASSIGNMENT" => Some(ActionType::EditAssignment),
            "DELETE_ASSIGNMENT" => Some(ActionType::DeleteAssignment),
            "SUBMIT" => Some(ActionType::Submit),
            "EDIT_SUBMISSION" => Some(ActionType::EditSubmission),
            "GRADE" => Some(ActionType::Grade),
            "ALLOW_RESUBMISSION" => Some(ActionType::AllowResubmission),
            "LESSON_COMPLETED" => Some(ActionType::LessonCompleted),
            _ => None,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}
