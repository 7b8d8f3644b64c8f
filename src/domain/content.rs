// ==========================================
// 课程权限与成绩汇总引擎 - 课程内容实体
// ==========================================
// 职责: 课次 (Lesson) 与作业 (Assignment)
// 范围: (科目, 专业方向) 面向该方向全部班级；或 (科目, 班级) 仅该班级
// ==========================================

use crate::domain::types::LessonType;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ScopeUnit - 内容范围
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeUnit {
    Direction(i64),
    Group(i64),
}

impl ScopeUnit {
    /// 从 (direction_id, group_id) 两列还原；group 优先
    pub fn from_columns(direction_id: Option<i64>, group_id: Option<i64>) -> Option<Self> {
        match (direction_id, group_id) {
            (_, Some(g)) => Some(ScopeUnit::Group(g)),
            (Some(d), None) => Some(ScopeUnit::Direction(d)),
            (None, None) => None,
        }
    }

    pub fn direction_id(&self) -> Option<i64> {
        match self {
            ScopeUnit::Direction(d) => Some(*d),
            ScopeUnit::Group(_) => None,
        }
    }

    pub fn group_id(&self) -> Option<i64> {
        match self {
            ScopeUnit::Direction(_) => None,
            ScopeUnit::Group(g) => Some(*g),
        }
    }
}

// ==========================================
// Lesson - 课次
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: i64,
    pub subject_id: i64,
    pub scope: ScopeUnit,
    pub lesson_type: LessonType,
    /// 在 (科目, 范围, 课程类型) 内唯一
    pub order: i32,
    pub title: String,
    pub semester: Option<i32>,
    pub video_ref: Option<String>,
    pub file_refs: Vec<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lesson {
    pub fn has_video(&self) -> bool {
        self.video_ref
            .as_deref()
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
    }
}

/// 新建/编辑课次的输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonDraft {
    pub subject_id: i64,
    pub scope: ScopeUnit,
    pub lesson_type: LessonType,
    pub order: i32,
    pub title: String,
    pub semester: Option<i32>,
    pub video_ref: Option<String>,
    pub file_refs: Vec<String>,
}

// ==========================================
// Assignment - 作业
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub subject_id: i64,
    pub scope: ScopeUnit,
    pub lesson_type: LessonType,
    pub title: String,
    pub max_score: f64,
    pub due_date: Option<NaiveDate>,
    pub file_required: bool,
    pub semester: Option<i32>,
    pub related_lesson_ids: Vec<i64>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 新建/编辑作业的输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentDraft {
    pub subject_id: i64,
    pub scope: ScopeUnit,
    pub lesson_type: LessonType,
    pub title: String,
    pub max_score: f64,
    pub due_date: Option<NaiveDate>,
    pub file_required: bool,
    pub semester: Option<i32>,
    pub related_lesson_ids: Vec<i64>,
}
