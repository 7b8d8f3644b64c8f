// ==========================================
// 课程权限与成绩汇总引擎 - 作业提交实体
// ==========================================
// 状态: NoAttempt → Submitted → Graded，可重新提交（有上限）
// 红线: 每个 (学生, 作业) 同一时刻只有一条 is_active = true
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 一次提交尝试
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub assignment_id: i64,
    pub student_id: i64,
    pub content: Option<String>,
    pub file_ref: Option<String>,
    /// None = 未评分
    pub score: Option<f64>,
    pub resubmission_count: i32,
    pub is_active: bool,
    pub allow_resubmission: bool,
    pub graded_by: Option<i64>,
    pub graded_at: Option<DateTime<Utc>>,
    pub feedback: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn is_graded(&self) -> bool {
        self.score.is_some()
    }
}

/// 学生提交的内容
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttemptPayload {
    pub content: Option<String>,
    pub file_ref: Option<String>,
}

impl AttemptPayload {
    pub fn has_file(&self) -> bool {
        self.file_ref
            .as_deref()
            .map(|f| !f.trim().is_empty())
            .unwrap_or(false)
    }
}

/// 写入新尝试的计划（由状态机计算，仓储层原子执行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptPlan {
    pub assignment_id: i64,
    pub student_id: i64,
    /// 写入时校验：当前活跃提交必须仍是它
    pub expected_active_id: Option<i64>,
    /// 写入时校验：已有尝试次数必须仍是它
    pub expected_attempts: i64,
    pub resubmission_count: i32,
}

/// 评分写入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub submission_id: i64,
    pub score: f64,
    pub feedback: Option<String>,
    pub graded_by: i64,
    pub graded_at: DateTime<Utc>,
}

// ==========================================
// SubmissionStatus - 状态展示（只看活跃提交）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    NotSubmitted,
    Submitted {
        submission_id: i64,
        resubmission_count: i32,
        submitted_at: DateTime<Utc>,
    },
    Graded {
        submission_id: i64,
        resubmission_count: i32,
        score: f64,
        allow_resubmission: bool,
    },
}

impl SubmissionStatus {
    pub fn from_active(active: Option<&Submission>) -> Self {
        match active {
            None => SubmissionStatus::NotSubmitted,
            Some(s) => match s.score {
                Some(score) => SubmissionStatus::Graded {
                    submission_id: s.id,
                    resubmission_count: s.resubmission_count,
                    score,
                    allow_resubmission: s.allow_resubmission,
                },
                None => SubmissionStatus::Submitted {
                    submission_id: s.id,
                    resubmission_count: s.resubmission_count,
                    submitted_at: s.submitted_at,
                },
            },
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionStatus::NotSubmitted => write!(f, "NOT_SUBMITTED"),
            SubmissionStatus::Submitted { .. } => write!(f, "SUBMITTED"),
            SubmissionStatus::Graded { .. } => write!(f, "GRADED"),
        }
    }
}
