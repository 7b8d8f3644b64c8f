// ==========================================
// 课程权限与成绩汇总引擎 - 观看进度实体
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 学生 × 课次 的观看记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonView {
    pub student_id: i64,
    pub lesson_id: i64,
    pub watched_seconds: i64,
    pub attention_checks_passed: i32,
    pub is_completed: bool,
    /// 首次达标时写入，之后不再变化
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// 列表展示用的课次状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonState {
    pub lesson_id: i64,
    pub locked: bool,
    pub completed: bool,
    /// 阻塞当前课次的最早一节未完成课次
    pub blocked_by: Option<i64>,
}
