// ==========================================
// 课程权限与成绩汇总引擎 - 教学任务实体
// ==========================================
// 职责: 教师 × 科目 × 班级 × 课程类型 的任课绑定
// ==========================================

use crate::domain::types::LessonType;
use serde::{Deserialize, Serialize};

/// 教学任务 (TeachingAssignment)
///
/// 同一 (科目, 班级, 课程类型[, 学年, 学期]) 改派他人时替换原绑定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeachingAssignment {
    pub id: i64,
    pub teacher_id: i64,
    pub subject_id: i64,
    pub group_id: i64,
    pub lesson_type: LessonType,
    pub academic_year: Option<String>,
    /// 为空表示适用于所有学期
    pub semester: Option<i32>,
}

/// 绑定查询范围：整个专业方向，或显式班级列表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingScope {
    Direction(i64),
    Groups(Vec<i64>),
}
