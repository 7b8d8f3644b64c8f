// ==========================================
// 课程权限与成绩汇总引擎 - 组织结构实体
// ==========================================
// 职责: 专业方向 / 班级 / 学生 / 科目
// 红线: 引擎只读，不负责维护这些主数据
// ==========================================

use serde::{Deserialize, Serialize};

/// 专业方向 (Direction)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub faculty_id: Option<i64>,
    pub enrollment_year: Option<i32>,
    pub education_type: Option<String>,
}

/// 班级 (Group)
///
/// `direction_id` 可为空：未挂靠专业方向的班级没有教学大纲可查
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyGroup {
    pub id: i64,
    pub name: String,
    pub direction_id: Option<i64>,
    pub course_year: i32,
    pub semester: i32,
    pub education_type: Option<String>,
    pub enrollment_year: Option<i32>,
}

/// 学生与班级的归属
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub user_id: i64,
    pub group_id: i64,
    pub full_name: String,
}

/// 科目 (Subject)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    /// 兜底学分：仅当教学大纲学时合计为 0 时使用
    pub credits: f64,
}
