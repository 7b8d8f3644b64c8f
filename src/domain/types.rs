// ==========================================
// 课程权限与成绩汇总引擎 - 领域类型定义
// ==========================================
// 红线: 课程类型是封闭枚举，未知编码在边界处拒绝
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ==========================================
// 课程类型 (Lesson Type)
// ==========================================
// 数据库编码沿用教务系统字段名: maruza / amaliyot / laboratoriya / seminar / kurs_ishi / mustaqil
// 顺序即展示顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonType {
    Lecture,          // 讲授 (maruza)
    Practicum,        // 实践 (amaliyot)
    Lab,              // 实验 (laboratoriya)
    Seminar,          // 研讨 (seminar)
    Coursework,       // 课程设计 (kurs_ishi)
    IndependentStudy, // 自学 (mustaqil)
}

/// 未知课程类型编码
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("未知的课程类型: {0}")]
pub struct UnknownLessonType(pub String);

impl LessonType {
    pub const ALL: [LessonType; 6] = [
        LessonType::Lecture,
        LessonType::Practicum,
        LessonType::Lab,
        LessonType::Seminar,
        LessonType::Coursework,
        LessonType::IndependentStudy,
    ];

    /// 无直接任课教师时，可由实践课教师兜底负责的类型
    pub const PRACTICUM_FALLBACK: [LessonType; 2] = [LessonType::Lab, LessonType::Coursework];

    /// 转换为数据库存储编码
    pub fn to_db_str(&self) -> &'static str {
        match self {
            LessonType::Lecture => "maruza",
            LessonType::Practicum => "amaliyot",
            LessonType::Lab => "laboratoriya",
            LessonType::Seminar => "seminar",
            LessonType::Coursework => "kurs_ishi",
            LessonType::IndependentStudy => "mustaqil",
        }
    }

    /// 从数据库编码解析（同时接受英文名，便于外部调用方）
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "maruza" | "lecture" => Some(LessonType::Lecture),
            "amaliyot" | "practicum" => Some(LessonType::Practicum),
            "laboratoriya" | "lab" => Some(LessonType::Lab),
            "seminar" => Some(LessonType::Seminar),
            "kurs_ishi" | "coursework" => Some(LessonType::Coursework),
            "mustaqil" | "independent_study" => Some(LessonType::IndependentStudy),
            _ => None,
        }
    }

    /// 学时是否计入学分
    ///
    /// 课程设计学时只表示"存在该类型"，不计入学分
    pub fn counts_toward_credits(&self) -> bool {
        !matches!(self, LessonType::Coursework)
    }
}

impl FromStr for LessonType {
    type Err = UnknownLessonType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LessonType::from_db_str(s).ok_or_else(|| UnknownLessonType(s.to_string()))
    }
}

impl fmt::Display for LessonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 用户角色 (Role)
// ==========================================
// 一个用户可持有多个角色，每次请求只以一个角色行事
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Dean,
    Teacher,
    Student,
}

impl Role {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Dean => "dean",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "dean" => Some(Role::Dean),
            "teacher" => Some(Role::Teacher),
            "student" => Some(Role::Student),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 操作类型 (Policy Action)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyAction {
    Create,
    Edit,
    Delete,
    Grade,
    View,
}

impl PolicyAction {
    /// 是否为写操作
    pub fn is_write(&self) -> bool {
        !matches!(self, PolicyAction::View)
    }
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyAction::Create => write!(f, "CREATE"),
            PolicyAction::Edit => write!(f, "EDIT"),
            PolicyAction::Delete => write!(f, "DELETE"),
            PolicyAction::Grade => write!(f, "GRADE"),
            PolicyAction::View => write!(f, "VIEW"),
        }
    }
}

// ==========================================
// 目标实体类型 (Target Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetKind {
    Lesson,
    Assignment,
    Submission,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Lesson => write!(f, "LESSON"),
            TargetKind::Assignment => write!(f, "ASSIGNMENT"),
            TargetKind::Submission => write!(f, "SUBMISSION"),
        }
    }
}
