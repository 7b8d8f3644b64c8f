// ==========================================
// 课程权限与成绩汇总引擎 - 教学大纲实体
// ==========================================
// 职责: 定义大纲条目（学时分配）与解析后的只读视图
// ==========================================

use crate::domain::types::LessonType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ==========================================
// LessonHours - 各课程类型学时
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonHours {
    pub lecture: u32,
    pub practicum: u32,
    pub lab: u32,
    pub seminar: u32,
    pub coursework: u32,
    pub independent_study: u32,
}

impl LessonHours {
    pub fn get(&self, lesson_type: LessonType) -> u32 {
        match lesson_type {
            LessonType::Lecture => self.lecture,
            LessonType::Practicum => self.practicum,
            LessonType::Lab => self.lab,
            LessonType::Seminar => self.seminar,
            LessonType::Coursework => self.coursework,
            LessonType::IndependentStudy => self.independent_study,
        }
    }

    pub fn set(&mut self, lesson_type: LessonType, hours: u32) {
        match lesson_type {
            LessonType::Lecture => self.lecture = hours,
            LessonType::Practicum => self.practicum = hours,
            LessonType::Lab => self.lab = hours,
            LessonType::Seminar => self.seminar = hours,
            LessonType::Coursework => self.coursework = hours,
            LessonType::IndependentStudy => self.independent_study = hours,
        }
    }

    /// 计入学分的学时合计（不含课程设计）
    pub fn credit_hours(&self) -> u32 {
        LessonType::ALL
            .iter()
            .filter(|t| t.counts_toward_credits())
            .map(|t| self.get(*t))
            .sum()
    }
}

// ==========================================
// CurriculumEntry - 大纲条目（存储行）
// ==========================================
// 唯一键: direction × subject × semester [× enrollment_year × education_type]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumEntry {
    pub id: i64,
    pub direction_id: i64,
    pub subject_id: i64,
    pub semester: i32,
    pub enrollment_year: Option<i32>,
    pub education_type: Option<String>,
    pub hours: LessonHours,
}

/// 大纲查询条件
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurriculumQuery {
    pub direction_id: i64,
    pub subject_id: i64,
    pub semester: i32,
    pub enrollment_year: Option<i32>,
    pub education_type: Option<String>,
}

impl CurriculumQuery {
    pub fn new(direction_id: i64, subject_id: i64, semester: i32) -> Self {
        Self {
            direction_id,
            subject_id,
            semester,
            enrollment_year: None,
            education_type: None,
        }
    }

    pub fn with_enrollment_year(mut self, year: Option<i32>) -> Self {
        self.enrollment_year = year;
        self
    }

    pub fn with_education_type(mut self, education_type: Option<String>) -> Self {
        self.education_type = education_type;
        self
    }
}

// ==========================================
// CurriculumView - 解析结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumView {
    pub entry_id: i64,
    pub direction_id: i64,
    pub subject_id: i64,
    pub semester: i32,
    pub hours: BTreeMap<LessonType, u32>,
    pub credits: f64,
}

impl CurriculumView {
    /// 该范围是否开设某课程类型（学时 > 0）
    pub fn offers(&self, lesson_type: LessonType) -> bool {
        self.hours.get(&lesson_type).copied().unwrap_or(0) > 0
    }

    pub fn offered_types(&self) -> BTreeSet<LessonType> {
        self.hours
            .iter()
            .filter(|(_, h)| **h > 0)
            .map(|(t, _)| *t)
            .collect()
    }
}

/// 找不到大纲条目时的处理口径
///
/// 引擎不替调用方猜测：每个调用点必须显式声明
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissingCurriculum {
    /// 缺失即不限制（视为开设全部类型），例如内容列表
    Unrestricted,
    /// 缺失即拒绝（视为未开设任何类型），例如兜底授权
    Restricted,
}

impl MissingCurriculum {
    /// 在给定口径下计算开设的课程类型集合
    pub fn offered_types(&self, view: Option<&CurriculumView>) -> BTreeSet<LessonType> {
        match (view, self) {
            (Some(v), _) => v.offered_types(),
            (None, MissingCurriculum::Unrestricted) => LessonType::ALL.into_iter().collect(),
            (None, MissingCurriculum::Restricted) => BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_hours_skip_coursework() {
        let hours = LessonHours {
            lecture: 60,
            practicum: 30,
            independent_study: 30,
            coursework: 40,
            ..Default::default()
        };
        assert_eq!(hours.credit_hours(), 120);
    }

    #[test]
    fn test_missing_curriculum_policies() {
        assert_eq!(MissingCurriculum::Unrestricted.offered_types(None).len(), 6);
        assert!(MissingCurriculum::Restricted.offered_types(None).is_empty());
    }
}
