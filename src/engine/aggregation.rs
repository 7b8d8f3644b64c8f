// ==========================================
// 课程权限与成绩汇总引擎 - 成绩汇总引擎
// ==========================================
// 口径:
// - 计分: 每份作业取学生全部已评分尝试的最高分
// - 状态: 只看活跃提交
// - 科目: total = Σ 最高分, max = Σ 满分（未提交/未评分计 0 分但计入满分）
// - 学期: 先求和再相除，不对百分比取平均
// ==========================================

use crate::config::EngineConfigReader;
use crate::domain::content::Assignment;
use crate::domain::curriculum::{CurriculumQuery, CurriculumView, MissingCurriculum};
use crate::domain::grade_scale::GradeScale;
use crate::domain::organization::{Student, StudyGroup};
use crate::domain::submission::{Submission, SubmissionStatus};
use crate::domain::types::LessonType;
use crate::engine::curriculum_resolver::CurriculumResolver;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::submission::SubmissionCore;
use crate::repository::{
    AssignmentRepository, GradeScaleRepository, OrganizationRepository, SubmissionRepository,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// 报表结构
// ==========================================

/// 单份作业的汇总行（两条读取路径并列）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionScoreLine {
    pub assignment_id: i64,
    pub title: String,
    pub lesson_type: LessonType,
    pub max_score: f64,
    /// 计分口径: 全部已评分尝试最高分
    pub best_score: Option<f64>,
    /// 展示口径: 活跃提交状态
    pub status: SubmissionStatus,
}

/// 科目成绩
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectScore {
    pub subject_id: i64,
    pub credits: Option<f64>,
    pub total: f64,
    pub max: f64,
    pub percent: f64,
    pub letter: Option<String>,
    pub color: Option<String>,
    pub lines: Vec<SubmissionScoreLine>,
}

/// 学期成绩
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemesterReport {
    pub student_id: i64,
    pub group_id: i64,
    pub semester: i32,
    pub total_credits: f64,
    pub total: f64,
    pub max: f64,
    pub percent: f64,
    pub letter: Option<String>,
    pub color: Option<String>,
    pub subjects: Vec<SubjectScore>,
}

// ==========================================
// AggregationCore - 纯函数
// ==========================================
pub struct AggregationCore;

impl AggregationCore {
    /// 百分比（满分为 0 时为 0）
    pub fn percent(total: f64, max: f64) -> f64 {
        if max <= 0.0 {
            0.0
        } else {
            total / max * 100.0
        }
    }

    /// 筛选计入汇总的作业: 开设类型 + 学期匹配
    pub fn in_scope_assignments<'a>(
        assignments: &'a [Assignment],
        offered: &BTreeSet<LessonType>,
        current_semester: i32,
    ) -> Vec<&'a Assignment> {
        assignments
            .iter()
            .filter(|a| offered.contains(&a.lesson_type))
            .filter(|a| a.semester.map_or(true, |s| s == current_semester))
            .collect()
    }

    /// 构建单份作业的汇总行
    pub fn score_line(assignment: &Assignment, history: &[Submission]) -> EngineResult<SubmissionScoreLine> {
        let active = SubmissionCore::single_active(history)?;
        Ok(SubmissionScoreLine {
            assignment_id: assignment.id,
            title: assignment.title.clone(),
            lesson_type: assignment.lesson_type,
            max_score: assignment.max_score,
            best_score: SubmissionCore::best_score(history),
            status: SubmissionStatus::from_active(active),
        })
    }

    /// 由汇总行得出科目成绩
    pub fn subject_score(
        subject_id: i64,
        credits: Option<f64>,
        lines: Vec<SubmissionScoreLine>,
        scale: &GradeScale,
    ) -> SubjectScore {
        let total: f64 = lines.iter().map(|l| l.best_score.unwrap_or(0.0)).sum();
        let max: f64 = lines.iter().map(|l| l.max_score).sum();
        let percent = Self::percent(total, max);
        let band = scale.band_for(percent);

        SubjectScore {
            subject_id,
            credits,
            total,
            max,
            percent,
            letter: band.map(|b| b.letter.clone()),
            color: band.map(|b| b.color.clone()),
            lines,
        }
    }
}

// ==========================================
// GradeAggregationEngine - 成绩汇总引擎
// ==========================================
pub struct GradeAggregationEngine<C>
where
    C: EngineConfigReader,
{
    organization_repo: Arc<OrganizationRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    submission_repo: Arc<SubmissionRepository>,
    grade_scale_repo: Arc<GradeScaleRepository>,
    curriculum: Arc<CurriculumResolver<C>>,
}

impl<C> GradeAggregationEngine<C>
where
    C: EngineConfigReader,
{
    pub fn new(
        organization_repo: Arc<OrganizationRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        submission_repo: Arc<SubmissionRepository>,
        grade_scale_repo: Arc<GradeScaleRepository>,
        curriculum: Arc<CurriculumResolver<C>>,
    ) -> Self {
        Self {
            organization_repo,
            assignment_repo,
            submission_repo,
            grade_scale_repo,
            curriculum,
        }
    }

    fn load_student_group(&self, student_id: i64) -> EngineResult<(Student, StudyGroup)> {
        let student = self
            .organization_repo
            .find_student(student_id)?
            .ok_or_else(|| EngineError::ScopeNotFound(format!("student_id={}", student_id)))?;
        let group = self
            .organization_repo
            .find_group(student.group_id)?
            .ok_or_else(|| EngineError::ScopeNotFound(format!("group_id={}", student.group_id)))?;
        Ok((student, group))
    }

    /// 科目成绩（学生所在班级/方向的当前学期）
    ///
    /// 大纲缺失按 Unrestricted 处理（全部类型计入）
    #[instrument(skip(self))]
    pub fn subject_report(&self, student_id: i64, subject_id: i64) -> EngineResult<SubjectScore> {
        let (student, group) = self.load_student_group(student_id)?;
        let view = match group.direction_id {
            Some(direction_id) => self.curriculum.resolve(
                &CurriculumQuery::new(direction_id, subject_id, group.semester)
                    .with_enrollment_year(group.enrollment_year)
                    .with_education_type(group.education_type.clone()),
            )?,
            None => None,
        };
        let offered = MissingCurriculum::Unrestricted.offered_types(view.as_ref());
        let scale = self.grade_scale_repo.load()?;

        self.score_subject(&student, &group, subject_id, view.map(|v| v.credits), &offered, &scale)
    }

    /// 学期成绩: 遍历方向当前学期的全部大纲科目
    #[instrument(skip(self))]
    pub fn semester_report(&self, student_id: i64) -> EngineResult<SemesterReport> {
        let (student, group) = self.load_student_group(student_id)?;
        let views: Vec<CurriculumView> = match group.direction_id {
            Some(direction_id) => self.curriculum.offered_subjects(
                direction_id,
                group.semester,
                group.enrollment_year,
                group.education_type.clone(),
            )?,
            None => Vec::new(),
        };
        let scale = self.grade_scale_repo.load()?;

        let mut subjects = Vec::with_capacity(views.len());
        for view in &views {
            let offered = view.offered_types();
            subjects.push(self.score_subject(
                &student,
                &group,
                view.subject_id,
                Some(view.credits),
                &offered,
                &scale,
            )?);
        }

        let total: f64 = subjects.iter().map(|s| s.total).sum();
        let max: f64 = subjects.iter().map(|s| s.max).sum();
        let percent = AggregationCore::percent(total, max);
        let band = scale.band_for(percent);

        Ok(SemesterReport {
            student_id,
            group_id: group.id,
            semester: group.semester,
            total_credits: subjects.iter().filter_map(|s| s.credits).sum(),
            total,
            max,
            percent,
            letter: band.map(|b| b.letter.clone()),
            color: band.map(|b| b.color.clone()),
            subjects,
        })
    }

    fn score_subject(
        &self,
        student: &Student,
        group: &StudyGroup,
        subject_id: i64,
        credits: Option<f64>,
        offered: &BTreeSet<LessonType>,
        scale: &GradeScale,
    ) -> EngineResult<SubjectScore> {
        let visible = self.assignment_repo.find_visible_for_group(
            subject_id,
            group.id,
            group.direction_id,
            Some(group.semester),
        )?;
        let in_scope = AggregationCore::in_scope_assignments(&visible, offered, group.semester);

        let ids: Vec<i64> = in_scope.iter().map(|a| a.id).collect();
        let mut by_assignment: HashMap<i64, Vec<Submission>> = HashMap::new();
        if !ids.is_empty() {
            for submission in self
                .submission_repo
                .find_for_student_assignments(student.user_id, &ids)?
            {
                by_assignment
                    .entry(submission.assignment_id)
                    .or_default()
                    .push(submission);
            }
        }

        let mut lines = Vec::with_capacity(in_scope.len());
        for assignment in in_scope {
            let history = by_assignment
                .get(&assignment.id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            lines.push(AggregationCore::score_line(assignment, history)?);
        }

        Ok(AggregationCore::subject_score(subject_id, credits, lines, scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::content::ScopeUnit;
    use crate::domain::grade_scale::GradeBand;
    use chrono::{TimeZone, Utc};

    fn line(max: f64, best: Option<f64>) -> SubmissionScoreLine {
        SubmissionScoreLine {
            assignment_id: 1,
            title: String::new(),
            lesson_type: LessonType::Lecture,
            max_score: max,
            best_score: best,
            status: SubmissionStatus::NotSubmitted,
        }
    }

    fn scale() -> GradeScale {
        GradeScale::new(vec![
            GradeBand {
                min_percent: 0.0,
                letter: "F".to_string(),
                color: "red".to_string(),
            },
            GradeBand {
                min_percent: 60.0,
                letter: "C".to_string(),
                color: "yellow".to_string(),
            },
            GradeBand {
                min_percent: 86.0,
                letter: "A".to_string(),
                color: "green".to_string(),
            },
        ])
    }

    #[test]
    fn test_unsubmitted_counts_in_denominator() {
        let score = AggregationCore::subject_score(10, None, vec![line(20.0, Some(18.0)), line(20.0, None)], &scale());
        assert_eq!(score.total, 18.0);
        assert_eq!(score.max, 40.0);
        assert_eq!(score.percent, 45.0);
        assert_eq!(score.letter.as_deref(), Some("F"));
    }

    #[test]
    fn test_zero_max_gives_zero_percent() {
        assert_eq!(AggregationCore::percent(0.0, 0.0), 0.0);
        let score = AggregationCore::subject_score(10, None, vec![], &scale());
        assert_eq!(score.percent, 0.0);
    }

    #[test]
    fn test_in_scope_filters_offered_types_and_semester() {
        let t = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let mk = |id: i64, lesson_type: LessonType, semester: Option<i32>| Assignment {
            id,
            subject_id: 10,
            scope: ScopeUnit::Direction(1),
            lesson_type,
            title: String::new(),
            max_score: 10.0,
            due_date: None,
            file_required: false,
            semester,
            related_lesson_ids: vec![],
            created_by: None,
            created_at: t,
            updated_at: t,
        };
        let assignments = vec![
            mk(1, LessonType::Lecture, Some(3)),
            mk(2, LessonType::Lab, Some(3)),
            mk(3, LessonType::Lecture, Some(4)),
            mk(4, LessonType::Practicum, None),
        ];
        let offered: BTreeSet<_> = [LessonType::Lecture, LessonType::Practicum].into_iter().collect();

        let ids: Vec<i64> = AggregationCore::in_scope_assignments(&assignments, &offered, 3)
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![1, 4]);
    }
}
