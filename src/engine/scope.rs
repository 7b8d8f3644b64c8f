// ==========================================
// 课程权限与成绩汇总引擎 - 判定目标解析
// ==========================================
// 职责: 由课次/作业/提交（或新建草稿）构建 PolicyTarget
// 学期口径: 方向内容必须自带学期；班级内容缺省取班级当前学期
// ==========================================

use crate::domain::content::{Assignment, AssignmentDraft, Lesson, LessonDraft, ScopeUnit};
use crate::domain::submission::Submission;
use crate::domain::types::{LessonType, TargetKind};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::policy::PolicyTarget;
use crate::repository::{AssignmentRepository, LessonRepository, OrganizationRepository, SubmissionRepository};
use std::sync::Arc;

pub struct ScopeResolver {
    organization_repo: Arc<OrganizationRepository>,
    lesson_repo: Arc<LessonRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    submission_repo: Arc<SubmissionRepository>,
}

impl ScopeResolver {
    pub fn new(
        organization_repo: Arc<OrganizationRepository>,
        lesson_repo: Arc<LessonRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        submission_repo: Arc<SubmissionRepository>,
    ) -> Self {
        Self {
            organization_repo,
            lesson_repo,
            assignment_repo,
            submission_repo,
        }
    }

    // ==========================================
    // 学期解析
    // ==========================================

    /// 解析内容学期（新建时使用，缺失即报错）
    pub fn resolve_semester(&self, scope: ScopeUnit, semester: Option<i32>) -> EngineResult<i32> {
        match (semester, scope) {
            (Some(s), _) if s >= 1 => Ok(s),
            (Some(s), _) => Err(EngineError::InvalidInput(format!("学期必须为正数: {}", s))),
            (None, ScopeUnit::Direction(d)) => Err(EngineError::InvalidInput(format!(
                "方向范围内容必须指定学期: direction_id={}",
                d
            ))),
            (None, ScopeUnit::Group(g)) => Ok(self.require_group_semester(g)?),
        }
    }

    /// 解析已存储内容的学期（历史数据可能缺失，方向内容缺失时为 None）
    fn stored_semester(&self, scope: ScopeUnit, semester: Option<i32>) -> EngineResult<Option<i32>> {
        match (semester, scope) {
            (Some(s), _) => Ok(Some(s)),
            (None, ScopeUnit::Direction(_)) => Ok(None),
            (None, ScopeUnit::Group(g)) => Ok(Some(self.require_group_semester(g)?)),
        }
    }

    fn require_group_semester(&self, group_id: i64) -> EngineResult<i32> {
        self.organization_repo
            .find_group(group_id)?
            .map(|g| g.semester)
            .ok_or_else(|| EngineError::ScopeNotFound(format!("group_id={}", group_id)))
    }

    /// 校验科目与范围记录存在
    fn require_scope_exists(&self, subject_id: i64, scope: ScopeUnit) -> EngineResult<()> {
        if self.organization_repo.find_subject(subject_id)?.is_none() {
            return Err(EngineError::ScopeNotFound(format!("subject_id={}", subject_id)));
        }
        let exists = match scope {
            ScopeUnit::Direction(d) => self.organization_repo.find_direction(d)?.is_some(),
            ScopeUnit::Group(g) => self.organization_repo.find_group(g)?.is_some(),
        };
        if !exists {
            return Err(EngineError::ScopeNotFound(format!("{:?}", scope)));
        }
        Ok(())
    }

    fn content_target(
        kind: TargetKind,
        subject_id: i64,
        scope: ScopeUnit,
        semester: Option<i32>,
        lesson_type: LessonType,
        created_by: Option<i64>,
    ) -> PolicyTarget {
        PolicyTarget {
            kind,
            subject_id,
            scope,
            semester,
            lesson_type,
            created_by,
            submission_owner: None,
        }
    }

    // ==========================================
    // 新建草稿
    // ==========================================

    /// 课次草稿 → 判定目标（同时补全学期）
    pub fn lesson_draft_target(&self, draft: &mut LessonDraft) -> EngineResult<PolicyTarget> {
        self.require_scope_exists(draft.subject_id, draft.scope)?;
        let semester = self.resolve_semester(draft.scope, draft.semester)?;
        draft.semester = Some(semester);
        Ok(Self::content_target(
            TargetKind::Lesson,
            draft.subject_id,
            draft.scope,
            Some(semester),
            draft.lesson_type,
            None,
        ))
    }

    /// 作业草稿 → 判定目标（同时补全学期）
    pub fn assignment_draft_target(&self, draft: &mut AssignmentDraft) -> EngineResult<PolicyTarget> {
        self.require_scope_exists(draft.subject_id, draft.scope)?;
        let semester = self.resolve_semester(draft.scope, draft.semester)?;
        draft.semester = Some(semester);
        Ok(Self::content_target(
            TargetKind::Assignment,
            draft.subject_id,
            draft.scope,
            Some(semester),
            draft.lesson_type,
            None,
        ))
    }

    // ==========================================
    // 已存储实体
    // ==========================================

    pub fn lesson_target(&self, lesson: &Lesson) -> EngineResult<PolicyTarget> {
        Ok(Self::content_target(
            TargetKind::Lesson,
            lesson.subject_id,
            lesson.scope,
            self.stored_semester(lesson.scope, lesson.semester)?,
            lesson.lesson_type,
            lesson.created_by,
        ))
    }

    pub fn assignment_target(&self, assignment: &Assignment) -> EngineResult<PolicyTarget> {
        Ok(Self::content_target(
            TargetKind::Assignment,
            assignment.subject_id,
            assignment.scope,
            self.stored_semester(assignment.scope, assignment.semester)?,
            assignment.lesson_type,
            assignment.created_by,
        ))
    }

    /// 提交 → 判定目标（学期与课程类型取自所属作业，范围收窄到提交学生的班级）
    pub fn submission_target(&self, submission: &Submission) -> EngineResult<(PolicyTarget, Assignment)> {
        let assignment = self.load_assignment(submission.assignment_id)?;
        let target = self.owned_submission_target(&assignment, submission.student_id)?;
        Ok((target, assignment))
    }

    /// 某学生在某作业下的提交（含尚未提交时的状态/历史查询）
    ///
    /// 方向范围作业的提交同样只按学生本班判定，教师不能跨班评分
    pub fn owned_submission_target(&self, assignment: &Assignment, student_id: i64) -> EngineResult<PolicyTarget> {
        let student = self
            .organization_repo
            .find_student(student_id)?
            .ok_or_else(|| EngineError::ScopeNotFound(format!("student_id={}", student_id)))?;
        let mut target = self.assignment_target(assignment)?;
        target.kind = TargetKind::Submission;
        target.scope = ScopeUnit::Group(student.group_id);
        target.created_by = None;
        target.submission_owner = Some(student_id);
        Ok(target)
    }

    // ==========================================
    // 加载
    // ==========================================

    pub fn load_lesson(&self, lesson_id: i64) -> EngineResult<Lesson> {
        self.lesson_repo
            .find_by_id(lesson_id)?
            .ok_or_else(|| EngineError::ScopeNotFound(format!("lesson_id={}", lesson_id)))
    }

    pub fn load_assignment(&self, assignment_id: i64) -> EngineResult<Assignment> {
        self.assignment_repo
            .find_by_id(assignment_id)?
            .ok_or_else(|| EngineError::ScopeNotFound(format!("assignment_id={}", assignment_id)))
    }

    pub fn load_submission(&self, submission_id: i64) -> EngineResult<Submission> {
        self.submission_repo
            .find_by_id(submission_id)?
            .ok_or_else(|| EngineError::ScopeNotFound(format!("submission_id={}", submission_id)))
    }
}
