// ==========================================
// 课程权限与成绩汇总引擎 - 成绩报表 API
// ==========================================
// 职责: 科目成绩与学期成绩查询
// 权限: 报表按"该学生在该科目下的提交"判定查看权限
// ==========================================

use std::sync::Arc;

use tracing::instrument;

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::actor::Actor;
use crate::domain::content::ScopeUnit;
use crate::domain::organization::StudyGroup;
use crate::domain::types::{LessonType, PolicyAction, TargetKind};
use crate::engine::policy::PolicyTarget;
use crate::engine::{GradeAggregationEngine, PolicyEngine, SemesterReport, SubjectScore};
use crate::repository::OrganizationRepository;

pub struct ReportApi {
    organization_repo: Arc<OrganizationRepository>,
    policy_engine: Arc<PolicyEngine<ConfigManager>>,
    aggregation_engine: Arc<GradeAggregationEngine<ConfigManager>>,
}

impl ReportApi {
    pub fn new(
        organization_repo: Arc<OrganizationRepository>,
        policy_engine: Arc<PolicyEngine<ConfigManager>>,
        aggregation_engine: Arc<GradeAggregationEngine<ConfigManager>>,
    ) -> Self {
        Self {
            organization_repo,
            policy_engine,
            aggregation_engine,
        }
    }

    fn student_group(&self, student_id: i64) -> ApiResult<StudyGroup> {
        let student = self
            .organization_repo
            .find_student(student_id)?
            .ok_or_else(|| ApiError::NotFound(format!("学生(id={})不存在", student_id)))?;
        self.organization_repo
            .find_group(student.group_id)?
            .ok_or_else(|| ApiError::NotFound(format!("班级(id={})不存在", student.group_id)))
    }

    /// 报表判定目标: 学生本班、当前学期、该科目下的提交
    ///
    /// 查看规则不区分课程类型，lesson_type 仅为占位
    fn report_target(group: &StudyGroup, student_id: i64, subject_id: i64) -> PolicyTarget {
        PolicyTarget {
            kind: TargetKind::Submission,
            subject_id,
            scope: ScopeUnit::Group(group.id),
            semester: Some(group.semester),
            lesson_type: LessonType::Lecture,
            created_by: None,
            submission_owner: Some(student_id),
        }
    }

    /// 科目成绩
    #[instrument(skip(self, actor), fields(user_id = actor.user_id))]
    pub fn subject_report(&self, actor: &Actor, student_id: i64, subject_id: i64) -> ApiResult<SubjectScore> {
        let group = self.student_group(student_id)?;
        self.policy_engine.require(
            actor,
            PolicyAction::View,
            &Self::report_target(&group, student_id, subject_id),
        )?;
        Ok(self.aggregation_engine.subject_report(student_id, subject_id)?)
    }

    /// 学期成绩（须能查看其中每个科目）
    #[instrument(skip(self, actor), fields(user_id = actor.user_id))]
    pub fn semester_report(&self, actor: &Actor, student_id: i64) -> ApiResult<SemesterReport> {
        let group = self.student_group(student_id)?;
        let report = self.aggregation_engine.semester_report(student_id)?;
        for subject in &report.subjects {
            self.policy_engine.require(
                actor,
                PolicyAction::View,
                &Self::report_target(&group, student_id, subject.subject_id),
            )?;
        }
        Ok(report)
    }
}
