// ==========================================
// 课程权限与成绩汇总引擎 - 作业提交 API
// ==========================================
// 职责: 提交/修改/评分/允许重交，以及状态与历史查询
// 红线: 提交与修改只能以学生角色进行；评分只能以教师角色进行
// ==========================================

use std::sync::Arc;

use chrono::Utc;
use tracing::{instrument, warn};

use crate::api::error::ApiResult;
use crate::config::ConfigManager;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::actor::Actor;
use crate::domain::submission::{AttemptPayload, Submission, SubmissionStatus};
use crate::domain::types::{PolicyAction, Role, TargetKind};
use crate::engine::policy::{DenyReason, PolicyTarget};
use crate::engine::{EngineError, PolicyEngine, ScopeResolver, SubmissionEngine};
use crate::repository::ActionLogRepository;

pub struct SubmissionApi {
    action_log_repo: Arc<ActionLogRepository>,
    scope_resolver: Arc<ScopeResolver>,
    policy_engine: Arc<PolicyEngine<ConfigManager>>,
    submission_engine: Arc<SubmissionEngine<ConfigManager>>,
}

impl SubmissionApi {
    pub fn new(
        action_log_repo: Arc<ActionLogRepository>,
        scope_resolver: Arc<ScopeResolver>,
        policy_engine: Arc<PolicyEngine<ConfigManager>>,
        submission_engine: Arc<SubmissionEngine<ConfigManager>>,
    ) -> Self {
        Self {
            action_log_repo,
            scope_resolver,
            policy_engine,
            submission_engine,
        }
    }

    fn record(&self, log: ActionLog) {
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(error = %e, action = %log.action_type, "记录操作日志失败");
        }
    }

    /// 学生本人写入自己的提交: 先做角色检查，再判定对目标的查看权限
    fn require_student_write(&self, actor: &Actor, action: PolicyAction, target: &PolicyTarget) -> ApiResult<()> {
        if !actor.holds_active_role() {
            return Err(EngineError::PolicyDenied(DenyReason::RoleNotHeld {
                role: actor.active_role,
            })
            .into());
        }
        if actor.active_role != Role::Student {
            return Err(EngineError::PolicyDenied(DenyReason::ActionNotApplicable {
                action,
                kind: TargetKind::Submission,
            })
            .into());
        }
        self.policy_engine.require(actor, PolicyAction::View, target)?;
        Ok(())
    }

    // ==========================================
    // 学生操作
    // ==========================================

    /// 提交作业（首次或重新提交）
    #[instrument(skip(self, actor, payload), fields(user_id = actor.user_id))]
    pub fn submit(&self, actor: &Actor, assignment_id: i64, payload: AttemptPayload) -> ApiResult<Submission> {
        let assignment = self.scope_resolver.load_assignment(assignment_id)?;
        let target = self.scope_resolver.assignment_target(&assignment)?;
        self.require_student_write(actor, PolicyAction::Create, &target)?;

        let now = Utc::now();
        let submission = self
            .submission_engine
            .submit(actor.user_id, &assignment, &payload, now)?;

        self.record(
            ActionLog::new(
                ActionType::Submit,
                actor.user_id,
                TargetKind::Submission,
                Some(submission.id),
                now,
            )
            .with_payload(serde_json::json!({
                "assignment_id": assignment_id,
                "resubmission_count": submission.resubmission_count,
                "has_file": payload.has_file(),
            })),
        );
        Ok(submission)
    }

    /// 修改未评分的活跃提交
    #[instrument(skip(self, actor, payload), fields(user_id = actor.user_id))]
    pub fn edit_submission(
        &self,
        actor: &Actor,
        submission_id: i64,
        payload: AttemptPayload,
    ) -> ApiResult<Submission> {
        let submission = self.scope_resolver.load_submission(submission_id)?;
        let (target, _) = self.scope_resolver.submission_target(&submission)?;
        self.require_student_write(actor, PolicyAction::Edit, &target)?;

        let now = Utc::now();
        let updated = self
            .submission_engine
            .edit(actor.user_id, submission_id, &payload, now)?;

        self.record(ActionLog::new(
            ActionType::EditSubmission,
            actor.user_id,
            TargetKind::Submission,
            Some(submission_id),
            now,
        ));
        Ok(updated)
    }

    // ==========================================
    // 教师操作
    // ==========================================

    /// 评分
    #[instrument(skip(self, actor, feedback), fields(user_id = actor.user_id))]
    pub fn grade(
        &self,
        actor: &Actor,
        submission_id: i64,
        score: f64,
        feedback: Option<String>,
    ) -> ApiResult<Submission> {
        let submission = self.scope_resolver.load_submission(submission_id)?;
        let (target, _) = self.scope_resolver.submission_target(&submission)?;
        self.policy_engine.require(actor, PolicyAction::Grade, &target)?;

        let now = Utc::now();
        let graded = self
            .submission_engine
            .grade(actor.user_id, submission_id, score, feedback, now)?;

        self.record(
            ActionLog::new(
                ActionType::Grade,
                actor.user_id,
                TargetKind::Submission,
                Some(submission_id),
                now,
            )
            .with_payload(serde_json::json!({
                "score": score,
                "previous_score": submission.score,
                "student_id": submission.student_id,
            })),
        );
        Ok(graded)
    }

    /// 允许/禁止对已评分提交重新提交（与评分同权限）
    #[instrument(skip(self, actor), fields(user_id = actor.user_id))]
    pub fn set_allow_resubmission(&self, actor: &Actor, submission_id: i64, allow: bool) -> ApiResult<Submission> {
        let submission = self.scope_resolver.load_submission(submission_id)?;
        let (target, _) = self.scope_resolver.submission_target(&submission)?;
        self.policy_engine.require(actor, PolicyAction::Grade, &target)?;

        let now = Utc::now();
        let updated = self
            .submission_engine
            .set_allow_resubmission(submission_id, allow, now)?;

        self.record(
            ActionLog::new(
                ActionType::AllowResubmission,
                actor.user_id,
                TargetKind::Submission,
                Some(submission_id),
                now,
            )
            .with_payload(serde_json::json!({ "allow": allow })),
        );
        Ok(updated)
    }

    // ==========================================
    // 查询
    // ==========================================

    fn require_view_owned(&self, actor: &Actor, student_id: i64, assignment_id: i64) -> ApiResult<()> {
        let assignment = self.scope_resolver.load_assignment(assignment_id)?;
        let target = self
            .scope_resolver
            .owned_submission_target(&assignment, student_id)?;
        self.policy_engine.require(actor, PolicyAction::View, &target)?;
        Ok(())
    }

    /// 当前状态（只看活跃提交）
    pub fn current_status(&self, actor: &Actor, student_id: i64, assignment_id: i64) -> ApiResult<SubmissionStatus> {
        self.require_view_owned(actor, student_id, assignment_id)?;
        Ok(self.submission_engine.current_status(student_id, assignment_id)?)
    }

    /// 全部尝试（按提交时间排序）
    pub fn history(&self, actor: &Actor, student_id: i64, assignment_id: i64) -> ApiResult<Vec<Submission>> {
        self.require_view_owned(actor, student_id, assignment_id)?;
        Ok(self.submission_engine.history(student_id, assignment_id)?)
    }
}
