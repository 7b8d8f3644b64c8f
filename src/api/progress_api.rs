// ==========================================
// 课程权限与成绩汇总引擎 - 学习进度 API
// ==========================================
// 职责: 学生课次列表（含锁定状态）、打开课次、专注检查与观看时长
// ==========================================

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::actor::Actor;
use crate::domain::content::Lesson;
use crate::domain::lesson_view::{LessonState, LessonView};
use crate::domain::types::{PolicyAction, Role, TargetKind};
use crate::engine::policy::DenyReason;
use crate::engine::{EngineError, LessonUnlockGate, PolicyEngine, ScopeResolver};
use crate::repository::{ActionLogRepository, LessonRepository, OrganizationRepository};

/// 课次 + 学生状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonWithState {
    pub lesson: Lesson,
    pub state: LessonState,
}

pub struct ProgressApi {
    lesson_repo: Arc<LessonRepository>,
    organization_repo: Arc<OrganizationRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    scope_resolver: Arc<ScopeResolver>,
    policy_engine: Arc<PolicyEngine<ConfigManager>>,
    unlock_gate: Arc<LessonUnlockGate<ConfigManager>>,
}

impl ProgressApi {
    pub fn new(
        lesson_repo: Arc<LessonRepository>,
        organization_repo: Arc<OrganizationRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        scope_resolver: Arc<ScopeResolver>,
        policy_engine: Arc<PolicyEngine<ConfigManager>>,
        unlock_gate: Arc<LessonUnlockGate<ConfigManager>>,
    ) -> Self {
        Self {
            lesson_repo,
            organization_repo,
            action_log_repo,
            scope_resolver,
            policy_engine,
            unlock_gate,
        }
    }

    /// 加载课次并判定查看权限
    fn viewable_lesson(&self, actor: &Actor, lesson_id: i64) -> ApiResult<Lesson> {
        let lesson = self.scope_resolver.load_lesson(lesson_id)?;
        let target = self.scope_resolver.lesson_target(&lesson)?;
        self.policy_engine.require(actor, PolicyAction::View, &target)?;
        Ok(lesson)
    }

    /// 进度只记在学生名下: 其他角色写入观看记录一律拒绝
    fn student_lesson(&self, actor: &Actor, lesson_id: i64) -> ApiResult<Lesson> {
        if !actor.holds_active_role() {
            return Err(EngineError::PolicyDenied(DenyReason::RoleNotHeld {
                role: actor.active_role,
            })
            .into());
        }
        if actor.active_role != Role::Student {
            return Err(EngineError::PolicyDenied(DenyReason::ActionNotApplicable {
                action: PolicyAction::Edit,
                kind: TargetKind::Lesson,
            })
            .into());
        }
        self.viewable_lesson(actor, lesson_id)
    }

    /// 学生在某科目下可见的课次及锁定状态
    #[instrument(skip(self, actor), fields(user_id = actor.user_id))]
    pub fn lessons_for_student(&self, actor: &Actor, subject_id: i64) -> ApiResult<Vec<LessonWithState>> {
        let student = self
            .organization_repo
            .find_student(actor.user_id)?
            .ok_or_else(|| ApiError::NotFound(format!("学生(id={})不存在", actor.user_id)))?;
        let group = self
            .organization_repo
            .find_group(student.group_id)?
            .ok_or_else(|| ApiError::NotFound(format!("班级(id={})不存在", student.group_id)))?;

        let mut visible = Vec::new();
        for lesson in self
            .lesson_repo
            .find_visible_for_group(subject_id, group.id, group.direction_id)?
        {
            let target = self.scope_resolver.lesson_target(&lesson)?;
            if self
                .policy_engine
                .authorize(actor, PolicyAction::View, &target)?
                .is_allowed()
            {
                visible.push(lesson);
            }
        }

        let states = self.unlock_gate.lesson_states(actor.user_id, &visible)?;
        Ok(visible
            .into_iter()
            .zip(states)
            .map(|(lesson, state)| LessonWithState { lesson, state })
            .collect())
    }

    /// 打开课次（学生角色下锁定时拒绝）
    pub fn open_lesson(&self, actor: &Actor, lesson_id: i64) -> ApiResult<Lesson> {
        let lesson = self.viewable_lesson(actor, lesson_id)?;
        if actor.active_role != Role::Student {
            return Ok(lesson);
        }
        if let Some(blocked_by) = self.unlock_gate.blocked_by(actor.user_id, &lesson)? {
            return Err(EngineError::LessonLocked { lesson_id, blocked_by }.into());
        }
        Ok(lesson)
    }

    /// 记录专注检查；首次完成时写操作日志
    #[instrument(skip(self, actor), fields(user_id = actor.user_id))]
    pub fn record_attention_check(&self, actor: &Actor, lesson_id: i64, checkpoint: i32) -> ApiResult<LessonView> {
        self.student_lesson(actor, lesson_id)?;

        let now = Utc::now();
        let outcome = self
            .unlock_gate
            .record_attention_check(actor.user_id, lesson_id, checkpoint, now)?;

        if outcome.newly_completed {
            let log = ActionLog::new(
                ActionType::LessonCompleted,
                actor.user_id,
                TargetKind::Lesson,
                Some(lesson_id),
                now,
            );
            if let Err(e) = self.action_log_repo.insert(&log) {
                warn!(error = %e, "记录操作日志失败");
            }
        }
        Ok(outcome.view)
    }

    /// 累加观看时长
    pub fn record_watch_time(&self, actor: &Actor, lesson_id: i64, seconds: i64) -> ApiResult<LessonView> {
        self.student_lesson(actor, lesson_id)?;
        Ok(self
            .unlock_gate
            .record_watch_time(actor.user_id, lesson_id, seconds, Utc::now())?)
    }
}
