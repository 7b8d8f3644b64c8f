// ==========================================
// 课程权限与成绩汇总引擎 - 课程内容 API
// ==========================================
// 职责: 课次/作业的增删改查
// 红线: 每次写入先经 PolicyEngine 判定，成功后写操作日志
// ==========================================

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::actor::Actor;
use crate::domain::content::{Assignment, AssignmentDraft, Lesson, LessonDraft, ScopeUnit};
use crate::domain::types::{LessonType, PolicyAction, TargetKind};
use crate::engine::policy::PolicyTarget;
use crate::engine::{PolicyEngine, ScopeResolver};
use crate::repository::{
    ActionLogRepository, AssignmentRepository, LessonRepository, OrganizationRepository,
};

// ==========================================
// 草稿校验
// ==========================================

fn validate_lesson_draft(draft: &LessonDraft) -> ApiResult<()> {
    if draft.title.trim().is_empty() {
        return Err(ApiError::InvalidInput("课次标题不能为空".to_string()));
    }
    if draft.order < 1 {
        return Err(ApiError::InvalidInput(format!(
            "课次顺序号必须从1开始: {}",
            draft.order
        )));
    }
    if draft.file_refs.iter().any(|f| f.trim().is_empty()) {
        return Err(ApiError::InvalidInput("附件引用不能为空字符串".to_string()));
    }
    Ok(())
}

fn validate_assignment_draft(draft: &AssignmentDraft) -> ApiResult<()> {
    if draft.title.trim().is_empty() {
        return Err(ApiError::InvalidInput("作业标题不能为空".to_string()));
    }
    if !draft.max_score.is_finite() || draft.max_score <= 0.0 {
        return Err(ApiError::InvalidInput(format!(
            "满分必须为正数: {}",
            draft.max_score
        )));
    }
    Ok(())
}

/// 科目/范围/学期/类型任一变化，都视为把内容挪到新的位置
///
/// 学期按已解析值比较: 班级内容缺省学期与显式写出的同一学期视为未变
fn placement_changed(old: &PolicyTarget, new: &PolicyTarget) -> bool {
    (old.subject_id, old.scope, old.semester, old.lesson_type)
        != (new.subject_id, new.scope, new.semester, new.lesson_type)
}

// ==========================================
// ContentApi - 课程内容 API
// ==========================================

/// 课程内容API
///
/// 编辑时除了对原内容判定 Edit，若科目/范围/类型发生变化，
/// 还要对新位置判定 Create，防止教师把内容挪进自己无权的范围。
pub struct ContentApi {
    lesson_repo: Arc<LessonRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    organization_repo: Arc<OrganizationRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    scope_resolver: Arc<ScopeResolver>,
    policy_engine: Arc<PolicyEngine<ConfigManager>>,
}

impl ContentApi {
    pub fn new(
        lesson_repo: Arc<LessonRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        organization_repo: Arc<OrganizationRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        scope_resolver: Arc<ScopeResolver>,
        policy_engine: Arc<PolicyEngine<ConfigManager>>,
    ) -> Self {
        Self {
            lesson_repo,
            assignment_repo,
            organization_repo,
            action_log_repo,
            scope_resolver,
            policy_engine,
        }
    }

    fn record(&self, log: ActionLog) {
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(error = %e, action = %log.action_type, "记录操作日志失败");
        }
    }

    fn require(&self, actor: &Actor, action: PolicyAction, target: &PolicyTarget) -> ApiResult<()> {
        self.policy_engine.require(actor, action, target)?;
        Ok(())
    }

    // ==========================================
    // 课次
    // ==========================================

    /// 新建课次
    #[instrument(skip(self, actor, draft), fields(user_id = actor.user_id, subject_id = draft.subject_id))]
    pub fn create_lesson(&self, actor: &Actor, mut draft: LessonDraft) -> ApiResult<Lesson> {
        validate_lesson_draft(&draft)?;
        let target = self.scope_resolver.lesson_draft_target(&mut draft)?;
        self.require(actor, PolicyAction::Create, &target)?;

        let now = Utc::now();
        let id = self.lesson_repo.insert(&draft, Some(actor.user_id), now)?;
        info!(lesson_id = id, lesson_type = %draft.lesson_type, "课次已创建");

        self.record(
            ActionLog::new(ActionType::CreateLesson, actor.user_id, TargetKind::Lesson, Some(id), now)
                .with_payload(serde_json::json!({
                    "subject_id": draft.subject_id,
                    "scope": draft.scope,
                    "lesson_type": draft.lesson_type,
                    "order": draft.order,
                })),
        );
        Ok(self.scope_resolver.load_lesson(id)?)
    }

    /// 编辑课次（整体替换）
    #[instrument(skip(self, actor, draft), fields(user_id = actor.user_id))]
    pub fn update_lesson(&self, actor: &Actor, lesson_id: i64, mut draft: LessonDraft) -> ApiResult<Lesson> {
        let existing = self.scope_resolver.load_lesson(lesson_id)?;
        let current_target = self.scope_resolver.lesson_target(&existing)?;
        self.require(actor, PolicyAction::Edit, &current_target)?;

        validate_lesson_draft(&draft)?;
        let new_target = self.scope_resolver.lesson_draft_target(&mut draft)?;
        if placement_changed(&current_target, &new_target) {
            self.require(actor, PolicyAction::Create, &new_target)?;
        }

        let now = Utc::now();
        self.lesson_repo.update(lesson_id, &draft, now)?;
        self.record(
            ActionLog::new(ActionType::EditLesson, actor.user_id, TargetKind::Lesson, Some(lesson_id), now)
                .with_payload(serde_json::json!({
                    "before": { "scope": existing.scope, "lesson_type": existing.lesson_type, "order": existing.order },
                    "after": { "scope": draft.scope, "lesson_type": draft.lesson_type, "order": draft.order },
                })),
        );
        Ok(self.scope_resolver.load_lesson(lesson_id)?)
    }

    /// 删除课次
    #[instrument(skip(self, actor), fields(user_id = actor.user_id))]
    pub fn delete_lesson(&self, actor: &Actor, lesson_id: i64) -> ApiResult<()> {
        let existing = self.scope_resolver.load_lesson(lesson_id)?;
        let target = self.scope_resolver.lesson_target(&existing)?;
        self.require(actor, PolicyAction::Delete, &target)?;

        let now = Utc::now();
        self.lesson_repo.delete(lesson_id)?;
        self.record(
            ActionLog::new(ActionType::DeleteLesson, actor.user_id, TargetKind::Lesson, Some(lesson_id), now)
                .with_detail(existing.title),
        );
        Ok(())
    }

    /// 查看课次
    pub fn get_lesson(&self, actor: &Actor, lesson_id: i64) -> ApiResult<Lesson> {
        let lesson = self.scope_resolver.load_lesson(lesson_id)?;
        let target = self.scope_resolver.lesson_target(&lesson)?;
        self.require(actor, PolicyAction::View, &target)?;
        Ok(lesson)
    }

    /// 某范围内的课次（按类型、顺序号排列），只返回可查看的
    pub fn list_lessons(&self, actor: &Actor, subject_id: i64, scope: ScopeUnit) -> ApiResult<Vec<Lesson>> {
        let mut visible = Vec::new();
        for lesson_type in LessonType::ALL {
            for lesson in self.lesson_repo.find_in_scope(subject_id, scope, lesson_type)? {
                let target = self.scope_resolver.lesson_target(&lesson)?;
                if self.policy_engine.authorize(actor, PolicyAction::View, &target)?.is_allowed() {
                    visible.push(lesson);
                }
            }
        }
        Ok(visible)
    }

    // ==========================================
    // 作业
    // ==========================================

    /// 新建作业
    #[instrument(skip(self, actor, draft), fields(user_id = actor.user_id, subject_id = draft.subject_id))]
    pub fn create_assignment(&self, actor: &Actor, mut draft: AssignmentDraft) -> ApiResult<Assignment> {
        validate_assignment_draft(&draft)?;
        let target = self.scope_resolver.assignment_draft_target(&mut draft)?;
        self.require(actor, PolicyAction::Create, &target)?;

        let now = Utc::now();
        let id = self.assignment_repo.insert(&draft, Some(actor.user_id), now)?;
        info!(assignment_id = id, lesson_type = %draft.lesson_type, "作业已创建");

        self.record(
            ActionLog::new(
                ActionType::CreateAssignment,
                actor.user_id,
                TargetKind::Assignment,
                Some(id),
                now,
            )
            .with_payload(serde_json::json!({
                "subject_id": draft.subject_id,
                "scope": draft.scope,
                "lesson_type": draft.lesson_type,
                "max_score": draft.max_score,
                "due_date": draft.due_date,
            })),
        );
        Ok(self.scope_resolver.load_assignment(id)?)
    }

    /// 编辑作业（整体替换）
    #[instrument(skip(self, actor, draft), fields(user_id = actor.user_id))]
    pub fn update_assignment(
        &self,
        actor: &Actor,
        assignment_id: i64,
        mut draft: AssignmentDraft,
    ) -> ApiResult<Assignment> {
        let existing = self.scope_resolver.load_assignment(assignment_id)?;
        let current_target = self.scope_resolver.assignment_target(&existing)?;
        self.require(actor, PolicyAction::Edit, &current_target)?;

        validate_assignment_draft(&draft)?;
        let new_target = self.scope_resolver.assignment_draft_target(&mut draft)?;
        if placement_changed(&current_target, &new_target) {
            self.require(actor, PolicyAction::Create, &new_target)?;
        }

        let now = Utc::now();
        self.assignment_repo.update(assignment_id, &draft, now)?;
        self.record(
            ActionLog::new(
                ActionType::EditAssignment,
                actor.user_id,
                TargetKind::Assignment,
                Some(assignment_id),
                now,
            )
            .with_payload(serde_json::json!({
                "before": { "max_score": existing.max_score, "due_date": existing.due_date },
                "after": { "max_score": draft.max_score, "due_date": draft.due_date },
            })),
        );
        Ok(self.scope_resolver.load_assignment(assignment_id)?)
    }

    /// 删除作业（提交记录级联删除）
    #[instrument(skip(self, actor), fields(user_id = actor.user_id))]
    pub fn delete_assignment(&self, actor: &Actor, assignment_id: i64) -> ApiResult<()> {
        let existing = self.scope_resolver.load_assignment(assignment_id)?;
        let target = self.scope_resolver.assignment_target(&existing)?;
        self.require(actor, PolicyAction::Delete, &target)?;

        let now = Utc::now();
        self.assignment_repo.delete(assignment_id)?;
        self.record(
            ActionLog::new(
                ActionType::DeleteAssignment,
                actor.user_id,
                TargetKind::Assignment,
                Some(assignment_id),
                now,
            )
            .with_detail(existing.title),
        );
        Ok(())
    }

    /// 查看作业
    pub fn get_assignment(&self, actor: &Actor, assignment_id: i64) -> ApiResult<Assignment> {
        let assignment = self.scope_resolver.load_assignment(assignment_id)?;
        let target = self.scope_resolver.assignment_target(&assignment)?;
        self.require(actor, PolicyAction::View, &target)?;
        Ok(assignment)
    }

    /// 某班级在某科目下可见的作业，只返回可查看的
    pub fn list_assignments_for_group(
        &self,
        actor: &Actor,
        subject_id: i64,
        group_id: i64,
    ) -> ApiResult<Vec<Assignment>> {
        let group = self
            .organization_repo
            .find_group(group_id)?
            .ok_or_else(|| ApiError::NotFound(format!("班级(id={})不存在", group_id)))?;

        let mut visible = Vec::new();
        for assignment in self.assignment_repo.find_visible_for_group(
            subject_id,
            group.id,
            group.direction_id,
            Some(group.semester),
        )? {
            let target = self.scope_resolver.assignment_target(&assignment)?;
            if self.policy_engine.authorize(actor, PolicyAction::View, &target)?.is_allowed() {
                visible.push(assignment);
            }
        }
        Ok(visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson_draft() -> LessonDraft {
        LessonDraft {
            subject_id: 1,
            scope: ScopeUnit::Group(2),
            lesson_type: LessonType::Lecture,
            order: 1,
            title: "Kirish".to_string(),
            semester: None,
            video_ref: None,
            file_refs: vec![],
        }
    }

    #[test]
    fn test_lesson_draft_validation() {
        assert!(validate_lesson_draft(&lesson_draft()).is_ok());

        let mut draft = lesson_draft();
        draft.title = "  ".to_string();
        assert!(matches!(validate_lesson_draft(&draft), Err(ApiError::InvalidInput(_))));

        let mut draft = lesson_draft();
        draft.order = 0;
        assert!(matches!(validate_lesson_draft(&draft), Err(ApiError::InvalidInput(_))));
    }

    #[test]
    fn test_assignment_max_score_must_be_positive() {
        let draft = AssignmentDraft {
            subject_id: 1,
            scope: ScopeUnit::Direction(1),
            lesson_type: LessonType::Practicum,
            title: "Amaliy ish 1".to_string(),
            max_score: 0.0,
            due_date: None,
            file_required: false,
            semester: Some(3),
            related_lesson_ids: vec![],
        };
        assert!(matches!(validate_assignment_draft(&draft), Err(ApiError::InvalidInput(_))));
    }

    fn placed(scope: ScopeUnit, semester: Option<i32>, lesson_type: LessonType) -> PolicyTarget {
        PolicyTarget {
            kind: TargetKind::Lesson,
            subject_id: 1,
            scope,
            semester,
            lesson_type,
            created_by: Some(7),
            submission_owner: None,
        }
    }

    #[test]
    fn test_placement_change_detection() {
        let a = placed(ScopeUnit::Group(2), Some(3), LessonType::Lab);
        assert!(!placement_changed(&a, &a.clone()));
        assert!(placement_changed(&a, &placed(ScopeUnit::Group(3), Some(3), LessonType::Lab)));
        assert!(placement_changed(&a, &placed(ScopeUnit::Group(2), Some(3), LessonType::Lecture)));
        assert!(placement_changed(&a, &placed(ScopeUnit::Group(2), Some(4), LessonType::Lab)));

        // 创建者不同不算挪动
        let mut same_place = a.clone();
        same_place.created_by = None;
        assert!(!placement_changed(&a, &same_place));
    }
}
