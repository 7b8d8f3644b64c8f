// ==========================================
// 课程权限与成绩汇总引擎 - 访问策略引擎
// ==========================================
// 职责: authorize(行为人, 操作, 目标) → Allow | Deny(原因)
// 红线: 所有写入与查看的权限判定只经过此处
// 红线: 行为角色始终由调用方显式传入，引擎不读取会话状态
// ==========================================
// 规则顺序（先匹配先生效）:
// 0. 当前角色不在其角色集合中 → 拒绝
// 1. admin → 全部允许；dean → 除评分外全部允许
// 2. teacher → 按有效绑定（含实践课兜底）判定；创建者可编辑/删除自己的内容
// 3. student → 仅查看；本班/本方向当前学期内容；仅自己的提交
// ==========================================

use crate::config::EngineConfigReader;
use crate::domain::actor::Actor;
use crate::domain::content::ScopeUnit;
use crate::domain::organization::StudyGroup;
use crate::domain::teaching::BindingScope;
use crate::domain::types::{LessonType, PolicyAction, Role, TargetKind};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::teaching_index::TeachingIndex;
use crate::i18n;
use crate::repository::OrganizationRepository;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// PolicyTarget - 判定目标
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyTarget {
    pub kind: TargetKind,
    pub subject_id: i64,
    pub scope: ScopeUnit,
    /// 已解析的学期（方向内容取自身，班级内容缺省取班级当前学期）
    pub semester: Option<i32>,
    pub lesson_type: LessonType,
    pub created_by: Option<i64>,
    /// 仅 Submission 目标有值
    pub submission_owner: Option<i64>,
}

// ==========================================
// DenyReason - 拒绝原因
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    RoleNotHeld { role: Role },
    GradingRequiresTeacherRole,
    ActionNotApplicable { action: PolicyAction, kind: TargetKind },
    LessonTypeNotBound { lesson_type: LessonType },
    NotBoundToSubject { subject_id: i64 },
    ReadOnlyRole,
    OutsideStudentScope,
    NotSubmissionOwner,
}

impl DenyReason {
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::RoleNotHeld { .. } => "ROLE_NOT_HELD",
            DenyReason::GradingRequiresTeacherRole => "GRADING_REQUIRES_TEACHER_ROLE",
            DenyReason::ActionNotApplicable { .. } => "ACTION_NOT_APPLICABLE",
            DenyReason::LessonTypeNotBound { .. } => "LESSON_TYPE_NOT_BOUND",
            DenyReason::NotBoundToSubject { .. } => "NOT_BOUND_TO_SUBJECT",
            DenyReason::ReadOnlyRole => "READ_ONLY_ROLE",
            DenyReason::OutsideStudentScope => "OUTSIDE_STUDENT_SCOPE",
            DenyReason::NotSubmissionOwner => "NOT_SUBMISSION_OWNER",
        }
    }

    /// 面向用户的本地化提示
    pub fn localized_message(&self) -> String {
        let key = format!("policy.deny.{}", self.code().to_ascii_lowercase());
        match self {
            DenyReason::RoleNotHeld { role } => {
                i18n::t_with_args(&key, &[("role", role.to_db_str())])
            }
            DenyReason::ActionNotApplicable { action, kind } => i18n::t_with_args(
                &key,
                &[("action", &action.to_string()), ("kind", &kind.to_string())],
            ),
            DenyReason::LessonTypeNotBound { lesson_type } => {
                i18n::t_with_args(&key, &[("lesson_type", lesson_type.to_db_str())])
            }
            DenyReason::NotBoundToSubject { subject_id } => {
                i18n::t_with_args(&key, &[("subject_id", &subject_id.to_string())])
            }
            _ => i18n::t(&key),
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::RoleNotHeld { role } => write!(f, "{} (role={})", self.code(), role),
            DenyReason::ActionNotApplicable { action, kind } => {
                write!(f, "{} (action={}, kind={})", self.code(), action, kind)
            }
            DenyReason::LessonTypeNotBound { lesson_type } => {
                write!(f, "{} (lesson_type={})", self.code(), lesson_type)
            }
            DenyReason::NotBoundToSubject { subject_id } => {
                write!(f, "{} (subject_id={})", self.code(), subject_id)
            }
            _ => write!(f, "{}", self.code()),
        }
    }
}

// ==========================================
// Decision - 判定结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

// ==========================================
// PolicyCore - 纯规则
// ==========================================
pub struct PolicyCore;

impl PolicyCore {
    /// 不依赖数据的规则（0、1 以及学生写操作）
    ///
    /// 返回 None 表示需要继续查询绑定/学籍
    pub fn static_decision(actor: &Actor, action: PolicyAction) -> Option<Decision> {
        if !actor.holds_active_role() {
            return Some(Decision::Deny(DenyReason::RoleNotHeld {
                role: actor.active_role,
            }));
        }

        match actor.active_role {
            Role::Admin => Some(Decision::Allow),
            Role::Dean => match action {
                PolicyAction::Grade => Some(Decision::Deny(DenyReason::GradingRequiresTeacherRole)),
                _ => Some(Decision::Allow),
            },
            Role::Student if action.is_write() => Some(Decision::Deny(DenyReason::ReadOnlyRole)),
            Role::Teacher | Role::Student => None,
        }
    }

    /// 教师规则
    ///
    /// `effective` 为教师在目标范围/学期内的有效绑定（含兜底）
    pub fn teacher_decision(
        teacher_id: i64,
        action: PolicyAction,
        target: &PolicyTarget,
        effective: &BTreeSet<LessonType>,
    ) -> Decision {
        let is_content = !matches!(target.kind, TargetKind::Submission);
        let is_creator = is_content && target.created_by == Some(teacher_id);

        match (action, target.kind) {
            (PolicyAction::Grade, TargetKind::Submission) => Self::bound_decision(target, effective),
            (PolicyAction::Grade, kind) => Decision::Deny(DenyReason::ActionNotApplicable { action, kind }),
            (PolicyAction::View, _) => {
                if is_creator || !effective.is_empty() {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::NotBoundToSubject {
                        subject_id: target.subject_id,
                    })
                }
            }
            (_, TargetKind::Submission) => Decision::Deny(DenyReason::ActionNotApplicable {
                action,
                kind: TargetKind::Submission,
            }),
            (PolicyAction::Edit | PolicyAction::Delete, _) if is_creator => Decision::Allow,
            _ => Self::bound_decision(target, effective),
        }
    }

    fn bound_decision(target: &PolicyTarget, effective: &BTreeSet<LessonType>) -> Decision {
        if effective.contains(&target.lesson_type) {
            Decision::Allow
        } else {
            Decision::Deny(DenyReason::LessonTypeNotBound {
                lesson_type: target.lesson_type,
            })
        }
    }

    /// 学生查看规则
    pub fn student_view_decision(student_id: i64, group: &StudyGroup, target: &PolicyTarget) -> Decision {
        if target.kind == TargetKind::Submission {
            return if target.submission_owner == Some(student_id) {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::NotSubmissionOwner)
            };
        }

        let in_scope = match target.scope {
            ScopeUnit::Group(g) => g == group.id,
            ScopeUnit::Direction(d) => group.direction_id == Some(d),
        };
        let in_semester = target.semester.map_or(true, |s| s == group.semester);

        if in_scope && in_semester {
            Decision::Allow
        } else {
            Decision::Deny(DenyReason::OutsideStudentScope)
        }
    }
}

// ==========================================
// PolicyEngine - 访问策略引擎
// ==========================================
// 红线: 无副作用；Deny 是值，不是错误
pub struct PolicyEngine<C>
where
    C: EngineConfigReader,
{
    teaching: Arc<TeachingIndex<C>>,
    organization_repo: Arc<OrganizationRepository>,
}

impl<C> PolicyEngine<C>
where
    C: EngineConfigReader,
{
    pub fn new(teaching: Arc<TeachingIndex<C>>, organization_repo: Arc<OrganizationRepository>) -> Self {
        Self {
            teaching,
            organization_repo,
        }
    }

    /// 权限判定
    #[instrument(skip(self, actor, target), fields(
        user_id = actor.user_id,
        role = %actor.active_role,
        action = %action,
        kind = %target.kind,
        lesson_type = %target.lesson_type,
    ))]
    pub fn authorize(
        &self,
        actor: &Actor,
        action: PolicyAction,
        target: &PolicyTarget,
    ) -> EngineResult<Decision> {
        if let Some(decision) = PolicyCore::static_decision(actor, action) {
            return Ok(decision);
        }

        let decision = match actor.active_role {
            Role::Teacher => {
                let scope = BindingScope::from(target.scope);
                let effective = self.teaching.effective_bindings_with_fallback(
                    actor.user_id,
                    target.subject_id,
                    &scope,
                    target.semester,
                )?;
                PolicyCore::teacher_decision(actor.user_id, action, target, &effective)
            }
            Role::Student => self.student_decision(actor.user_id, target)?,
            Role::Admin | Role::Dean => Decision::Allow,
        };

        if let Decision::Deny(reason) = &decision {
            tracing::debug!(reason = %reason, "权限拒绝");
        }
        Ok(decision)
    }

    /// 判定并在拒绝时返回 PolicyDenied 错误
    pub fn require(&self, actor: &Actor, action: PolicyAction, target: &PolicyTarget) -> EngineResult<()> {
        match self.authorize(actor, action, target)? {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(EngineError::PolicyDenied(reason)),
        }
    }

    fn student_decision(&self, student_id: i64, target: &PolicyTarget) -> EngineResult<Decision> {
        let Some(student) = self.organization_repo.find_student(student_id)? else {
            tracing::warn!(student_id, "学生记录不存在，按范围外处理");
            return Ok(Decision::Deny(DenyReason::OutsideStudentScope));
        };
        let Some(group) = self.organization_repo.find_group(student.group_id)? else {
            tracing::warn!(student_id, group_id = student.group_id, "学生所在班级不存在，按范围外处理");
            return Ok(Decision::Deny(DenyReason::OutsideStudentScope));
        };
        Ok(PolicyCore::student_view_decision(student_id, &group, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(kind: TargetKind, lesson_type: LessonType) -> PolicyTarget {
        PolicyTarget {
            kind,
            subject_id: 10,
            scope: ScopeUnit::Group(5),
            semester: Some(3),
            lesson_type,
            created_by: None,
            submission_owner: None,
        }
    }

    fn group() -> StudyGroup {
        StudyGroup {
            id: 5,
            name: "KI-21".to_string(),
            direction_id: Some(1),
            course_year: 2,
            semester: 3,
            education_type: None,
            enrollment_year: Some(2023),
        }
    }

    #[test]
    fn test_role_not_held_is_denied_first() {
        let actor = Actor::new(1, [Role::Teacher], Role::Admin);
        assert_eq!(
            PolicyCore::static_decision(&actor, PolicyAction::View),
            Some(Decision::Deny(DenyReason::RoleNotHeld { role: Role::Admin }))
        );
    }

    #[test]
    fn test_dean_cannot_grade_without_switching_role() {
        let dean = Actor::new(2, [Role::Dean, Role::Teacher], Role::Dean);
        assert_eq!(
            PolicyCore::static_decision(&dean, PolicyAction::Grade),
            Some(Decision::Deny(DenyReason::GradingRequiresTeacherRole))
        );
        assert_eq!(
            PolicyCore::static_decision(&dean, PolicyAction::Delete),
            Some(Decision::Allow)
        );
        let as_teacher = Actor::new(2, [Role::Dean, Role::Teacher], Role::Teacher);
        assert_eq!(PolicyCore::static_decision(&as_teacher, PolicyAction::Grade), None);
    }

    #[test]
    fn test_teacher_grading_requires_matching_lesson_type() {
        let effective: BTreeSet<_> = [LessonType::Lecture].into_iter().collect();
        let submission = target(TargetKind::Submission, LessonType::Practicum);

        assert_eq!(
            PolicyCore::teacher_decision(7, PolicyAction::Grade, &submission, &effective),
            Decision::Deny(DenyReason::LessonTypeNotBound {
                lesson_type: LessonType::Practicum
            })
        );
    }

    #[test]
    fn test_teacher_grade_on_content_not_applicable() {
        let effective: BTreeSet<_> = [LessonType::Lecture].into_iter().collect();
        let lesson = target(TargetKind::Lesson, LessonType::Lecture);
        assert!(matches!(
            PolicyCore::teacher_decision(7, PolicyAction::Grade, &lesson, &effective),
            Decision::Deny(DenyReason::ActionNotApplicable { .. })
        ));
    }

    #[test]
    fn test_creator_may_edit_and_delete_own_content() {
        let mut lesson = target(TargetKind::Lesson, LessonType::Seminar);
        lesson.created_by = Some(7);
        let none = BTreeSet::new();

        assert_eq!(
            PolicyCore::teacher_decision(7, PolicyAction::Edit, &lesson, &none),
            Decision::Allow
        );
        assert_eq!(
            PolicyCore::teacher_decision(7, PolicyAction::Delete, &lesson, &none),
            Decision::Allow
        );
        assert_eq!(
            PolicyCore::teacher_decision(7, PolicyAction::View, &lesson, &none),
            Decision::Allow
        );
        assert!(!PolicyCore::teacher_decision(8, PolicyAction::Edit, &lesson, &none).is_allowed());
    }

    #[test]
    fn test_student_scope_and_semester() {
        let g = group();
        let mut lesson = target(TargetKind::Lesson, LessonType::Lecture);
        assert_eq!(PolicyCore::student_view_decision(100, &g, &lesson), Decision::Allow);

        lesson.scope = ScopeUnit::Direction(1);
        assert_eq!(PolicyCore::student_view_decision(100, &g, &lesson), Decision::Allow);

        lesson.semester = Some(4);
        assert_eq!(
            PolicyCore::student_view_decision(100, &g, &lesson),
            Decision::Deny(DenyReason::OutsideStudentScope)
        );

        lesson.semester = Some(3);
        lesson.scope = ScopeUnit::Group(6);
        assert!(!PolicyCore::student_view_decision(100, &g, &lesson).is_allowed());
    }

    #[test]
    fn test_student_sees_only_own_submission() {
        let g = group();
        let mut submission = target(TargetKind::Submission, LessonType::Lecture);
        submission.submission_owner = Some(100);

        assert!(PolicyCore::student_view_decision(100, &g, &submission).is_allowed());
        assert_eq!(
            PolicyCore::student_view_decision(101, &g, &submission),
            Decision::Deny(DenyReason::NotSubmissionOwner)
        );
    }

    #[test]
    fn test_student_write_denied() {
        let student = Actor::single(100, Role::Student);
        assert_eq!(
            PolicyCore::static_decision(&student, PolicyAction::Create),
            Some(Decision::Deny(DenyReason::ReadOnlyRole))
        );
        assert_eq!(PolicyCore::static_decision(&student, PolicyAction::View), None);
    }
}
