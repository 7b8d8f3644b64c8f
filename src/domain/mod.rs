// ==========================================
// 课程权限与成绩汇总引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、值对象
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod actor;
pub mod content;
pub mod curriculum;
pub mod grade_scale;
pub mod lesson_view;
pub mod organization;
pub mod submission;
pub mod teaching;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use actor::Actor;
pub use content::{Assignment, AssignmentDraft, Lesson, LessonDraft, ScopeUnit};
pub use curriculum::{CurriculumEntry, CurriculumQuery, CurriculumView, LessonHours, MissingCurriculum};
pub use grade_scale::{GradeBand, GradeScale};
pub use lesson_view::{LessonState, LessonView};
pub use organization::{Direction, Student, StudyGroup, Subject};
pub use submission::{AttemptPayload, AttemptPlan, GradeRecord, Submission, SubmissionStatus};
pub use teaching::{BindingScope, TeachingAssignment};
pub use types::{LessonType, PolicyAction, Role, TargetKind, UnknownLessonType};
