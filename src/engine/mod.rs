// ==========================================
// 课程权限与成绩汇总引擎 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL；拒绝必须带原因
// ==========================================
// 组成（自底向上）:
// 1. CurriculumResolver   教学大纲解析
// 2. TeachingIndex        任课绑定索引（含实践课兜底）
// 3. PolicyEngine         访问策略
// 4. SubmissionEngine     作业提交状态机
// 5. LessonUnlockGate     课次解锁
// 6. GradeAggregationEngine 成绩汇总
// ==========================================

pub mod aggregation;
pub mod curriculum_resolver;
pub mod error;
pub mod policy;
pub mod repositories;
pub mod scope;
pub mod submission;
pub mod teaching_index;
pub mod unlock_gate;

// 重导出核心引擎
pub use aggregation::{
    AggregationCore, GradeAggregationEngine, SemesterReport, SubjectScore, SubmissionScoreLine,
};
pub use curriculum_resolver::{CurriculumCore, CurriculumResolver};
pub use error::{EngineError, EngineResult};
pub use policy::{Decision, DenyReason, PolicyCore, PolicyEngine, PolicyTarget};
pub use repositories::EngineRepositories;
pub use scope::ScopeResolver;
pub use submission::{SubmissionCore, SubmissionEngine};
pub use teaching_index::{TeachingCore, TeachingIndex};
pub use unlock_gate::{AttentionOutcome, LessonUnlockGate, UnlockCore};
