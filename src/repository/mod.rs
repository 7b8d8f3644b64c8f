// ==========================================
// 课程权限与成绩汇总引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod action_log_repo;
pub mod assignment_repo;
pub mod curriculum_repo;
pub mod error;
pub mod grade_scale_repo;
pub mod lesson_repo;
pub mod lesson_view_repo;
pub mod organization_repo;
pub mod sql_utils;
pub mod submission_repo;
pub mod teaching_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use assignment_repo::AssignmentRepository;
pub use curriculum_repo::CurriculumRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use grade_scale_repo::GradeScaleRepository;
pub use lesson_repo::LessonRepository;
pub use lesson_view_repo::LessonViewRepository;
pub use organization_repo::OrganizationRepository;
pub use submission_repo::SubmissionRepository;
pub use teaching_repo::TeachingAssignmentRepository;
