// ==========================================
// 课程权限与成绩汇总引擎 - API 层
// ==========================================
// 职责: 面向调用方的门面；所有写入先经 PolicyEngine 判定并写操作日志
// ==========================================

pub mod content_api;
pub mod error;
pub mod progress_api;
pub mod report_api;
pub mod submission_api;

pub use content_api::ContentApi;
pub use error::{ApiError, ApiResult};
pub use progress_api::{LessonWithState, ProgressApi};
pub use report_api::ReportApi;
pub use submission_api::SubmissionApi;
