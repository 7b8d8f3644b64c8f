// ==========================================
// 课程权限与成绩汇总引擎 - 应用层
// ==========================================
// 职责: 装配共享状态，供宿主应用持有
// ==========================================

pub mod state;

pub use state::AppState;
