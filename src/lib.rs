// ==========================================
// 课程权限与成绩汇总引擎 - 核心库
// ==========================================
// 职责: 教学大纲范围内的访问授权、作业提交状态机、课次解锁与成绩汇总
// 技术栈: Rust + SQLite
// 系统定位: 进程内引擎，由宿主应用显式传入当前角色
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 共享状态装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{LessonType, PolicyAction, Role, TargetKind};

// 领域实体
pub use domain::{
    ActionLog, ActionType, Actor, Assignment, AssignmentDraft, AttemptPayload, CurriculumEntry,
    CurriculumView, Lesson, LessonDraft, LessonView, ScopeUnit, Submission, SubmissionStatus,
    TeachingAssignment,
};

// 引擎
pub use engine::{
    CurriculumResolver, Decision, DenyReason, EngineError, GradeAggregationEngine,
    LessonUnlockGate, PolicyEngine, PolicyTarget, SemesterReport, SubjectScore, SubmissionEngine,
    TeachingIndex,
};

// API
pub use api::{ApiError, ContentApi, ProgressApi, ReportApi, SubmissionApi};

// 应用状态
pub use app::AppState;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "课程权限与成绩汇总引擎";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";
