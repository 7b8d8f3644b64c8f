// ==========================================
// 课程权限与成绩汇总引擎 - 应用状态
// ==========================================
// 职责: 在同一数据库连接上装配仓储、引擎与 API
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{ContentApi, ProgressApi, ReportApi, SubmissionApi};
use crate::config::config_manager::ConfigManager;
use crate::db::{apply_schema, open_shared_connection};
use crate::engine::{
    CurriculumResolver, EngineRepositories, GradeAggregationEngine, LessonUnlockGate, PolicyEngine,
    ScopeResolver, SubmissionEngine, TeachingIndex,
};

/// 应用状态
///
/// 宿主应用（Web 服务、后台任务等）持有一份，所有 API 共享同一连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 全局配置
    pub config_manager: Arc<ConfigManager>,

    /// 仓储集合（供宿主维护组织结构、大纲、任课绑定等主数据）
    pub repositories: EngineRepositories,

    /// 教学大纲解析
    pub curriculum_resolver: Arc<CurriculumResolver<ConfigManager>>,

    /// 任课绑定索引
    pub teaching_index: Arc<TeachingIndex<ConfigManager>>,

    /// 访问策略
    pub policy_engine: Arc<PolicyEngine<ConfigManager>>,

    /// 课程内容API
    pub content_api: Arc<ContentApi>,

    /// 作业提交API
    pub submission_api: Arc<SubmissionApi>,

    /// 学习进度API
    pub progress_api: Arc<ProgressApi>,

    /// 成绩报表API
    pub report_api: Arc<ReportApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开共享连接并应用建库脚本（幂等）
    /// 2. 初始化所有Repository与Engine
    /// 3. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_shared_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        {
            let c = conn.lock().map_err(|e| format!("数据库锁获取失败: {}", e))?;
            apply_schema(&c).map_err(|e| format!("建库脚本执行失败: {}", e))?;
        }

        Self::from_connection(db_path, conn)
    }

    /// 在已有连接上装配（连接须已完成建库）
    pub fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> Result<Self, String> {
        // ==========================================
        // 初始化Repository层
        // ==========================================
        let repositories = EngineRepositories::from_connection(conn.clone());

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let curriculum_resolver = Arc::new(CurriculumResolver::new(
            repositories.curriculum_repo.clone(),
            repositories.organization_repo.clone(),
            config_manager.clone(),
        ));
        let teaching_index = Arc::new(TeachingIndex::new(
            repositories.teaching_repo.clone(),
            repositories.organization_repo.clone(),
            curriculum_resolver.clone(),
        ));
        let policy_engine = Arc::new(PolicyEngine::new(
            teaching_index.clone(),
            repositories.organization_repo.clone(),
        ));
        let scope_resolver = Arc::new(ScopeResolver::new(
            repositories.organization_repo.clone(),
            repositories.lesson_repo.clone(),
            repositories.assignment_repo.clone(),
            repositories.submission_repo.clone(),
        ));
        let submission_engine = Arc::new(SubmissionEngine::new(
            repositories.submission_repo.clone(),
            repositories.assignment_repo.clone(),
            config_manager.clone(),
        ));
        let unlock_gate = Arc::new(LessonUnlockGate::new(
            repositories.lesson_repo.clone(),
            repositories.lesson_view_repo.clone(),
            config_manager.clone(),
        ));
        let aggregation_engine = Arc::new(GradeAggregationEngine::new(
            repositories.organization_repo.clone(),
            repositories.assignment_repo.clone(),
            repositories.submission_repo.clone(),
            repositories.grade_scale_repo.clone(),
            curriculum_resolver.clone(),
        ));

        // ==========================================
        // 初始化API层
        // ==========================================
        let content_api = Arc::new(ContentApi::new(
            repositories.lesson_repo.clone(),
            repositories.assignment_repo.clone(),
            repositories.organization_repo.clone(),
            repositories.action_log_repo.clone(),
            scope_resolver.clone(),
            policy_engine.clone(),
        ));
        let submission_api = Arc::new(SubmissionApi::new(
            repositories.action_log_repo.clone(),
            scope_resolver.clone(),
            policy_engine.clone(),
            submission_engine,
        ));
        let progress_api = Arc::new(ProgressApi::new(
            repositories.lesson_repo.clone(),
            repositories.organization_repo.clone(),
            repositories.action_log_repo.clone(),
            scope_resolver,
            policy_engine.clone(),
            unlock_gate,
        ));
        let report_api = Arc::new(ReportApi::new(
            repositories.organization_repo.clone(),
            policy_engine.clone(),
            aggregation_engine,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            config_manager,
            repositories,
            curriculum_resolver,
            teaching_index,
            policy_engine,
            content_api,
            submission_api,
            progress_api,
            report_api,
        })
    }
}
