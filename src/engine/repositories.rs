// ==========================================
// 课程权限与成绩汇总引擎 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合引擎与 API 层所需的全部 Repository
// 约束: 全部仓储共享同一个连接
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::repository::{
    ActionLogRepository, AssignmentRepository, CurriculumRepository, GradeScaleRepository,
    LessonRepository, LessonViewRepository, OrganizationRepository, SubmissionRepository,
    TeachingAssignmentRepository,
};

/// 课程引擎仓储集合
///
/// # 包含的仓储
/// - `organization_repo`: 方向/班级/学生/科目
/// - `curriculum_repo`: 教学大纲
/// - `teaching_repo`: 任课绑定
/// - `lesson_repo` / `assignment_repo`: 课程内容
/// - `submission_repo`: 作业提交
/// - `lesson_view_repo`: 观看进度
/// - `grade_scale_repo`: 评分等级
/// - `action_log_repo`: 操作日志
#[derive(Clone)]
pub struct EngineRepositories {
    pub organization_repo: Arc<OrganizationRepository>,
    pub curriculum_repo: Arc<CurriculumRepository>,
    pub teaching_repo: Arc<TeachingAssignmentRepository>,
    pub lesson_repo: Arc<LessonRepository>,
    pub assignment_repo: Arc<AssignmentRepository>,
    pub submission_repo: Arc<SubmissionRepository>,
    pub lesson_view_repo: Arc<LessonViewRepository>,
    pub grade_scale_repo: Arc<GradeScaleRepository>,
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl EngineRepositories {
    /// 在同一连接上创建全部仓储
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            organization_repo: Arc::new(OrganizationRepository::from_connection(conn.clone())),
            curriculum_repo: Arc::new(CurriculumRepository::from_connection(conn.clone())),
            teaching_repo: Arc::new(TeachingAssignmentRepository::from_connection(conn.clone())),
            lesson_repo: Arc::new(LessonRepository::from_connection(conn.clone())),
            assignment_repo: Arc::new(AssignmentRepository::from_connection(conn.clone())),
            submission_repo: Arc::new(SubmissionRepository::from_connection(conn.clone())),
            lesson_view_repo: Arc::new(LessonViewRepository::from_connection(conn.clone())),
            grade_scale_repo: Arc::new(GradeScaleRepository::from_connection(conn.clone())),
            action_log_repo: Arc::new(ActionLogRepository::new(conn)),
        }
    }
}
