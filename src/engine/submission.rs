// ==========================================
// 课程权限与成绩汇总引擎 - 作业提交状态机
// ==========================================
// 状态: NoAttempt → Submitted → Graded；Graded|Submitted → Submitted'
// 红线: 每个 (学生, 作业) 至多一条活跃提交；出现多条即硬失败，不修复
// 红线: 状态展示只看活跃提交；成绩汇总取全部已评分尝试的最高分
// ==========================================
// 新尝试的判定顺序:
// (a) 已有尝试次数 < 上限        → 否则 AttemptLimitExceeded
// (b) 无截止日或未过截止日 23:59:59（院校本地时间） → 否则 PastDueDate
// (c) 活跃提交未评分或已允许重新提交 → 否则 ResubmissionNotAllowed
// ==========================================

use crate::config::EngineConfigReader;
use crate::domain::content::Assignment;
use crate::domain::submission::{AttemptPayload, AttemptPlan, GradeRecord, Submission, SubmissionStatus};
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::{AssignmentRepository, SubmissionRepository};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// SubmissionCore - 纯函数
// ==========================================
pub struct SubmissionCore;

impl SubmissionCore {
    /// 截止时刻: 截止日 23:59:59（院校本地时间）换算为 UTC
    pub fn deadline(due_date: NaiveDate, utc_offset_minutes: i32) -> Option<DateTime<Utc>> {
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60)?;
        let local = due_date.and_hms_opt(23, 59, 59)?;
        offset
            .from_local_datetime(&local)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// 取唯一活跃提交
    ///
    /// 多于一条说明存储层不变量已被破坏
    pub fn single_active(history: &[Submission]) -> EngineResult<Option<&Submission>> {
        let mut active = history.iter().filter(|s| s.is_active);
        let first = active.next();
        if let Some(second) = active.next() {
            let first_id = first.map(|s| s.id).unwrap_or_default();
            tracing::error!(
                student_id = second.student_id,
                assignment_id = second.assignment_id,
                first_id,
                second_id = second.id,
                "同一 (学生, 作业) 存在多条活跃提交"
            );
            return Err(EngineError::InvariantViolation(format!(
                "student_id={}, assignment_id={} 存在多条活跃提交: {}, {}",
                second.student_id, second.assignment_id, first_id, second.id
            )));
        }
        Ok(first)
    }

    /// 全部已评分尝试中的最高分（成绩汇总口径）
    pub fn best_score(history: &[Submission]) -> Option<f64> {
        history
            .iter()
            .filter_map(|s| s.score)
            .fold(None, |best, score| match best {
                Some(b) if b >= score => Some(b),
                _ => Some(score),
            })
    }

    /// 计算一次新尝试
    ///
    /// `history` 为该 (学生, 作业) 的全部尝试，按提交顺序
    pub fn plan_attempt(
        assignment: &Assignment,
        student_id: i64,
        history: &[Submission],
        max_attempts: i64,
        utc_offset_minutes: i32,
        now: DateTime<Utc>,
    ) -> EngineResult<AttemptPlan> {
        let active = Self::single_active(history)?;
        let attempts = history.len() as i64;

        // (a) 次数上限
        if attempts >= max_attempts {
            return Err(EngineError::AttemptLimitExceeded { limit: max_attempts });
        }

        // (b) 截止日
        if let Some(due_date) = assignment.due_date {
            let deadline = Self::deadline(due_date, utc_offset_minutes).ok_or_else(|| {
                EngineError::Config(format!("无效的院校时区偏移: {} 分钟", utc_offset_minutes))
            })?;
            if now > deadline {
                return Err(EngineError::PastDueDate { due_date });
            }
        }

        // (c) 重新提交许可
        if let Some(current) = active {
            if current.is_graded() && !current.allow_resubmission {
                return Err(EngineError::ResubmissionNotAllowed);
            }
        }

        let resubmission_count = history
            .last()
            .map(|s| s.resubmission_count + 1)
            .unwrap_or(0);

        Ok(AttemptPlan {
            assignment_id: assignment.id,
            student_id,
            expected_active_id: active.map(|s| s.id),
            expected_attempts: attempts,
            resubmission_count,
        })
    }

    /// 校验提交内容
    pub fn validate_payload(assignment: &Assignment, payload: &AttemptPayload) -> EngineResult<()> {
        let has_content = payload
            .content
            .as_deref()
            .map(|c| !c.trim().is_empty())
            .unwrap_or(false);

        if assignment.file_required && !payload.has_file() {
            return Err(EngineError::InvalidInput(format!(
                "作业要求上传文件: assignment_id={}",
                assignment.id
            )));
        }
        if !has_content && !payload.has_file() {
            return Err(EngineError::InvalidInput("提交内容为空".to_string()));
        }
        Ok(())
    }

    /// 校验分数在 [0, max_score]
    pub fn validate_score(score: f64, max_score: f64) -> EngineResult<()> {
        if !score.is_finite() || score < 0.0 || score > max_score {
            return Err(EngineError::InvalidInput(format!(
                "分数超出范围: score={}, max_score={}",
                score, max_score
            )));
        }
        Ok(())
    }
}

// ==========================================
// SubmissionEngine - 提交状态机
// ==========================================
// 权限判定在 API 层经 PolicyEngine 完成；此处只管状态转换
pub struct SubmissionEngine<C>
where
    C: EngineConfigReader,
{
    submission_repo: Arc<SubmissionRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    config: Arc<C>,
}

impl<C> SubmissionEngine<C>
where
    C: EngineConfigReader,
{
    pub fn new(
        submission_repo: Arc<SubmissionRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        config: Arc<C>,
    ) -> Self {
        Self {
            submission_repo,
            assignment_repo,
            config,
        }
    }

    fn load_assignment(&self, assignment_id: i64) -> EngineResult<Assignment> {
        self.assignment_repo
            .find_by_id(assignment_id)?
            .ok_or_else(|| EngineError::ScopeNotFound(format!("assignment_id={}", assignment_id)))
    }

    fn load_submission(&self, submission_id: i64) -> EngineResult<Submission> {
        self.submission_repo
            .find_by_id(submission_id)?
            .ok_or_else(|| EngineError::ScopeNotFound(format!("submission_id={}", submission_id)))
    }

    // ==========================================
    // 状态转换
    // ==========================================

    /// 提交新尝试（首次提交或重新提交）
    ///
    /// 停用旧活跃提交与插入新提交在同一事务内完成；
    /// 事务内复核失败（并发提交）返回 Conflict，不写入任何数据。
    #[instrument(skip(self, assignment, payload), fields(assignment_id = assignment.id))]
    pub fn submit(
        &self,
        student_id: i64,
        assignment: &Assignment,
        payload: &AttemptPayload,
        now: DateTime<Utc>,
    ) -> EngineResult<Submission> {
        SubmissionCore::validate_payload(assignment, payload)?;

        let history = self.submission_repo.find_history(student_id, assignment.id)?;
        let max_attempts = self.config.get_max_attempts().map_err(EngineError::config)?;
        let offset = self
            .config
            .get_institution_utc_offset_minutes()
            .map_err(EngineError::config)?;

        let plan = SubmissionCore::plan_attempt(assignment, student_id, &history, max_attempts, offset, now)?;
        let id = self.submission_repo.insert_attempt(&plan, payload, now)?;

        tracing::info!(
            submission_id = id,
            resubmission_count = plan.resubmission_count,
            replaced = ?plan.expected_active_id,
            "提交已写入"
        );
        self.load_submission(id)
    }

    /// 修改未评分提交的内容（不产生新尝试）
    #[instrument(skip(self, payload))]
    pub fn edit(
        &self,
        student_id: i64,
        submission_id: i64,
        payload: &AttemptPayload,
        now: DateTime<Utc>,
    ) -> EngineResult<Submission> {
        let submission = self.load_submission(submission_id)?;
        if submission.student_id != student_id {
            return Err(EngineError::EditNotAllowed("只能修改自己的提交".to_string()));
        }
        if submission.is_graded() {
            return Err(EngineError::EditNotAllowed("提交已评分".to_string()));
        }
        if !submission.is_active {
            return Err(EngineError::EditNotAllowed("提交已被新尝试取代".to_string()));
        }

        let assignment = self.load_assignment(submission.assignment_id)?;
        SubmissionCore::validate_payload(&assignment, payload)?;

        let rows = self
            .submission_repo
            .update_ungraded_content(submission_id, student_id, payload, now)?;
        if rows == 0 {
            // 读取与写入之间被评分
            return Err(EngineError::EditNotAllowed("提交已评分".to_string()));
        }
        self.load_submission(submission_id)
    }

    /// 评分（可针对历史尝试；不改变 is_active）
    #[instrument(skip(self, feedback))]
    pub fn grade(
        &self,
        grader_id: i64,
        submission_id: i64,
        score: f64,
        feedback: Option<String>,
        now: DateTime<Utc>,
    ) -> EngineResult<Submission> {
        let submission = self.load_submission(submission_id)?;
        let assignment = self.load_assignment(submission.assignment_id)?;
        SubmissionCore::validate_score(score, assignment.max_score)?;

        self.submission_repo.apply_grade(&GradeRecord {
            submission_id,
            score,
            feedback,
            graded_by: grader_id,
            graded_at: now,
        })?;

        tracing::info!(submission_id, score, "提交已评分");
        self.load_submission(submission_id)
    }

    /// 设置是否允许重新提交
    #[instrument(skip(self))]
    pub fn set_allow_resubmission(
        &self,
        submission_id: i64,
        allow: bool,
        now: DateTime<Utc>,
    ) -> EngineResult<Submission> {
        self.submission_repo
            .set_allow_resubmission(submission_id, allow, now)?;
        self.load_submission(submission_id)
    }

    // ==========================================
    // 读取路径
    // ==========================================

    /// 状态展示: 只看活跃提交
    pub fn current_status(&self, student_id: i64, assignment_id: i64) -> EngineResult<SubmissionStatus> {
        let active = self.submission_repo.find_active(student_id, assignment_id)?;
        let current = SubmissionCore::single_active(&active)?;
        Ok(SubmissionStatus::from_active(current))
    }

    /// 成绩汇总: 全部已评分尝试的最高分
    pub fn best_score_for_aggregation(&self, student_id: i64, assignment_id: i64) -> EngineResult<Option<f64>> {
        let history = self.submission_repo.find_history(student_id, assignment_id)?;
        SubmissionCore::single_active(&history)?;
        Ok(SubmissionCore::best_score(&history))
    }

    /// 全部尝试（教师回看）
    pub fn history(&self, student_id: i64, assignment_id: i64) -> EngineResult<Vec<Submission>> {
        Ok(self.submission_repo.find_history(student_id, assignment_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::content::ScopeUnit;
    use crate::domain::types::LessonType;
    use chrono::TimeZone;

    fn assignment(due_date: Option<NaiveDate>) -> Assignment {
        let t = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        Assignment {
            id: 1,
            subject_id: 10,
            scope: ScopeUnit::Group(5),
            lesson_type: LessonType::Practicum,
            title: "Lab report".to_string(),
            max_score: 20.0,
            due_date,
            file_required: false,
            semester: Some(3),
            related_lesson_ids: vec![],
            created_by: Some(7),
            created_at: t,
            updated_at: t,
        }
    }

    fn attempt(id: i64, count: i32, active: bool, score: Option<f64>, allow: bool) -> Submission {
        let t = Utc.with_ymd_and_hms(2025, 2, 2, 0, 0, 0).unwrap();
        Submission {
            id,
            assignment_id: 1,
            student_id: 100,
            content: Some("answer".to_string()),
            file_ref: None,
            score,
            resubmission_count: count,
            is_active: active,
            allow_resubmission: allow,
            graded_by: score.map(|_| 7),
            graded_at: score.map(|_| t),
            feedback: None,
            submitted_at: t,
            updated_at: t,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_first_attempt_plan() {
        let plan = SubmissionCore::plan_attempt(&assignment(None), 100, &[], 3, 300, now()).unwrap();
        assert_eq!(plan.resubmission_count, 0);
        assert_eq!(plan.expected_active_id, None);
        assert_eq!(plan.expected_attempts, 0);
    }

    #[test]
    fn test_third_attempt_replaces_ungraded_second() {
        let history = vec![attempt(1, 0, false, Some(10.0), true), attempt(2, 1, true, None, false)];
        let plan = SubmissionCore::plan_attempt(&assignment(None), 100, &history, 3, 300, now()).unwrap();
        assert_eq!(plan.resubmission_count, 2);
        assert_eq!(plan.expected_active_id, Some(2));
    }

    #[test]
    fn test_graded_without_permission_rejected() {
        let history = vec![attempt(1, 0, false, Some(10.0), true), attempt(2, 1, true, Some(12.0), false)];
        let err = SubmissionCore::plan_attempt(&assignment(None), 100, &history, 3, 300, now()).unwrap_err();
        assert!(matches!(err, EngineError::ResubmissionNotAllowed));
    }

    #[test]
    fn test_fourth_attempt_rejected_even_when_allowed() {
        let history = vec![
            attempt(1, 0, false, Some(5.0), true),
            attempt(2, 1, false, Some(8.0), true),
            attempt(3, 2, true, Some(9.0), true),
        ];
        let err = SubmissionCore::plan_attempt(&assignment(None), 100, &history, 3, 300, now()).unwrap_err();
        assert!(matches!(err, EngineError::AttemptLimitExceeded { limit: 3 }));
    }

    #[test]
    fn test_deadline_uses_institution_local_end_of_day() {
        let due = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        // UTC+5: 2025-03-01 23:59:59 本地 = 18:59:59 UTC
        let deadline = SubmissionCore::deadline(due, 300).unwrap();
        assert_eq!(deadline, Utc.with_ymd_and_hms(2025, 3, 1, 18, 59, 59).unwrap());

        let a = assignment(Some(due));
        let on_time = Utc.with_ymd_and_hms(2025, 3, 1, 18, 59, 59).unwrap();
        assert!(SubmissionCore::plan_attempt(&a, 100, &[], 3, 300, on_time).is_ok());

        let late = Utc.with_ymd_and_hms(2025, 3, 1, 19, 0, 0).unwrap();
        let err = SubmissionCore::plan_attempt(&a, 100, &[], 3, 300, late).unwrap_err();
        assert!(matches!(err, EngineError::PastDueDate { .. }));
    }

    #[test]
    fn test_attempt_limit_checked_before_due_date() {
        let a = assignment(Some(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
        let history = vec![
            attempt(1, 0, false, None, false),
            attempt(2, 1, false, None, false),
            attempt(3, 2, true, None, false),
        ];
        let err = SubmissionCore::plan_attempt(&a, 100, &history, 3, 300, now()).unwrap_err();
        assert!(matches!(err, EngineError::AttemptLimitExceeded { .. }));
    }

    #[test]
    fn test_two_active_rows_is_invariant_violation() {
        let history = vec![attempt(1, 0, true, None, false), attempt(2, 1, true, None, false)];
        let err = SubmissionCore::single_active(&history).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));
    }

    #[test]
    fn test_best_score_ignores_ungraded_and_takes_max() {
        let history = vec![
            attempt(1, 0, false, Some(12.0), true),
            attempt(2, 1, false, Some(18.0), true),
            attempt(3, 2, true, Some(15.0), false),
        ];
        assert_eq!(SubmissionCore::best_score(&history), Some(18.0));
        assert_eq!(SubmissionCore::best_score(&[attempt(1, 0, true, None, false)]), None);
    }

    #[test]
    fn test_score_bounds() {
        assert!(SubmissionCore::validate_score(0.0, 20.0).is_ok());
        assert!(SubmissionCore::validate_score(20.0, 20.0).is_ok());
        assert!(SubmissionCore::validate_score(20.5, 20.0).is_err());
        assert!(SubmissionCore::validate_score(-1.0, 20.0).is_err());
        assert!(SubmissionCore::validate_score(f64::NAN, 20.0).is_err());
    }

    #[test]
    fn test_file_required_payload() {
        let mut a = assignment(None);
        a.file_required = true;
        let text_only = AttemptPayload {
            content: Some("text".to_string()),
            file_ref: None,
        };
        assert!(SubmissionCore::validate_payload(&a, &text_only).is_err());

        let with_file = AttemptPayload {
            content: None,
            file_ref: Some("uploads/report.pdf".to_string()),
        };
        assert!(SubmissionCore::validate_payload(&a, &with_file).is_ok());
    }
}
