// ==========================================
// 课程权限与成绩汇总引擎 - 作业提交仓储
// ==========================================
// 红线: Repository 不含业务逻辑（提交条件由 SubmissionEngine 判定）
// 原子性:
// - 新尝试: 停用旧活跃提交 + 插入新提交，同一 IMMEDIATE 事务
// - 评分: 分数与评分元数据同一条 UPDATE
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::submission::{AttemptPayload, AttemptPlan, GradeRecord, Submission};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::build_in_clause;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Result as SqliteResult, Row,
    TransactionBehavior,
};
use std::sync::{Arc, Mutex};

const SUBMISSION_COLUMNS: &str = r#"
    id, assignment_id, student_id, content, file_ref, score, resubmission_count, is_active,
    allow_resubmission, graded_by, graded_at, feedback, submitted_at, updated_at
"#;

// ==========================================
// SubmissionRepository - 作业提交仓储
// ==========================================
pub struct SubmissionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SubmissionRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 写入一次新尝试
    ///
    /// 事务内重新读取活跃提交与尝试次数，与计划不一致时放弃写入（乐观校验），
    /// 由调用方决定是否重新评估。
    ///
    /// # 返回
    /// - Ok(id): 新提交ID
    /// - Err(ConcurrentModification): 计划已过期
    pub fn insert_attempt(
        &self,
        plan: &AttemptPlan,
        payload: &AttemptPayload,
        now: DateTime<Utc>,
    ) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let active_id: Option<i64> = tx
            .query_row(
                "SELECT id FROM submission WHERE student_id = ?1 AND assignment_id = ?2 AND is_active = 1",
                params![plan.student_id, plan.assignment_id],
                |row| row.get(0),
            )
            .optional()?;
        let attempts: i64 = tx.query_row(
            "SELECT COUNT(*) FROM submission WHERE student_id = ?1 AND assignment_id = ?2",
            params![plan.student_id, plan.assignment_id],
            |row| row.get(0),
        )?;

        if active_id != plan.expected_active_id || attempts != plan.expected_attempts {
            return Err(RepositoryError::ConcurrentModification {
                message: format!(
                    "student_id={}, assignment_id={}: expected active={:?}/attempts={}, actual active={:?}/attempts={}",
                    plan.student_id,
                    plan.assignment_id,
                    plan.expected_active_id,
                    plan.expected_attempts,
                    active_id,
                    attempts
                ),
            });
        }

        if let Some(previous) = active_id {
            tx.execute(
                "UPDATE submission SET is_active = 0, updated_at = ?2 WHERE id = ?1",
                params![previous, now],
            )?;
        }

        tx.execute(
            r#"
            INSERT INTO submission (
                assignment_id, student_id, content, file_ref, score, resubmission_count,
                is_active, allow_resubmission, submitted_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, NULL, ?5, 1, 0, ?6, ?6)
            "#,
            params![
                plan.assignment_id,
                plan.student_id,
                payload.content,
                payload.file_ref,
                plan.resubmission_count,
                now,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    /// 学生修改未评分的提交内容
    ///
    /// # 返回
    /// - Ok(rows): 0 表示提交不存在、不属于该学生或已评分
    pub fn update_ungraded_content(
        &self,
        submission_id: i64,
        student_id: i64,
        payload: &AttemptPayload,
        now: DateTime<Utc>,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE submission SET content = ?3, file_ref = ?4, updated_at = ?5
            WHERE id = ?1 AND student_id = ?2 AND score IS NULL
            "#,
            params![submission_id, student_id, payload.content, payload.file_ref, now],
        )?;
        Ok(rows)
    }

    /// 写入评分（不改变 is_active）
    pub fn apply_grade(&self, grade: &GradeRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE submission SET
                score = ?2, feedback = ?3, graded_by = ?4, graded_at = ?5, updated_at = ?5
            WHERE id = ?1
            "#,
            params![
                grade.submission_id,
                grade.score,
                grade.feedback,
                grade.graded_by,
                grade.graded_at,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Submission", grade.submission_id));
        }
        Ok(())
    }

    /// 设置教师是否允许重新提交
    pub fn set_allow_resubmission(
        &self,
        submission_id: i64,
        allow: bool,
        now: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE submission SET allow_resubmission = ?2, updated_at = ?3 WHERE id = ?1",
            params![submission_id, allow, now],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Submission", submission_id));
        }
        Ok(())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, submission_id: i64) -> RepositoryResult<Option<Submission>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM submission WHERE id = ?1", SUBMISSION_COLUMNS);
        let submission = conn
            .query_row(&sql, params![submission_id], map_submission)
            .optional()?;
        Ok(submission)
    }

    /// 查询 (学生, 作业) 的全部尝试，按提交顺序
    pub fn find_history(&self, student_id: i64, assignment_id: i64) -> RepositoryResult<Vec<Submission>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM submission WHERE student_id = ?1 AND assignment_id = ?2 ORDER BY id ASC",
            SUBMISSION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![student_id, assignment_id], map_submission)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 查询 (学生, 作业) 的活跃提交
    ///
    /// 返回列表而非 Option：出现多条时由引擎层报告数据不变量被破坏
    pub fn find_active(&self, student_id: i64, assignment_id: i64) -> RepositoryResult<Vec<Submission>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM submission WHERE student_id = ?1 AND assignment_id = ?2 AND is_active = 1 ORDER BY id ASC",
            SUBMISSION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![student_id, assignment_id], map_submission)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 批量查询学生在多份作业上的全部尝试（成绩汇总使用）
    pub fn find_for_student_assignments(
        &self,
        student_id: i64,
        assignment_ids: &[i64],
    ) -> RepositoryResult<Vec<Submission>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM submission WHERE student_id = ? AND {} ORDER BY assignment_id ASC, id ASC",
            SUBMISSION_COLUMNS,
            build_in_clause("assignment_id", assignment_ids.len())
        );
        let mut values: Vec<Value> = vec![Value::Integer(student_id)];
        values.extend(assignment_ids.iter().map(|id| Value::Integer(*id)));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), map_submission)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}

fn map_submission(row: &Row<'_>) -> SqliteResult<Submission> {
    Ok(Submission {
        id: row.get(0)?,
        assignment_id: row.get(1)?,
        student_id: row.get(2)?,
        content: row.get(3)?,
        file_ref: row.get(4)?,
        score: row.get(5)?,
        resubmission_count: row.get(6)?,
        is_active: row.get(7)?,
        allow_resubmission: row.get(8)?,
        graded_by: row.get(9)?,
        graded_at: row.get(10)?,
        feedback: row.get(11)?,
        submitted_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}
