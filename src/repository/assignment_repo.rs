// ==========================================
// 课程权限与成绩汇总引擎 - 作业仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::content::{Assignment, AssignmentDraft, ScopeUnit};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::{deserialize_json_array, parse_lesson_type, serialize_json};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const ASSIGNMENT_COLUMNS: &str = r#"
    id, subject_id, direction_id, group_id, lesson_type, title, max_score, due_date,
    file_required, semester, related_lessons_json, created_by, created_at, updated_at
"#;

// ==========================================
// AssignmentRepository - 作业仓储
// ==========================================
pub struct AssignmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AssignmentRepository {
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

    pub fn insert(
        &self,
        draft: &AssignmentDraft,
        created_by: Option<i64>,
        now: DateTime<Utc>,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO assignment (
                subject_id, direction_id, group_id, lesson_type, title, max_score, due_date,
                file_required, semester, related_lessons_json, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
            "#,
            params![
                draft.subject_id,
                draft.scope.direction_id(),
                draft.scope.group_id(),
                draft.lesson_type.to_db_str(),
                draft.title,
                draft.max_score,
                draft.due_date,
                draft.file_required,
                draft.semester,
                serialize_json(&draft.related_lesson_ids),
                created_by,
                now,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 整体更新作业（created_by 不变）
    pub fn update(
        &self,
        assignment_id: i64,
        draft: &AssignmentDraft,
        now: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE assignment SET
                subject_id = ?2, direction_id = ?3, group_id = ?4, lesson_type = ?5, title = ?6,
                max_score = ?7, due_date = ?8, file_required = ?9, semester = ?10,
                related_lessons_json = ?11, updated_at = ?12
            WHERE id = ?1
            "#,
            params![
                assignment_id,
                draft.subject_id,
                draft.scope.direction_id(),
                draft.scope.group_id(),
                draft.lesson_type.to_db_str(),
                draft.title,
                draft.max_score,
                draft.due_date,
                draft.file_required,
                draft.semester,
                serialize_json(&draft.related_lesson_ids),
                now,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Assignment", assignment_id));
        }
        Ok(())
    }

    /// 删除作业（提交记录随外键级联删除）
    pub fn delete(&self, assignment_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM assignment WHERE id = ?1", params![assignment_id])?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Assignment", assignment_id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, assignment_id: i64) -> RepositoryResult<Option<Assignment>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM assignment WHERE id = ?1", ASSIGNMENT_COLUMNS);
        let assignment = conn
            .query_row(&sql, params![assignment_id], map_assignment)
            .optional()?;
        Ok(assignment)
    }

    /// 查询某班级在某科目下可见的作业：方向公共作业 + 本班专属作业
    ///
    /// `semester` 为 Some 时，排除标注了其他学期的作业
    pub fn find_visible_for_group(
        &self,
        subject_id: i64,
        group_id: i64,
        direction_id: Option<i64>,
        semester: Option<i32>,
    ) -> RepositoryResult<Vec<Assignment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM assignment
            WHERE subject_id = ?1
              AND (group_id = ?2 OR (group_id IS NULL AND ?3 IS NOT NULL AND direction_id = ?3))
              AND (?4 IS NULL OR semester IS NULL OR semester = ?4)
            ORDER BY id ASC
            "#,
            ASSIGNMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let assignments = stmt
            .query_map(params![subject_id, group_id, direction_id, semester], map_assignment)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(assignments)
    }
}

fn map_assignment(row: &Row<'_>) -> SqliteResult<Assignment> {
    let scope = ScopeUnit::from_columns(row.get(2)?, row.get(3)?).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Null,
            "assignment 缺少 direction_id/group_id".into(),
        )
    })?;
    let raw_type: String = row.get(4)?;
    let related_json: String = row.get(10)?;

    Ok(Assignment {
        id: row.get(0)?,
        subject_id: row.get(1)?,
        scope,
        lesson_type: parse_lesson_type(4, &raw_type)?,
        title: row.get(5)?,
        max_score: row.get(6)?,
        due_date: row.get(7)?,
        file_required: row.get(8)?,
        semester: row.get(9)?,
        related_lesson_ids: deserialize_json_array(&related_json),
        created_by: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}
