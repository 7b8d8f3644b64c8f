// ==========================================
// 课程权限与成绩汇总引擎 - 观看进度仓储
// ==========================================
// 红线: 完成标记一旦写入不可回退（SQL 层同样保证）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::lesson_view::LessonView;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::build_in_clause;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ==========================================
// LessonViewRepository - 观看进度仓储
// ==========================================
pub struct LessonViewRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LessonViewRepository {
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

    pub fn find(&self, student_id: i64, lesson_id: i64) -> RepositoryResult<Option<LessonView>> {
        let conn = self.get_conn()?;
        let view = conn
            .query_row(
                r#"
                SELECT student_id, lesson_id, watched_seconds, attention_checks_passed,
                       is_completed, completed_at, updated_at
                FROM lesson_view WHERE student_id = ?1 AND lesson_id = ?2
                "#,
                params![student_id, lesson_id],
                map_view,
            )
            .optional()?;
        Ok(view)
    }

    /// 批量查询学生在多节课次上的进度
    pub fn find_for_lessons(
        &self,
        student_id: i64,
        lesson_ids: &[i64],
    ) -> RepositoryResult<HashMap<i64, LessonView>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT student_id, lesson_id, watched_seconds, attention_checks_passed,
                   is_completed, completed_at, updated_at
            FROM lesson_view WHERE student_id = ? AND {}
            "#,
            build_in_clause("lesson_id", lesson_ids.len())
        );
        let mut values: Vec<Value> = vec![Value::Integer(student_id)];
        values.extend(lesson_ids.iter().map(|id| Value::Integer(*id)));

        let mut stmt = conn.prepare(&sql)?;
        let views = stmt
            .query_map(params_from_iter(values), map_view)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(views.into_iter().map(|v| (v.lesson_id, v)).collect())
    }

    /// 写入进度（首次写入时创建记录）
    ///
    /// 已完成的记录保持完成，completed_at 只保留第一次的值。
    /// 观看时长只由 add_watch_time 累加，此处不覆盖；专注检查次数只增不减
    pub fn upsert(&self, view: &LessonView) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO lesson_view (
                student_id, lesson_id, watched_seconds, attention_checks_passed,
                is_completed, completed_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(student_id, lesson_id) DO UPDATE SET
                attention_checks_passed = MAX(lesson_view.attention_checks_passed, excluded.attention_checks_passed),
                is_completed = MAX(lesson_view.is_completed, excluded.is_completed),
                completed_at = COALESCE(lesson_view.completed_at, excluded.completed_at),
                updated_at = excluded.updated_at
            "#,
            params![
                view.student_id,
                view.lesson_id,
                view.watched_seconds,
                view.attention_checks_passed,
                view.is_completed,
                view.completed_at,
                view.updated_at,
            ],
        )?;
        Ok(())
    }

    /// 累加观看时长
    pub fn add_watch_time(
        &self,
        student_id: i64,
        lesson_id: i64,
        seconds: i64,
        now: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO lesson_view (student_id, lesson_id, watched_seconds, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(student_id, lesson_id) DO UPDATE SET
                watched_seconds = lesson_view.watched_seconds + excluded.watched_seconds,
                updated_at = excluded.updated_at
            "#,
            params![student_id, lesson_id, seconds, now],
        )?;
        Ok(())
    }
}

fn map_view(row: &Row<'_>) -> SqliteResult<LessonView> {
    Ok(LessonView {
        student_id: row.get(0)?,
        lesson_id: row.get(1)?,
        watched_seconds: row.get(2)?,
        attention_checks_passed: row.get(3)?,
        is_completed: row.get(4)?,
        completed_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
