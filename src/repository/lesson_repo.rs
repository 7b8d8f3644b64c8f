// ==========================================
// 课程权限与成绩汇总引擎 - 课次仓储
// ==========================================
// 红线: Repository 不含业务逻辑（解锁判定在 UnlockGate 中）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::content::{Lesson, LessonDraft, ScopeUnit};
use crate::domain::types::LessonType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::{deserialize_json_array, parse_lesson_type, serialize_json};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const LESSON_COLUMNS: &str = r#"
    id, subject_id, direction_id, group_id, lesson_type, lesson_order, title, semester,
    video_ref, file_refs_json, created_by, created_at, updated_at
"#;

// ==========================================
// LessonRepository - 课次仓储
// ==========================================
pub struct LessonRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LessonRepository {
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

    /// 新建课次
    ///
    /// # 返回
    /// - Ok(id): 新课次ID
    /// - Err(UniqueConstraintViolation): 顺序号在 (科目, 范围, 类型) 内重复
    pub fn insert(
        &self,
        draft: &LessonDraft,
        created_by: Option<i64>,
        now: DateTime<Utc>,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO lesson (
                subject_id, direction_id, group_id, lesson_type, lesson_order, title, semester,
                video_ref, file_refs_json, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            "#,
            params![
                draft.subject_id,
                draft.scope.direction_id(),
                draft.scope.group_id(),
                draft.lesson_type.to_db_str(),
                draft.order,
                draft.title,
                draft.semester,
                draft.video_ref,
                serialize_json(&draft.file_refs),
                created_by,
                now,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 整体更新课次（created_by 不变）
    pub fn update(&self, lesson_id: i64, draft: &LessonDraft, now: DateTime<Utc>) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE lesson SET
                subject_id = ?2, direction_id = ?3, group_id = ?4, lesson_type = ?5,
                lesson_order = ?6, title = ?7, semester = ?8, video_ref = ?9,
                file_refs_json = ?10, updated_at = ?11
            WHERE id = ?1
            "#,
            params![
                lesson_id,
                draft.subject_id,
                draft.scope.direction_id(),
                draft.scope.group_id(),
                draft.lesson_type.to_db_str(),
                draft.order,
                draft.title,
                draft.semester,
                draft.video_ref,
                serialize_json(&draft.file_refs),
                now,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Lesson", lesson_id));
        }
        Ok(())
    }

    pub fn delete(&self, lesson_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM lesson WHERE id = ?1", params![lesson_id])?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Lesson", lesson_id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, lesson_id: i64) -> RepositoryResult<Option<Lesson>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM lesson WHERE id = ?1", LESSON_COLUMNS);
        let lesson = conn.query_row(&sql, params![lesson_id], map_lesson).optional()?;
        Ok(lesson)
    }

    /// 查询同一 (科目, 范围, 类型) 内的课次，按顺序号升序
    pub fn find_in_scope(
        &self,
        subject_id: i64,
        scope: ScopeUnit,
        lesson_type: LessonType,
    ) -> RepositoryResult<Vec<Lesson>> {
        let conn = self.get_conn()?;
        let (scope_filter, scope_id) = match scope {
            ScopeUnit::Direction(d) => ("direction_id = ?2 AND group_id IS NULL", d),
            ScopeUnit::Group(g) => ("group_id = ?2", g),
        };
        let sql = format!(
            "SELECT {} FROM lesson WHERE subject_id = ?1 AND {} AND lesson_type = ?3 ORDER BY lesson_order ASC",
            LESSON_COLUMNS, scope_filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let lessons = stmt
            .query_map(params![subject_id, scope_id, lesson_type.to_db_str()], map_lesson)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(lessons)
    }

    /// 查询某班级可见的课次：方向公共课次 + 本班专属课次
    ///
    /// 按 (类型, 范围, 顺序号) 排序
    pub fn find_visible_for_group(
        &self,
        subject_id: i64,
        group_id: i64,
        direction_id: Option<i64>,
    ) -> RepositoryResult<Vec<Lesson>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM lesson
            WHERE subject_id = ?1
              AND (group_id = ?2 OR (group_id IS NULL AND ?3 IS NOT NULL AND direction_id = ?3))
            ORDER BY lesson_type ASC, group_id IS NOT NULL, lesson_order ASC
            "#,
            LESSON_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let lessons = stmt
            .query_map(params![subject_id, group_id, direction_id], map_lesson)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(lessons)
    }
}

fn map_lesson(row: &Row<'_>) -> SqliteResult<Lesson> {
    let scope = ScopeUnit::from_columns(row.get(2)?, row.get(3)?).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Null,
            "lesson 缺少 direction_id/group_id".into(),
        )
    })?;
    let raw_type: String = row.get(4)?;
    let file_refs_json: String = row.get(9)?;

    Ok(Lesson {
        id: row.get(0)?,
        subject_id: row.get(1)?,
        scope,
        lesson_type: parse_lesson_type(4, &raw_type)?,
        order: row.get(5)?,
        title: row.get(6)?,
        semester: row.get(7)?,
        video_ref: row.get(8)?,
        file_refs: deserialize_json_array(&file_refs_json),
        created_by: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}
