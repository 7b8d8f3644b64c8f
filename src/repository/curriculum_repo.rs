// ==========================================
// 课程权限与成绩汇总引擎 - 教学大纲仓储
// ==========================================
// 红线: Repository 不含业务逻辑（条目挑选在 CurriculumResolver 中完成）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::curriculum::{CurriculumEntry, LessonHours};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const ENTRY_COLUMNS: &str = r#"
    id, direction_id, subject_id, semester, enrollment_year, education_type,
    hours_maruza, hours_amaliyot, hours_laboratoriya, hours_seminar, hours_kurs_ishi, hours_mustaqil
"#;

// ==========================================
// CurriculumRepository - 教学大纲仓储
// ==========================================
pub struct CurriculumRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CurriculumRepository {
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

    /// 写入大纲条目（由教务侧维护，此处供初始化/测试使用）
    ///
    /// # 返回
    /// - Ok(id): 新条目ID
    /// - Err(UniqueConstraintViolation): 同一范围已存在条目
    pub fn insert(&self, entry: &CurriculumEntry) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let h = &entry.hours;
        conn.execute(
            r#"
            INSERT INTO curriculum_entry (
                direction_id, subject_id, semester, enrollment_year, education_type,
                hours_maruza, hours_amaliyot, hours_laboratoriya, hours_seminar, hours_kurs_ishi, hours_mustaqil
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                entry.direction_id,
                entry.subject_id,
                entry.semester,
                entry.enrollment_year,
                entry.education_type,
                h.lecture,
                h.practicum,
                h.lab,
                h.seminar,
                h.coursework,
                h.independent_study,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 查询 (方向, 科目, 学期) 的全部候选条目
    ///
    /// 入学年份/培养形式的匹配由引擎层完成
    pub fn find_candidates(
        &self,
        direction_id: i64,
        subject_id: i64,
        semester: i32,
    ) -> RepositoryResult<Vec<CurriculumEntry>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM curriculum_entry WHERE direction_id = ?1 AND subject_id = ?2 AND semester = ?3 ORDER BY id ASC",
            ENTRY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![direction_id, subject_id, semester], map_entry)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(entries)
    }

    /// 查询某方向某学期的全部条目（学期汇总使用）
    pub fn find_by_direction_semester(
        &self,
        direction_id: i64,
        semester: i32,
    ) -> RepositoryResult<Vec<CurriculumEntry>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM curriculum_entry WHERE direction_id = ?1 AND semester = ?2 ORDER BY subject_id ASC, id ASC",
            ENTRY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![direction_id, semester], map_entry)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(entries)
    }
}

fn map_entry(row: &Row<'_>) -> SqliteResult<CurriculumEntry> {
    Ok(CurriculumEntry {
        id: row.get(0)?,
        direction_id: row.get(1)?,
        subject_id: row.get(2)?,
        semester: row.get(3)?,
        enrollment_year: row.get(4)?,
        education_type: row.get(5)?,
        hours: LessonHours {
            lecture: row.get(6)?,
            practicum: row.get(7)?,
            lab: row.get(8)?,
            seminar: row.get(9)?,
            coursework: row.get(10)?,
            independent_study: row.get(11)?,
        },
    })
}
