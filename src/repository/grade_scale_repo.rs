// ==========================================
// 课程权限与成绩汇总引擎 - 评分等级仓储
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::grade_scale::{GradeBand, GradeScale};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::sync::{Arc, Mutex};

pub struct GradeScaleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl GradeScaleRepository {
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

    /// 加载完整等级表
    pub fn load(&self) -> RepositoryResult<GradeScale> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT min_percent, letter, color FROM grade_scale ORDER BY min_percent ASC",
        )?;
        let bands = stmt
            .query_map([], |row| {
                Ok(GradeBand {
                    min_percent: row.get(0)?,
                    letter: row.get(1)?,
                    color: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(GradeScale::new(bands))
    }

    /// 以新等级表整体替换旧表
    pub fn replace_all(&self, bands: &[GradeBand]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM grade_scale", [])?;
        for band in bands {
            tx.execute(
                "INSERT INTO grade_scale (min_percent, letter, color) VALUES (?1, ?2, ?3)",
                params![band.min_percent, band.letter, band.color],
            )?;
        }
        tx.commit()?;
        Ok(bands.len())
    }
}
