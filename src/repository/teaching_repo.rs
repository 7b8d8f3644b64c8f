// ==========================================
// 课程权限与成绩汇总引擎 - 教学任务仓储
// ==========================================
// 红线: Repository 不含业务逻辑（兜底规则在 TeachingIndex 中）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::teaching::TeachingAssignment;
use crate::domain::types::LessonType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_utils::{build_in_clause, parse_lesson_type};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Result as SqliteResult, Row};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

// ==========================================
// TeachingAssignmentRepository - 教学任务仓储
// ==========================================
pub struct TeachingAssignmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TeachingAssignmentRepository {
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

    /// 写入任课绑定
    ///
    /// 同一 (科目, 班级, 课程类型, 学年, 学期) 已有绑定时整体替换（改派），不产生重复行。
    /// 删除与插入在同一事务中完成。
    ///
    /// # 返回
    /// - Ok(id): 新绑定ID
    pub fn assign(&self, binding: &TeachingAssignment) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let replaced = tx.execute(
            r#"
            DELETE FROM teaching_assignment
            WHERE subject_id = ?1 AND group_id = ?2 AND lesson_type = ?3
              AND COALESCE(academic_year, '') = COALESCE(?4, '')
              AND COALESCE(semester, 0) = COALESCE(?5, 0)
            "#,
            params![
                binding.subject_id,
                binding.group_id,
                binding.lesson_type.to_db_str(),
                binding.academic_year,
                binding.semester,
            ],
        )?;

        tx.execute(
            r#"
            INSERT INTO teaching_assignment (
                teacher_id, subject_id, group_id, lesson_type, academic_year, semester
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                binding.teacher_id,
                binding.subject_id,
                binding.group_id,
                binding.lesson_type.to_db_str(),
                binding.academic_year,
                binding.semester,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        if replaced > 0 {
            tracing::info!(
                subject_id = binding.subject_id,
                group_id = binding.group_id,
                lesson_type = %binding.lesson_type,
                teacher_id = binding.teacher_id,
                "任课绑定已改派"
            );
        }
        Ok(id)
    }

    /// 查询教师在给定班级集合内、某科目的全部绑定
    ///
    /// `semester` 为 Some 时，只返回该学期或不限学期的绑定
    pub fn find_for_teacher(
        &self,
        teacher_id: i64,
        subject_id: i64,
        group_ids: &[i64],
        semester: Option<i32>,
    ) -> RepositoryResult<Vec<TeachingAssignment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT id, teacher_id, subject_id, group_id, lesson_type, academic_year, semester
            FROM teaching_assignment
            WHERE teacher_id = ? AND subject_id = ? AND {}
              AND (? IS NULL OR semester IS NULL OR semester = ?)
            ORDER BY group_id ASC, id ASC
            "#,
            build_in_clause("group_id", group_ids.len())
        );

        let mut values: Vec<Value> = vec![Value::Integer(teacher_id), Value::Integer(subject_id)];
        values.extend(group_ids.iter().map(|g| Value::Integer(*g)));
        let sem = semester.map(|s| Value::Integer(s as i64)).unwrap_or(Value::Null);
        values.push(sem.clone());
        values.push(sem);

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), map_binding)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 查询给定班级集合内、某科目已被（任意教师）绑定的课程类型
    pub fn bound_lesson_types(
        &self,
        subject_id: i64,
        group_ids: &[i64],
        semester: Option<i32>,
    ) -> RepositoryResult<BTreeSet<LessonType>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT DISTINCT lesson_type
            FROM teaching_assignment
            WHERE subject_id = ? AND {}
              AND (? IS NULL OR semester IS NULL OR semester = ?)
            "#,
            build_in_clause("group_id", group_ids.len())
        );

        let mut values: Vec<Value> = vec![Value::Integer(subject_id)];
        values.extend(group_ids.iter().map(|g| Value::Integer(*g)));
        let sem = semester.map(|s| Value::Integer(s as i64)).unwrap_or(Value::Null);
        values.push(sem.clone());
        values.push(sem);

        let mut stmt = conn.prepare(&sql)?;
        let types = stmt
            .query_map(params_from_iter(values), |row| {
                let raw: String = row.get(0)?;
                parse_lesson_type(0, &raw)
            })?
            .collect::<SqliteResult<BTreeSet<_>>>()?;
        Ok(types)
    }

    /// 查询班级的全部绑定（课表/导出使用）
    pub fn find_by_group(&self, group_id: i64) -> RepositoryResult<Vec<TeachingAssignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, teacher_id, subject_id, group_id, lesson_type, academic_year, semester
            FROM teaching_assignment
            WHERE group_id = ?1
            ORDER BY subject_id ASC, lesson_type ASC
            "#,
        )?;
        let rows = stmt
            .query_map(params![group_id], map_binding)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}

fn map_binding(row: &Row<'_>) -> SqliteResult<TeachingAssignment> {
    let raw_type: String = row.get(4)?;
    Ok(TeachingAssignment {
        id: row.get(0)?,
        teacher_id: row.get(1)?,
        subject_id: row.get(2)?,
        group_id: row.get(3)?,
        lesson_type: parse_lesson_type(4, &raw_type)?,
        academic_year: row.get(5)?,
        semester: row.get(6)?,
    })
}
