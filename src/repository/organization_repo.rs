// ==========================================
// 课程权限与成绩汇总引擎 - 组织结构仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: direction / study_group / student / subject 表的读写
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::organization::{Direction, Student, StudyGroup, Subject};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// OrganizationRepository - 组织结构仓储
// ==========================================
pub struct OrganizationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrganizationRepository {
    /// 创建新的 OrganizationRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 专业方向
    // ==========================================

    pub fn insert_direction(&self, direction: &Direction) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO direction (id, code, name, faculty_id, enrollment_year, education_type)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                direction.id,
                direction.code,
                direction.name,
                direction.faculty_id,
                direction.enrollment_year,
                direction.education_type,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_direction(&self, direction_id: i64) -> RepositoryResult<Option<Direction>> {
        let conn = self.get_conn()?;
        let direction = conn
            .query_row(
                r#"
                SELECT id, code, name, faculty_id, enrollment_year, education_type
                FROM direction WHERE id = ?1
                "#,
                params![direction_id],
                |row| {
                    Ok(Direction {
                        id: row.get(0)?,
                        code: row.get(1)?,
                        name: row.get(2)?,
                        faculty_id: row.get(3)?,
                        enrollment_year: row.get(4)?,
                        education_type: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(direction)
    }

    // ==========================================
    // 班级
    // ==========================================

    pub fn insert_group(&self, group: &StudyGroup) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO study_group (
                id, name, direction_id, course_year, semester, education_type, enrollment_year
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                group.id,
                group.name,
                group.direction_id,
                group.course_year,
                group.semester,
                group.education_type,
                group.enrollment_year,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_group(&self, group_id: i64) -> RepositoryResult<Option<StudyGroup>> {
        let conn = self.get_conn()?;
        let group = conn
            .query_row(
                r#"
                SELECT id, name, direction_id, course_year, semester, education_type, enrollment_year
                FROM study_group WHERE id = ?1
                "#,
                params![group_id],
                map_group,
            )
            .optional()?;
        Ok(group)
    }

    /// 查询专业方向下的全部班级
    pub fn find_groups_by_direction(&self, direction_id: i64) -> RepositoryResult<Vec<StudyGroup>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, name, direction_id, course_year, semester, education_type, enrollment_year
            FROM study_group
            WHERE direction_id = ?1
            ORDER BY id ASC
            "#,
        )?;
        let groups = stmt
            .query_map(params![direction_id], map_group)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(groups)
    }

    /// 更新班级当前学期（学期切换由教务侧触发）
    pub fn update_group_semester(&self, group_id: i64, semester: i32) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE study_group SET semester = ?2 WHERE id = ?1",
            params![group_id, semester],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("StudyGroup", group_id));
        }
        Ok(())
    }

    // ==========================================
    // 学生
    // ==========================================

    pub fn insert_student(&self, student: &Student) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO student (user_id, group_id, full_name) VALUES (?1, ?2, ?3)",
            params![student.user_id, student.group_id, student.full_name],
        )?;
        Ok(())
    }

    pub fn find_student(&self, user_id: i64) -> RepositoryResult<Option<Student>> {
        let conn = self.get_conn()?;
        let student = conn
            .query_row(
                "SELECT user_id, group_id, full_name FROM student WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(Student {
                        user_id: row.get(0)?,
                        group_id: row.get(1)?,
                        full_name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(student)
    }

    // ==========================================
    // 科目
    // ==========================================

    pub fn insert_subject(&self, subject: &Subject) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO subject (id, name, credits) VALUES (?1, ?2, ?3)",
            params![subject.id, subject.name, subject.credits],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_subject(&self, subject_id: i64) -> RepositoryResult<Option<Subject>> {
        let conn = self.get_conn()?;
        let subject = conn
            .query_row(
                "SELECT id, name, credits FROM subject WHERE id = ?1",
                params![subject_id],
                |row| {
                    Ok(Subject {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        credits: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(subject)
    }
}

fn map_group(row: &Row<'_>) -> SqliteResult<StudyGroup> {
    Ok(StudyGroup {
        id: row.get(0)?,
        name: row.get(1)?,
        direction_id: row.get(2)?,
        course_year: row.get(3)?,
        semester: row.get(4)?,
        education_type: row.get(5)?,
        enrollment_year: row.get(6)?,
    })
}
