use super::core::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::types::TargetKind;
use crate::repository::error::RepositoryResult;
use rusqlite::types::Type;
use rusqlite::{params, Result as SqliteResult, Row};

impl ActionLogRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 action_id 查询单个日志
    pub fn find_by_id(&self, action_id: &str) -> RepositoryResult<Option<ActionLog>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT action_id, action_type, action_ts, actor_id,
                   target_type, target_id, payload_json, detail
            FROM action_log
            WHERE action_id = ?
            "#,
        )?;

        match stmt.query_row(params![action_id], |row| self.map_row(row)) {
            Ok(log) => Ok(Some(log)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询某个目标实体的全部日志（时间倒序）
    pub fn find_by_target(
        &self,
        target_type: TargetKind,
        target_id: i64,
    ) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT action_id, action_type, action_ts, actor_id,
                   target_type, target_id, payload_json, detail
            FROM action_log
            WHERE target_type = ? AND target_id = ?
            ORDER BY action_ts DESC
            "#,
        )?;

        let logs = stmt
            .query_map(params![target_type.to_string(), target_id], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }

    /// 查询某操作人的最近日志
    pub fn find_recent_by_actor(&self, actor_id: i64, limit: i32) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT action_id, action_type, action_ts, actor_id,
                   target_type, target_id, payload_json, detail
            FROM action_log
            WHERE actor_id = ?
            ORDER BY action_ts DESC
            LIMIT ?
            "#,
        )?;

        let logs = stmt
            .query_map(params![actor_id, limit], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn map_row(&self, row: &Row) -> SqliteResult<ActionLog> {
        let raw_type: String = row.get(1)?;
        let action_type = ActionType::from_db_str(&raw_type).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                Type::Text,
                format!("未知操作类型: {}", raw_type).into(),
            )
        })?;

        let raw_target: String = row.get(4)?;
        let target_type = match raw_target.as_str() {
            "LESSON" => TargetKind::Lesson,
            "ASSIGNMENT" => TargetKind::Assignment,
            "SUBMISSION" => TargetKind::Submission,
            other => {
                return Err(rusqlite::Error::FromSqlConversionFailure(
                    4,
                    Type::Text,
                    format!("未知目标类型: {}", other).into(),
                ))
            }
        };

        let payload_json: Option<String> = row.get(6)?;

        Ok(ActionLog {
            action_id: row.get(0)?,
            action_type,
            action_ts: row.get(2)?,
            actor_id: row.get(3)?,
            target_type,
            target_id: row.get(5)?,
            payload_json: payload_json.and_then(|s| serde_json::from_str(&s).ok()),
            detail: row.get(7)?,
        })
    }
}
