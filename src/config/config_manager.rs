// ==========================================
// 课程权限与成绩汇总引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::engine_config_trait::{
    EngineConfigReader, DEFAULT_ATTENTION_CHECKS_REQUIRED, DEFAULT_HOURS_PER_CREDIT,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_UTC_OFFSET_MINUTES,
};
use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 对传入连接再次应用统一 PRAGMA（幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;

        tracing::info!(config_key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 读取并解析数值配置；缺失或格式错误时回退默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr + Copy,
    {
        let Some(raw) = self.get_global_config_value(key)? else {
            return Ok(default);
        };

        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(config_key = key, raw_value = %raw, "配置格式错误，使用默认值");
                Ok(default)
            }
        }
    }

    /// 获取所有 global 配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 成绩报表导出时记录当时的参数
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

// ==========================================
// EngineConfigReader Trait 实现
// ==========================================
impl EngineConfigReader for ConfigManager {
    fn get_max_attempts(&self) -> Result<i64, Box<dyn Error>> {
        let v = self.get_parsed_or_default(config_keys::MAX_ATTEMPTS, DEFAULT_MAX_ATTEMPTS)?;
        Ok(if v < 1 { DEFAULT_MAX_ATTEMPTS } else { v })
    }

    fn get_attention_checks_required(&self) -> Result<i32, Box<dyn Error>> {
        let v = self.get_parsed_or_default(
            config_keys::ATTENTION_CHECKS_REQUIRED,
            DEFAULT_ATTENTION_CHECKS_REQUIRED,
        )?;
        Ok(if v < 1 { DEFAULT_ATTENTION_CHECKS_REQUIRED } else { v })
    }

    fn get_institution_utc_offset_minutes(&self) -> Result<i32, Box<dyn Error>> {
        let v = self.get_parsed_or_default(config_keys::UTC_OFFSET_MINUTES, DEFAULT_UTC_OFFSET_MINUTES)?;
        // chrono::FixedOffset 只接受 ±24h 以内
        Ok(if v.abs() >= 24 * 60 { DEFAULT_UTC_OFFSET_MINUTES } else { v })
    }

    fn get_hours_per_credit(&self) -> Result<f64, Box<dyn Error>> {
        let v = self.get_parsed_or_default(config_keys::HOURS_PER_CREDIT, DEFAULT_HOURS_PER_CREDIT)?;
        Ok(if v > 0.0 { v } else { DEFAULT_HOURS_PER_CREDIT })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 提交
    pub const MAX_ATTEMPTS: &str = "submission.max_attempts";

    // 课次解锁
    pub const ATTENTION_CHECKS_REQUIRED: &str = "lesson.attention_checks_required";

    // 院校
    pub const UTC_OFFSET_MINUTES: &str = "institution.utc_offset_minutes";

    // 学分
    pub const HOURS_PER_CREDIT: &str = "curriculum.hours_per_credit";
}
