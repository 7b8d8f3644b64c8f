// ==========================================
// 课程权限与成绩汇总引擎 - 引擎配置读取 Trait
// ==========================================
// 职责: 定义引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use std::error::Error;

/// 默认提交次数上限
pub const DEFAULT_MAX_ATTEMPTS: i64 = 3;
/// 默认完成课次所需的专注检查次数
pub const DEFAULT_ATTENTION_CHECKS_REQUIRED: i32 = 3;
/// 默认院校时区偏移（UTC+5）
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 300;
/// 默认每学分学时
pub const DEFAULT_HOURS_PER_CREDIT: f64 = 30.0;

// ==========================================
// EngineConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）、StaticEngineConfig（固定值）
pub trait EngineConfigReader: Send + Sync {
    /// 每个 (学生, 作业) 的最大尝试次数
    ///
    /// # 默认值
    /// - 3
    fn get_max_attempts(&self) -> Result<i64, Box<dyn Error>>;

    /// 课次完成所需通过的专注检查次数
    ///
    /// # 默认值
    /// - 3
    fn get_attention_checks_required(&self) -> Result<i32, Box<dyn Error>>;

    /// 院校本地时间相对 UTC 的偏移（分钟），用于截止日 23:59:59 判定
    ///
    /// # 默认值
    /// - 300
    fn get_institution_utc_offset_minutes(&self) -> Result<i32, Box<dyn Error>>;

    /// 学分换算除数
    ///
    /// # 默认值
    /// - 30
    fn get_hours_per_credit(&self) -> Result<f64, Box<dyn Error>>;
}

// ==========================================
// StaticEngineConfig - 固定配置
// ==========================================
// 用途: 不依赖数据库的场景（纯计算、单元测试）
#[derive(Debug, Clone, PartialEq)]
pub struct StaticEngineConfig {
    pub max_attempts: i64,
    pub attention_checks_required: i32,
    pub utc_offset_minutes: i32,
    pub hours_per_credit: f64,
}

impl Default for StaticEngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attention_checks_required: DEFAULT_ATTENTION_CHECKS_REQUIRED,
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            hours_per_credit: DEFAULT_HOURS_PER_CREDIT,
        }
    }
}

impl EngineConfigReader for StaticEngineConfig {
    fn get_max_attempts(&self) -> Result<i64, Box<dyn Error>> {
        Ok(self.max_attempts)
    }

    fn get_attention_checks_required(&self) -> Result<i32, Box<dyn Error>> {
        Ok(self.attention_checks_required)
    }

    fn get_institution_utc_offset_minutes(&self) -> Result<i32, Box<dyn Error>> {
        Ok(self.utc_offset_minutes)
    }

    fn get_hours_per_credit(&self) -> Result<f64, Box<dyn Error>> {
        Ok(self.hours_per_credit)
    }
}
