// ==========================================
// Mock 配置实现 - 用于集成测试
// ==========================================

use course_policy_engine::config::EngineConfigReader;
use std::error::Error;

/// Mock 配置结构
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub max_attempts: i64,
    pub attention_checks_required: i32,
    pub utc_offset_minutes: i32,
    pub hours_per_credit: f64,
}

impl MockConfig {
    /// 创建默认配置
    pub fn default() -> Self {
        Self {
            max_attempts: 3,
            attention_checks_required: 3,
            utc_offset_minutes: 300,
            hours_per_credit: 30.0,
        }
    }

    /// 自定义提交次数上限
    pub fn with_max_attempts(max_attempts: i64) -> Self {
        let mut config = Self::default();
        config.max_attempts = max_attempts;
        config
    }

    /// 自定义专注检查次数
    pub fn with_attention_checks(required: i32) -> Self {
        let mut config = Self::default();
        config.attention_checks_required = required;
        config
    }
}

impl EngineConfigReader for MockConfig {
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
