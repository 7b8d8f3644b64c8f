// ==========================================
// 课程权限与成绩汇总引擎 - 配置层
// ==========================================
// 职责: 引擎参数读取与覆写
// 存储: config_kv 表 (scope_id = 'global')
// ==========================================

pub mod config_manager;
pub mod engine_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use engine_config_trait::{EngineConfigReader, StaticEngineConfig};
