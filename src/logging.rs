// ==========================================
// 课程权限与成绩汇总引擎 - 日志
// ==========================================
// 引擎只打点（权限拒绝、锁定拒绝、评分、完成），订阅器由宿主安装
// 过滤器优先级: COURSE_ENGINE_LOG > RUST_LOG > 内置默认
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 引擎专用的过滤器环境变量
pub const LOG_ENV: &str = "COURSE_ENGINE_LOG";

/// 依赖库只报警告，引擎自身的判定与状态变化按 info 输出
pub const DEFAULT_FILTER: &str = "warn,course_policy_engine=info";

/// 测试下展开引擎的 debug 打点（判定原因、解锁检查）
pub const TEST_FILTER: &str = "warn,course_policy_engine=debug";

/// 按优先级选出过滤器；环境变量写错时退回默认值
fn resolve_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// 安装全局订阅器
///
/// 宿主已安装订阅器时不覆盖，返回 false。
///
/// ```no_run
/// use course_policy_engine::logging;
/// logging::init();
/// ```
pub fn init() -> bool {
    fmt()
        .with_env_filter(resolve_filter())
        .with_target(true)
        .with_line_number(true)
        .try_init()
        .is_ok()
}

/// 测试用订阅器，输出交给测试框架捕获；可重复调用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new(TEST_FILTER))
        .with_test_writer()
        .try_init();
}
