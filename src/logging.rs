// ==========================================
// 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// 支持环境变量配置日志级别
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 将配置文件中的日志级别映射为 tracing 过滤指令
///
/// critical → error, warning → warn，其余原样；无法识别时返回 None
pub fn level_directive(level: &str) -> Option<&'static str> {
    match level.trim().to_lowercase().as_str() {
        "critical" | "error" => Some("error"),
        "warning" | "warn" => Some("warn"),
        "info" => Some("info"),
        "debug" => Some("debug"),
        "trace" => Some("trace"),
        _ => None,
    }
}

fn build_filter(level: &str) -> EnvFilter {
    // RUST_LOG 优先，其次使用配置的级别
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(level).unwrap_or("error")))
}

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（优先于配置文件）
///   例如: RUST_LOG=debug 或 RUST_LOG=metric_handel=trace
///
/// # 示例
/// ```no_run
/// use metric_handel::logging;
/// logging::init("info");
/// ```
pub fn init(level: &str) {
    let _ = fmt()
        .with_env_filter(build_filter(level))
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .try_init();
}

/// 初始化 JSON 行格式日志（便于机器采集）
pub fn init_json(level: &str) {
    let _ = fmt()
        .json()
        .with_env_filter(build_filter(level))
        .with_current_span(true)
        .try_init();
}

/// 初始化测试环境的日志系统
///
/// 使用更详细的日志级别，便于调试
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive_mapping() {
        assert_eq!(level_directive("critical"), Some("error"));
        assert_eq!(level_directive("WARNING"), Some("warn"));
        assert_eq!(level_directive("debug"), Some("debug"));
        assert_eq!(level_directive("verbose"), None);
    }
}
