//! 日志初始化
//! 控制台输出: 全部日志写 stdout, WARN 及以上同时写 stderr.
//! stdout 被结果占用时 (JSON Lines), 日志只写 stderr.

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化日志 (`RUST_LOG` 优先于 `base_level`)
///
/// 重复调用时保留第一次的设置, 返回 false.
pub fn setup_logging(base_level: &str, stderr_only: bool) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(base_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if stderr_only {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_ansi(false)
            .with_writer(std::io::stderr);
        registry.with(console_layer).try_init().is_ok()
    } else {
        let console_writer = std::io::stdout.and(std::io::stderr.with_max_level(Level::WARN));
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_ansi(true)
            .with_writer(console_writer);
        registry.with(console_layer).try_init().is_ok()
    }
}
