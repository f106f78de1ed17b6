use std::path::Path;

use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Installs the global subscriber. When `LOG_DIR` is set, JSON records are
/// also written to a daily-rotated file there; keep the returned guard alive
/// until shutdown so buffered lines get flushed.
pub fn init() -> Option<WorkerGuard> {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "postboard=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    let stdout = if json_logs {
        fmt::layer().with_target(false).json().boxed()
    } else {
        fmt::layer().boxed()
    };

    let mut guard = None;
    let file = match std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()) {
        Some(dir) => match file_appender(Path::new(&dir)) {
            Ok(appender) => {
                let (writer, g) = tracing_appender::non_blocking(appender);
                guard = Some(g);
                Some(fmt::layer().json().with_ansi(false).with_writer(writer))
            }
            Err(e) => {
                eprintln!("file logging disabled: {e:#}");
                None
            }
        },
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(env_filter))
        .with(stdout)
        .with(file)
        .init();
    guard
}

/// `postboard.<date>.log` in `dir`, rotated daily, two files kept.
fn file_appender(dir: &Path) -> anyhow::Result<RollingFileAppender> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("postboard")
        .filename_suffix("log")
        .max_log_files(2)
        .build(dir)?;
    Ok(appender)
}

/// Masks the local part of an email for log output, keeping `visible`
/// leading characters: `obfuscate_email("bob@x.io", 2) == "bo*@x.io"`.
pub fn obfuscate_email(email: &str, visible: usize) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let keep: String = local.chars().take(visible).collect();
            let masked = local.chars().count().saturating_sub(visible);
            format!("{keep}{}@{domain}", "*".repeat(masked))
        }
        None => "*".repeat(email.chars().count()),
    }
}
