//! Stderr logging for the CLI.
//!
//! `--log-level` applies to the bladelink crates only. Everything else (tokio,
//! mio) stays at `warn` so `--log-level trace` shows frames and timers rather
//! than reactor internals. `BLADELINK_LOG` replaces the whole filter with
//! `EnvFilter` directives when set.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a full filter, e.g. `bladelink_session=trace,tokio=debug`.
pub const LOG_ENV: &str = "BLADELINK_LOG";

const CRATE_TARGETS: [&str; 3] = ["bladelink", "bladelink_frame", "bladelink_session"];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Filter directives for `level`: our crates at `level`, the rest no louder
/// than `warn`.
fn directives(level: LogLevel) -> String {
    let others = level.min(LogLevel::Warn).as_str();
    let mut out = String::from(others);
    for target in CRATE_TARGETS {
        out.push(',');
        out.push_str(target);
        out.push('=');
        out.push_str(level.as_str());
    }
    out
}

/// Pick the filter and report a rejected `BLADELINK_LOG` value, if any.
fn build_filter(level: LogLevel, env: Option<&str>) -> (EnvFilter, Option<String>) {
    let fallback = || EnvFilter::new(directives(level));
    match env.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => match EnvFilter::try_new(value) {
            Ok(filter) => (filter, None),
            Err(err) => (fallback(), Some(format!("{value:?}: {err}"))),
        },
        None => (fallback(), None),
    }
}

/// Route logs to stderr so stdout carries only command output.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let env = std::env::var(LOG_ENV).ok();
    let (filter, rejected) = build_filter(level, env.as_deref());

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_ansi(false);

    let installed = match format {
        LogFormat::Text => builder.with_target(level >= LogLevel::Debug).try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    if let (Ok(()), Some(rejected)) = (installed, rejected) {
        tracing::warn!(filter = %rejected, "ignoring invalid {LOG_ENV}");
    }
}
