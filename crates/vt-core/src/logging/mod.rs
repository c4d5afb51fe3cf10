//! Structured logging foundation for vegtrend.
//!
//! Provides dual-mode logging:
//! - Human-readable console output for interactive use
//! - Machine-parseable JSON lines for pipelines
//!
//! # Usage
//!
//! ```ignore
//! use vt_core::logging::{init_logging, LogConfig, LogContext, Stage, event_names};
//!
//! let config = LogConfig::from_env(0, None);
//! init_logging(&config);
//!
//! let ctx = LogContext::new(generate_run_id());
//! vt_core::log_event!(ctx, INFO, event_names::RUN_STARTED, Stage::Init, "starting");
//! ```
//!
//! stdout is reserved for result payloads; all log output goes to stderr.

pub mod config;
pub mod events;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, LogContext, Stage};

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose events pass the default filter.
const LOG_TARGETS: [&str; 4] = ["vegtrend", "vt_core", "vt_config", "vt_common"];

fn default_filter(level: LogLevel) -> EnvFilter {
    let directives = LOG_TARGETS
        .iter()
        .map(|t| format!("{}={}", t, level))
        .collect::<Vec<_>>()
        .join(",");
    EnvFilter::new(directives)
}

/// Filter for one invocation.
///
/// A valid `rust_log` replaces the level-derived filter, except that a level
/// chosen with `-v`/`-q` is applied on top of it for the workspace crates.
fn resolve_filter(rust_log: Option<&str>, config: &LogConfig) -> EnvFilter {
    let Some(env) = rust_log.and_then(|s| EnvFilter::try_new(s).ok()) else {
        return default_filter(config.level);
    };
    if !config.level_from_cli {
        return env;
    }
    LOG_TARGETS
        .iter()
        .filter_map(|t| format!("{}={}", t, config.level).parse::<Directive>().ok())
        .fold(env, EnvFilter::add_directive)
}

/// Initialize the logging subsystem.
///
/// Must be called once at startup before any logging occurs. `RUST_LOG`,
/// when set, replaces `VT_LOG`; `-v`/`-q` flags apply last.
pub fn init_logging(config: &LogConfig) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = resolve_filter(rust_log.as_deref(), config);

    match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(use_ansi);

            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .init();
            }
        }
        LogFormat::Jsonl => {
            let json_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .flatten_event(true);
            tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .init();
        }
    }
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("run-{}", &uuid.simple().to_string()[..12])
}

/// Structured event with the invocation's correlation fields.
///
/// ```ignore
/// log_event!(ctx, INFO, event_names::LOAD_FINISHED, Stage::Load, "dataset ready", rows = 1200);
/// ```
#[macro_export]
macro_rules! log_event {
    ($ctx:expr, INFO, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::info!(
            event = $event,
            run_id = %$ctx.run_id,
            scenario = ?$ctx.scenario,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
    ($ctx:expr, DEBUG, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::debug!(
            event = $event,
            run_id = %$ctx.run_id,
            scenario = ?$ctx.scenario,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
    ($ctx:expr, WARN, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::warn!(
            event = $event,
            run_id = %$ctx.run_id,
            scenario = ?$ctx.scenario,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
    ($ctx:expr, ERROR, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::error!(
            event = $event,
            run_id = %$ctx.run_id,
            scenario = ?$ctx.scenario,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_generate_run_id() {
        let id1 = generate_run_id();
        let id2 = generate_run_id();
        assert!(id1.starts_with("run-"));
        assert_eq!(id1.len(), 16);
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_default_filter_covers_workspace_crates() {
        let filter = default_filter(LogLevel::Debug).to_string();
        assert!(filter.contains("vt_core=debug"));
        assert!(filter.contains("vegtrend=debug"));
    }

    #[test]
    fn test_rust_log_replaces_configured_level() {
        let config = LogConfig::default().with_level(LogLevel::Debug);
        let filter = resolve_filter(Some("vt_core=error"), &config);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::ERROR));

        let filter = resolve_filter(None, &config);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_cli_level_wins_over_rust_log() {
        let louder = LogConfig::default().with_cli_level(LogLevel::Debug);
        let filter = resolve_filter(Some("vt_core=error"), &louder);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
        assert!(filter.to_string().contains("vt_core=debug"));

        let quieter = LogConfig::default().with_cli_level(LogLevel::Error);
        let filter = resolve_filter(Some("vt_core=trace"), &quieter).to_string();
        assert!(filter.contains("vt_core=error"));
        assert!(!filter.contains("vt_core=trace"));
    }

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.format, LogFormat::Human);
        assert_eq!(config.level, LogLevel::Info);
    }
}
