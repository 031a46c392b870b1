//! Logging setup.

use std::io::IsTerminal;

use anyhow::{Context, Result};
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Parse a `--log-level` value. Unknown names fall back to `info`.
pub fn parse_level(level: &str) -> Option<LevelFilter> {
	match level.to_lowercase().as_str() {
		"" => None,
		"disabled" | "off" => Some(LevelFilter::OFF),
		"trace" => Some(LevelFilter::TRACE),
		"debug" => Some(LevelFilter::DEBUG),
		"warn" | "warning" => Some(LevelFilter::WARN),
		"error" | "fatal" => Some(LevelFilter::ERROR),
		_ => Some(LevelFilter::INFO),
	}
}

/// Initialize tracing with the given log level.
///
/// Priority for log level:
/// 1. `log_level` argument (from --log-level CLI flag)
/// 2. `RUST_LOG` environment variable
/// 3. Default: info
///
/// Logs always go to stderr; pretty when stderr is a terminal, JSON otherwise.
pub fn init(log_level: Option<LevelFilter>) -> Result<()> {
	let filter_layer = match log_level {
		Some(level) => EnvFilter::new(level.to_string()),
		None => EnvFilter::builder()
			.with_default_directive(LevelFilter::INFO.into())
			.from_env_lossy(),
	};

	let fmt_layer = if std::io::stderr().is_terminal() {
		tracing_subscriber::fmt::layer()
			.with_writer(std::io::stderr)
			.pretty()
			.boxed()
	} else {
		tracing_subscriber::fmt::layer()
			.with_writer(std::io::stderr)
			.json()
			.boxed()
	};

	tracing_subscriber::registry()
		.with(filter_layer)
		.with(fmt_layer)
		.try_init()
		.context("failed to install tracing subscriber")
}
