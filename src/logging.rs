//! Logging prelude module for convenient access to tracing macros.
//!
//! # Usage
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("This is an info message");
//! warn!("This is a warning");
//! ```

pub use tracing::{debug, error, info, warn};

/// Initialize the tracing subscriber with environment filter support.
///
/// `RUST_LOG` takes precedence; otherwise `default_level` is used. Logs go to
/// stderr so stdout stays reserved for command output:
///
/// ```bash
/// RUST_LOG=debug musync serve
/// RUST_LOG=musync::serve=debug,musync::client=trace musync automatic
/// ```
pub fn init_tracing(default_level: &str) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.or_else(|_| tracing_subscriber::EnvFilter::try_new(default_level))
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

	// A second initialization (e.g. from tests) keeps the first subscriber
	let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

/// Log level for `-v` repetitions on top of the configured level
pub fn verbosity_level(configured: &str, verbose: u8) -> String {
	match verbose {
		0 => configured.to_string(),
		1 => "debug".to_string(),
		_ => "trace".to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_verbosity_level() {
		assert_eq!(verbosity_level("warn", 0), "warn");
		assert_eq!(verbosity_level("warn", 1), "debug");
		assert_eq!(verbosity_level("info", 4), "trace");
	}
}

// vim: ts=4
