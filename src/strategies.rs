//! Strategy and mode enums
//!
//! Each enum includes a FromStr implementation for CLI and config parsing.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// FAILURE POLICY
// ============================================================================

/// What automatic reconciliation does when one file fails to copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
	/// Log the failure and continue with the next missing file (default)
	#[default]
	BestEffort,

	/// Stop at the first failure; remaining files are reported as skipped
	FailFast,
}

impl FromStr for FailurePolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"best-effort" | "continue" => Ok(Self::BestEffort),
			"fail-fast" | "abort" => Ok(Self::FailFast),
			_ => Err(format!(
				"Unknown failure policy: {}. Valid options: best-effort, fail-fast",
				s
			)),
		}
	}
}

impl std::fmt::Display for FailurePolicy {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::BestEffort => write!(f, "best-effort"),
			Self::FailFast => write!(f, "fail-fast"),
		}
	}
}


// vim: ts=4
