//! Configuration validation functions

use super::ValidationError;

/// Validate a TCP port
///
/// Port 0 only makes sense for tests that bind an ephemeral port
/// programmatically, never in a configuration.
pub fn validate_port(port: u16) -> Result<(), ValidationError> {
	if port == 0 {
		return Err(ValidationError::ConfigError("Port must be greater than 0".to_string()));
	}
	Ok(())
}

/// Validate timeout in seconds
pub fn validate_timeout_secs(timeout_secs: u64) -> Result<(), ValidationError> {
	if timeout_secs == 0 {
		return Err(ValidationError::ConfigError("Timeout must be greater than 0".to_string()));
	}
	if timeout_secs > 3600 {
		return Err(ValidationError::ConfigError(format!(
			"Timeout too large: {} seconds (max 3600)",
			timeout_secs
		)));
	}
	Ok(())
}

/// Validate a glob exclusion pattern
pub fn validate_pattern(pattern: &str) -> Result<(), ValidationError> {
	glob::Pattern::new(pattern).map(|_| ()).map_err(|e| {
		ValidationError::ConfigError(format!("Invalid pattern {:?}: {}", pattern, e))
	})
}

/// Validate a host name or address
pub fn validate_host(host: &str) -> Result<(), ValidationError> {
	if host.trim().is_empty() {
		return Err(ValidationError::ConfigError("Host must not be empty".to_string()));
	}
	Ok(())
}


// vim: ts=4
