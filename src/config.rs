//! Unified configuration for musync
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (Config::default())
//! 2. Config file (--config, or ~/.config/musync/config.toml)
//! 3. Environment variables (MUSYNC_* prefix)
//! 4. CLI flags (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fmt, fs, io};

use crate::strategies::FailurePolicy;
use crate::validation::{self, ValidationError, Validator};

/// Default TCP port
pub const DEFAULT_PORT: u16 = 5000;

/// Default bind / connect host
pub const DEFAULT_HOST: &str = "127.0.0.1";

// ============================================================================
// MAIN CONFIGURATION STRUCT
// ============================================================================

/// Configuration for both the catalog server and the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	/// Catalog server settings
	pub server: ServerConfig,

	/// Client and reconciliation settings
	pub client: ClientConfig,

	/// Log level (trace, debug, info, warn, error)
	pub log_level: String,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			server: ServerConfig::default(),
			client: ClientConfig::default(),
			log_level: "info".to_string(),
		}
	}
}

/// Catalog server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
	/// Directory whose audio files make up the catalog
	pub root: PathBuf,

	/// Address to bind
	pub host: String,

	/// Port to bind
	pub port: u16,

	/// Idle time after which a connection is closed
	pub read_timeout_secs: u64,

	/// Glob patterns matched against file names to hide from the catalog
	pub exclude_patterns: Vec<String>,
}

impl Default for ServerConfig {
	fn default() -> Self {
		ServerConfig {
			root: PathBuf::from("."),
			host: DEFAULT_HOST.to_string(),
			port: DEFAULT_PORT,
			read_timeout_secs: 30,
			exclude_patterns: vec![],
		}
	}
}

impl ServerConfig {
	pub fn address(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}

	pub fn read_timeout(&self) -> Duration {
		Duration::from_secs(self.read_timeout_secs)
	}
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
	/// Local directory files are downloaded into
	pub root: PathBuf,

	/// Server host
	pub host: String,

	/// Server port
	pub port: u16,

	/// Connection establishment timeout
	pub connect_timeout_secs: u64,

	/// Timeout for each read from the server
	pub read_timeout_secs: u64,

	/// Behavior of automatic reconciliation when a copy fails
	pub failure_policy: FailurePolicy,
}

impl Default for ClientConfig {
	fn default() -> Self {
		ClientConfig {
			root: PathBuf::from("."),
			host: DEFAULT_HOST.to_string(),
			port: DEFAULT_PORT,
			connect_timeout_secs: 10,
			read_timeout_secs: 30,
			failure_policy: FailurePolicy::BestEffort,
		}
	}
}

impl ClientConfig {
	pub fn address(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}

	pub fn connect_timeout(&self) -> Duration {
		Duration::from_secs(self.connect_timeout_secs)
	}

	pub fn read_timeout(&self) -> Duration {
		Duration::from_secs(self.read_timeout_secs)
	}
}

// ============================================================================
// LOADING
// ============================================================================

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
	/// Config file could not be read
	Io { path: PathBuf, source: io::Error },

	/// Config file could not be parsed
	Parse { path: PathBuf, message: String },

	/// A value is out of range
	Invalid(ValidationError),
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::Io { path, source } => {
				write!(f, "Cannot read {}: {}", path.display(), source)
			}
			ConfigError::Parse { path, message } => {
				write!(f, "Cannot parse {}: {}", path.display(), message)
			}
			ConfigError::Invalid(e) => write!(f, "{}", e),
		}
	}
}

impl Error for ConfigError {}

impl From<ValidationError> for ConfigError {
	fn from(e: ValidationError) -> Self {
		ConfigError::Invalid(e)
	}
}

impl Config {
	/// Location of the per-user config file, if HOME is known
	pub fn default_path() -> Option<PathBuf> {
		env::var("HOME")
			.ok()
			.map(|home| PathBuf::from(home).join(".config").join("musync").join("config.toml"))
	}

	/// Load a config file; `.json`/`.json5` files are JSON5, anything else TOML.
	pub fn load(path: &Path) -> Result<Config, ConfigError> {
		let contents = fs::read_to_string(path)
			.map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
		Self::parse(path, &contents)
	}

	/// Load the explicit file if given, else the per-user file if it exists,
	/// else the defaults.
	pub fn load_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
		match path {
			Some(path) => Self::load(path),
			None => match Self::default_path() {
				Some(path) if path.is_file() => Self::load(&path),
				_ => Ok(Config::default()),
			},
		}
	}

	fn parse(path: &Path, contents: &str) -> Result<Config, ConfigError> {
		let is_json = matches!(
			path.extension().and_then(|e| e.to_str()),
			Some("json") | Some("json5")
		);
		if is_json {
			json5::from_str(contents)
				.map_err(|e| ConfigError::Parse { path: path.to_path_buf(), message: e.to_string() })
		} else {
			toml::from_str(contents)
				.map_err(|e| ConfigError::Parse { path: path.to_path_buf(), message: e.to_string() })
		}
	}

	/// Apply MUSYNC_* overrides from the process environment
	pub fn apply_env(&mut self) -> Result<(), ConfigError> {
		self.apply_env_from(|key| env::var(key).ok())
	}

	/// Apply MUSYNC_* overrides using `lookup` to read variables
	///
	/// Host, port and root apply to both the server and the client section.
	pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		if let Some(host) = lookup("MUSYNC_HOST") {
			self.server.host = host.clone();
			self.client.host = host;
		}
		if let Some(port) = lookup("MUSYNC_PORT") {
			let port: u16 = port.trim().parse().map_err(|_| {
				ValidationError::ConfigError(format!("MUSYNC_PORT is not a port: {:?}", port))
			})?;
			self.server.port = port;
			self.client.port = port;
		}
		if let Some(root) = lookup("MUSYNC_ROOT") {
			self.server.root = PathBuf::from(&root);
			self.client.root = PathBuf::from(root);
		}
		if let Some(level) = lookup("MUSYNC_LOG") {
			self.log_level = level;
		}
		Ok(())
	}
}

impl Validator for Config {
	fn validate(&self) -> Result<(), ValidationError> {
		self.server.validate()?;
		self.client.validate()
	}
}

impl Validator for ServerConfig {
	fn validate(&self) -> Result<(), ValidationError> {
		validation::validate_host(&self.host)?;
		validation::validate_port(self.port)?;
		validation::validate_timeout_secs(self.read_timeout_secs)?;
		for pattern in &self.exclude_patterns {
			validation::validate_pattern(pattern)?;
		}
		Ok(())
	}
}

impl Validator for ClientConfig {
	fn validate(&self) -> Result<(), ValidationError> {
		validation::validate_host(&self.host)?;
		validation::validate_port(self.port)?;
		validation::validate_timeout_secs(self.connect_timeout_secs)?;
		validation::validate_timeout_secs(self.read_timeout_secs)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_config_default() {
		let config = Config::default();
		assert_eq!(config.log_level, "info");
		assert_eq!(config.server.port, DEFAULT_PORT);
		assert_eq!(config.client.port, DEFAULT_PORT);
		assert_eq!(config.server.read_timeout_secs, 30);
		assert_eq!(config.client.failure_policy, FailurePolicy::BestEffort);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_addresses() {
		let config = Config::default();
		assert_eq!(config.server.address(), "127.0.0.1:5000");
		assert_eq!(config.client.address(), "127.0.0.1:5000");
	}

	#[test]
	fn test_config_serialization() {
		let config = Config::default();
		let json = serde_json::to_string(&config).expect("Failed to serialize");
		assert!(json.contains("readTimeoutSecs"));
		let deserialized: Config = serde_json::from_str(&json).expect("Failed to deserialize");
		assert_eq!(config.server.port, deserialized.server.port);
		assert_eq!(config.client.failure_policy, deserialized.client.failure_policy);
	}

	#[test]
	fn test_apply_env_overrides() {
		let mut config = Config::default();
		config
			.apply_env_from(|key| match key {
				"MUSYNC_HOST" => Some("192.168.1.4".to_string()),
				"MUSYNC_PORT" => Some("6734".to_string()),
				"MUSYNC_LOG" => Some("debug".to_string()),
				_ => None,
			})
			.unwrap();
		assert_eq!(config.server.address(), "192.168.1.4:6734");
		assert_eq!(config.client.address(), "192.168.1.4:6734");
		assert_eq!(config.log_level, "debug");
		assert_eq!(config.client.root, PathBuf::from("."));
	}

	#[test]
	fn test_apply_env_rejects_bad_port() {
		let mut config = Config::default();
		let result = config.apply_env_from(|key| match key {
			"MUSYNC_PORT" => Some("seventy".to_string()),
			_ => None,
		});
		assert!(matches!(result, Err(ConfigError::Invalid(_))));
	}

	#[test]
	fn test_validate_rejects_zero_timeout() {
		let mut config = Config::default();
		config.client.read_timeout_secs = 0;
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_validate_rejects_bad_pattern() {
		let mut config = Config::default();
		config.server.exclude_patterns = vec!["[oops".to_string()];
		assert!(config.validate().is_err());
	}
}

// vim: ts=4
