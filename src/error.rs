//! Error types for musync operations

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::config::ConfigError;
use crate::protocol::{ProtocolError, Sentinel};
use crate::validation::ValidationError;

/// Main error type, used by the binary to funnel every failure
#[derive(Debug)]
pub enum MusyncError {
	/// Server-side catalog error (nested)
	Catalog(CatalogError),

	/// Client-side error (nested)
	Client(ClientError),

	/// Configuration error (nested)
	Config(ConfigError),

	/// I/O error
	Io(io::Error),

	/// Generic error message
	Other { message: String },
}

impl fmt::Display for MusyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			MusyncError::Catalog(e) => write!(f, "Catalog error: {}", e),
			MusyncError::Client(e) => write!(f, "{}", e),
			MusyncError::Config(e) => write!(f, "Configuration error: {}", e),
			MusyncError::Io(e) => write!(f, "I/O error: {}", e),
			MusyncError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for MusyncError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			MusyncError::Catalog(e) => Some(e),
			MusyncError::Client(e) => Some(e),
			MusyncError::Config(e) => Some(e),
			MusyncError::Io(e) => Some(e),
			MusyncError::Other { .. } => None,
		}
	}
}

impl From<CatalogError> for MusyncError {
	fn from(e: CatalogError) -> Self {
		MusyncError::Catalog(e)
	}
}

impl From<ClientError> for MusyncError {
	fn from(e: ClientError) -> Self {
		MusyncError::Client(e)
	}
}

impl From<ConfigError> for MusyncError {
	fn from(e: ConfigError) -> Self {
		MusyncError::Config(e)
	}
}

impl From<ValidationError> for MusyncError {
	fn from(e: ValidationError) -> Self {
		MusyncError::Config(ConfigError::Invalid(e))
	}
}

impl From<io::Error> for MusyncError {
	fn from(e: io::Error) -> Self {
		MusyncError::Io(e)
	}
}

impl From<String> for MusyncError {
	fn from(e: String) -> Self {
		MusyncError::Other { message: e }
	}
}

/// Catalog (server-side) errors
#[derive(Debug)]
pub enum CatalogError {
	/// Requested position is outside `[1, len]`
	PositionOutOfRange { position: usize, len: usize },

	/// Directory or file access failed
	Io { path: PathBuf, source: io::Error },

	/// Exclusion pattern does not compile
	InvalidPattern { pattern: String, message: String },
}

impl CatalogError {
	pub fn is_not_found(&self) -> bool {
		matches!(self, CatalogError::PositionOutOfRange { .. })
	}
}

impl fmt::Display for CatalogError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CatalogError::PositionOutOfRange { position, len } => {
				write!(f, "Position {} out of range: catalog has {} entries", position, len)
			}
			CatalogError::Io { path, source } => {
				write!(f, "Cannot access {}: {}", path.display(), source)
			}
			CatalogError::InvalidPattern { pattern, message } => {
				write!(f, "Invalid exclude pattern {:?}: {}", pattern, message)
			}
		}
	}
}

impl Error for CatalogError {}

/// Client-side errors
#[derive(Debug)]
pub enum ClientError {
	/// Server reported an empty catalog
	EmptyCatalog,

	/// Server answered a copy with an error sentinel
	CopyRejected { sentinel: Sentinel },

	/// Could not reach the server (refused, reset, unresolved)
	Connection { address: String, source: io::Error },

	/// Server did not answer within the read timeout
	Timeout,

	/// Server closed the connection mid-response
	Disconnected,

	/// Destination file or directory could not be created or written
	LocalIo { path: PathBuf, source: io::Error },

	/// Response does not follow the protocol
	Protocol { message: String },
}

impl ClientError {
	pub fn is_empty_catalog(&self) -> bool {
		matches!(self, ClientError::EmptyCatalog)
	}

	pub fn is_copy_rejected(&self) -> bool {
		matches!(self, ClientError::CopyRejected { .. })
	}

	/// Classify a socket error: peer hang-ups become `Disconnected`
	pub fn transport(address: &str, source: io::Error) -> Self {
		if is_disconnect(&source) {
			ClientError::Disconnected
		} else {
			ClientError::Connection { address: address.to_string(), source }
		}
	}
}

impl fmt::Display for ClientError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ClientError::EmptyCatalog => write!(f, "There is no music on the server"),
			ClientError::CopyRejected { sentinel } => {
				write!(f, "Server rejected the copy: {}", sentinel)
			}
			ClientError::Connection { address, source } => {
				write!(f, "Cannot connect to {}: {}", address, source)
			}
			ClientError::Timeout => write!(f, "Server response timeout"),
			ClientError::Disconnected => write!(f, "Server closed the connection"),
			ClientError::LocalIo { path, source } => {
				write!(f, "Cannot write {}: {}", path.display(), source)
			}
			ClientError::Protocol { message } => write!(f, "Protocol error: {}", message),
		}
	}
}

impl Error for ClientError {}

impl From<ProtocolError> for ClientError {
	fn from(e: ProtocolError) -> Self {
		match e {
			ProtocolError::Io(e) if is_disconnect(&e) => ClientError::Disconnected,
			other => ClientError::Protocol { message: other.to_string() },
		}
	}
}

fn is_disconnect(e: &io::Error) -> bool {
	matches!(
		e.kind(),
		io::ErrorKind::ConnectionReset
			| io::ErrorKind::ConnectionAborted
			| io::ErrorKind::BrokenPipe
			| io::ErrorKind::UnexpectedEof
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_protocol_error_conversion() {
		let reset = ProtocolError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
		assert!(matches!(ClientError::from(reset), ClientError::Disconnected));

		let long = ProtocolError::FrameTooLong { limit: 4096 };
		assert!(matches!(ClientError::from(long), ClientError::Protocol { .. }));
	}

	#[test]
	fn test_copy_rejected_display() {
		let err = ClientError::CopyRejected { sentinel: Sentinel::NotAvailable };
		assert!(err.is_copy_rejected());
		assert!(err.to_string().contains("not-available"));
	}

	#[test]
	fn test_musync_error_conversions() {
		let err = MusyncError::from(ClientError::EmptyCatalog);
		assert!(matches!(err, MusyncError::Client(ClientError::EmptyCatalog)));
		assert!(err.source().is_some());

		let err = MusyncError::from(ValidationError::ConfigError("port 0".to_string()));
		assert!(matches!(err, MusyncError::Config(ConfigError::Invalid(_))));
		assert!(err.to_string().contains("port 0"));

		let err = MusyncError::from("3 copies failed, 0 skipped".to_string());
		assert_eq!(err.to_string(), "3 copies failed, 0 skipped");
		assert!(err.source().is_none());
	}

	#[test]
	fn test_position_out_of_range_is_not_found() {
		let err = CatalogError::PositionOutOfRange { position: 99, len: 2 };
		assert!(err.is_not_found());
		assert!(err.to_string().contains("99"));
	}
}

// vim: ts=4
