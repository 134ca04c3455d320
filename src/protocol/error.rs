//! Protocol error types
//!
//! Errors raised while decoding commands or reading line frames. The
//! connection handler turns the decode variants into a `bad-parameter`
//! reply; the client surfaces the rest as protocol failures.

use std::fmt;
use std::io;

/// Protocol error type
#[derive(Debug)]
pub enum ProtocolError {
	/// I/O error from async operations
	Io(io::Error),
	/// Command text is not one of the recognized commands
	UnknownCommand(String),
	/// `--copy` argument is missing or not a non-negative integer
	BadParameter(String),
	/// Line frame exceeded its size bound before a newline was seen
	FrameTooLong { limit: usize },
	/// Line frame is not valid UTF-8
	InvalidUtf8,
}

impl ProtocolError {
	/// Whether the peer sent something the codec could not understand,
	/// as opposed to a transport failure.
	pub fn is_malformed_command(&self) -> bool {
		matches!(self, ProtocolError::UnknownCommand(_) | ProtocolError::BadParameter(_))
	}
}

impl fmt::Display for ProtocolError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProtocolError::Io(e) => write!(f, "I/O error: {}", e),
			ProtocolError::UnknownCommand(cmd) => write!(f, "Unknown command: {:?}", cmd),
			ProtocolError::BadParameter(arg) => write!(f, "Bad parameter: {:?}", arg),
			ProtocolError::FrameTooLong { limit } => {
				write!(f, "Frame exceeds {} bytes without terminator", limit)
			}
			ProtocolError::InvalidUtf8 => write!(f, "Frame is not valid UTF-8"),
		}
	}
}

impl std::error::Error for ProtocolError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			ProtocolError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for ProtocolError {
	fn from(e: io::Error) -> Self {
		ProtocolError::Io(e)
	}
}

impl From<std::string::FromUtf8Error> for ProtocolError {
	fn from(_: std::string::FromUtf8Error) -> Self {
		ProtocolError::InvalidUtf8
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_malformed_command_classification() {
		assert!(ProtocolError::UnknownCommand("--play".into()).is_malformed_command());
		assert!(ProtocolError::BadParameter("abc".into()).is_malformed_command());
		assert!(!ProtocolError::InvalidUtf8.is_malformed_command());
		assert!(!ProtocolError::FrameTooLong { limit: 8 }.is_malformed_command());
	}

	#[test]
	fn test_display() {
		let err = ProtocolError::FrameTooLong { limit: 4096 };
		assert!(err.to_string().contains("4096"));
	}
}

// vim: ts=4
