//! Wire protocol
//!
//! Text commands and sentinels framed as lines, shared by the catalog
//! server and client.
//!
//! # Example Usage
//!
//! ```ignore
//! use musync::protocol::{Command, read_line, MAX_COMMAND_LEN};
//!
//! if let Some(frame) = read_line(&mut reader, MAX_COMMAND_LEN).await? {
//!     match Command::decode(&frame)? {
//!         Command::RawAvailable => { /* ... */ }
//!         _ => {}
//!     }
//! }
//! ```

pub mod codec;
pub mod error;

// Re-export public API
pub use codec::{
	read_line, write_line, write_sentinel, Command, Sentinel, MAX_COMMAND_LEN,
	MAX_LISTING_LINE_LEN, RAW_SEPARATOR,
};
pub use error::ProtocolError;

// vim: ts=4
