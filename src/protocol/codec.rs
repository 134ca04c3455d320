//! Command codec shared by server and client
//!
//! Every text frame on the wire is a single line terminated by `\n`:
//! commands, listing lines, sentinels and the file-name header of a copy.
//! Only the file body of a `--copy` is raw, and it ends when the server
//! closes the connection.

use std::fmt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::error::ProtocolError;

/// Upper bound for a command line or a copy header line
pub const MAX_COMMAND_LEN: usize = 4096;

/// Upper bound for one line of listing output (a raw listing is one line)
pub const MAX_LISTING_LINE_LEN: usize = 16 * 1024 * 1024;

/// Separator between names in a `--raw-available` payload
pub const RAW_SEPARATOR: &str = "|";

/// Commands a client can send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
	/// `--available`: numbered, human-readable catalog
	Available,
	/// `--raw-available`: names joined by `|`
	RawAvailable,
	/// `--copy <n>`: bytes of the n-th catalog entry (1-based)
	Copy(usize),
}

impl Command {
	/// Decode one command frame (without its line terminator).
	pub fn decode(frame: &str) -> Result<Command, ProtocolError> {
		let frame = frame.trim();
		match frame {
			"--available" => Ok(Command::Available),
			"--raw-available" => Ok(Command::RawAvailable),
			_ => match frame.strip_prefix("--copy") {
				Some(arg) if arg.is_empty() || arg.starts_with(char::is_whitespace) => {
					parse_position(arg.trim()).map(Command::Copy)
				}
				_ => Err(ProtocolError::UnknownCommand(frame.to_string())),
			},
		}
	}

	/// Wire form including the line terminator
	pub fn to_frame(&self) -> String {
		format!("{}\n", self)
	}
}

impl fmt::Display for Command {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Command::Available => write!(f, "--available"),
			Command::RawAvailable => write!(f, "--raw-available"),
			Command::Copy(position) => write!(f, "--copy {}", position),
		}
	}
}

fn parse_position(arg: &str) -> Result<usize, ProtocolError> {
	if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
		return Err(ProtocolError::BadParameter(arg.to_string()));
	}
	arg.parse::<usize>().map_err(|_| ProtocolError::BadParameter(arg.to_string()))
}

/// Reserved tokens sent in place of, or after, a normal payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
	/// Terminates a listing
	End,
	/// Empty catalog or position out of range
	NotAvailable,
	/// Malformed command or argument
	BadParameter,
}

impl Sentinel {
	pub fn as_str(&self) -> &'static str {
		match self {
			Sentinel::End => "end",
			Sentinel::NotAvailable => "not-available",
			Sentinel::BadParameter => "bad-parameter",
		}
	}

	pub fn from_token(token: &str) -> Option<Sentinel> {
		match token {
			"end" => Some(Sentinel::End),
			"not-available" => Some(Sentinel::NotAvailable),
			"bad-parameter" => Some(Sentinel::BadParameter),
			_ => None,
		}
	}

	/// Error sentinels reject the whole operation; `end` does not.
	pub fn is_error(&self) -> bool {
		!matches!(self, Sentinel::End)
	}
}

impl fmt::Display for Sentinel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Read one `\n`-terminated line of at most `limit` bytes.
///
/// Returns `None` on a clean EOF. A trailing `\r` is stripped. A final
/// line cut short by EOF is returned as is.
pub async fn read_line<R>(reader: &mut R, limit: usize) -> Result<Option<String>, ProtocolError>
where
	R: AsyncBufRead + Unpin,
{
	let mut buf = Vec::new();
	let n = (&mut *reader).take(limit as u64 + 1).read_until(b'\n', &mut buf).await?;
	if n == 0 {
		return Ok(None);
	}

	if buf.last() == Some(&b'\n') {
		buf.pop();
		if buf.last() == Some(&b'\r') {
			buf.pop();
		}
	} else if buf.len() > limit {
		return Err(ProtocolError::FrameTooLong { limit });
	}

	Ok(Some(String::from_utf8(buf)?))
}

/// Write one text frame followed by `\n`.
pub async fn write_line<W>(writer: &mut W, line: &str) -> Result<(), ProtocolError>
where
	W: AsyncWrite + Unpin,
{
	let mut frame = Vec::with_capacity(line.len() + 1);
	frame.extend_from_slice(line.as_bytes());
	frame.push(b'\n');
	writer.write_all(&frame).await?;
	Ok(())
}

pub async fn write_sentinel<W>(writer: &mut W, sentinel: Sentinel) -> Result<(), ProtocolError>
where
	W: AsyncWrite + Unpin,
{
	write_line(writer, sentinel.as_str()).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::io::BufReader;

	#[test]
	fn test_decode_listing_commands() {
		assert_eq!(Command::decode("--available").unwrap(), Command::Available);
		assert_eq!(Command::decode("--raw-available").unwrap(), Command::RawAvailable);
		assert_eq!(Command::decode("  --raw-available \r").unwrap(), Command::RawAvailable);
	}

	#[test]
	fn test_decode_copy() {
		assert_eq!(Command::decode("--copy 3").unwrap(), Command::Copy(3));
		assert_eq!(Command::decode("--copy    12").unwrap(), Command::Copy(12));
		// Zero parses; range checking belongs to the catalog
		assert_eq!(Command::decode("--copy 0").unwrap(), Command::Copy(0));
	}

	#[test]
	fn test_decode_copy_bad_parameter() {
		for frame in ["--copy", "--copy abc", "--copy -1", "--copy 1 2", "--copy 1.5"] {
			match Command::decode(frame) {
				Err(ProtocolError::BadParameter(_)) => {}
				other => panic!("{:?} decoded as {:?}", frame, other),
			}
		}
		let huge = format!("--copy {}0", usize::MAX);
		assert!(matches!(Command::decode(&huge), Err(ProtocolError::BadParameter(_))));
	}

	#[test]
	fn test_decode_unknown() {
		for frame in ["", "--play", "--copyx 1", "available", "--available now"] {
			assert!(
				matches!(Command::decode(frame), Err(ProtocolError::UnknownCommand(_))),
				"{:?} should be unknown",
				frame
			);
		}
	}

	#[test]
	fn test_command_frames() {
		assert_eq!(Command::Available.to_frame(), "--available\n");
		assert_eq!(Command::RawAvailable.to_frame(), "--raw-available\n");
		assert_eq!(Command::Copy(7).to_frame(), "--copy 7\n");
	}

	#[test]
	fn test_sentinel_tokens() {
		for s in [Sentinel::End, Sentinel::NotAvailable, Sentinel::BadParameter] {
			assert_eq!(Sentinel::from_token(s.as_str()), Some(s));
		}
		assert_eq!(Sentinel::from_token("song.mp3"), None);
		assert!(!Sentinel::End.is_error());
		assert!(Sentinel::NotAvailable.is_error());
		assert!(Sentinel::BadParameter.is_error());
	}

	#[tokio::test]
	async fn test_read_line_sequence() {
		let data: &[u8] = b"first\r\nsecond\nlast";
		let mut reader = BufReader::new(data);
		assert_eq!(read_line(&mut reader, 64).await.unwrap().as_deref(), Some("first"));
		assert_eq!(read_line(&mut reader, 64).await.unwrap().as_deref(), Some("second"));
		assert_eq!(read_line(&mut reader, 64).await.unwrap().as_deref(), Some("last"));
		assert!(read_line(&mut reader, 64).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_read_line_limit() {
		let data: &[u8] = b"12345678\n123456789\n";
		let mut reader = BufReader::new(data);
		assert_eq!(read_line(&mut reader, 8).await.unwrap().as_deref(), Some("12345678"));
		match read_line(&mut reader, 8).await {
			Err(ProtocolError::FrameTooLong { limit: 8 }) => {}
			other => panic!("expected FrameTooLong, got {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_read_line_rejects_invalid_utf8() {
		let data: &[u8] = b"\xff\xfe\n";
		let mut reader = BufReader::new(data);
		assert!(matches!(read_line(&mut reader, 64).await, Err(ProtocolError::InvalidUtf8)));
	}

	#[tokio::test]
	async fn test_write_line() {
		let mut out: Vec<u8> = Vec::new();
		write_line(&mut out, "a.mp3|b.wav").await.unwrap();
		write_sentinel(&mut out, Sentinel::End).await.unwrap();
		assert_eq!(out, b"a.mp3|b.wav\nend\n");
	}
}

// vim: ts=4
