//! Catalog client
//!
//! A [`Connection`] speaks the protocol over one TCP stream. Listings can be
//! repeated on the same connection; a copy consumes it, because the server
//! closes the stream once the file has been sent.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs as afs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use uuid::Uuid;

use crate::catalog;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::logging::*;
use crate::protocol::{
	read_line, Command, ProtocolError, Sentinel, MAX_COMMAND_LEN, MAX_LISTING_LINE_LEN,
	RAW_SEPARATOR,
};
use crate::validation;

const RECEIVE_BUFFER_SIZE: usize = 64 * 1024;

/// Client-side view of a catalog server
///
/// The reconciliation engine depends only on this trait.
#[async_trait]
pub trait CatalogRemote: Send {
	/// Directory downloaded files are written to
	fn local_root(&self) -> &Path;

	/// Server catalog names in server order; `EmptyCatalog` if there are none
	async fn raw_available(&mut self) -> Result<Vec<String>, ClientError>;

	/// Download the entry at 1-based `position`, returning the written name
	async fn copy(&mut self, position: usize) -> Result<String, ClientError>;
}

/// Outcome of reading a listing up to its terminator
enum Listing {
	Lines(Vec<String>),
	NotAvailable,
}

/// One open protocol connection
pub struct Connection {
	reader: BufReader<OwnedReadHalf>,
	writer: OwnedWriteHalf,
	address: String,
	root: PathBuf,
	read_timeout: Duration,
}

impl Connection {
	/// Request the numbered catalog; an empty catalog renders no lines
	pub async fn available(&mut self) -> Result<Vec<String>, ClientError> {
		self.send(Command::Available).await?;
		match self.read_listing().await? {
			Listing::Lines(lines) => Ok(lines),
			Listing::NotAvailable => Ok(Vec::new()),
		}
	}

	/// Request the raw catalog and split it into names
	pub async fn raw_available(&mut self) -> Result<Vec<String>, ClientError> {
		self.send(Command::RawAvailable).await?;
		let payload = match self.read_listing().await? {
			Listing::Lines(lines) => lines.concat(),
			Listing::NotAvailable => return Err(ClientError::EmptyCatalog),
		};
		if payload.is_empty() {
			return Err(ClientError::EmptyCatalog);
		}
		Ok(payload.split(RAW_SEPARATOR).map(String::from).collect())
	}

	/// Download the entry at 1-based `position` into the local root
	///
	/// No file is created when the server rejects the request. A transfer
	/// that fails midway leaves no partial file behind.
	pub async fn copy(mut self, position: usize) -> Result<String, ClientError> {
		self.send(Command::Copy(position)).await?;
		let header = self.read_frame(MAX_COMMAND_LEN).await?.ok_or(ClientError::Disconnected)?;

		if let Some(sentinel) = Sentinel::from_token(&header) {
			if sentinel.is_error() {
				debug!("Copy of position {} rejected: {}", position, sentinel);
				return Err(ClientError::CopyRejected { sentinel });
			}
			return Err(ClientError::Protocol {
				message: format!("unexpected {:?} instead of a file name", header),
			});
		}
		validation::validate_file_name(&header)
			.map_err(|e| ClientError::Protocol { message: e.to_string() })?;
		if !catalog::is_audio_file(&header) {
			return Err(ClientError::Protocol {
				message: format!("{:?} is not an audio file name", header),
			});
		}

		let dest = self.root.join(&header);
		// Fixed-length name: a catalog name may already be at the filesystem limit
		let part = self.root.join(format!(".musync.{}.part", Uuid::new_v4()));

		let received = match self.receive_into(&part).await {
			Ok(received) => received,
			Err(e) => {
				if let Err(rm) = afs::remove_file(&part).await {
					debug!("Cannot remove {}: {}", part.display(), rm);
				}
				return Err(e);
			}
		};
		afs::rename(&part, &dest)
			.await
			.map_err(|source| ClientError::LocalIo { path: dest.clone(), source })?;

		info!("Music {} created ({} bytes)", header, received);
		Ok(header)
	}

	async fn receive_into(&mut self, path: &Path) -> Result<u64, ClientError> {
		let local_err = |source| ClientError::LocalIo { path: path.to_path_buf(), source };
		let mut file = afs::File::create(path).await.map_err(local_err)?;
		let mut buf = vec![0u8; RECEIVE_BUFFER_SIZE];
		let mut total = 0u64;

		// The body ends when the server closes the connection
		loop {
			let n = tokio::time::timeout(self.read_timeout, self.reader.read(&mut buf))
				.await
				.map_err(|_| ClientError::Timeout)?
				.map_err(|e| ClientError::transport(&self.address, e))?;
			if n == 0 {
				break;
			}
			file.write_all(&buf[..n]).await.map_err(local_err)?;
			total += n as u64;
		}

		file.flush().await.map_err(local_err)?;
		Ok(total)
	}

	async fn send(&mut self, command: Command) -> Result<(), ClientError> {
		debug!("Sending {} to {}", command, self.address);
		let address = &self.address;
		self.writer
			.write_all(command.to_frame().as_bytes())
			.await
			.map_err(|e| ClientError::transport(address, e))?;
		self.writer.flush().await.map_err(|e| ClientError::transport(address, e))
	}

	async fn read_frame(&mut self, limit: usize) -> Result<Option<String>, ClientError> {
		match tokio::time::timeout(self.read_timeout, read_line(&mut self.reader, limit)).await {
			Err(_) => Err(ClientError::Timeout),
			Ok(Ok(frame)) => Ok(frame),
			Ok(Err(ProtocolError::Io(e))) => Err(ClientError::transport(&self.address, e)),
			Ok(Err(e)) => Err(e.into()),
		}
	}

	async fn read_listing(&mut self) -> Result<Listing, ClientError> {
		let mut lines = Vec::new();
		loop {
			let line =
				self.read_frame(MAX_LISTING_LINE_LEN).await?.ok_or(ClientError::Disconnected)?;
			match Sentinel::from_token(&line) {
				Some(Sentinel::End) => return Ok(Listing::Lines(lines)),
				Some(Sentinel::NotAvailable) if lines.is_empty() => return Ok(Listing::NotAvailable),
				Some(Sentinel::BadParameter) if lines.is_empty() => {
					return Err(ClientError::Protocol {
						message: "server rejected the listing request".to_string(),
					})
				}
				_ => lines.push(line),
			}
		}
	}
}

/// Connects to a catalog server on behalf of a local directory
#[derive(Debug, Clone)]
pub struct CatalogClient {
	address: String,
	root: PathBuf,
	connect_timeout: Duration,
	read_timeout: Duration,
}

impl CatalogClient {
	/// Create a client; the local root must be an existing directory
	pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
		let root = config.root.clone();
		match std::fs::metadata(&root) {
			Ok(meta) if meta.is_dir() => {}
			Ok(_) => {
				return Err(ClientError::LocalIo {
					path: root,
					source: std::io::Error::new(std::io::ErrorKind::Other, "not a directory"),
				})
			}
			Err(source) => return Err(ClientError::LocalIo { path: root, source }),
		}

		Ok(CatalogClient {
			address: config.address(),
			root,
			connect_timeout: config.connect_timeout(),
			read_timeout: config.read_timeout(),
		})
	}

	pub fn address(&self) -> &str {
		&self.address
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Open a new connection to the server
	pub async fn connect(&self) -> Result<Connection, ClientError> {
		let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.address))
			.await
			.map_err(|_| ClientError::Timeout)?
			.map_err(|source| ClientError::Connection { address: self.address.clone(), source })?;
		if let Err(e) = stream.set_nodelay(true) {
			debug!("Cannot set TCP_NODELAY: {}", e);
		}
		debug!("Connected to {}", self.address);

		let (reader, writer) = stream.into_split();
		Ok(Connection {
			reader: BufReader::new(reader),
			writer,
			address: self.address.clone(),
			root: self.root.clone(),
			read_timeout: self.read_timeout,
		})
	}

	/// Numbered catalog over a fresh connection
	pub async fn available(&self) -> Result<Vec<String>, ClientError> {
		self.connect().await?.available().await
	}
}

#[async_trait]
impl CatalogRemote for CatalogClient {
	fn local_root(&self) -> &Path {
		&self.root
	}

	async fn raw_available(&mut self) -> Result<Vec<String>, ClientError> {
		self.connect().await?.raw_available().await
	}

	async fn copy(&mut self, position: usize) -> Result<String, ClientError> {
		// A copy ends the connection, so each one gets its own
		self.connect().await?.copy(position).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;
	use tokio::io::AsyncBufReadExt;
	use tokio::net::TcpListener;

	/// Accept one connection, read one command line, answer with `reply`
	/// and close.
	async fn scripted_server<B>(reply: B) -> (String, tokio::task::JoinHandle<String>)
	where
		B: AsRef<[u8]> + Send + 'static,
	{
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap().to_string();
		let handle = tokio::spawn(async move {
			let (stream, _) = listener.accept().await.unwrap();
			let (rd, mut wr) = stream.into_split();
			let mut rd = BufReader::new(rd);
			let mut command = String::new();
			rd.read_line(&mut command).await.unwrap();
			wr.write_all(reply.as_ref()).await.unwrap();
			wr.shutdown().await.unwrap();
			command
		});
		(addr, handle)
	}

	fn client_for(addr: &str, root: &Path) -> CatalogClient {
		let (host, port) = addr.rsplit_once(':').unwrap();
		let config = ClientConfig {
			root: root.to_path_buf(),
			host: host.to_string(),
			port: port.parse().unwrap(),
			connect_timeout_secs: 5,
			read_timeout_secs: 5,
			..ClientConfig::default()
		};
		CatalogClient::new(&config).unwrap()
	}

	#[tokio::test]
	async fn test_raw_available_concatenates_frames() {
		let dir = TempDir::new().unwrap();
		let (addr, server) = scripted_server(b"a.mp3|b.w\nav|c.ogg\nend\n").await;
		let mut client = client_for(&addr, dir.path());
		let names = client.raw_available().await.unwrap();
		assert_eq!(names, vec!["a.mp3", "b.wav", "c.ogg"]);
		assert_eq!(server.await.unwrap(), "--raw-available\n");
	}

	#[tokio::test]
	async fn test_raw_available_empty_catalog() {
		let dir = TempDir::new().unwrap();
		let (addr, _server) = scripted_server(b"not-available\n").await;
		let mut client = client_for(&addr, dir.path());
		assert!(client.raw_available().await.unwrap_err().is_empty_catalog());
	}

	#[tokio::test]
	async fn test_raw_available_truncated_listing() {
		let dir = TempDir::new().unwrap();
		let (addr, _server) = scripted_server(b"a.mp3|b.wav\n").await;
		let mut client = client_for(&addr, dir.path());
		assert!(matches!(client.raw_available().await, Err(ClientError::Disconnected)));
	}

	#[tokio::test]
	async fn test_available_empty_renders_nothing() {
		let dir = TempDir::new().unwrap();
		let (addr, _server) = scripted_server(b"not-available\n").await;
		let client = client_for(&addr, dir.path());
		assert!(client.available().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_copy_writes_file() {
		let dir = TempDir::new().unwrap();
		let (addr, server) = scripted_server(b"song.mp3\nID3\x00\x01\x02end\n").await;
		let mut client = client_for(&addr, dir.path());
		assert_eq!(client.copy(4).await.unwrap(), "song.mp3");
		assert_eq!(std::fs::read(dir.path().join("song.mp3")).unwrap(), b"ID3\x00\x01\x02end\n");
		assert_eq!(server.await.unwrap(), "--copy 4\n");
		// Only the destination file remains
		assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
	}

	#[tokio::test]
	async fn test_copy_zero_bytes_creates_empty_file() {
		let dir = TempDir::new().unwrap();
		let (addr, _server) = scripted_server(b"silence.wav\n").await;
		let mut client = client_for(&addr, dir.path());
		assert_eq!(client.copy(1).await.unwrap(), "silence.wav");
		assert_eq!(std::fs::metadata(dir.path().join("silence.wav")).unwrap().len(), 0);
	}

	#[tokio::test]
	async fn test_copy_rejected_creates_nothing() {
		for (reply, expected) in [
			(&b"not-available\n"[..], Sentinel::NotAvailable),
			(&b"bad-parameter\n"[..], Sentinel::BadParameter),
		] {
			let dir = TempDir::new().unwrap();
			let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
			let addr = listener.local_addr().unwrap().to_string();
			let reply = reply.to_vec();
			tokio::spawn(async move {
				let (mut stream, _) = listener.accept().await.unwrap();
				let mut buf = [0u8; 64];
				let _ = stream.read(&mut buf).await;
				stream.write_all(&reply).await.unwrap();
			});

			let mut client = client_for(&addr, dir.path());
			match client.copy(99).await {
				Err(ClientError::CopyRejected { sentinel }) => assert_eq!(sentinel, expected),
				other => panic!("expected CopyRejected, got {:?}", other),
			}
			assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
		}
	}

	#[tokio::test]
	async fn test_copy_rejects_path_names() {
		let dir = TempDir::new().unwrap();
		let (addr, _server) = scripted_server(b"../escape.mp3\ndata").await;
		let mut client = client_for(&addr, dir.path());
		assert!(matches!(client.copy(1).await, Err(ClientError::Protocol { .. })));
		assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
	}

	#[tokio::test]
	async fn test_copy_rejects_non_audio_names() {
		let dir = TempDir::new().unwrap();
		let (addr, _server) = scripted_server(b"run.sh\n#!/bin/sh\n").await;
		let mut client = client_for(&addr, dir.path());
		assert!(matches!(client.copy(1).await, Err(ClientError::Protocol { .. })));
		assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
	}

	#[tokio::test]
	async fn test_copy_name_near_filesystem_limit() {
		let dir = TempDir::new().unwrap();
		let name = format!("{}.flac", "n".repeat(245));
		let (addr, _server) = scripted_server(format!("{}\nlong body", name).into_bytes()).await;
		let mut client = client_for(&addr, dir.path());
		assert_eq!(client.copy(1).await.unwrap(), name);
		assert_eq!(std::fs::read(dir.path().join(&name)).unwrap(), b"long body");
		assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
	}

	#[tokio::test]
	async fn test_connection_refused() {
		let dir = TempDir::new().unwrap();
		// Bind and drop to get a port nobody listens on
		let addr = {
			let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
			listener.local_addr().unwrap().to_string()
		};
		let mut client = client_for(&addr, dir.path());
		assert!(matches!(client.raw_available().await, Err(ClientError::Connection { .. })));
	}

	#[test]
	fn test_new_requires_directory() {
		let dir = TempDir::new().unwrap();
		let config = ClientConfig { root: dir.path().join("missing"), ..ClientConfig::default() };
		assert!(matches!(CatalogClient::new(&config), Err(ClientError::LocalIo { .. })));

		let file = dir.path().join("file.mp3");
		std::fs::write(&file, b"x").unwrap();
		let config = ClientConfig { root: file, ..ClientConfig::default() };
		assert!(matches!(CatalogClient::new(&config), Err(ClientError::LocalIo { .. })));
	}
}

// vim: ts=4
