//! Catalog server
//!
//! One tokio task per accepted connection. Tasks share the read-only
//! catalog root and nothing else.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::catalog::{self, CatalogService};
use crate::config::ServerConfig;
use crate::error::MusyncError;
use crate::logging::*;
use crate::protocol::{
	read_line, write_line, write_sentinel, Command, ProtocolError, Sentinel, MAX_COMMAND_LEN,
	RAW_SEPARATOR,
};

/// Connection handler states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
	/// Waiting for the next command
	Idle,
	/// A command was decoded and is being served
	Dispatching,
	/// Connection finished; no further commands are read
	Closed,
}

/// Serves the commands of a single connection, one at a time
pub struct ConnectionHandler<R, W> {
	reader: BufReader<R>,
	writer: W,
	catalog: CatalogService,
	read_timeout: Duration,
	state: HandlerState,
}

impl<R, W> ConnectionHandler<R, W>
where
	R: AsyncRead + Unpin,
	W: AsyncWrite + Unpin,
{
	pub fn new(reader: R, writer: W, catalog: CatalogService, read_timeout: Duration) -> Self {
		ConnectionHandler {
			reader: BufReader::new(reader),
			writer,
			catalog,
			read_timeout,
			state: HandlerState::Idle,
		}
	}

	pub fn state(&self) -> HandlerState {
		self.state
	}

	/// Process commands until the connection closes
	///
	/// Only transport failures are returned; every protocol or catalog
	/// failure is answered with a sentinel.
	pub async fn run(&mut self) -> Result<(), ProtocolError> {
		let result = self.command_loop().await;
		self.state = HandlerState::Closed;
		// The peer may already be gone
		let _ = self.writer.shutdown().await;
		result
	}

	async fn command_loop(&mut self) -> Result<(), ProtocolError> {
		while self.state != HandlerState::Closed {
			self.state = HandlerState::Idle;

			let frame = match tokio::time::timeout(
				self.read_timeout,
				read_line(&mut self.reader, MAX_COMMAND_LEN),
			)
			.await
			{
				Err(_) => {
					debug!("Idle for {:?}, closing", self.read_timeout);
					return Ok(());
				}
				Ok(Ok(None)) => return Ok(()),
				Ok(Ok(Some(frame))) => frame,
				Ok(Err(ProtocolError::Io(e))) => return Err(ProtocolError::Io(e)),
				Ok(Err(e)) => {
					warn!("Unreadable command: {}", e);
					self.reject().await?;
					return Ok(());
				}
			};

			self.state = HandlerState::Dispatching;
			debug!("Command received -> {:?}", frame);
			self.state = match Command::decode(&frame) {
				Ok(command) => self.dispatch(command).await?,
				Err(e) => {
					warn!("Bad command {:?}: {}", frame, e);
					self.reject().await?
				}
			};
		}
		Ok(())
	}

	async fn dispatch(&mut self, command: Command) -> Result<HandlerState, ProtocolError> {
		match command {
			Command::Available => self.send_listing(false).await,
			Command::RawAvailable => self.send_listing(true).await,
			Command::Copy(position) => self.send_file(position).await,
		}
	}

	async fn reject(&mut self) -> Result<HandlerState, ProtocolError> {
		write_sentinel(&mut self.writer, Sentinel::BadParameter).await?;
		Ok(HandlerState::Closed)
	}

	async fn send_listing(&mut self, raw: bool) -> Result<HandlerState, ProtocolError> {
		let names = match self.catalog.list().await {
			Ok(names) => names,
			Err(e) => {
				warn!("Cannot list catalog: {}", e);
				Vec::new()
			}
		};

		if names.is_empty() {
			debug!("Catalog is empty");
			write_sentinel(&mut self.writer, Sentinel::NotAvailable).await?;
			self.writer.flush().await?;
			return Ok(HandlerState::Idle);
		}

		let mut payload = if raw {
			names.join(RAW_SEPARATOR)
		} else {
			catalog::render_available(&names).join("\n")
		};
		payload.push('\n');
		payload.push_str(Sentinel::End.as_str());
		write_line(&mut self.writer, &payload).await?;
		self.writer.flush().await?;

		debug!("Sent {} catalog entries", names.len());
		Ok(HandlerState::Idle)
	}

	async fn send_file(&mut self, position: usize) -> Result<HandlerState, ProtocolError> {
		match self.catalog.fetch(position).await {
			Ok(mut entry) => {
				info!("Sending {} ({} bytes)", entry.name, entry.len);
				write_line(&mut self.writer, &entry.name).await?;
				let sent = tokio::io::copy(&mut entry.file, &mut self.writer).await?;
				self.writer.flush().await?;
				if sent != entry.len {
					warn!("{} changed during transfer: sent {} of {} bytes", entry.name, sent, entry.len);
				}
				info!("{} sent", entry.name);
			}
			Err(e) if e.is_not_found() => {
				info!("Requested position not available: {}", e);
				write_sentinel(&mut self.writer, Sentinel::NotAvailable).await?;
			}
			Err(e) => {
				warn!("Cannot serve position {}: {}", position, e);
				write_sentinel(&mut self.writer, Sentinel::NotAvailable).await?;
			}
		}
		// One file per connection
		Ok(HandlerState::Closed)
	}
}

/// Handle one accepted TCP connection to completion
pub async fn handle_connection(stream: TcpStream, catalog: CatalogService, read_timeout: Duration) {
	let peer = stream.peer_addr().map(|a| a.to_string()).unwrap_or_else(|_| "?".to_string());
	info!("Connection at {}", peer);
	if let Err(e) = stream.set_nodelay(true) {
		debug!("Cannot set TCP_NODELAY for {}: {}", peer, e);
	}

	let (reader, writer) = stream.into_split();
	let mut handler = ConnectionHandler::new(reader, writer, catalog, read_timeout);
	match handler.run().await {
		Ok(()) => info!("Connection {} closed", peer),
		Err(e) => warn!("Connection {} ended with error: {}", peer, e),
	}
}

/// Catalog server bound to a TCP address
pub struct Server {
	listener: TcpListener,
	catalog: CatalogService,
	read_timeout: Duration,
}

impl Server {
	/// Bind the configured address; fails if the root is not a directory
	pub async fn bind(config: &ServerConfig) -> Result<Server, MusyncError> {
		if !config.root.is_dir() {
			return Err(MusyncError::Other {
				message: format!("{} is not a directory", config.root.display()),
			});
		}
		let catalog =
			CatalogService::with_exclude_patterns(config.root.clone(), &config.exclude_patterns)?;
		let listener = TcpListener::bind(config.address()).await?;
		Ok(Server { listener, catalog, read_timeout: config.read_timeout() })
	}

	pub fn local_addr(&self) -> io::Result<SocketAddr> {
		self.listener.local_addr()
	}

	/// Accept connections forever
	pub async fn run(self) -> io::Result<()> {
		self.run_until(std::future::pending::<()>()).await
	}

	/// Accept connections until `shutdown` completes
	///
	/// Connections already accepted keep running to completion.
	pub async fn run_until<F>(self, shutdown: F) -> io::Result<()>
	where
		F: Future<Output = ()>,
	{
		let addr = self.listener.local_addr()?;
		info!("Serving {} on {}", self.catalog.root().display(), addr);
		tokio::pin!(shutdown);

		loop {
			tokio::select! {
				_ = &mut shutdown => {
					info!("Shutting down server on {}", addr);
					return Ok(());
				}
				accepted = self.listener.accept() => match accepted {
					Ok((stream, _)) => {
						let catalog = self.catalog.clone();
						let read_timeout = self.read_timeout;
						tokio::spawn(async move {
							handle_connection(stream, catalog, read_timeout).await;
						});
					}
					Err(e) => {
						warn!("Accept failed: {}", e);
						tokio::time::sleep(Duration::from_millis(100)).await;
					}
				},
			}
		}
	}
}


// vim: ts=4
