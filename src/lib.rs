//! # musync - Audio Catalog Server and Reconciling Client
//!
//! A server exposes the audio files of one directory as a numbered catalog
//! over a small line-based TCP protocol. A client lists the catalog, copies
//! entries by position, and can reconcile a local directory by downloading
//! every entry it is missing.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use musync::client::CatalogClient;
//! use musync::config::ClientConfig;
//! use musync::reconcile::Reconciler;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig { root: "./music".into(), ..ClientConfig::default() };
//!     let mut client = CatalogClient::new(&config)?;
//!     let report = Reconciler::default().automatic(&mut client).await?;
//!     println!("Copied {} files", report.copied.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Serving a Directory
//!
//! ```rust,ignore
//! use musync::config::ServerConfig;
//! use musync::serve::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig { root: "./library".into(), ..ServerConfig::default() };
//!     Server::bind(&config).await?.run().await?;
//!     Ok(())
//! }
//! ```

pub mod callbacks;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod reconcile;
pub mod serve;
pub mod strategies;
pub mod validation;

// Re-export commonly used types and functions
pub use client::{CatalogClient, CatalogRemote, Connection};
pub use config::Config;
pub use error::{CatalogError, ClientError, MusyncError};
pub use reconcile::{diff, ReconcileReport, Reconciler};

// vim: ts=4
