//! Reconciliation engine
//!
//! Computes which server catalog entries are missing from the local
//! directory and fetches them one after another.

use std::collections::HashSet;
use std::path::Path;

use crate::callbacks::{NoReconcileCallback, ReconcileCallback};
use crate::catalog;
use crate::client::CatalogRemote;
use crate::error::{CatalogError, ClientError};
use crate::logging::*;
use crate::strategies::FailurePolicy;

/// Server entries absent from `local`, as 1-based (position, name) pairs
///
/// Pairs follow server order. A name listed twice by the server is only
/// requested once, at its first position.
pub fn diff(server: &[String], local: &[String]) -> Vec<(usize, String)> {
	let local: HashSet<&str> = local.iter().map(String::as_str).collect();
	let mut seen = HashSet::new();
	let mut missing = Vec::new();

	for (idx, name) in server.iter().enumerate() {
		if local.contains(name.as_str()) || !seen.insert(name.as_str()) {
			continue;
		}
		missing.push((idx + 1, name.clone()));
	}
	missing
}

/// Audio file names already present in the local directory
pub async fn local_catalog(root: &Path) -> Result<Vec<String>, ClientError> {
	catalog::scan_audio_files(root, &[]).await.map_err(|e| match e {
		CatalogError::Io { path, source } => ClientError::LocalIo { path, source },
		other => ClientError::Protocol { message: other.to_string() },
	})
}

/// Outcome of an automatic reconciliation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
	/// Names written locally, in copy order
	pub copied: Vec<String>,

	/// Names whose copy failed, with the error message
	pub failed: Vec<(String, String)>,

	/// Names never attempted because the run stopped early
	pub skipped: Vec<String>,
}

impl ReconcileReport {
	/// True when every missing entry was copied
	pub fn is_complete(&self) -> bool {
		self.failed.is_empty() && self.skipped.is_empty()
	}
}

/// Drives reconciliation against a [`CatalogRemote`]
pub struct Reconciler {
	policy: FailurePolicy,
	callback: Box<dyn ReconcileCallback>,
}

impl Default for Reconciler {
	fn default() -> Self {
		Self::new(FailurePolicy::default())
	}
}

impl Reconciler {
	pub fn new(policy: FailurePolicy) -> Self {
		Reconciler { policy, callback: Box::new(NoReconcileCallback) }
	}

	pub fn with_callback(mut self, callback: Box<dyn ReconcileCallback>) -> Self {
		self.callback = callback;
		self
	}

	pub fn policy(&self) -> FailurePolicy {
		self.policy
	}

	/// Entries the local directory is missing; empty if the server has none
	pub async fn plan<R>(&self, remote: &mut R) -> Result<Vec<(usize, String)>, ClientError>
	where
		R: CatalogRemote + ?Sized,
	{
		let server = match remote.raw_available().await {
			Ok(names) => names,
			Err(ClientError::EmptyCatalog) => {
				info!("There is no music on the server");
				return Ok(Vec::new());
			}
			Err(e) => return Err(e),
		};
		let local = local_catalog(remote.local_root()).await?;
		let missing = diff(&server, &local);
		debug!("{} on server, {} local, {} missing", server.len(), local.len(), missing.len());
		Ok(missing)
	}

	/// Copy every missing entry, sequentially
	pub async fn automatic<R>(&self, remote: &mut R) -> Result<ReconcileReport, ClientError>
	where
		R: CatalogRemote + ?Sized,
	{
		let missing = self.plan(remote).await?;
		let mut report = ReconcileReport::default();
		let mut pending = missing.into_iter();

		while let Some((position, name)) = pending.next() {
			self.callback.on_file_start(position, &name);
			match remote.copy(position).await {
				Ok(written) => {
					if written != name {
						warn!(
							"Position {} changed since listing: expected {}, received {}",
							position, name, written
						);
					}
					self.callback.on_file_copied(&written);
					report.copied.push(written);
				}
				Err(e) => {
					warn!("Failed to copy {} (position {}): {}", name, position, e);
					self.callback.on_file_failed(&name, &e);
					report.failed.push((name, e.to_string()));
					if self.policy == FailurePolicy::FailFast {
						report.skipped.extend(pending.by_ref().map(|(_, name)| name));
						break;
					}
				}
			}
		}

		info!(
			"Reconciliation done: {} copied, {} failed, {} skipped",
			report.copied.len(),
			report.failed.len(),
			report.skipped.len()
		);
		Ok(report)
	}
}


// vim: ts=4
