//! Catalog service
//!
//! A catalog is the ordered list of audio file names directly inside a root
//! directory. It is re-enumerated on every request and never cached, so a
//! position is only meaningful against the listing it came from.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs as afs;

use crate::error::CatalogError;
use crate::logging::*;
use crate::validation;

/// File name suffixes recognized as audio
pub const AUDIO_EXTENSIONS: &[&str] =
	&[".pcm", ".wav", ".aiff", ".mp3", ".aac", ".ogg", ".wma", ".flac", ".alac", ".m4a"];

/// Whether `name` ends with one of the recognized audio suffixes (case-sensitive)
pub fn is_audio_file(name: &str) -> bool {
	AUDIO_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Enumerate audio files directly inside `dir`, in directory-read order.
///
/// Only regular files (symlinks are followed) are kept. Names that are not
/// UTF-8, cannot be carried in a listing frame, or match one of `exclude`
/// are skipped.
pub async fn scan_audio_files(
	dir: &Path,
	exclude: &[glob::Pattern],
) -> Result<Vec<String>, CatalogError> {
	let io_err = |source| CatalogError::Io { path: dir.to_path_buf(), source };
	let mut entries = afs::read_dir(dir).await.map_err(io_err)?;
	let mut names = Vec::new();

	while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
		let name = match entry.file_name().into_string() {
			Ok(name) => name,
			Err(raw) => {
				warn!("Skipping non UTF-8 file name {:?}", raw);
				continue;
			}
		};
		if !is_audio_file(&name) {
			continue;
		}
		if !validation::is_wire_safe_name(&name) {
			warn!("Skipping {:?}: name cannot be listed on the wire", name);
			continue;
		}
		if exclude.iter().any(|p| p.matches(&name)) {
			debug!("Excluded {:?}", name);
			continue;
		}

		match afs::metadata(entry.path()).await {
			Ok(meta) if meta.is_file() => names.push(name),
			Ok(_) => {}
			Err(e) => {
				// Dangling symlink or entry removed during the scan
				debug!("Cannot stat {}: {}", entry.path().display(), e);
			}
		}
	}

	Ok(names)
}

/// Render the `--available` listing lines
pub fn render_available(names: &[String]) -> Vec<String> {
	names.iter().enumerate().map(|(idx, name)| format!("{} -> {}", idx + 1, name)).collect()
}

/// Map a 1-based position into a listing
pub fn resolve_position(names: &[String], position: usize) -> Result<&str, CatalogError> {
	position
		.checked_sub(1)
		.and_then(|idx| names.get(idx))
		.map(|name| name.as_str())
		.ok_or(CatalogError::PositionOutOfRange { position, len: names.len() })
}

/// An open catalog entry ready to be streamed
#[derive(Debug)]
pub struct CatalogFile {
	pub name: String,
	pub file: afs::File,
	pub len: u64,
}

/// Serves the catalog of one root directory
///
/// Cloning is cheap; clones share the compiled exclusion patterns.
#[derive(Debug, Clone)]
pub struct CatalogService {
	root: PathBuf,
	exclude: Arc<Vec<glob::Pattern>>,
}

impl CatalogService {
	pub fn new<P: Into<PathBuf>>(root: P) -> Self {
		CatalogService { root: root.into(), exclude: Arc::new(Vec::new()) }
	}

	/// Create a service that hides names matching any of `patterns`
	pub fn with_exclude_patterns<P: Into<PathBuf>>(
		root: P,
		patterns: &[String],
	) -> Result<Self, CatalogError> {
		let exclude = patterns
			.iter()
			.map(|p| {
				glob::Pattern::new(p).map_err(|e| CatalogError::InvalidPattern {
					pattern: p.clone(),
					message: e.to_string(),
				})
			})
			.collect::<Result<Vec<_>, _>>()?;
		Ok(CatalogService { root: root.into(), exclude: Arc::new(exclude) })
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Enumerate the current catalog
	pub async fn list(&self) -> Result<Vec<String>, CatalogError> {
		scan_audio_files(&self.root, &self.exclude).await
	}

	/// Open the entry at 1-based `position` of a fresh listing
	pub async fn fetch(&self, position: usize) -> Result<CatalogFile, CatalogError> {
		let names = self.list().await?;
		let name = resolve_position(&names, position)?.to_string();
		let path = self.root.join(&name);

		let file = afs::File::open(&path)
			.await
			.map_err(|source| CatalogError::Io { path: path.clone(), source })?;
		let len = file
			.metadata()
			.await
			.map_err(|source| CatalogError::Io { path: path.clone(), source })?
			.len();

		debug!("Resolved position {} to {} ({} bytes)", position, name, len);
		Ok(CatalogFile { name, file, len })
	}
}


// vim: ts=4
