//! Callback traits for reconciliation events

use crate::error::ClientError;

type FileStartFn = dyn Fn(usize, &str) + Send + Sync;
type FileCopiedFn = dyn Fn(&str) + Send + Sync;
type FileFailedFn = dyn Fn(&str, &ClientError) + Send + Sync;

/// Events raised while the reconciler works through the missing files
pub trait ReconcileCallback: Send + Sync {
	/// Called before a copy is requested
	fn on_file_start(&self, _position: usize, _name: &str) {}

	/// Called once a file has been written locally, with the written name
	fn on_file_copied(&self, _name: &str) {}

	/// Called when a copy fails
	fn on_file_failed(&self, _name: &str, _error: &ClientError) {}
}

/// Default callback that does nothing
pub struct NoReconcileCallback;

impl ReconcileCallback for NoReconcileCallback {}

/// Builder for reconcile callbacks from closures
#[derive(Default)]
pub struct CallbackBuilder {
	file_start: Option<Box<FileStartFn>>,
	file_copied: Option<Box<FileCopiedFn>>,
	file_failed: Option<Box<FileFailedFn>>,
}

impl CallbackBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn on_file_start<F>(mut self, callback: F) -> Self
	where
		F: Fn(usize, &str) + Send + Sync + 'static,
	{
		self.file_start = Some(Box::new(callback));
		self
	}

	pub fn on_file_copied<F>(mut self, callback: F) -> Self
	where
		F: Fn(&str) + Send + Sync + 'static,
	{
		self.file_copied = Some(Box::new(callback));
		self
	}

	pub fn on_file_failed<F>(mut self, callback: F) -> Self
	where
		F: Fn(&str, &ClientError) + Send + Sync + 'static,
	{
		self.file_failed = Some(Box::new(callback));
		self
	}

	pub fn build(self) -> Box<dyn ReconcileCallback> {
		Box::new(CompositeCallback {
			file_start: self.file_start,
			file_copied: self.file_copied,
			file_failed: self.file_failed,
		})
	}
}

struct CompositeCallback {
	file_start: Option<Box<FileStartFn>>,
	file_copied: Option<Box<FileCopiedFn>>,
	file_failed: Option<Box<FileFailedFn>>,
}

impl ReconcileCallback for CompositeCallback {
	fn on_file_start(&self, position: usize, name: &str) {
		if let Some(ref callback) = self.file_start {
			callback(position, name);
		}
	}

	fn on_file_copied(&self, name: &str) {
		if let Some(ref callback) = self.file_copied {
			callback(name);
		}
	}

	fn on_file_failed(&self, name: &str, error: &ClientError) {
		if let Some(ref callback) = self.file_failed {
			callback(name, error);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::{Arc, Mutex};

	#[test]
	fn test_builder_dispatches_set_callbacks() {
		let events = Arc::new(Mutex::new(Vec::new()));
		let (e1, e2) = (events.clone(), events.clone());
		let callback = CallbackBuilder::new()
			.on_file_start(move |pos, name| e1.lock().unwrap().push(format!("start {} {}", pos, name)))
			.on_file_copied(move |name| e2.lock().unwrap().push(format!("copied {}", name)))
			.build();

		callback.on_file_start(2, "b.wav");
		callback.on_file_copied("b.wav");
		// Unset callbacks are no-ops
		callback.on_file_failed("c.ogg", &ClientError::Timeout);

		assert_eq!(*events.lock().unwrap(), vec!["start 2 b.wav", "copied b.wav"]);
	}
}

// vim: ts=4
