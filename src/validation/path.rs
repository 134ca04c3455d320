//! Path validation functions

use std::path::{Component, Path};

use super::ValidationError;

/// Check if a name is a single, plain file name
///
/// Catalogs are flat, so anything a server sends as a destination name must
/// resolve to an entry directly inside the client root: exactly one normal
/// path component, no separators, no `.`/`..`, not absolute.
///
/// # Arguments
/// * `name` - Name to check
///
/// # Returns
/// `true` if the name is a bare file name, `false` otherwise
pub fn is_bare_file_name(name: &str) -> bool {
	if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains('\0') {
		return false;
	}
	let mut components = Path::new(name).components();
	matches!((components.next(), components.next()), (Some(Component::Normal(_)), None))
}

/// Validate a file name received from the server
///
/// # Arguments
/// * `name` - Name to validate
///
/// # Returns
/// `Ok(())` if valid, `Err(ValidationError)` if the name could escape the root
pub fn validate_file_name(name: &str) -> Result<(), ValidationError> {
	if !is_bare_file_name(name) {
		return Err(ValidationError::PathError(format!(
			"{:?} is not a plain file name",
			name
		)));
	}
	Ok(())
}

/// Check whether a name can be carried in a listing frame
///
/// Newlines would split the frame and `|` is the raw listing separator.
pub fn is_wire_safe_name(name: &str) -> bool {
	!name.contains(|c: char| c == '|' || c == '\n' || c == '\r')
}


// vim: ts=4
