use std::path::{Component, Path};

use crate::TransferError;

/// Validates that a stored display name is safe to use as a single file
/// name inside the download directory.
///
/// Rejects:
/// - Empty names
/// - Absolute paths (Unix `/` or Windows `C:\`)
/// - Parent or current directory components (`..`, `.`)
/// - Anything with more than one path component
pub fn validate_file_name(name: &str) -> Result<(), TransferError> {
    if name.trim().is_empty() {
        return Err(TransferError::InvalidName("empty name".into()));
    }

    let path = Path::new(name);
    if path.is_absolute() {
        return Err(TransferError::InvalidName(format!(
            "absolute path not allowed: {name}"
        )));
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        (Some(Component::ParentDir), _) | (Some(Component::CurDir), _) => Err(
            TransferError::InvalidName(format!("directory reference not allowed: {name}")),
        ),
        _ => Err(TransferError::InvalidName(format!(
            "nested path not allowed: {name}"
        ))),
    }
}
