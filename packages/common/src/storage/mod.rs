mod error;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use filesystem::FilesystemMediaStore;
pub use traits::MediaStore;

/// Reduce an uploaded file name to a safe, flat name.
///
/// Directory components are dropped, spaces become underscores and every
/// character outside `[A-Za-z0-9._-]` is removed.
pub fn sanitize_file_name(raw: &str) -> Result<String, StorageError> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let cleaned: String = base
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    if cleaned.is_empty() || cleaned.starts_with('.') {
        return Err(StorageError::InvalidName(raw.to_string()));
    }
    Ok(cleaned)
}
