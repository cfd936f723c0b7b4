use async_trait::async_trait;

use super::error::StorageError;

/// Storage for user-uploaded files addressed by a relative path such as
/// `posts/small.gif`.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store `data` as `file_name` inside `dir` and return the relative path
    /// it was saved under. An existing file is never overwritten; a free
    /// name is chosen instead.
    async fn save(&self, dir: &str, file_name: &str, data: &[u8]) -> Result<String, StorageError>;

    /// Delete a stored file, e.g. an upload whose post was never saved.
    ///
    /// Returns `true` if the file was deleted, `false` if it did not exist.
    async fn delete(&self, path: &str) -> Result<bool, StorageError>;

    /// Public URL for a stored path.
    fn url(&self, path: &str) -> String;
}
