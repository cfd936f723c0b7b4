use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use rand::Rng;
use rand::distr::Alphanumeric;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::error::StorageError;
use super::sanitize_file_name;
use super::traits::MediaStore;

/// How many alternative names are tried before giving up on a save.
const MAX_NAME_ATTEMPTS: usize = 16;

/// Filesystem-backed media store rooted at a single directory.
///
/// Files live at `{root}/{dir}/{file_name}`, mirroring the relative path
/// recorded in the database.
pub struct FilesystemMediaStore {
    root: PathBuf,
    base_url: String,
    max_size: u64,
}

impl FilesystemMediaStore {
    /// Create a new filesystem media store, creating the root if needed.
    pub async fn new(
        root: PathBuf,
        base_url: impl Into<String>,
        max_size: u64,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            base_url: base_url.into(),
            max_size,
        })
    }

    /// Map a relative media path onto the filesystem, refusing anything that
    /// could escape the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if path.is_empty() || !safe {
            return Err(StorageError::InvalidName(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

/// Alternative name for a taken path: `stem_XXXXXXX.ext`.
fn alternative_name(file_name: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(7)
        .map(char::from)
        .collect();
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{suffix}.{ext}"),
        _ => format!("{file_name}_{suffix}"),
    }
}

#[async_trait]
impl MediaStore for FilesystemMediaStore {
    async fn save(&self, dir: &str, file_name: &str, data: &[u8]) -> Result<String, StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let file_name = sanitize_file_name(file_name)?;
        let dir = dir.trim_matches('/');
        let dir_path = self.resolve(dir)?;
        fs::create_dir_all(&dir_path).await?;

        let mut candidate = file_name.clone();
        for _ in 0..MAX_NAME_ATTEMPTS {
            let target = dir_path.join(&candidate);
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)
                .await
            {
                Ok(mut file) => {
                    if let Err(e) = file.write_all(data).await {
                        drop(file);
                        let _ = fs::remove_file(&target).await;
                        return Err(e.into());
                    }
                    file.flush().await?;
                    let relative = format!("{dir}/{candidate}");
                    tracing::debug!(path = %relative, size = data.len(), "Stored media file");
                    return Ok(relative);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    candidate = alternative_name(&file_name);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StorageError::InvalidName(file_name))
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        let full = self.resolve(path)?;
        match fs::remove_file(&full).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}
