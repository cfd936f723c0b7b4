use std::sync::Arc;

use common::storage::{FilesystemMediaStore, MediaStore, StorageError};
use sea_orm::DatabaseConnection;

use crate::cache::PageCache;
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub media: Arc<dyn MediaStore>,
    pub page_cache: Arc<PageCache>,
}

impl AppState {
    /// Wire up shared services around an open database. Creates the media
    /// directory if needed.
    pub async fn new(db: DatabaseConnection, config: AppConfig) -> Result<Self, StorageError> {
        let media = FilesystemMediaStore::new(
            config.media.root.clone(),
            config.media.url.clone(),
            config.media.max_upload_size,
        )
        .await?;
        let page_cache = PageCache::new(&config.cache);

        Ok(Self {
            db,
            media: Arc::new(media),
            page_cache: Arc::new(page_cache),
            config,
        })
    }
}
