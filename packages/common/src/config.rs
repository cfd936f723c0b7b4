use std::path::PathBuf;

use serde::Deserialize;

/// Uploaded media configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    /// Directory uploaded files are written to. Default: "./media".
    #[serde(default = "default_media_root")]
    pub root: PathBuf,
    /// Public URL prefix the media directory is served under. Default: "/media/".
    #[serde(default = "default_media_url")]
    pub url: String,
    /// Largest accepted upload in bytes. Default: 5 MiB.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,
}

fn default_media_root() -> PathBuf {
    PathBuf::from("./media")
}
fn default_media_url() -> String {
    "/media/".into()
}
fn default_max_upload_size() -> u64 {
    5 * 1024 * 1024
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: default_media_root(),
            url: default_media_url(),
            max_upload_size: default_max_upload_size(),
        }
    }
}

/// Full-page cache configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Lifetime of a cached index page in seconds. Default: 20.
    #[serde(default = "default_index_ttl_secs")]
    pub index_ttl_secs: u64,
    /// Maximum number of cached pages. Default: 128.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

fn default_index_ttl_secs() -> u64 {
    20
}
fn default_cache_capacity() -> usize {
    128
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            index_ttl_secs: default_index_ttl_secs(),
            capacity: default_cache_capacity(),
        }
    }
}
