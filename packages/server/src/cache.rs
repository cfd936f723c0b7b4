//! Full-page response cache for the index page.
//!
//! Entries live for a fixed window from the moment they are stored. Nothing
//! invalidates them when posts change, so a stale page is served until the
//! window closes or [`PageCache::clear`] is called.

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use common::CacheConfig;
use lru::LruCache;

use crate::extractors::auth::session_user;
use crate::extractors::format::ResponseFormat;
use crate::state::AppState;

/// Largest response body the cache will buffer.
const MAX_CACHED_BODY: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct CachedPage {
    stored_at: Instant,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

pub struct PageCache {
    ttl: Duration,
    entries: Mutex<LruCache<String, CachedPage>>,
}

impl PageCache {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            ttl: Duration::from_secs(config.index_ttl_secs),
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// A live entry for `key`. Expired entries are dropped.
    pub fn get(&self, key: &str) -> Option<CachedPage> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let fresh = entries.get(key)?.stored_at.elapsed() < self.ttl;
        if fresh {
            entries.get(key).cloned()
        } else {
            entries.pop(key);
            None
        }
    }

    pub fn insert(&self, key: String, content_type: Option<HeaderValue>, body: Bytes) {
        if self.ttl.is_zero() {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.put(
            key,
            CachedPage {
                stored_at: Instant::now(),
                content_type,
                body,
            },
        );
    }

    /// Drop every cached page.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        tracing::debug!("Page cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache key: representation, viewer and request URI. The viewer is part of
/// the key because the page header shows who is logged in.
fn cache_key(req: &Request, secret: &str) -> String {
    let format = ResponseFormat::from_headers(req.headers());
    let viewer = session_user(req.headers(), secret)
        .map(|u| u.user_id.to_string())
        .unwrap_or_else(|| "anon".into());
    let uri = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    format!("{}:{viewer}:{uri}", format.as_str())
}

/// Middleware serving GET requests from the [`PageCache`] and storing
/// successful responses in it.
pub async fn cache_page(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if req.method() != Method::GET {
        return next.run(req).await;
    }

    let key = cache_key(&req, &state.config.auth.jwt_secret);
    if let Some(page) = state.page_cache.get(&key) {
        tracing::debug!(key = %key, "Page cache hit");
        return cached_response(page);
    }

    let response = next.run(req).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_CACHED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to buffer response for caching: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    state.page_cache.insert(
        key,
        parts.headers.get(header::CONTENT_TYPE).cloned(),
        bytes.clone(),
    );
    Response::from_parts(parts, Body::from(bytes))
}

fn cached_response(page: CachedPage) -> Response {
    let mut response = Response::new(Body::from(page.body));
    if let Some(content_type) = page.content_type {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
    }
    response
}
