pub mod auth;
pub mod posts;

use crate::error::AppError;

/// Fallback for paths no route matches.
pub async fn not_found() -> AppError {
    AppError::NotFound("Page not found".into())
}
