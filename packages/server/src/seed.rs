use sea_orm::sea_query::Index;
use sea_orm::*;
use tracing::info;

use crate::entity::{group, post};
use crate::error::AppError;

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();

    // Profile feed and per-author counts:
    // SELECT ... FROM post WHERE author_id = ? ORDER BY pub_date DESC
    let author_feed = Index::create()
        .if_not_exists()
        .name("idx_post_author_pub_date")
        .table(post::Entity)
        .col(post::Column::AuthorId)
        .col(post::Column::PubDate)
        .to_owned();

    // Group feed
    let group_feed = Index::create()
        .if_not_exists()
        .name("idx_post_group_pub_date")
        .table(post::Entity)
        .col(post::Column::GroupId)
        .col(post::Column::PubDate)
        .to_owned();

    // Index page
    let index_feed = Index::create()
        .if_not_exists()
        .name("idx_post_pub_date")
        .table(post::Entity)
        .col(post::Column::PubDate)
        .to_owned();

    for (name, stmt) in [
        ("idx_post_author_pub_date", author_feed),
        ("idx_post_group_pub_date", group_feed),
        ("idx_post_pub_date", index_feed),
    ] {
        match db.execute_raw(backend.build(&stmt)).await {
            Ok(_) => info!("Ensured index {} exists", name),
            Err(e) => tracing::warn!("Failed to create index {}: {}", name, e),
        }
    }

    Ok(())
}

/// Slugs are limited to ASCII letters, digits, hyphens and underscores.
pub fn validate_slug(slug: &str) -> Result<(), AppError> {
    if slug.is_empty() || slug.len() > 50 {
        return Err(AppError::Validation(
            "Slug must be 1-50 characters".into(),
        ));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::Validation(
            "Slug may only contain letters, digits, hyphens and underscores".into(),
        ));
    }
    Ok(())
}

/// Create a group. Groups are managed by administrators only, so this is
/// reachable from the command line and not over HTTP.
pub async fn create_group<C: ConnectionTrait>(
    db: &C,
    title: &str,
    slug: &str,
    description: &str,
) -> Result<group::Model, AppError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > 200 {
        return Err(AppError::Validation("Title must be 1-200 characters".into()));
    }
    validate_slug(slug)?;

    let model = group::ActiveModel {
        title: Set(title.to_string()),
        slug: Set(slug.to_string()),
        description: Set(description.trim().to_string()),
        ..Default::default()
    };

    let group = model.insert(db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict(format!("A group with slug '{slug}' already exists"))
        }
        _ => AppError::from(e),
    })?;

    info!(group_id = group.id, slug = %group.slug, "Created group");
    Ok(group)
}
