use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{comment, user};

use super::post::AuthorSummary;
use super::shared::{FormErrors, clean_required};

/// Submitted comment form.
#[derive(Debug, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    /// The trimmed comment text, or the form errors.
    pub fn clean(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::default();
        clean_required(&mut errors, "text", &self.text).ok_or(errors)
    }
}

/// Empty comment form rendered under a post.
#[derive(Debug, Default, Serialize, utoipa::ToSchema)]
pub struct CommentFormView {
    pub text: String,
    pub errors: FormErrors,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CommentView {
    pub id: i32,
    pub text: String,
    pub created: DateTime<Utc>,
    pub author: AuthorSummary,
}

impl CommentView {
    pub fn new(comment: comment::Model, author: &user::Model) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            created: comment.created,
            author: author.into(),
        }
    }
}
