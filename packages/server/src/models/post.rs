use bytes::Bytes;
use chrono::{DateTime, Utc};
use common::storage::{MediaStore, sanitize_file_name};
use mime_guess::mime;
use sea_orm::{ConnectionTrait, EntityTrait};
use serde::{Deserialize, Serialize};

use crate::entity::{group, post, user};
use crate::error::AppError;

use super::comment::{CommentFormView, CommentView};
use super::shared::{FormErrors, Page, clean_required};

/// Author as shown next to a post.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct AuthorSummary {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "leo")]
    pub username: String,
    /// "First Last", or the username when no name was given.
    #[schema(example = "Leo Tolstoy")]
    pub full_name: String,
}

impl From<&user::Model> for AuthorSummary {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name(),
        }
    }
}

/// Group as shown next to a post.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct GroupSummary {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Cats")]
    pub title: String,
    #[schema(example = "cats")]
    pub slug: String,
}

impl From<&group::Model> for GroupSummary {
    fn from(group: &group::Model) -> Self {
        Self {
            id: group.id,
            title: group.title.clone(),
            slug: group.slug.clone(),
        }
    }
}

/// Full group, shown at the top of its feed.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct GroupDetail {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl From<group::Model> for GroupDetail {
    fn from(group: group::Model) -> Self {
        Self {
            id: group.id,
            title: group.title,
            slug: group.slug,
            description: group.description,
        }
    }
}

/// A post as rendered in listings and on its detail page.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PostCard {
    #[schema(example = 42)]
    pub id: i32,
    pub text: String,
    /// First 15 characters of the text.
    pub title: String,
    pub pub_date: DateTime<Utc>,
    pub author: AuthorSummary,
    pub group: Option<GroupSummary>,
    /// Path relative to the media root.
    #[schema(example = "posts/small.gif")]
    pub image: Option<String>,
    #[schema(example = "/media/posts/small.gif")]
    pub image_url: Option<String>,
}

impl PostCard {
    pub fn new(
        post: post::Model,
        author: &user::Model,
        group: Option<&group::Model>,
        media: &dyn MediaStore,
    ) -> Self {
        let title = post.to_string();
        let image_url = post.image.as_deref().map(|path| media.url(path));
        Self {
            id: post.id,
            text: post.text,
            title,
            pub_date: post.pub_date,
            author: author.into(),
            group: group.map(GroupSummary::from),
            image: post.image,
            image_url,
        }
    }
}

/// Choice offered by the group select box.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct GroupChoice {
    pub id: i32,
    pub title: String,
}

impl From<group::Model> for GroupChoice {
    fn from(group: group::Model) -> Self {
        Self {
            id: group.id,
            title: group.title,
        }
    }
}

/// Text fields of a submitted post form.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PostFormInput {
    #[serde(default)]
    pub text: String,
    /// Group id, or empty for "no group".
    #[serde(default)]
    pub group: Option<String>,
    /// Any non-empty value removes the current image on edit.
    #[serde(default)]
    pub clear_image: Option<String>,
}

/// An uploaded file held in memory until validated.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Validated post form data.
#[derive(Debug)]
pub struct CleanedPost {
    pub text: String,
    pub group_id: Option<i32>,
    pub image: Option<UploadedFile>,
    pub clear_image: bool,
}

const INVALID_GROUP: &str = "Select a valid choice. That choice is not one of the available choices.";

/// Validate a post form. The group must exist; the image, if any, must be an
/// image no larger than `max_upload_size` bytes.
pub async fn validate_post_form<C: ConnectionTrait>(
    db: &C,
    input: &PostFormInput,
    image: Option<&UploadedFile>,
    max_upload_size: u64,
) -> Result<CleanedPost, FormErrors> {
    let mut errors = FormErrors::default();

    let text = clean_required(&mut errors, "text", &input.text);

    let group_id = match input.group.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.parse::<i32>() {
            Ok(id) => match group::Entity::find_by_id(id).one(db).await {
                Ok(Some(_)) => Some(id),
                Ok(None) => {
                    errors.add("group", INVALID_GROUP);
                    None
                }
                Err(e) => {
                    tracing::error!("Group lookup failed during form validation: {}", e);
                    errors.add(FormErrors::NON_FIELD, "Could not validate the form, try again.");
                    None
                }
            },
            Err(_) => {
                errors.add("group", INVALID_GROUP);
                None
            }
        },
    };

    let clear_image = input.clear_image.as_deref().is_some_and(|v| !v.is_empty());
    if let Some(file) = image {
        if clear_image {
            errors.add(
                "image",
                "Please either submit a file or check the clear checkbox, not both.",
            );
        } else if let Err(message) = validate_image(file, max_upload_size) {
            errors.add("image", message);
        }
    }

    match text {
        Some(text) if errors.is_empty() => Ok(CleanedPost {
            text,
            group_id,
            image: image.cloned(),
            clear_image,
        }),
        _ => Err(errors),
    }
}

/// Check that an upload looks like an image and fits the size limit.
pub fn validate_image(file: &UploadedFile, max_upload_size: u64) -> Result<(), String> {
    if sanitize_file_name(&file.file_name).is_err() {
        return Err("Invalid file name.".into());
    }
    if file.data.is_empty() {
        return Err("The submitted file is empty.".into());
    }
    if file.data.len() as u64 > max_upload_size {
        return Err(format!(
            "The file is too large ({} bytes, limit {max_upload_size}).",
            file.data.len()
        ));
    }

    let declared = file
        .content_type
        .as_deref()
        .and_then(|ct| ct.parse::<mime::Mime>().ok())
        .filter(|m| *m != mime::APPLICATION_OCTET_STREAM);
    let media_type = declared.or_else(|| mime_guess::from_path(&file.file_name).first());

    match media_type {
        Some(m) if m.type_() == mime::IMAGE => Ok(()),
        _ => Err(
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image."
                .into(),
        ),
    }
}

/// Post form as redisplayed to the user.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PostFormView {
    pub text: String,
    /// Selected group id.
    pub group: Option<i32>,
    /// Current image path when editing.
    pub image: Option<String>,
    pub groups: Vec<GroupChoice>,
    pub errors: FormErrors,
}

impl PostFormView {
    pub fn empty(groups: Vec<GroupChoice>) -> Self {
        Self {
            text: String::new(),
            group: None,
            image: None,
            groups,
            errors: FormErrors::default(),
        }
    }

    pub fn for_post(post: &PostCard, groups: Vec<GroupChoice>) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group.as_ref().map(|g| g.id),
            image: post.image.clone(),
            groups,
            errors: FormErrors::default(),
        }
    }

    /// Redisplay submitted values next to their errors.
    pub fn with_errors(
        input: &PostFormInput,
        current_image: Option<String>,
        groups: Vec<GroupChoice>,
        errors: FormErrors,
    ) -> Self {
        Self {
            text: input.text.clone(),
            group: input
                .group
                .as_deref()
                .and_then(|g| g.trim().parse::<i32>().ok()),
            image: current_image,
            groups,
            errors,
        }
    }
}

/// Context of `posts/index.html`.
#[derive(Serialize, utoipa::ToSchema)]
pub struct IndexContext {
    pub page_obj: Page<PostCard>,
}

/// Context of `posts/group_list.html`.
#[derive(Serialize, utoipa::ToSchema)]
pub struct GroupPostsContext {
    pub group: GroupDetail,
    pub page_obj: Page<PostCard>,
}

/// Context of `posts/profile.html`.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ProfileContext {
    pub author: AuthorSummary,
    pub page_obj: Page<PostCard>,
    pub posts_count: u64,
    /// Whether the requesting user follows this author.
    pub following: bool,
}

/// Context of `posts/post_detail.html`.
#[derive(Serialize, utoipa::ToSchema)]
pub struct PostDetailContext {
    pub post: PostCard,
    /// Number of posts by the same author.
    pub count: u64,
    pub form: CommentFormView,
    pub comments: Vec<CommentView>,
}

/// Context of `posts/create_post.html`.
#[derive(Serialize, utoipa::ToSchema)]
pub struct PostFormContext {
    pub form: PostFormView,
    pub post: Option<PostCard>,
    pub is_edit: bool,
}

/// Context of `posts/follow.html`.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FollowIndexContext {
    pub page_obj: Page<PostCard>,
    pub title: String,
}

/// Look up a post, returning 404 if not found.
pub async fn find_post<C: ConnectionTrait>(db: &C, id: i32) -> Result<post::Model, AppError> {
    post::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".into()))
}
