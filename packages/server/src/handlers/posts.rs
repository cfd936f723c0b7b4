use std::collections::{HashMap, HashSet};

use axum::extract::{Path, Query, State};
use axum::response::Response;
use common::storage::MediaStore;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{comment, follow, group, post, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::form::{AppForm, PostSubmission};
use crate::models::comment::{CommentForm, CommentFormView, CommentView};
use crate::models::post::*;
use crate::models::shared::{Page, PageQuery};
use crate::render::Renderer;
use crate::state::AppState;
use crate::utils::paginator::{POSTS_PER_PAGE, PageWindow};
use crate::utils::redirect;

const FOLLOW_URL: &str = "/follow/";

fn profile_url(username: &str) -> String {
    format!("/profile/{username}/")
}

fn detail_url(post_id: i32) -> String {
    format!("/posts/{post_id}/")
}

/// Post ids in URLs are integers; anything else does not name a post.
fn parse_post_id(raw: &str) -> Result<i32, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound("Post not found".into()))
}

async fn find_author(db: &DatabaseConnection, username: &str) -> Result<user::Model, AppError> {
    user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User '{username}' not found")))
}

async fn group_choices(db: &DatabaseConnection) -> Result<Vec<GroupChoice>, AppError> {
    Ok(group::Entity::find()
        .order_by_asc(group::Column::Title)
        .all(db)
        .await?
        .into_iter()
        .map(GroupChoice::from)
        .collect())
}

/// Turn posts into cards, loading their authors and groups in two queries.
async fn load_cards(state: &AppState, posts: Vec<post::Model>) -> Result<Vec<PostCard>, AppError> {
    let author_ids: HashSet<i32> = posts.iter().map(|p| p.author_id).collect();
    let group_ids: HashSet<i32> = posts.iter().filter_map(|p| p.group_id).collect();

    let authors: HashMap<i32, user::Model> = if author_ids.is_empty() {
        HashMap::new()
    } else {
        user::Entity::find()
            .filter(user::Column::Id.is_in(author_ids))
            .all(&state.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect()
    };
    let groups: HashMap<i32, group::Model> = if group_ids.is_empty() {
        HashMap::new()
    } else {
        group::Entity::find()
            .filter(group::Column::Id.is_in(group_ids))
            .all(&state.db)
            .await?
            .into_iter()
            .map(|g| (g.id, g))
            .collect()
    };

    posts
        .into_iter()
        .map(|post| {
            let author = authors.get(&post.author_id).ok_or_else(|| {
                AppError::Internal(format!("Post {} has no author {}", post.id, post.author_id))
            })?;
            let group = post.group_id.and_then(|id| groups.get(&id));
            Ok(PostCard::new(post, author, group, state.media.as_ref()))
        })
        .collect()
}

/// One page of posts matching `condition`, newest first.
async fn paginate_posts(
    state: &AppState,
    condition: Condition,
    raw_page: Option<&str>,
) -> Result<Page<PostCard>, AppError> {
    let select = post::Entity::find()
        .filter(condition)
        .order_by_desc(post::Column::PubDate)
        .order_by_desc(post::Column::Id);

    let paginator = select.paginate(&state.db, POSTS_PER_PAGE);
    let count = paginator.num_items().await?;
    let window = PageWindow::resolve(raw_page, count, POSTS_PER_PAGE);
    let posts = paginator.fetch_page(window.index()).await?;

    Ok(Page::new(window, load_cards(state, posts).await?))
}

async fn post_card(state: &AppState, post: post::Model) -> Result<PostCard, AppError> {
    load_cards(state, vec![post])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Post card was not built".into()))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Posts",
    operation_id = "index",
    summary = "Latest posts",
    description = "All posts, newest first, 10 per page. The rendered page is cached for `cache.index_ttl_secs` seconds.",
    params(PageQuery),
    responses(
        (status = 200, description = "posts/index.html", body = IndexContext),
    ),
)]
#[instrument(skip(state, renderer, query))]
pub async fn index(
    State(state): State<AppState>,
    renderer: Renderer,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let page_obj = paginate_posts(&state, Condition::all(), query.page.as_deref()).await?;
    renderer.render("posts/index.html", &IndexContext { page_obj })
}

#[utoipa::path(
    get,
    path = "/group/{slug}/",
    tag = "Posts",
    operation_id = "groupPosts",
    summary = "Posts of a group",
    params(("slug" = String, Path, description = "Group slug"), PageQuery),
    responses(
        (status = 200, description = "posts/group_list.html", body = GroupPostsContext),
        (status = 404, description = "Unknown group", body = ErrorBody),
    ),
)]
#[instrument(skip(state, renderer, query))]
pub async fn group_posts(
    State(state): State<AppState>,
    renderer: Renderer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let group = group::Entity::find()
        .filter(group::Column::Slug.eq(&slug))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Group not found".into()))?;

    let page_obj = paginate_posts(
        &state,
        Condition::all().add(post::Column::GroupId.eq(group.id)),
        query.page.as_deref(),
    )
    .await?;

    renderer.render(
        "posts/group_list.html",
        &GroupPostsContext {
            group: group.into(),
            page_obj,
        },
    )
}

#[utoipa::path(
    get,
    path = "/profile/{username}/",
    tag = "Posts",
    operation_id = "profile",
    summary = "Posts of an author",
    params(("username" = String, Path, description = "Author username"), PageQuery),
    responses(
        (status = 200, description = "posts/profile.html", body = ProfileContext),
        (status = 404, description = "Unknown user", body = ErrorBody),
    ),
)]
#[instrument(skip(state, renderer, query))]
pub async fn profile(
    State(state): State<AppState>,
    renderer: Renderer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let author = find_author(&state.db, &username).await?;

    let page_obj = paginate_posts(
        &state,
        Condition::all().add(post::Column::AuthorId.eq(author.id)),
        query.page.as_deref(),
    )
    .await?;

    let following = match &renderer.viewer {
        Some(viewer) => follow::Entity::find_by_id((viewer.user_id, author.id))
            .one(&state.db)
            .await?
            .is_some(),
        None => false,
    };

    renderer.render(
        "posts/profile.html",
        &ProfileContext {
            author: AuthorSummary::from(&author),
            posts_count: page_obj.count,
            page_obj,
            following,
        },
    )
}

#[utoipa::path(
    get,
    path = "/posts/{post_id}/",
    tag = "Posts",
    operation_id = "postDetail",
    summary = "A single post with its comments",
    params(("post_id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "posts/post_detail.html", body = PostDetailContext),
        (status = 404, description = "Unknown post", body = ErrorBody),
    ),
)]
#[instrument(skip(state, renderer))]
pub async fn post_detail(
    State(state): State<AppState>,
    renderer: Renderer,
    Path(post_id): Path<String>,
) -> Result<Response, AppError> {
    let post = find_post(&state.db, parse_post_id(&post_id)?).await?;

    let count = post::Entity::find()
        .filter(post::Column::AuthorId.eq(post.author_id))
        .count(&state.db)
        .await?;

    let comments = comment::Entity::find()
        .filter(comment::Column::PostId.eq(post.id))
        .order_by_desc(comment::Column::Created)
        .order_by_desc(comment::Column::Id)
        .all(&state.db)
        .await?;
    let commenter_ids: HashSet<i32> = comments.iter().map(|c| c.author_id).collect();
    let commenters: HashMap<i32, user::Model> = if commenter_ids.is_empty() {
        HashMap::new()
    } else {
        user::Entity::find()
            .filter(user::Column::Id.is_in(commenter_ids))
            .all(&state.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect()
    };
    let comments = comments
        .into_iter()
        .filter_map(|c| {
            let author = commenters.get(&c.author_id)?;
            Some(CommentView::new(c, author))
        })
        .collect();

    renderer.render(
        "posts/post_detail.html",
        &PostDetailContext {
            post: post_card(&state, post).await?,
            count,
            form: CommentFormView::default(),
            comments,
        },
    )
}

#[utoipa::path(
    get,
    path = "/create/",
    tag = "Posts",
    operation_id = "postCreateForm",
    summary = "Empty post form",
    description = "Requires login; anonymous visitors are redirected to `/auth/login/?next=/create/`.",
    responses(
        (status = 200, description = "posts/create_post.html", body = PostFormContext),
        (status = 302, description = "Not logged in"),
    ),
)]
#[instrument(skip(auth_user, state, renderer), fields(user_id = auth_user.user_id))]
pub async fn post_create_form(
    auth_user: AuthUser,
    State(state): State<AppState>,
    renderer: Renderer,
) -> Result<Response, AppError> {
    renderer.render(
        "posts/create_post.html",
        &PostFormContext {
            form: PostFormView::empty(group_choices(&state.db).await?),
            post: None,
            is_edit: false,
        },
    )
}

/// Store a validated upload and return its media path.
async fn store_image(state: &AppState, file: &UploadedFile) -> Result<String, AppError> {
    Ok(state
        .media
        .save(post::IMAGE_DIR, &file.file_name, &file.data)
        .await?)
}

/// Remove an upload whose post row could not be written.
async fn discard_image(media: &dyn MediaStore, path: &str) {
    match media.delete(path).await {
        Ok(_) => tracing::debug!(path, "Discarded unsaved upload"),
        Err(e) => tracing::warn!(path, "Orphaned upload left in media storage: {}", e),
    }
}

#[utoipa::path(
    post,
    path = "/create/",
    tag = "Posts",
    operation_id = "postCreate",
    summary = "Publish a post",
    description = "Requires login. The author is the current user. Invalid input re-renders the form.",
    request_body(content_type = "multipart/form-data", description = "`text`, optional `group` id and optional `image` file"),
    responses(
        (status = 200, description = "posts/create_post.html with form errors", body = PostFormContext),
        (status = 302, description = "Created, redirects to the author's profile; or not logged in"),
    ),
)]
#[instrument(skip(auth_user, state, renderer, submission), fields(user_id = auth_user.user_id))]
pub async fn post_create(
    auth_user: AuthUser,
    State(state): State<AppState>,
    renderer: Renderer,
    submission: PostSubmission,
) -> Result<Response, AppError> {
    let PostSubmission { input, image } = submission;
    let cleaned = match validate_post_form(
        &state.db,
        &input,
        image.as_ref(),
        state.config.media.max_upload_size,
    )
    .await
    {
        Ok(cleaned) => cleaned,
        Err(errors) => {
            let groups = group_choices(&state.db).await?;
            return renderer.render(
                "posts/create_post.html",
                &PostFormContext {
                    form: PostFormView::with_errors(&input, None, groups, errors),
                    post: None,
                    is_edit: false,
                },
            );
        }
    };

    let image = match &cleaned.image {
        Some(file) => Some(store_image(&state, file).await?),
        None => None,
    };

    let new_post = post::ActiveModel {
        text: Set(cleaned.text),
        pub_date: Set(chrono::Utc::now()),
        author_id: Set(auth_user.user_id),
        group_id: Set(cleaned.group_id),
        image: Set(image.clone()),
        ..Default::default()
    };
    let post = match new_post.insert(&state.db).await {
        Ok(post) => post,
        Err(e) => {
            if let Some(path) = &image {
                discard_image(state.media.as_ref(), path).await;
            }
            return Err(e.into());
        }
    };
    tracing::info!(post_id = post.id, "Post created");

    Ok(redirect::found(&profile_url(&auth_user.username)))
}

#[utoipa::path(
    get,
    path = "/posts/{post_id}/edit/",
    tag = "Posts",
    operation_id = "postEditForm",
    summary = "Post form filled with an existing post",
    description = "Requires login. Users other than the author are redirected to the post.",
    params(("post_id" = i32, Path, description = "Post ID")),
    responses(
        (status = 200, description = "posts/create_post.html", body = PostFormContext),
        (status = 302, description = "Not logged in, or not the author"),
        (status = 404, description = "Unknown post", body = ErrorBody),
    ),
)]
#[instrument(skip(auth_user, state, renderer), fields(user_id = auth_user.user_id))]
pub async fn post_edit_form(
    auth_user: AuthUser,
    State(state): State<AppState>,
    renderer: Renderer,
    Path(post_id): Path<String>,
) -> Result<Response, AppError> {
    let post = find_post(&state.db, parse_post_id(&post_id)?).await?;
    if post.author_id != auth_user.user_id {
        return Ok(redirect::found(&detail_url(post.id)));
    }

    let card = post_card(&state, post).await?;
    let groups = group_choices(&state.db).await?;
    renderer.render(
        "posts/create_post.html",
        &PostFormContext {
            form: PostFormView::for_post(&card, groups),
            post: Some(card),
            is_edit: true,
        },
    )
}

#[utoipa::path(
    post,
    path = "/posts/{post_id}/edit/",
    tag = "Posts",
    operation_id = "postEdit",
    summary = "Update a post",
    description = "Requires login. Only the author may edit; other users are redirected to the post unchanged. \
        Without a new `image` the current one is kept unless `clear_image` is set.",
    params(("post_id" = i32, Path, description = "Post ID")),
    request_body(content_type = "multipart/form-data", description = "`text`, optional `group`, optional `image`, optional `clear_image`"),
    responses(
        (status = 200, description = "posts/create_post.html with form errors", body = PostFormContext),
        (status = 302, description = "Updated, or not the author; redirects to the post"),
        (status = 404, description = "Unknown post", body = ErrorBody),
    ),
)]
#[instrument(skip(auth_user, state, renderer, submission), fields(user_id = auth_user.user_id))]
pub async fn post_edit(
    auth_user: AuthUser,
    State(state): State<AppState>,
    renderer: Renderer,
    Path(post_id): Path<String>,
    submission: PostSubmission,
) -> Result<Response, AppError> {
    let post = find_post(&state.db, parse_post_id(&post_id)?).await?;
    if post.author_id != auth_user.user_id {
        tracing::debug!(post_id = post.id, "Edit attempt by a non-author");
        return Ok(redirect::found(&detail_url(post.id)));
    }

    let PostSubmission { input, image } = submission;
    let cleaned = match validate_post_form(
        &state.db,
        &input,
        image.as_ref(),
        state.config.media.max_upload_size,
    )
    .await
    {
        Ok(cleaned) => cleaned,
        Err(errors) => {
            let current_image = post.image.clone();
            let card = post_card(&state, post).await?;
            let groups = group_choices(&state.db).await?;
            return renderer.render(
                "posts/create_post.html",
                &PostFormContext {
                    form: PostFormView::with_errors(&input, current_image, groups, errors),
                    post: Some(card),
                    is_edit: true,
                },
            );
        }
    };

    let uploaded = match &cleaned.image {
        Some(file) => Some(store_image(&state, file).await?),
        None => None,
    };
    let image = match &uploaded {
        Some(path) => Some(path.clone()),
        None if cleaned.clear_image => None,
        None => post.image.clone(),
    };

    let id = post.id;
    let mut active = post.into_active_model();
    active.text = Set(cleaned.text);
    active.group_id = Set(cleaned.group_id);
    active.image = Set(image);
    if let Err(e) = active.update(&state.db).await {
        if let Some(path) = &uploaded {
            discard_image(state.media.as_ref(), path).await;
        }
        return Err(e.into());
    }
    tracing::info!(post_id = id, "Post updated");

    Ok(redirect::found(&detail_url(id)))
}

#[utoipa::path(
    post,
    path = "/posts/{post_id}/comment/",
    tag = "Posts",
    operation_id = "addComment",
    summary = "Comment on a post",
    description = "Requires login. An empty comment is dropped without an error.",
    params(("post_id" = i32, Path, description = "Post ID")),
    request_body(content_type = "application/x-www-form-urlencoded", description = "`text`"),
    responses(
        (status = 302, description = "Redirects to the post"),
        (status = 404, description = "Unknown post", body = ErrorBody),
    ),
)]
#[instrument(skip(auth_user, state, form), fields(user_id = auth_user.user_id))]
pub async fn add_comment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    AppForm(form): AppForm<CommentForm>,
) -> Result<Response, AppError> {
    let post = find_post(&state.db, parse_post_id(&post_id)?).await?;

    match form.clean() {
        Ok(text) => {
            let new_comment = comment::ActiveModel {
                post_id: Set(Some(post.id)),
                author_id: Set(auth_user.user_id),
                text: Set(text),
                created: Set(chrono::Utc::now()),
                ..Default::default()
            };
            let comment = new_comment.insert(&state.db).await?;
            tracing::info!(post_id = post.id, comment_id = comment.id, "Comment added");
        }
        Err(errors) => {
            tracing::debug!(post_id = post.id, ?errors, "Comment rejected");
        }
    }

    Ok(redirect::found(&detail_url(post.id)))
}

#[utoipa::path(
    get,
    path = "/follow/",
    tag = "Follow",
    operation_id = "followIndex",
    summary = "Posts of followed authors",
    params(PageQuery),
    responses(
        (status = 200, description = "posts/follow.html", body = FollowIndexContext),
        (status = 302, description = "Not logged in"),
    ),
)]
#[instrument(skip(auth_user, state, renderer, query), fields(user_id = auth_user.user_id))]
pub async fn follow_index(
    auth_user: AuthUser,
    State(state): State<AppState>,
    renderer: Renderer,
    Query(query): Query<PageQuery>,
) -> Result<Response, AppError> {
    let author_ids: Vec<i32> = follow::Entity::find()
        .filter(follow::Column::UserId.eq(auth_user.user_id))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|f| f.author_id)
        .collect();

    let page_obj = paginate_posts(
        &state,
        Condition::all().add(post::Column::AuthorId.is_in(author_ids)),
        query.page.as_deref(),
    )
    .await?;

    renderer.render(
        "posts/follow.html",
        &FollowIndexContext {
            page_obj,
            title: "Posts of authors you follow".into(),
        },
    )
}

#[utoipa::path(
    post,
    path = "/profile/{username}/follow/",
    tag = "Follow",
    operation_id = "profileFollow",
    summary = "Follow an author",
    description = "Requires login. Also accepts GET. Following yourself or following twice changes nothing.",
    params(("username" = String, Path, description = "Author's username")),
    responses(
        (status = 302, description = "Redirects to /follow/"),
        (status = 404, description = "Unknown author", body = ErrorBody),
    ),
)]
#[instrument(skip(auth_user, state), fields(user_id = auth_user.user_id))]
pub async fn profile_follow(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Response, AppError> {
    let author = find_author(&state.db, &username).await?;

    if author.id == auth_user.user_id {
        tracing::debug!("Ignoring self-follow");
        return Ok(redirect::found(FOLLOW_URL));
    }

    let model = follow::ActiveModel {
        user_id: Set(auth_user.user_id),
        author_id: Set(author.id),
        created_at: Set(chrono::Utc::now()),
    };
    let result = follow::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([follow::Column::UserId, follow::Column::AuthorId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&state.db)
        .await;

    match result {
        Ok(0) | Err(DbErr::RecordNotInserted) => {
            tracing::debug!(author_id = author.id, "Already following author")
        }
        Ok(_) => tracing::info!(author_id = author.id, "Followed author"),
        Err(e) => return Err(e.into()),
    }

    Ok(redirect::found(FOLLOW_URL))
}

#[utoipa::path(
    post,
    path = "/profile/{username}/unfollow/",
    tag = "Follow",
    operation_id = "profileUnfollow",
    summary = "Stop following an author",
    description = "Requires login. Also accepts GET.",
    params(("username" = String, Path, description = "Author's username")),
    responses(
        (status = 302, description = "Redirects to /follow/"),
        (status = 404, description = "Unknown author, or not following", body = ErrorBody),
    ),
)]
#[instrument(skip(auth_user, state), fields(user_id = auth_user.user_id))]
pub async fn profile_unfollow(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Response, AppError> {
    let author = find_author(&state.db, &username).await?;

    let result = follow::Entity::delete_many()
        .filter(follow::Column::UserId.eq(auth_user.user_id))
        .filter(follow::Column::AuthorId.eq(author.id))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Follow not found".into()));
    }
    tracing::info!(author_id = author.id, "Unfollowed author");

    Ok(redirect::found(FOLLOW_URL))
}
