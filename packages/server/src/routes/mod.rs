use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};

use crate::cache;
use crate::handlers::{auth, posts};
use crate::state::AppState;

/// Room for the text fields and multipart framing around an upload.
const FORM_OVERHEAD: usize = 64 * 1024;

/// Site routes. Every path ends with a slash.
pub fn site_routes(state: &AppState) -> Router<AppState> {
    let upload_limit =
        DefaultBodyLimit::max(state.config.media.max_upload_size as usize + FORM_OVERHEAD);

    let cached = Router::new()
        .route("/", get(posts::index))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            cache::cache_page,
        ));

    Router::new()
        .merge(cached)
        .route("/group/{slug}/", get(posts::group_posts))
        .route("/profile/{username}/", get(posts::profile))
        .route(
            "/profile/{username}/follow/",
            get(posts::profile_follow).post(posts::profile_follow),
        )
        .route(
            "/profile/{username}/unfollow/",
            get(posts::profile_unfollow).post(posts::profile_unfollow),
        )
        .route("/follow/", get(posts::follow_index))
        .route(
            "/create/",
            get(posts::post_create_form)
                .post(posts::post_create)
                .layer(upload_limit),
        )
        .route("/posts/{post_id}/", get(posts::post_detail))
        .route(
            "/posts/{post_id}/edit/",
            get(posts::post_edit_form)
                .post(posts::post_edit)
                .layer(upload_limit),
        )
        .route("/posts/{post_id}/comment/", post(posts::add_comment))
        .nest("/auth", auth_routes())
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup/", get(auth::signup_form).post(auth::signup))
        .route("/login/", get(auth::login_form).post(auth::login))
        .route("/logout/", get(auth::logout).post(auth::logout))
}
