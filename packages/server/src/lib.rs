pub mod accounts;
pub mod cache;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod render;
pub mod routes;
pub mod seed;
pub mod state;
pub mod utils;

use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Yatube",
        version = "0.1.0",
        description = "Every page returns its template context as JSON when requested with `Accept: application/json`. The `template` field names the template that would have been rendered."
    ),
    paths(
        handlers::posts::index,
        handlers::posts::group_posts,
        handlers::posts::profile,
        handlers::posts::post_detail,
        handlers::posts::post_create_form,
        handlers::posts::post_create,
        handlers::posts::post_edit_form,
        handlers::posts::post_edit,
        handlers::posts::add_comment,
        handlers::posts::follow_index,
        handlers::posts::profile_follow,
        handlers::posts::profile_unfollow,
        handlers::auth::signup_form,
        handlers::auth::signup,
        handlers::auth::login_form,
        handlers::auth::login,
        handlers::auth::logout,
    ),
    tags(
        (name = "Posts", description = "Post feeds, post pages and the post form"),
        (name = "Follow", description = "Author subscriptions"),
        (name = "Auth", description = "Sign-up, login and logout"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "session",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(
                extractors::auth::SESSION_COOKIE,
            ))),
        );
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let media_prefix = match state.config.media.url.trim_end_matches('/') {
        "" => "/media".to_string(),
        prefix => prefix.to_string(),
    };
    let media = ServeDir::new(&state.config.media.root);

    routes::site_routes(&state)
        .nest_service(&media_prefix, media)
        .fallback(handlers::not_found)
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}
