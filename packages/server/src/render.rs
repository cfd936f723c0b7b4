//! HTML rendering with Tera, or the raw template context as JSON for clients
//! that ask for `application/json`.
//!
//! Templates are compiled into the binary, so the server does not depend on
//! its working directory.

use std::sync::LazyLock;

use axum::{
    Json,
    extract::FromRequestParts,
    http::request::Parts,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use tera::{Context, Tera};

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AuthUser, session_user};
use crate::extractors::format::ResponseFormat;
use crate::state::AppState;

/// Every template shipped with the application.
const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    (
        "includes/header.html",
        include_str!("../templates/includes/header.html"),
    ),
    (
        "includes/post_card.html",
        include_str!("../templates/includes/post_card.html"),
    ),
    (
        "includes/paginator.html",
        include_str!("../templates/includes/paginator.html"),
    ),
    (
        "includes/form_errors.html",
        include_str!("../templates/includes/form_errors.html"),
    ),
    (
        "posts/index.html",
        include_str!("../templates/posts/index.html"),
    ),
    (
        "posts/group_list.html",
        include_str!("../templates/posts/group_list.html"),
    ),
    (
        "posts/profile.html",
        include_str!("../templates/posts/profile.html"),
    ),
    (
        "posts/post_detail.html",
        include_str!("../templates/posts/post_detail.html"),
    ),
    (
        "posts/create_post.html",
        include_str!("../templates/posts/create_post.html"),
    ),
    (
        "posts/follow.html",
        include_str!("../templates/posts/follow.html"),
    ),
    (
        "users/signup.html",
        include_str!("../templates/users/signup.html"),
    ),
    (
        "users/login.html",
        include_str!("../templates/users/login.html"),
    ),
    (
        "users/logged_out.html",
        include_str!("../templates/users/logged_out.html"),
    ),
    (
        "core/error.html",
        include_str!("../templates/core/error.html"),
    ),
];

pub const ERROR_TEMPLATE: &str = "core/error.html";

static ENGINE: LazyLock<Result<Tera, tera::Error>> = LazyLock::new(|| {
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES.iter().copied())?;
    Ok(tera)
});

/// The shared template engine.
pub fn engine() -> Result<&'static Tera, AppError> {
    ENGINE
        .as_ref()
        .map_err(|e| AppError::Internal(format!("Template engine failed to load: {e:?}")))
}

/// Serialize a context into a JSON object and attach the template name and
/// the requesting user.
fn build_context<C: Serialize>(
    template: &str,
    viewer: Option<&AuthUser>,
    context: &C,
) -> Result<Value, AppError> {
    let mut value = serde_json::to_value(context)
        .map_err(|e| AppError::Internal(format!("Context serialization failed: {e}")))?;
    let Value::Object(map) = &mut value else {
        return Err(AppError::Internal(format!(
            "Context for {template} is not an object"
        )));
    };
    map.insert("template".into(), Value::String(template.to_string()));
    map.insert(
        "viewer".into(),
        serde_json::to_value(viewer)
            .map_err(|e| AppError::Internal(format!("Context serialization failed: {e}")))?,
    );
    Ok(value)
}

fn render_html(template: &str, value: Value) -> Result<String, AppError> {
    let context = Context::from_value(value)?;
    Ok(engine()?.render(template, &context)?)
}

/// Render the error page for an [`ErrorBody`].
pub fn render_error_page(body: &ErrorBody) -> Result<String, AppError> {
    let value = build_context(
        ERROR_TEMPLATE,
        None,
        &serde_json::json!({ "error": body }),
    )?;
    render_html(ERROR_TEMPLATE, value)
}

/// Per-request renderer: knows the negotiated format and who is asking.
pub struct Renderer {
    pub format: ResponseFormat,
    pub viewer: Option<AuthUser>,
}

impl Renderer {
    pub fn render<C: Serialize>(&self, template: &str, context: &C) -> Result<Response, AppError> {
        let value = build_context(template, self.viewer.as_ref(), context)?;
        match self.format {
            ResponseFormat::Json => Ok(Json(value).into_response()),
            ResponseFormat::Html => Ok(Html(render_html(template, value)?).into_response()),
        }
    }
}

impl FromRequestParts<AppState> for Renderer {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Renderer {
            format: ResponseFormat::from_headers(&parts.headers),
            viewer: session_user(&parts.headers, &state.config.auth.jwt_secret),
        })
    }
}
