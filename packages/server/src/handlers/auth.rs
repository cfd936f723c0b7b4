use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::instrument;

use crate::accounts::{self, CreateUserError, NewUser};
use crate::error::AppError;
use crate::extractors::auth::SESSION_COOKIE;
use crate::extractors::form::AppForm;
use crate::models::auth::*;
use crate::models::shared::FormErrors;
use crate::render::Renderer;
use crate::state::AppState;
use crate::utils::{jwt, redirect};

const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

fn session_cookie(token: String, ttl_days: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(ttl_days))
        .build()
}

/// Sign a session for `user` and attach it to the jar.
fn start_session(
    state: &AppState,
    jar: CookieJar,
    user_id: i32,
    username: &str,
) -> Result<CookieJar, AppError> {
    let ttl_days = state.config.auth.token_ttl_days;
    let token = jwt::sign(user_id, username, &state.config.auth.jwt_secret, ttl_days)
        .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;
    Ok(jar.add(session_cookie(token, ttl_days)))
}

#[utoipa::path(
    get,
    path = "/auth/signup/",
    tag = "Auth",
    operation_id = "signupForm",
    summary = "Empty sign-up form",
    responses((status = 200, description = "users/signup.html", body = SignupContext)),
)]
#[instrument(skip(renderer))]
pub async fn signup_form(renderer: Renderer) -> Result<Response, AppError> {
    renderer.render(
        "users/signup.html",
        &SignupContext {
            form: SignupFormView::default(),
        },
    )
}

/// Create an account and log it in.
#[utoipa::path(
    post,
    path = "/auth/signup/",
    tag = "Auth",
    operation_id = "signup",
    summary = "Create an account and log in",
    request_body(content_type = "application/x-www-form-urlencoded", description = "`first_name`, `last_name`, `username`, `email`, `password1`, `password2`"),
    responses(
        (status = 200, description = "users/signup.html with form errors", body = SignupContext),
        (status = 302, description = "Signed up; sets the session cookie and redirects to /"),
    ),
)]
#[instrument(skip(state, renderer, jar, form), fields(username = %form.username))]
pub async fn signup(
    State(state): State<AppState>,
    renderer: Renderer,
    jar: CookieJar,
    AppForm(form): AppForm<SignupForm>,
) -> Result<Response, AppError> {
    if let Err(errors) = form.validate() {
        return renderer.render(
            "users/signup.html",
            &SignupContext {
                form: SignupFormView::with_errors(&form, errors),
            },
        );
    }

    let created = accounts::create_user(
        &state.db,
        NewUser {
            username: &form.username,
            password: &form.password1,
            first_name: &form.first_name,
            last_name: &form.last_name,
            email: &form.email,
        },
    )
    .await;

    let user = match created {
        Ok(user) => user,
        Err(CreateUserError::UsernameTaken) => {
            let mut errors = FormErrors::default();
            errors.add("username", "A user with that username already exists.");
            return renderer.render(
                "users/signup.html",
                &SignupContext {
                    form: SignupFormView::with_errors(&form, errors),
                },
            );
        }
        Err(CreateUserError::Other(e)) => return Err(e),
    };

    tracing::info!(user_id = user.id, "User signed up");
    let jar = start_session(&state, jar, user.id, &user.username)?;
    Ok((jar, redirect::found("/")).into_response())
}

#[utoipa::path(
    get,
    path = "/auth/login/",
    tag = "Auth",
    operation_id = "loginForm",
    summary = "Login form",
    params(("next" = Option<String>, Query, description = "Local path to return to after login")),
    responses((status = 200, description = "users/login.html", body = LoginContext)),
)]
#[instrument(skip(renderer, query))]
pub async fn login_form(
    renderer: Renderer,
    Query(query): Query<NextQuery>,
) -> Result<Response, AppError> {
    renderer.render(
        "users/login.html",
        &LoginContext {
            form: LoginFormView::default(),
            next: redirect::safe_next(query.next.as_deref()).map(str::to_owned),
        },
    )
}

#[utoipa::path(
    post,
    path = "/auth/login/",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in",
    params(("next" = Option<String>, Query, description = "Local path to return to after login")),
    request_body(content_type = "application/x-www-form-urlencoded", description = "`username`, `password`"),
    responses(
        (status = 200, description = "users/login.html with a non-field error", body = LoginContext),
        (status = 302, description = "Logged in; sets the session cookie and redirects to `next` or /"),
    ),
)]
#[instrument(skip(state, renderer, jar, query, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    renderer: Renderer,
    jar: CookieJar,
    Query(query): Query<NextQuery>,
    AppForm(form): AppForm<LoginForm>,
) -> Result<Response, AppError> {
    let next = redirect::safe_next(query.next.as_deref()).map(str::to_owned);

    let errors = match form.validate() {
        Err(errors) => errors,
        Ok(()) => match accounts::authenticate(&state.db, &form.username, &form.password).await? {
            Some(user) => {
                tracing::info!(user_id = user.id, "User logged in");
                let jar = start_session(&state, jar, user.id, &user.username)?;
                let target = next.as_deref().unwrap_or("/");
                return Ok((jar, redirect::found(target)).into_response());
            }
            None => {
                let mut errors = FormErrors::default();
                errors.add(FormErrors::NON_FIELD, INVALID_LOGIN);
                errors
            }
        },
    };

    renderer.render(
        "users/login.html",
        &LoginContext {
            form: LoginFormView {
                username: form.username.clone(),
                errors,
            },
            next,
        },
    )
}

#[utoipa::path(
    get,
    path = "/auth/logout/",
    tag = "Auth",
    operation_id = "logout",
    summary = "End the session",
    responses((status = 200, description = "users/logged_out.html")),
)]
#[instrument(skip(renderer, jar))]
pub async fn logout(renderer: Renderer, jar: CookieJar) -> Result<Response, AppError> {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    let renderer = Renderer {
        viewer: None,
        ..renderer
    };
    let page = renderer.render("users/logged_out.html", &serde_json::json!({}))?;
    Ok((jar, page).into_response())
}
