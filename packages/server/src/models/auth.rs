use serde::{Deserialize, Serialize};

use super::shared::{FormErrors, clean_required};

/// Longest accepted username.
pub const MAX_USERNAME_LEN: usize = 150;

/// Submitted sign-up form.
#[derive(Debug, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

/// Username rules: 1-150 characters; letters, digits and `@.+-_` only.
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(format!("Username must be 1-{MAX_USERNAME_LEN} characters."));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .into(),
        );
    }
    Ok(())
}

/// Password rules: 8-128 characters.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 8 || password.len() > 128 {
        return Err("Password must be 8-128 characters.".into());
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err("This password is entirely numeric.".into());
    }
    Ok(())
}

impl SignupForm {
    /// Field-level validation. Username uniqueness is checked on insert.
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();

        if let Some(username) = clean_required(&mut errors, "username", &self.username)
            && let Err(msg) = validate_username(&username)
        {
            errors.add("username", msg);
        }
        if self.first_name.chars().count() > 150 {
            errors.add("first_name", "Ensure this value has at most 150 characters.");
        }
        if self.last_name.chars().count() > 150 {
            errors.add("last_name", "Ensure this value has at most 150 characters.");
        }
        let email = self.email.trim();
        if !email.is_empty() && !email.contains('@') {
            errors.add("email", "Enter a valid email address.");
        }
        if self.password1.is_empty() {
            errors.add("password1", "This field is required.");
        } else if let Err(msg) = validate_password(&self.password1) {
            errors.add("password1", msg);
        }
        if self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Sign-up form as redisplayed to the user (passwords are never echoed).
#[derive(Debug, Default, Serialize, utoipa::ToSchema)]
pub struct SignupFormView {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub errors: FormErrors,
}

impl SignupFormView {
    pub fn with_errors(form: &SignupForm, errors: FormErrors) -> Self {
        Self {
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            username: form.username.clone(),
            email: form.email.clone(),
            errors,
        }
    }
}

/// Submitted login form.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        clean_required(&mut errors, "username", &self.username);
        if self.password.is_empty() {
            errors.add("password", "This field is required.");
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Default, Serialize, utoipa::ToSchema)]
pub struct LoginFormView {
    pub username: String,
    pub errors: FormErrors,
}

/// `?next=` on the login page.
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Context of `users/signup.html`.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SignupContext {
    pub form: SignupFormView,
}

/// Context of `users/login.html`.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginContext {
    pub form: LoginFormView,
    /// Where to go after a successful login.
    pub next: Option<String>,
}
