use sea_orm::*;

use crate::entity::user;
use crate::error::AppError;
use crate::utils::hash;

/// Fields needed to create an account.
pub struct NewUser<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
}

/// Why an account could not be created.
#[derive(Debug)]
pub enum CreateUserError {
    UsernameTaken,
    Other(AppError),
}

impl From<AppError> for CreateUserError {
    fn from(err: AppError) -> Self {
        CreateUserError::Other(err)
    }
}

impl From<DbErr> for CreateUserError {
    fn from(err: DbErr) -> Self {
        CreateUserError::Other(err.into())
    }
}

/// Hash the password and insert a user. Username uniqueness is left to the
/// database so concurrent signups cannot both succeed.
pub async fn create_user<C: ConnectionTrait>(
    db: &C,
    new_user: NewUser<'_>,
) -> Result<user::Model, CreateUserError> {
    let hash = hash::hash_password(new_user.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let model = user::ActiveModel {
        username: Set(new_user.username.trim().to_string()),
        password: Set(hash),
        first_name: Set(new_user.first_name.trim().to_string()),
        last_name: Set(new_user.last_name.trim().to_string()),
        email: Set(new_user.email.trim().to_string()),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    model.insert(db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!("Signup race condition: unique constraint caught on insert");
            CreateUserError::UsernameTaken
        }
        _ => CreateUserError::from(e),
    })
}

/// Check credentials. `Ok(None)` means unknown user or wrong password.
pub async fn authenticate<C: ConnectionTrait>(
    db: &C,
    username: &str,
    password: &str,
) -> Result<Option<user::Model>, AppError> {
    let Some(user) = user::Entity::find()
        .filter(user::Column::Username.eq(username.trim()))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    // Accounts without a usable password hash cannot log in.
    let is_valid = hash::verify_password(password, &user.password).unwrap_or_else(|e| {
        tracing::warn!(user_id = user.id, "Unusable password hash: {}", e);
        false
    });

    Ok(is_valid.then_some(user))
}
