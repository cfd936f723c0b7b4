use axum::{
    Form,
    extract::{FromRequest, Multipart, Request, rejection::FormRejection},
    http::header,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::models::post::{PostFormInput, UploadedFile};

/// A `Form<T>` wrapper that converts deserialization errors into `AppError::Validation`.
pub struct AppForm<T>(pub T);

impl<S, T> FromRequest<S> for AppForm<T>
where
    Form<T>: FromRequest<S, Rejection = FormRejection>,
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        Ok(AppForm(value))
    }
}

/// A submitted post form: `multipart/form-data` when an image is attached,
/// plain urlencoded otherwise.
pub struct PostSubmission {
    pub input: PostFormInput,
    pub image: Option<UploadedFile>,
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read form field: {e}")))
}

impl<S> FromRequest<S> for PostSubmission
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let AppForm(input) = AppForm::<PostFormInput>::from_request(req, state).await?;
            return Ok(PostSubmission { input, image: None });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        let mut input = PostFormInput::default();
        let mut image = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
        {
            match field.name() {
                Some("text") => input.text = field_text(field).await?,
                Some("group") => input.group = Some(field_text(field).await?),
                Some("clear_image") => input.clear_image = Some(field_text(field).await?),
                Some("image") => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let content_type = field.content_type().map(|s| s.to_string());
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
                    // Browsers send an empty, nameless part when no file was chosen.
                    if !file_name.is_empty() {
                        image = Some(UploadedFile {
                            file_name,
                            content_type,
                            data,
                        });
                    }
                }
                _ => {} // Ignore unknown fields.
            }
        }

        Ok(PostSubmission { input, image })
    }
}
