pub mod error;
pub mod files;
pub mod health;
pub mod product;
pub mod tryon;
pub mod user;

use crate::error::app_error::AppError;
use rocket::fs::TempFile;
use rocket::http::ContentType;
use rocket::tokio::io::AsyncReadExt;

/// Uploads must declare an `image/*` content type before the bytes are
/// even looked at.
pub(crate) fn ensure_image_content_type(content_type: Option<&ContentType>) -> Result<(), AppError> {
    match content_type {
        Some(ct) if ct.top() == "image" => Ok(()),
        _ => Err(AppError::BadRequest("File must be an image".to_string())),
    }
}

pub(crate) async fn read_upload(file: &mut TempFile<'_>) -> Result<Vec<u8>, AppError> {
    let mut bytes = Vec::with_capacity(file.len() as usize);
    file.open()
        .await
        .map_err(|e| AppError::io("Failed to open uploaded file", e))?
        .read_to_end(&mut bytes)
        .await
        .map_err(|e| AppError::io("Failed to read uploaded file", e))?;
    Ok(bytes)
}
