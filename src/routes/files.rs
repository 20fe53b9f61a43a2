use crate::error::app_error::AppError;
use crate::storage::Storage;
use rocket::fs::NamedFile;
use rocket::{routes, State};
use std::path::PathBuf;

/// Serves stored images (user photos, product photos, results) from the
/// storage root. Rocket's `PathBuf` segment guard already refuses `..`
/// traversal, so joining onto the root is safe.
#[rocket::get("/static/<path..>")]
pub async fn serve_static(storage: &State<Storage>, path: PathBuf) -> Result<NamedFile, AppError> {
    let full = storage.root().join(path);
    if !full.is_file() {
        return Err(AppError::NotFound("File not found".to_string()));
    }
    NamedFile::open(full)
        .await
        .map_err(|e| AppError::io("Failed to open stored file", e))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![serve_static]
}
