//! Path-based persistence under a single storage root. Layout:
//! `users/<user_id>/photos/<ts>_user.jpg`, `products/<product_id>/<ts>_product.jpg`,
//! `results/<session_id>/output.png`. Only relative paths are handed out;
//! absolute paths exist only transiently at I/O time. Nothing here deletes
//! files; cleanup belongs to the maintenance tooling.

use crate::error::app_error::AppError;
use crate::images;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone)]
pub struct Storage {
    root: PathBuf,
    /// Encodings converted to PNG before hitting disk. This ingest-time
    /// pass is separate from the per-request preparation pass; both runs
    /// exist deliberately.
    disallowed_formats: Vec<String>,
}

fn to_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>, disallowed_formats: Vec<String>) -> Self {
        Self {
            root: root.into(),
            disallowed_formats,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Joins a stored relative path onto the root. The only place absolute
    /// paths are constructed.
    pub fn absolute(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    fn write_normalized(&self, path: &Path, bytes: &[u8]) -> Result<(), AppError> {
        let normalized = images::normalize_encoding(bytes, &self.disallowed_formats)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| AppError::io("Failed to create storage directory", e))?;
        }
        fs::write(path, normalized).map_err(|e| AppError::io("Failed to write image file", e))
    }

    /// Persists an uploaded user photo and returns its root-relative path.
    pub fn save_user_photo(&self, user_id: i64, bytes: &[u8]) -> Result<String, AppError> {
        let filename = format!("{}_user.jpg", Utc::now().timestamp());
        let path = self.root.join("users").join(user_id.to_string()).join("photos").join(filename);
        self.write_normalized(&path, bytes)?;
        Ok(to_relative(&path, &self.root))
    }

    /// Persists a product source image and returns its root-relative path.
    pub fn save_product_photo(&self, product_id: i64, bytes: &[u8]) -> Result<String, AppError> {
        let filename = format!("{}_product.jpg", Utc::now().timestamp());
        let path = self.root.join("products").join(product_id.to_string()).join(filename);
        self.write_normalized(&path, bytes)?;
        Ok(to_relative(&path, &self.root))
    }

    /// Persists a generated result image (already PNG-encoded by the
    /// orchestrator) and returns its root-relative path.
    pub fn save_result_image(&self, session_id: i64, bytes: &[u8]) -> Result<String, AppError> {
        let path = self.root.join("results").join(session_id.to_string()).join("output.png");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| AppError::io("Failed to create storage directory", e))?;
        }
        fs::write(&path, bytes).map_err(|e| AppError::io("Failed to write result image", e))?;
        Ok(to_relative(&path, &self.root))
    }

    /// Most recently written photo for a user, by file modification time
    /// with filename as tie-break. Filesystem timestamps are not monotonic
    /// everywhere; this mirrors the observed selection rule rather than
    /// guaranteeing an ordering.
    pub fn latest_user_photo(&self, user_id: i64) -> Result<Option<String>, AppError> {
        let photos_dir = self.root.join("users").join(user_id.to_string()).join("photos");
        if !photos_dir.is_dir() {
            return Ok(None);
        }

        let mut candidates: Vec<(std::time::SystemTime, String, PathBuf)> = Vec::new();
        for entry in fs::read_dir(&photos_dir).map_err(|e| AppError::io("Failed to read photos directory", e))? {
            let entry = entry.map_err(|e| AppError::io("Failed to read photos directory entry", e))?;
            let path = entry.path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != "jpg") {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            let name = entry.file_name().to_string_lossy().into_owned();
            candidates.push((modified, name, path));
        }

        candidates.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
        Ok(candidates.first().map(|(_, _, path)| to_relative(path, &self.root)))
    }

    /// True when the stored relative path still points at a file.
    pub fn exists(&self, relative: &str) -> bool {
        self.absolute(relative).is_file()
    }
}
