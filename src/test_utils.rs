use crate::database::sqlite_repository::SqliteRepository;
use crate::images;
use crate::images::placeholder;
use crate::service::gemini::Generator;
use image::{DynamicImage, Rgb, RgbImage};
use sqlx::SqlitePool;

/// Fresh in-memory database with the full schema applied.
pub async fn memory_repository() -> SqliteRepository {
    let pool = SqlitePool::connect("sqlite::memory:").await.expect("in-memory pool");
    crate::db::run_migrations(&pool).await.expect("migrations apply");
    SqliteRepository::new(pool)
}

pub fn sample_png() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([120, 80, 40])));
    images::encode_png(&img).expect("encode sample png")
}

pub fn sample_jpeg() -> Vec<u8> {
    let img = RgbImage::from_pixel(64, 64, Rgb([40, 80, 120]));
    images::encode_jpeg(&img, 90).expect("encode sample jpeg")
}

/// Deterministic generator double: either a fixed PNG "composite" or the
/// placeholder fallback path, no network involved.
pub struct StubGenerator {
    succeed: bool,
}

impl StubGenerator {
    pub fn succeeding() -> Self {
        Self { succeed: true }
    }

    pub fn placeholder_only() -> Self {
        Self { succeed: false }
    }
}

#[async_trait::async_trait]
impl Generator for StubGenerator {
    async fn generate(&self, _user_jpeg: &[u8], _product_jpeg: &[u8], product_name: &str) -> Vec<u8> {
        if self.succeed {
            sample_png()
        } else {
            placeholder::error_image(&format!("Virtual try-on generation failed for {product_name}"))
        }
    }

    async fn health_check(&self) -> bool {
        self.succeed
    }
}

/// Builds a `multipart/form-data` body for local Rocket client tests.
pub fn multipart_body(boundary: &str, fields: &[(&str, &[u8], Option<&str>)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value, content_type) in fields {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        match content_type {
            Some(ct) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"upload\"\r\nContent-Type: {ct}\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes()),
        }
        body.extend_from_slice(value);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}
