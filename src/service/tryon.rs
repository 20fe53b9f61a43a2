//! Sequences persistence around a generation attempt. The session row is
//! committed before the external call so a failed attempt is never lost;
//! everything that goes wrong after that point collapses to a response
//! with an empty output reference, leaving the row pending.

use crate::config::ImageConfig;
use crate::database::product::ProductRepository;
use crate::database::session::SessionRepository;
use crate::database::user::UserRepository;
use crate::error::app_error::AppError;
use crate::images;
use crate::models::product::Product;
use crate::models::session::{TryOnResponse, TryOnSession};
use crate::service::gemini::Generator;
use crate::storage::Storage;
use crate::STATIC_MOUNT;
use std::fs;
use tracing::{info, warn};

pub struct TryOnService<'a, R, G> {
    repository: &'a R,
    storage: &'a Storage,
    generator: &'a G,
    image_config: &'a ImageConfig,
    disallowed_formats: &'a [String],
}

impl<'a, R, G> TryOnService<'a, R, G>
where
    R: UserRepository + ProductRepository + SessionRepository + Sync,
    G: Generator,
{
    pub fn new(
        repository: &'a R,
        storage: &'a Storage,
        generator: &'a G,
        image_config: &'a ImageConfig,
        disallowed_formats: &'a [String],
    ) -> Self {
        Self {
            repository,
            storage,
            generator,
            image_config,
            disallowed_formats,
        }
    }

    pub async fn request_try_on(&self, user_id: i64, product_id: i64) -> Result<TryOnResponse, AppError> {
        let user = self
            .repository
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let product = self
            .repository
            .get_product_by_id(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

        // Resolved before the session row exists: a user with no photos
        // produces no session at all.
        let user_photo = self.storage.latest_user_photo(user.id)?.ok_or(AppError::NoUserPhoto)?;

        let session = self
            .repository
            .create_session(user.id, product.id, &user_photo, &product.filepath)
            .await?;
        info!(session_id = session.id, user_id, product_id, "try-on session created");

        match self.generate_and_store(&session, &user_photo, &product).await {
            Ok(output_path) => Ok(TryOnResponse {
                session_id: session.id,
                output_image_url: format!("{STATIC_MOUNT}/{output_path}"),
                created_at: session.created_at,
            }),
            Err(e) => {
                // Best-effort policy: the session row stays pending and the
                // caller gets an empty output reference, not an error.
                warn!(session_id = session.id, error = ?e, "try-on generation failed");
                Ok(TryOnResponse {
                    session_id: session.id,
                    output_image_url: String::new(),
                    created_at: session.created_at,
                })
            }
        }
    }

    async fn generate_and_store(
        &self,
        session: &TryOnSession,
        user_photo: &str,
        product: &Product,
    ) -> Result<String, AppError> {
        let user_bytes = fs::read(self.storage.absolute(user_photo))
            .map_err(|e| AppError::io("Failed to read user photo", e))?;
        let product_bytes = fs::read(self.storage.absolute(&product.filepath))
            .map_err(|e| AppError::io("Failed to read product photo", e))?;

        let user_jpeg = images::prepare_for_generation(&user_bytes, self.image_config, self.disallowed_formats)?;
        let product_jpeg = images::prepare_for_generation(&product_bytes, self.image_config, self.disallowed_formats)?;

        let result = self.generator.generate(&user_jpeg, &product_jpeg, &product.name).await;

        let output_path = self.storage.save_result_image(session.id, &result)?;
        self.repository.set_output_path(session.id, &output_path).await?;
        info!(session_id = session.id, output_path, "try-on session completed");

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageConfig;
    use crate::database::sqlite_repository::SqliteRepository;
    use crate::test_utils::{memory_repository, sample_png, StubGenerator};

    struct Fixture {
        _dir: tempfile::TempDir,
        repo: SqliteRepository,
        storage: Storage,
        image_config: ImageConfig,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path(), vec!["bmp".to_string()]);
        Fixture {
            _dir: dir,
            repo: memory_repository().await,
            storage,
            image_config: ImageConfig::default(),
        }
    }

    impl Fixture {
        fn service<'a, G: Generator>(&'a self, generator: &'a G) -> TryOnService<'a, SqliteRepository, G> {
            TryOnService::new(&self.repo, &self.storage, generator, &self.image_config, &[])
        }

        async fn seed_user_with_photo(&self) -> i64 {
            let user = self.repo.create_user(Some("Alice")).await.unwrap();
            self.storage.save_user_photo(user.id, &sample_png()).unwrap();
            user.id
        }

        async fn seed_product(&self) -> i64 {
            let product = self.repo.create_product("Red Hoodie").await.unwrap();
            let path = self.storage.save_product_photo(product.id, &sample_png()).unwrap();
            self.repo.set_product_filepath(product.id, &path).await.unwrap();
            product.id
        }
    }

    #[tokio::test]
    async fn successful_generation_completes_the_session() {
        let fx = fixture().await;
        let user_id = fx.seed_user_with_photo().await;
        let product_id = fx.seed_product().await;
        let generator = StubGenerator::succeeding();

        let response = fx.service(&generator).request_try_on(user_id, product_id).await.unwrap();

        let expected_path = format!("results/{}/output.png", response.session_id);
        assert_eq!(response.output_image_url, format!("/static/{expected_path}"));
        assert!(fx.storage.exists(&expected_path));

        let session = fx.repo.get_session_by_id(response.session_id).await.unwrap().unwrap();
        assert_eq!(session.output_image_path.as_deref(), Some(expected_path.as_str()));
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.product_id, product_id);
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let fx = fixture().await;
        let product_id = fx.seed_product().await;
        let generator = StubGenerator::succeeding();

        let err = fx.service(&generator).request_try_on(999, product_id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn user_without_photos_creates_no_session() {
        let fx = fixture().await;
        let user = fx.repo.create_user(None).await.unwrap();
        let product_id = fx.seed_product().await;
        let generator = StubGenerator::succeeding();

        let err = fx.service(&generator).request_try_on(user.id, product_id).await.unwrap_err();
        assert!(matches!(err, AppError::NoUserPhoto));
        assert!(fx.repo.get_session_by_id(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_generation_leaves_session_pending() {
        let fx = fixture().await;
        let user_id = fx.seed_user_with_photo().await;
        // Product row whose file never made it to disk: preparation fails
        // after the session row exists.
        let product = fx.repo.create_product("Ghost Jacket").await.unwrap();
        let product = fx
            .repo
            .set_product_filepath(product.id, "products/404/1_product.jpg")
            .await
            .unwrap();
        let generator = StubGenerator::succeeding();

        let response = fx.service(&generator).request_try_on(user_id, product.id).await.unwrap();
        assert!(response.output_image_url.is_empty());

        let session = fx.repo.get_session_by_id(response.session_id).await.unwrap().unwrap();
        assert!(session.output_image_path.is_none());
    }

    #[tokio::test]
    async fn placeholder_results_still_complete_the_session() {
        let fx = fixture().await;
        let user_id = fx.seed_user_with_photo().await;
        let product_id = fx.seed_product().await;
        // A generator that always falls back to its placeholder output.
        let generator = StubGenerator::placeholder_only();

        let response = fx.service(&generator).request_try_on(user_id, product_id).await.unwrap();
        assert!(!response.output_image_url.is_empty());

        let session = fx.repo.get_session_by_id(response.session_id).await.unwrap().unwrap();
        let stored = std::fs::read(fx.storage.absolute(session.output_image_path.as_deref().unwrap())).unwrap();
        assert_eq!(image::guess_format(&stored).unwrap(), image::ImageFormat::Png);
    }
}
