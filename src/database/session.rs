use crate::database::sqlite_repository::SqliteRepository;
use crate::error::app_error::AppError;
use crate::models::session::TryOnSession;
use chrono::Utc;

#[async_trait::async_trait]
pub trait SessionRepository {
    /// Creates the session in its pending state (no output path). The row
    /// exists before generation is attempted so a failed attempt is never
    /// silently lost.
    async fn create_session(
        &self,
        user_id: i64,
        product_id: i64,
        input_user_photo_path: &str,
        input_product_photo_path: &str,
    ) -> Result<TryOnSession, AppError>;

    async fn set_output_path(&self, id: i64, output_image_path: &str) -> Result<TryOnSession, AppError>;
    async fn get_session_by_id(&self, id: i64) -> Result<Option<TryOnSession>, AppError>;
}

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn create_session(
        &self,
        user_id: i64,
        product_id: i64,
        input_user_photo_path: &str,
        input_product_photo_path: &str,
    ) -> Result<TryOnSession, AppError> {
        let session = sqlx::query_as::<_, TryOnSession>(
            r#"
            INSERT INTO tryon_sessions
                (user_id, product_id, input_user_photo_path, input_product_photo_path, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, product_id, input_user_photo_path,
                      input_product_photo_path, output_image_path, created_at
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(input_user_photo_path)
        .bind(input_product_photo_path)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    async fn set_output_path(&self, id: i64, output_image_path: &str) -> Result<TryOnSession, AppError> {
        let session = sqlx::query_as::<_, TryOnSession>(
            r#"
            UPDATE tryon_sessions
            SET output_image_path = $1
            WHERE id = $2
            RETURNING id, user_id, product_id, input_user_photo_path,
                      input_product_photo_path, output_image_path, created_at
            "#,
        )
        .bind(output_image_path)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    async fn get_session_by_id(&self, id: i64) -> Result<Option<TryOnSession>, AppError> {
        let session = sqlx::query_as::<_, TryOnSession>(
            r#"
            SELECT id, user_id, product_id, input_user_photo_path,
                   input_product_photo_path, output_image_path, created_at
            FROM tryon_sessions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }
}
