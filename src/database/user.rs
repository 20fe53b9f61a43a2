use crate::database::sqlite_repository::SqliteRepository;
use crate::error::app_error::AppError;
use crate::models::user::User;
use chrono::Utc;

#[async_trait::async_trait]
pub trait UserRepository {
    async fn create_user(&self, name: Option<&str>) -> Result<User, AppError>;
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, AppError>;
}

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn create_user(&self, name: Option<&str>) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, created_at)
            VALUES ($1, $2)
            RETURNING id, name, created_at
            "#,
        )
        .bind(name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::memory_repository;

    #[tokio::test]
    async fn create_and_fetch_user() {
        let repo = memory_repository().await;

        let user = repo.create_user(Some("Alice")).await.expect("create user");
        assert!(user.id >= 1);
        assert_eq!(user.name.as_deref(), Some("Alice"));

        let fetched = repo.get_user_by_id(user.id).await.expect("fetch user");
        assert_eq!(fetched.expect("user exists").id, user.id);
    }

    #[tokio::test]
    async fn anonymous_user_has_no_name() {
        let repo = memory_repository().await;
        let user = repo.create_user(None).await.expect("create user");
        assert!(user.name.is_none());
    }

    #[tokio::test]
    async fn missing_user_is_none() {
        let repo = memory_repository().await;
        assert!(repo.get_user_by_id(9999).await.expect("query ok").is_none());
    }
}
