use crate::database::sqlite_repository::SqliteRepository;
use crate::error::app_error::AppError;
use crate::models::product::Product;
use chrono::Utc;

#[async_trait::async_trait]
pub trait ProductRepository {
    /// Inserts the product row first so the generated id can key the
    /// storage directory; the filepath is attached afterwards with
    /// [`ProductRepository::set_product_filepath`].
    async fn create_product(&self, name: &str) -> Result<Product, AppError>;
    async fn set_product_filepath(&self, id: i64, filepath: &str) -> Result<Product, AppError>;
    async fn get_product_by_id(&self, id: i64) -> Result<Option<Product>, AppError>;
    async fn list_products(&self) -> Result<Vec<Product>, AppError>;
}

#[async_trait::async_trait]
impl ProductRepository for SqliteRepository {
    async fn create_product(&self, name: &str) -> Result<Product, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, filepath, created_at)
            VALUES ($1, '', $2)
            RETURNING id, name, filepath, created_at
            "#,
        )
        .bind(name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(product)
    }

    async fn set_product_filepath(&self, id: i64, filepath: &str) -> Result<Product, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET filepath = $1
            WHERE id = $2
            RETURNING id, name, filepath, created_at
            "#,
        )
        .bind(filepath)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(product)
    }

    async fn get_product_by_id(&self, id: i64) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, filepath, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, filepath, created_at
            FROM products
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::memory_repository;

    #[tokio::test]
    async fn create_then_attach_filepath() {
        let repo = memory_repository().await;

        let product = repo.create_product("Red Hoodie").await.expect("create");
        assert!(product.filepath.is_empty());

        let path = format!("products/{}/1700000000_product.jpg", product.id);
        let updated = repo.set_product_filepath(product.id, &path).await.expect("update");
        assert_eq!(updated.filepath, path);

        let fetched = repo.get_product_by_id(product.id).await.expect("fetch").expect("exists");
        assert_eq!(fetched.filepath, path);
    }

    #[tokio::test]
    async fn ids_are_persistence_generated_and_distinct() {
        let repo = memory_repository().await;
        let a = repo.create_product("A").await.expect("create a");
        let b = repo.create_product("B").await.expect("create b");
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn list_products_returns_all() {
        let repo = memory_repository().await;
        repo.create_product("A").await.expect("create a");
        repo.create_product("B").await.expect("create b");
        let products = repo.list_products().await.expect("list");
        assert_eq!(products.len(), 2);
    }
}
