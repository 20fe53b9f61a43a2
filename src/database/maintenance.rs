//! Offline maintenance queries used by the `dbtool` binary. None of this
//! runs on the live request path; orphaned rows and stale paths are only
//! ever touched here.

use crate::error::app_error::AppError;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::Path;

#[derive(Debug, Default)]
pub struct DbStats {
    pub users: i64,
    pub products: i64,
    pub sessions: i64,
    pub completed_sessions: i64,
    pub failed_sessions: i64,
    pub last_user_at: Option<DateTime<Utc>>,
    pub last_product_at: Option<DateTime<Utc>>,
    pub last_session_at: Option<DateTime<Utc>>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct OrphanedSession {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
}

#[derive(Debug, Default)]
pub struct PrefixFixReport {
    pub products_updated: u64,
    pub sessions_updated: u64,
}

#[derive(Debug, Default)]
pub struct FileCheckReport {
    pub products_checked: usize,
    pub sessions_checked: usize,
    /// (product id, name, filepath) for product images missing on disk.
    pub missing_product_files: Vec<(i64, String, String)>,
    /// (session id, path) for session input/output files missing on disk.
    pub missing_session_files: Vec<(i64, String)>,
}

async fn count(pool: &SqlitePool, sql: &str) -> Result<i64, AppError> {
    let (n,): (i64,) = sqlx::query_as(sql).fetch_one(pool).await?;
    Ok(n)
}

async fn latest(pool: &SqlitePool, table: &str) -> Result<Option<DateTime<Utc>>, AppError> {
    let sql = format!("SELECT created_at FROM {table} ORDER BY created_at DESC LIMIT 1");
    let row: Option<(DateTime<Utc>,)> = sqlx::query_as(&sql).fetch_optional(pool).await?;
    Ok(row.map(|(at,)| at))
}

pub async fn collect_stats(pool: &SqlitePool) -> Result<DbStats, AppError> {
    let users = count(pool, "SELECT COUNT(*) FROM users").await?;
    let products = count(pool, "SELECT COUNT(*) FROM products").await?;
    let sessions = count(pool, "SELECT COUNT(*) FROM tryon_sessions").await?;
    let completed_sessions = count(
        pool,
        "SELECT COUNT(*) FROM tryon_sessions WHERE output_image_path IS NOT NULL",
    )
    .await?;

    Ok(DbStats {
        users,
        products,
        sessions,
        completed_sessions,
        failed_sessions: sessions - completed_sessions,
        last_user_at: latest(pool, "users").await?,
        last_product_at: latest(pool, "products").await?,
        last_session_at: latest(pool, "tryon_sessions").await?,
    })
}

/// Finds session rows whose user or product no longer exists. Referential
/// integrity is not enforced by the schema, so out-of-band deletions leave
/// these behind.
pub async fn find_orphaned_sessions(pool: &SqlitePool) -> Result<Vec<OrphanedSession>, AppError> {
    let orphans = sqlx::query_as::<_, OrphanedSession>(
        r#"
        SELECT ts.id, ts.user_id, ts.product_id
        FROM tryon_sessions ts
        LEFT JOIN users u ON ts.user_id = u.id
        LEFT JOIN products p ON ts.product_id = p.id
        WHERE u.id IS NULL OR p.id IS NULL
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(orphans)
}

/// Deletes exactly the orphaned sessions and returns what was removed.
pub async fn prune_orphaned_sessions(pool: &SqlitePool) -> Result<Vec<OrphanedSession>, AppError> {
    let orphans = find_orphaned_sessions(pool).await?;
    if orphans.is_empty() {
        return Ok(orphans);
    }

    sqlx::query(
        r#"
        DELETE FROM tryon_sessions
        WHERE id IN (
            SELECT ts.id
            FROM tryon_sessions ts
            LEFT JOIN users u ON ts.user_id = u.id
            LEFT JOIN products p ON ts.product_id = p.id
            WHERE u.id IS NULL OR p.id IS NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(orphans)
}

/// Strips a legacy path prefix (historically `storage/`) from every stored
/// path, migrating rows written before paths became storage-root relative.
pub async fn strip_legacy_prefix(pool: &SqlitePool, prefix: &str) -> Result<PrefixFixReport, AppError> {
    let products = sqlx::query(
        r#"
        UPDATE products
        SET filepath = substr(filepath, length($1) + 1)
        WHERE filepath LIKE $1 || '%'
        "#,
    )
    .bind(prefix)
    .execute(pool)
    .await?;

    let sessions = sqlx::query(
        r#"
        UPDATE tryon_sessions
        SET input_user_photo_path = CASE
                WHEN input_user_photo_path LIKE $1 || '%'
                THEN substr(input_user_photo_path, length($1) + 1)
                ELSE input_user_photo_path END,
            input_product_photo_path = CASE
                WHEN input_product_photo_path LIKE $1 || '%'
                THEN substr(input_product_photo_path, length($1) + 1)
                ELSE input_product_photo_path END,
            output_image_path = CASE
                WHEN output_image_path LIKE $1 || '%'
                THEN substr(output_image_path, length($1) + 1)
                ELSE output_image_path END
        WHERE input_user_photo_path LIKE $1 || '%'
           OR input_product_photo_path LIKE $1 || '%'
           OR (output_image_path IS NOT NULL AND output_image_path LIKE $1 || '%')
        "#,
    )
    .bind(prefix)
    .execute(pool)
    .await?;

    Ok(PrefixFixReport {
        products_updated: products.rows_affected(),
        sessions_updated: sessions.rows_affected(),
    })
}

/// Cross-checks every stored path against the filesystem under
/// `storage_root` and reports the ones that are missing.
pub async fn verify_file_paths(pool: &SqlitePool, storage_root: &Path) -> Result<FileCheckReport, AppError> {
    let mut report = FileCheckReport::default();

    let products: Vec<(i64, String, String)> =
        sqlx::query_as("SELECT id, name, filepath FROM products").fetch_all(pool).await?;
    report.products_checked = products.len();
    for (id, name, filepath) in products {
        if !filepath.is_empty() && !storage_root.join(&filepath).is_file() {
            report.missing_product_files.push((id, name, filepath));
        }
    }

    let sessions: Vec<(i64, String, String, Option<String>)> = sqlx::query_as(
        "SELECT id, input_user_photo_path, input_product_photo_path, output_image_path FROM tryon_sessions",
    )
    .fetch_all(pool)
    .await?;
    report.sessions_checked = sessions.len();
    for (id, user_path, product_path, output_path) in sessions {
        for path in [user_path, product_path] {
            if !storage_root.join(&path).is_file() {
                report.missing_session_files.push((id, path));
            }
        }
        if let Some(output) = output_path {
            if !storage_root.join(&output).is_file() {
                report.missing_session_files.push((id, output));
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::product::ProductRepository;
    use crate::database::session::SessionRepository;
    use crate::database::user::UserRepository;
    use crate::test_utils::memory_repository;

    #[tokio::test]
    async fn stats_count_completed_and_failed() {
        let repo = memory_repository().await;
        let user = repo.create_user(Some("Alice")).await.unwrap();
        let product = repo.create_product("Hoodie").await.unwrap();

        let done = repo.create_session(user.id, product.id, "a.jpg", "b.jpg").await.unwrap();
        repo.set_output_path(done.id, "results/1/output.png").await.unwrap();
        repo.create_session(user.id, product.id, "a.jpg", "b.jpg").await.unwrap();

        let stats = collect_stats(&repo.pool).await.unwrap();
        assert_eq!(stats.users, 1);
        assert_eq!(stats.products, 1);
        assert_eq!(stats.sessions, 2);
        assert_eq!(stats.completed_sessions, 1);
        assert_eq!(stats.failed_sessions, 1);
        assert!(stats.last_session_at.is_some());
    }

    #[tokio::test]
    async fn prune_removes_exactly_the_orphans() {
        let repo = memory_repository().await;
        let user = repo.create_user(Some("Alice")).await.unwrap();
        let product = repo.create_product("Hoodie").await.unwrap();

        let kept = repo.create_session(user.id, product.id, "a.jpg", "b.jpg").await.unwrap();
        // References that never existed; the schema does not enforce them.
        let orphan_user = repo.create_session(777, product.id, "a.jpg", "b.jpg").await.unwrap();
        let orphan_product = repo.create_session(user.id, 888, "a.jpg", "b.jpg").await.unwrap();

        let pruned = prune_orphaned_sessions(&repo.pool).await.unwrap();
        let pruned_ids: Vec<i64> = pruned.iter().map(|o| o.id).collect();
        assert_eq!(pruned.len(), 2);
        assert!(pruned_ids.contains(&orphan_user.id));
        assert!(pruned_ids.contains(&orphan_product.id));

        assert!(repo.get_session_by_id(kept.id).await.unwrap().is_some());
        assert!(repo.get_session_by_id(orphan_user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn strip_prefix_rewrites_only_prefixed_paths() {
        let repo = memory_repository().await;
        let user = repo.create_user(None).await.unwrap();
        let product = repo.create_product("Hoodie").await.unwrap();
        repo.set_product_filepath(product.id, "storage/products/1/1_product.jpg").await.unwrap();

        let session = repo
            .create_session(user.id, product.id, "storage/users/1/photos/1_user.jpg", "products/1/1_product.jpg")
            .await
            .unwrap();

        let report = strip_legacy_prefix(&repo.pool, "storage/").await.unwrap();
        assert_eq!(report.products_updated, 1);
        assert_eq!(report.sessions_updated, 1);

        let product = repo.get_product_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(product.filepath, "products/1/1_product.jpg");
        let session = repo.get_session_by_id(session.id).await.unwrap().unwrap();
        assert_eq!(session.input_user_photo_path, "users/1/photos/1_user.jpg");
        // Untouched path stays as-is.
        assert_eq!(session.input_product_photo_path, "products/1/1_product.jpg");
    }

    #[tokio::test]
    async fn verify_reports_precisely_the_missing_files() {
        let repo = memory_repository().await;
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let user = repo.create_user(None).await.unwrap();
        let product = repo.create_product("Hoodie").await.unwrap();
        repo.set_product_filepath(product.id, "products/1/1_product.jpg").await.unwrap();
        std::fs::create_dir_all(root.join("products/1")).unwrap();
        std::fs::write(root.join("products/1/1_product.jpg"), b"jpg").unwrap();

        let session = repo
            .create_session(user.id, product.id, "users/1/photos/1_user.jpg", "products/1/1_product.jpg")
            .await
            .unwrap();
        repo.set_output_path(session.id, "results/1/output.png").await.unwrap();

        // Second session whose only gap is the product input image.
        let ghost = repo
            .create_session(user.id, product.id, "products/1/1_product.jpg", "products/9/ghost.jpg")
            .await
            .unwrap();

        let report = verify_file_paths(&repo.pool, root).await.unwrap();
        assert_eq!(report.products_checked, 1);
        assert_eq!(report.sessions_checked, 2);
        assert!(report.missing_product_files.is_empty());
        // Session one: input photo and output image are absent.
        // Session two: only the product input is absent.
        assert_eq!(report.missing_session_files.len(), 3);
        assert!(report
            .missing_session_files
            .contains(&(ghost.id, "products/9/ghost.jpg".to_string())));
    }
}
