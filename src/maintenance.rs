//! Database maintenance operations behind the `dbtool` binary. Every
//! destructive operation snapshots the database file first; the backup
//! path is returned so the operator can roll back by copying it over.

use crate::config::Config;
use crate::database::maintenance as queries;
use crate::db;
use crate::error::app_error::AppError;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::info;

pub use crate::database::maintenance::{DbStats, FileCheckReport, OrphanedSession, PrefixFixReport};

/// Prefix stored by early releases that kept storage-root-absolute paths
/// in the database. `dbtool fix` strips it.
pub const LEGACY_PATH_PREFIX: &str = "storage/";

async fn open_pool(config: &Config) -> Result<SqlitePool, AppError> {
    let pool = db::init_pool(&config.database)
        .await
        .map_err(|e| AppError::db("Failed to open database", e))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| AppError::db("Failed to run migrations", sqlx::Error::Migrate(Box::new(e))))?;
    Ok(pool)
}

fn backup_path(db_path: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let mut name = db_path.as_os_str().to_os_string();
    name.push(format!(".backup_{stamp}"));
    PathBuf::from(name)
}

/// Copies the database file aside. Returns `None` when there is nothing
/// to back up yet.
pub fn backup_database(config: &Config) -> Result<Option<PathBuf>, AppError> {
    let db_path = Path::new(&config.database.path);
    if !db_path.is_file() {
        return Ok(None);
    }

    let target = backup_path(db_path);
    std::fs::copy(db_path, &target).map_err(|e| AppError::io("Failed to back up database", e))?;
    info!(backup = %target.display(), "database backed up");
    Ok(Some(target))
}

/// Backs up and deletes the database file, then recreates an empty schema.
/// Stored images are left on disk untouched.
pub async fn reset_database(config: &Config) -> Result<Option<PathBuf>, AppError> {
    let backup = backup_database(config)?;

    let db_path = Path::new(&config.database.path);
    for path in [
        db_path.to_path_buf(),
        PathBuf::from(format!("{}-wal", config.database.path)),
        PathBuf::from(format!("{}-shm", config.database.path)),
    ] {
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| AppError::io("Failed to remove database file", e))?;
        }
    }

    let pool = open_pool(config).await?;
    pool.close().await;
    info!("database reset to an empty schema");
    Ok(backup)
}

/// Strips [`LEGACY_PATH_PREFIX`] from every stored path.
pub async fn fix_path_prefixes(config: &Config) -> Result<(Option<PathBuf>, PrefixFixReport), AppError> {
    let backup = backup_database(config)?;
    let pool = open_pool(config).await?;
    let report = queries::strip_legacy_prefix(&pool, LEGACY_PATH_PREFIX).await?;
    pool.close().await;
    Ok((backup, report))
}

/// Deletes sessions whose user or product row is gone.
pub async fn clean_orphans(config: &Config) -> Result<(Option<PathBuf>, Vec<OrphanedSession>), AppError> {
    let backup = backup_database(config)?;
    let pool = open_pool(config).await?;
    let pruned = queries::prune_orphaned_sessions(&pool).await?;
    pool.close().await;
    Ok((backup, pruned))
}

pub async fn stats(config: &Config) -> Result<DbStats, AppError> {
    let pool = open_pool(config).await?;
    let stats = queries::collect_stats(&pool).await?;
    pool.close().await;
    Ok(stats)
}

/// Reports database paths whose files are missing under the storage root.
pub async fn verify_files(config: &Config) -> Result<FileCheckReport, AppError> {
    let pool = open_pool(config).await?;
    let report = queries::verify_file_paths(&pool, Path::new(&config.storage.root)).await?;
    pool.close().await;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.database.path = dir.join("tool.db").to_string_lossy().into_owned();
        config.storage.root = dir.join("storage").to_string_lossy().into_owned();
        config
    }

    #[tokio::test]
    async fn backup_of_missing_database_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let config = file_config(dir.path());
        assert!(backup_database(&config).unwrap().is_none());
    }

    #[tokio::test]
    async fn reset_backs_up_and_recreates_the_schema() {
        let dir = tempfile::tempdir().unwrap();
        let config = file_config(dir.path());

        // Seed a database with one user.
        let pool = open_pool(&config).await.unwrap();
        sqlx::query("INSERT INTO users (name, created_at) VALUES ('Alice', '2026-01-01T00:00:00Z')")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        let backup = reset_database(&config).await.unwrap().expect("backup created");
        assert!(backup.is_file());

        let fresh = stats(&config).await.unwrap();
        assert_eq!(fresh.users, 0);
        assert_eq!(fresh.sessions, 0);
    }

    #[tokio::test]
    async fn fix_reports_rewritten_rows() {
        let dir = tempfile::tempdir().unwrap();
        let config = file_config(dir.path());

        let pool = open_pool(&config).await.unwrap();
        sqlx::query(
            "INSERT INTO products (name, filepath, created_at) VALUES ('Hoodie', 'storage/products/1/1_product.jpg', '2026-01-01T00:00:00Z')",
        )
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;

        let (_backup, report) = fix_path_prefixes(&config).await.unwrap();
        assert_eq!(report.products_updated, 1);
        assert_eq!(report.sessions_updated, 0);

        let pool = open_pool(&config).await.unwrap();
        let (filepath,): (String,) = sqlx::query_as("SELECT filepath FROM products")
            .fetch_one(&pool)
            .await
            .unwrap();
        pool.close().await;
        assert_eq!(filepath, "products/1/1_product.jpg");
    }
}
