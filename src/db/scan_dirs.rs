use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// A directory the user registered for library scans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanDirectoryRecord {
    pub id: i64,
    pub path: String,
    pub alias: String,
    pub created_at: i64,
    pub updated_at: i64,
}

fn row_to_dir(r: &SqliteRow) -> ScanDirectoryRecord {
    ScanDirectoryRecord {
        id: r.get("id"),
        path: r.get("path"),
        alias: r.get("alias"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

pub async fn list_directories(pool: &SqlitePool) -> Result<Vec<ScanDirectoryRecord>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id, path, alias, created_at, updated_at FROM scan_directories \
         WHERE deleted_at IS NULL ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(row_to_dir).collect())
}

pub async fn get_directory(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<ScanDirectoryRecord>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT id, path, alias, created_at, updated_at FROM scan_directories \
         WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.as_ref().map(row_to_dir))
}

pub async fn insert_directory(
    pool: &SqlitePool,
    path: &str,
    alias: &str,
) -> Result<i64, sqlx::Error> {
    let res = sqlx::query("INSERT INTO scan_directories (path, alias) VALUES (?, ?)")
        .bind(path)
        .bind(alias)
        .execute(pool)
        .await?;
    Ok(res.last_insert_rowid())
}

/// Returns false when the directory record does not exist.
pub async fn update_directory(
    pool: &SqlitePool,
    id: i64,
    path: &str,
    alias: &str,
) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE scan_directories SET path = ?, alias = ?, updated_at = strftime('%s','now') \
         WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(path)
    .bind(alias)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn delete_directory(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE scan_directories SET deleted_at = strftime('%s','now') \
         WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::local::open_test_pool;

    #[tokio::test]
    async fn crud_round_trip() {
        let pool = open_test_pool().await;
        let id = insert_directory(&pool, "/media/videos", "main").await.unwrap();

        let dirs = list_directories(&pool).await.unwrap();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].path, "/media/videos");
        assert_eq!(dirs[0].alias, "main");

        assert!(update_directory(&pool, id, "/media/films", "films")
            .await
            .unwrap());
        assert_eq!(list_directories(&pool).await.unwrap()[0].path, "/media/films");

        delete_directory(&pool, id).await.unwrap();
        assert!(list_directories(&pool).await.unwrap().is_empty());
        assert!(!update_directory(&pool, id, "/x", "x").await.unwrap());
    }
}
