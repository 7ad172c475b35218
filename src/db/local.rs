use sqlx::sqlite::SqlitePool;
use sqlx::QueryBuilder;

use crate::error::Error;

/// Open (or create) the SQLite database at `db_path` and bring it to a
/// servable state: migrations, duplicate-path reconciliation, the active-path
/// unique index, and the default settings row — in that order, before any
/// caller sees the pool.
///
/// Every step is fatal on failure; serving queries over a store with an
/// unreconciled or un-indexed `videos` table is worse than not starting.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, Error> {
    let url = format!("sqlite:{db_path}?mode=rwc");
    let pool = SqlitePool::connect(&url)
        .await
        .map_err(|e| Error::Init(format!("open database {db_path}: {e}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| Error::Init(format!("run migrations: {e}")))?;
    reconcile_duplicate_videos(&pool)
        .await
        .map_err(|e| Error::Init(format!("reconcile duplicate videos: {e}")))?;
    ensure_video_path_unique_index(&pool)
        .await
        .map_err(|e| Error::Init(format!("create video path unique index: {e}")))?;
    crate::db::settings::seed_default_settings(&pool)
        .await
        .map_err(|e| Error::Init(format!("seed default settings: {e}")))?;

    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS videos (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            name              TEXT    NOT NULL,
            path              TEXT    NOT NULL,
            directory         TEXT    NOT NULL DEFAULT '',
            size              INTEGER NOT NULL DEFAULT 0,
            duration          REAL    NOT NULL DEFAULT 0,
            play_count        INTEGER NOT NULL DEFAULT 0,
            random_play_count INTEGER NOT NULL DEFAULT 0,
            last_played_at    INTEGER,
            created_at        INTEGER NOT NULL DEFAULT (strftime('%s','now')),
            updated_at        INTEGER NOT NULL DEFAULT (strftime('%s','now')),
            deleted_at        INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_videos_directory ON videos(directory);
        CREATE INDEX IF NOT EXISTS idx_videos_deleted_at ON videos(deleted_at);

        CREATE TABLE IF NOT EXISTS tags (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            name       TEXT    NOT NULL UNIQUE,
            color      TEXT    NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL DEFAULT (strftime('%s','now')),
            updated_at INTEGER NOT NULL DEFAULT (strftime('%s','now'))
        );

        CREATE TABLE IF NOT EXISTS video_tags (
            video_id INTEGER NOT NULL,
            tag_id   INTEGER NOT NULL,
            PRIMARY KEY (video_id, tag_id)
        );

        CREATE TABLE IF NOT EXISTS settings (
            id                    INTEGER PRIMARY KEY DEFAULT 1,
            confirm_before_delete INTEGER NOT NULL DEFAULT 1,
            delete_original_file  INTEGER NOT NULL DEFAULT 0,
            video_extensions      TEXT    NOT NULL DEFAULT '',
            play_weight           REAL    NOT NULL DEFAULT 2.0,
            auto_scan_on_startup  INTEGER NOT NULL DEFAULT 0,
            log_enabled           INTEGER NOT NULL DEFAULT 0,
            updated_at            INTEGER NOT NULL DEFAULT (strftime('%s','now'))
        );

        CREATE TABLE IF NOT EXISTS scan_directories (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            path       TEXT    NOT NULL,
            alias      TEXT    NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL DEFAULT (strftime('%s','now')),
            updated_at INTEGER NOT NULL DEFAULT (strftime('%s','now')),
            deleted_at INTEGER
        );
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Collapse active records sharing a path into one canonical record.
///
/// The record with the highest id wins (most recently created). Tag links
/// from the losers are unioned onto the winner, then the losers are removed
/// outright — not soft-deleted — so the unique index can be created next.
pub async fn reconcile_duplicate_videos(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let duplicates = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT path, MAX(id) AS keep_id
        FROM videos
        WHERE deleted_at IS NULL AND path <> ''
        GROUP BY path
        HAVING COUNT(*) > 1
        "#,
    )
    .fetch_all(pool)
    .await?;

    for (path, keep_id) in duplicates {
        let loser_ids: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM videos WHERE path = ? AND deleted_at IS NULL AND id <> ?",
        )
        .bind(&path)
        .bind(keep_id)
        .fetch_all(pool)
        .await?;
        if loser_ids.is_empty() {
            continue;
        }

        let mut qb =
            QueryBuilder::new("INSERT OR IGNORE INTO video_tags (video_id, tag_id) SELECT ");
        qb.push_bind(keep_id);
        qb.push(", tag_id FROM video_tags WHERE video_id IN (");
        push_id_list(&mut qb, &loser_ids);
        qb.push(")");
        qb.build().execute(pool).await?;

        let mut qb = QueryBuilder::new("DELETE FROM video_tags WHERE video_id IN (");
        push_id_list(&mut qb, &loser_ids);
        qb.push(")");
        qb.build().execute(pool).await?;

        let mut qb = QueryBuilder::new("DELETE FROM videos WHERE id IN (");
        push_id_list(&mut qb, &loser_ids);
        qb.push(")");
        qb.build().execute(pool).await?;

        log::info!(
            "reconciled {} duplicate record(s) for {path}, kept id {keep_id}",
            loser_ids.len()
        );
    }

    Ok(())
}

/// Uniqueness of `path` among active records, enforced by the store from here
/// on. Scoped to non-deleted rows so a soft-deleted record never blocks
/// re-registration of its path.
pub async fn ensure_video_path_unique_index(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_videos_path_active
        ON videos(path)
        WHERE deleted_at IS NULL AND path <> ''
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

fn push_id_list(qb: &mut QueryBuilder<'_, sqlx::Sqlite>, ids: &[i64]) {
    let mut sep = qb.separated(", ");
    for id in ids {
        sep.push_bind(*id);
    }
}

#[cfg(test)]
pub(crate) async fn open_test_pool() -> SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    // one connection, so every handle sees the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory database");
    run_migrations(&pool).await.expect("run migrations");
    reconcile_duplicate_videos(&pool).await.expect("reconcile");
    ensure_video_path_unique_index(&pool)
        .await
        .expect("unique index");
    crate::db::settings::seed_default_settings(&pool)
        .await
        .expect("seed settings");
    pool
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;
    use crate::db;

    async fn bare_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    async fn insert_raw(pool: &SqlitePool, path: &str, size: i64) -> i64 {
        sqlx::query("INSERT INTO videos (name, path, directory, size) VALUES (?, ?, '/v', ?)")
            .bind(path.rsplit('/').next().unwrap())
            .bind(path)
            .bind(size)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    #[tokio::test]
    async fn reconciliation_keeps_max_id_and_unions_tags() {
        let pool = bare_pool().await;

        let first = insert_raw(&pool, "/v/dup.mp4", 1).await;
        let second = insert_raw(&pool, "/v/dup.mp4", 2).await;

        let tag_a = db::tags::insert_tag(&pool, "a", "#f00").await.unwrap();
        let tag_b = db::tags::insert_tag(&pool, "b", "#0f0").await.unwrap();
        db::tags::add_association(&pool, first, tag_a).await.unwrap();
        db::tags::add_association(&pool, second, tag_b)
            .await
            .unwrap();

        reconcile_duplicate_videos(&pool).await.unwrap();
        ensure_video_path_unique_index(&pool).await.unwrap();

        let surviving: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM videos WHERE path = '/v/dup.mp4'")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(surviving, vec![second]);

        let mut tag_ids: Vec<i64> =
            sqlx::query_scalar("SELECT tag_id FROM video_tags WHERE video_id = ?")
                .bind(second)
                .fetch_all(&pool)
                .await
                .unwrap();
        tag_ids.sort_unstable();
        assert_eq!(tag_ids, vec![tag_a, tag_b]);

        // the loser's links are gone entirely
        let orphaned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM video_tags WHERE video_id = ?")
            .bind(first)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(orphaned, 0);
    }

    #[tokio::test]
    async fn unique_index_rejects_third_record_on_same_path() {
        let pool = bare_pool().await;
        insert_raw(&pool, "/v/dup.mp4", 1).await;
        insert_raw(&pool, "/v/dup.mp4", 2).await;

        reconcile_duplicate_videos(&pool).await.unwrap();
        ensure_video_path_unique_index(&pool).await.unwrap();

        let err = sqlx::query(
            "INSERT INTO videos (name, path, directory, size) VALUES ('dup.mp4', '/v/dup.mp4', '/v', 3)",
        )
        .execute(&pool)
        .await
        .unwrap_err();
        assert!(db::is_unique_violation(&err));
    }

    #[tokio::test]
    async fn soft_deleted_path_does_not_block_reregistration() {
        let pool = open_test_pool().await;
        let id = insert_raw(&pool, "/v/a.mp4", 1).await;
        sqlx::query("UPDATE videos SET deleted_at = strftime('%s','now') WHERE id = ?")
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();

        // same path again — the partial index only covers active rows
        insert_raw(&pool, "/v/a.mp4", 2).await;
    }

    #[tokio::test]
    async fn reconciliation_is_idempotent() {
        let pool = bare_pool().await;
        insert_raw(&pool, "/v/dup.mp4", 1).await;
        insert_raw(&pool, "/v/dup.mp4", 2).await;

        reconcile_duplicate_videos(&pool).await.unwrap();
        reconcile_duplicate_videos(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM videos")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
