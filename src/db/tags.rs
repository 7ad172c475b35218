use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub created_at: i64,
    pub updated_at: i64,
}

fn row_to_tag(r: &SqliteRow) -> TagRecord {
    TagRecord {
        id: r.get("id"),
        name: r.get("name"),
        color: r.get("color"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

pub async fn list_tags(pool: &SqlitePool) -> Result<Vec<TagRecord>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id, name, color, created_at, updated_at FROM tags ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(row_to_tag).collect())
}

pub async fn get_tag(pool: &SqlitePool, id: i64) -> Result<Option<TagRecord>, sqlx::Error> {
    let row = sqlx::query("SELECT id, name, color, created_at, updated_at FROM tags WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(row_to_tag))
}

pub async fn find_tag_by_name(
    pool: &SqlitePool,
    name: &str,
) -> Result<Option<TagRecord>, sqlx::Error> {
    let row =
        sqlx::query("SELECT id, name, color, created_at, updated_at FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(pool)
            .await?;
    Ok(row.as_ref().map(row_to_tag))
}

pub async fn insert_tag(pool: &SqlitePool, name: &str, color: &str) -> Result<i64, sqlx::Error> {
    let res = sqlx::query("INSERT INTO tags (name, color) VALUES (?, ?)")
        .bind(name)
        .bind(color)
        .execute(pool)
        .await?;
    Ok(res.last_insert_rowid())
}

/// Returns false when the tag does not exist.
pub async fn update_tag(
    pool: &SqlitePool,
    id: i64,
    name: &str,
    color: &str,
) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE tags SET name = ?, color = ?, updated_at = strftime('%s','now') WHERE id = ?",
    )
    .bind(name)
    .bind(color)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected() > 0)
}

/// Remove the tag for good: associations first, then the row itself.
pub async fn delete_tag(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM video_tags WHERE tag_id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Idempotent — re-tagging an already-tagged video is a no-op.
pub async fn add_association(
    pool: &SqlitePool,
    video_id: i64,
    tag_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO video_tags (video_id, tag_id) VALUES (?, ?)")
        .bind(video_id)
        .bind(tag_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn remove_association(
    pool: &SqlitePool,
    video_id: i64,
    tag_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM video_tags WHERE video_id = ? AND tag_id = ?")
        .bind(video_id)
        .bind(tag_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::local::open_test_pool;
    use crate::db::videos::tests::insert_video_row;

    #[tokio::test]
    async fn tags_list_in_name_order() {
        let pool = open_test_pool().await;
        insert_tag(&pool, "zebra", "#000").await.unwrap();
        insert_tag(&pool, "apple", "#fff").await.unwrap();

        let names: Vec<String> = list_tags(&pool).await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["apple", "zebra"]);
    }

    #[tokio::test]
    async fn duplicate_tag_name_violates_unique() {
        let pool = open_test_pool().await;
        insert_tag(&pool, "sport", "#fff").await.unwrap();
        let err = insert_tag(&pool, "sport", "#000").await.unwrap_err();
        assert!(crate::db::is_unique_violation(&err));
    }

    #[tokio::test]
    async fn delete_clears_associations_first() {
        let pool = open_test_pool().await;
        let video = insert_video_row(&pool, "a.mp4", "/v/a.mp4", 1, 0, 0).await;
        let tag = insert_tag(&pool, "sport", "#fff").await.unwrap();
        add_association(&pool, video, tag).await.unwrap();

        delete_tag(&pool, tag).await.unwrap();

        assert!(get_tag(&pool, tag).await.unwrap().is_none());
        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM video_tags WHERE tag_id = ?")
            .bind(tag)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(links, 0);

        // name is reusable after a hard delete
        insert_tag(&pool, "sport", "#0f0").await.unwrap();
    }

    #[tokio::test]
    async fn association_add_is_idempotent() {
        let pool = open_test_pool().await;
        let video = insert_video_row(&pool, "a.mp4", "/v/a.mp4", 1, 0, 0).await;
        let tag = insert_tag(&pool, "sport", "#fff").await.unwrap();

        add_association(&pool, video, tag).await.unwrap();
        add_association(&pool, video, tag).await.unwrap();

        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM video_tags WHERE video_id = ?")
            .bind(video)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(links, 1);

        remove_association(&pool, video, tag).await.unwrap();
        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM video_tags WHERE video_id = ?")
            .bind(video)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(links, 0);
    }
}
