use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::db::tags::TagRecord;
use crate::ranking::cursor::PageCursor;
use crate::ranking::sampler::PlayProjection;
use crate::ranking::score::ScoreExpr;

/// A library entry. Timestamps are unix seconds; `deleted_at` marks soft
/// deletion and is never serialized out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub directory: String,
    pub size: i64,
    pub duration: f64,
    pub play_count: i64,
    pub random_play_count: i64,
    pub last_played_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(skip)]
    pub deleted_at: Option<i64>,
    pub tags: Vec<TagRecord>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PageFilter<'a> {
    /// Case-insensitive substring match on `name`; blank means no filter.
    pub keyword: Option<&'a str>,
    /// AND semantics: a record matches only if it carries every one of these.
    pub tag_ids: &'a [i64],
}

pub struct NewVideo<'a> {
    pub name: &'a str,
    pub path: &'a str,
    pub directory: &'a str,
    pub size: i64,
}

const VIDEO_COLUMNS: &str = "videos.id, videos.name, videos.path, videos.directory, videos.size, \
     videos.duration, videos.play_count, videos.random_play_count, videos.last_played_at, \
     videos.created_at, videos.updated_at, videos.deleted_at";

fn row_to_video(r: &SqliteRow) -> VideoRecord {
    VideoRecord {
        id: r.get("id"),
        name: r.get("name"),
        path: r.get("path"),
        directory: r.get("directory"),
        size: r.get("size"),
        duration: r.get("duration"),
        play_count: r.get("play_count"),
        random_play_count: r.get("random_play_count"),
        last_played_at: r.get("last_played_at"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
        deleted_at: r.get("deleted_at"),
        tags: Vec::new(),
    }
}

/// One page of active records in `(score ASC, size DESC, id DESC)` order,
/// filtered and resumed in a single statement — the store does the ordering,
/// nothing is re-sorted in memory.
///
/// `limit` is passed through; callers own supplying a sane positive bound.
pub async fn query_page(
    pool: &SqlitePool,
    filter: &PageFilter<'_>,
    cursor: &PageCursor,
    limit: i64,
) -> Result<Vec<VideoRecord>, sqlx::Error> {
    let raw_weight = crate::db::settings::play_weight(pool).await?;
    let expr = ScoreExpr::new(raw_weight);

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {VIDEO_COLUMNS} FROM videos"));

    let with_tags = !filter.tag_ids.is_empty();
    if with_tags {
        qb.push(" JOIN video_tags ON video_tags.video_id = videos.id");
    }

    qb.push(" WHERE videos.deleted_at IS NULL");

    if let Some(keyword) = filter.keyword.map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND videos.name LIKE ");
        qb.push_bind(format!("%{keyword}%"));
    }

    if with_tags {
        qb.push(" AND video_tags.tag_id IN (");
        let mut sep = qb.separated(", ");
        for id in filter.tag_ids {
            sep.push_bind(*id);
        }
        qb.push(")");
    }

    if cursor.is_set() {
        cursor.push_after_predicate(&expr, &mut qb);
    }

    if with_tags {
        qb.push(" GROUP BY videos.id HAVING COUNT(DISTINCT video_tags.tag_id) = ");
        qb.push_bind(filter.tag_ids.len() as i64);
    }

    qb.push(" ORDER BY ");
    expr.push(&mut qb);
    qb.push(" ASC, videos.size DESC, videos.id DESC LIMIT ");
    qb.push_bind(limit);

    let rows = qb.build().fetch_all(pool).await?;
    let mut videos: Vec<VideoRecord> = rows.iter().map(row_to_video).collect();
    attach_tags(pool, &mut videos).await?;
    Ok(videos)
}

/// Hydrate tag associations for an already-fetched set of records with one
/// `IN` query.
pub(crate) async fn attach_tags(
    pool: &SqlitePool,
    videos: &mut [VideoRecord],
) -> Result<(), sqlx::Error> {
    if videos.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT video_tags.video_id, tags.id, tags.name, tags.color, tags.created_at, \
         tags.updated_at \
         FROM video_tags JOIN tags ON tags.id = video_tags.tag_id \
         WHERE video_tags.video_id IN (",
    );
    let mut sep = qb.separated(", ");
    for v in videos.iter() {
        sep.push_bind(v.id);
    }
    qb.push(") ORDER BY tags.name");

    let rows = qb.build().fetch_all(pool).await?;
    let mut by_video: HashMap<i64, Vec<TagRecord>> = HashMap::new();
    for r in &rows {
        by_video
            .entry(r.get("video_id"))
            .or_default()
            .push(TagRecord {
                id: r.get("id"),
                name: r.get("name"),
                color: r.get("color"),
                created_at: r.get("created_at"),
                updated_at: r.get("updated_at"),
            });
    }

    for v in videos.iter_mut() {
        v.tags = by_video.remove(&v.id).unwrap_or_default();
    }
    Ok(())
}

/// Fetch one active record with its tags.
pub async fn get_video(pool: &SqlitePool, id: i64) -> Result<Option<VideoRecord>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ? AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else { return Ok(None) };
    let mut videos = vec![row_to_video(&row)];
    attach_tags(pool, &mut videos).await?;
    Ok(videos.pop())
}

pub async fn find_active_by_path(
    pool: &SqlitePool,
    path: &str,
) -> Result<Option<VideoRecord>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {VIDEO_COLUMNS} FROM videos WHERE path = ? AND deleted_at IS NULL"
    ))
    .bind(path)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else { return Ok(None) };
    let mut videos = vec![row_to_video(&row)];
    attach_tags(pool, &mut videos).await?;
    Ok(videos.pop())
}

pub async fn insert_video(pool: &SqlitePool, video: &NewVideo<'_>) -> Result<i64, sqlx::Error> {
    let res = sqlx::query("INSERT INTO videos (name, path, directory, size) VALUES (?, ?, ?, ?)")
        .bind(video.name)
        .bind(video.path)
        .bind(video.directory)
        .bind(video.size)
        .execute(pool)
        .await?;
    Ok(res.last_insert_rowid())
}

/// Logical removal. The row stays visible to reconciliation, and its path is
/// immediately free for re-registration.
pub async fn soft_delete_video(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE videos SET deleted_at = strftime('%s','now'), updated_at = strftime('%s','now') \
         WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Store-side increment — concurrent plays must not lose updates, so this is
/// never a read-modify-write of a value held in memory.
pub async fn record_play(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE videos SET play_count = play_count + 1, last_played_at = ?, \
         updated_at = strftime('%s','now') WHERE id = ?",
    )
    .bind(Utc::now().timestamp())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn record_random_play(pool: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE videos SET random_play_count = random_play_count + 1, last_played_at = ?, \
         updated_at = strftime('%s','now') WHERE id = ?",
    )
    .bind(Utc::now().timestamp())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Counters-only projection of every active record, in stable id order —
/// this is all the sampler needs for the whole library.
pub async fn play_projections(pool: &SqlitePool) -> Result<Vec<PlayProjection>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, i64, i64)>(
        "SELECT id, play_count, random_play_count FROM videos \
         WHERE deleted_at IS NULL ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, play_count, random_play_count)| PlayProjection {
            id,
            play_count,
            random_play_count,
        })
        .collect())
}

pub async fn active_video_count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM videos WHERE deleted_at IS NULL")
        .fetch_one(pool)
        .await
}

/// Active records registered under `dir` or any of its subdirectories.
pub async fn videos_in_directory(
    pool: &SqlitePool,
    dir: &str,
) -> Result<Vec<VideoRecord>, sqlx::Error> {
    let trimmed = dir.trim();
    let clean = if trimmed.len() > 1 {
        trimmed.trim_end_matches(std::path::MAIN_SEPARATOR)
    } else {
        trimmed
    };
    let child_prefix = format!(
        "{}%",
        escape_like(&format!("{clean}{}", std::path::MAIN_SEPARATOR))
    );

    let rows = sqlx::query(&format!(
        "SELECT {VIDEO_COLUMNS} FROM videos \
         WHERE deleted_at IS NULL AND (directory = ? OR directory LIKE ? ESCAPE '\\') \
         ORDER BY id DESC"
    ))
    .bind(clean)
    .bind(child_prefix)
    .fetch_all(pool)
    .await?;

    let mut videos: Vec<VideoRecord> = rows.iter().map(row_to_video).collect();
    attach_tags(pool, &mut videos).await?;
    Ok(videos)
}

fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
