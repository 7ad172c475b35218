use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// File extensions treated as video when the settings row holds a blank list.
pub const DEFAULT_VIDEO_EXTENSIONS: &str = ".mp4,.avi,.mkv,.mov,.wmv,.flv,.webm,.m4v,.ts,.3gp,.mpg,.mpeg,.rm,.rmvb,.vob,.divx,.f4v,.asf,.qt";

/// The singleton settings row (id = 1). Exactly one exists after startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub id: i64,
    pub confirm_before_delete: bool,
    pub delete_original_file: bool,
    pub video_extensions: String,
    /// How many random plays one deliberate play is worth in the score.
    /// Stored as saved; readers clamp through the score model.
    pub play_weight: f64,
    pub auto_scan_on_startup: bool,
    pub log_enabled: bool,
    pub updated_at: i64,
}

/// Insert the default row if none exists yet.
pub async fn seed_default_settings(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO settings
            (id, confirm_before_delete, delete_original_file, video_extensions,
             play_weight, auto_scan_on_startup, log_enabled)
        VALUES (1, 1, 0, ?, 2.0, 0, 0)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(DEFAULT_VIDEO_EXTENSIONS)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_settings(pool: &SqlitePool) -> Result<Settings, sqlx::Error> {
    let r = sqlx::query("SELECT * FROM settings WHERE id = 1")
        .fetch_one(pool)
        .await?;

    Ok(Settings {
        id: r.get("id"),
        confirm_before_delete: r.get::<i64, _>("confirm_before_delete") != 0,
        delete_original_file: r.get::<i64, _>("delete_original_file") != 0,
        video_extensions: r.get("video_extensions"),
        play_weight: r.get("play_weight"),
        auto_scan_on_startup: r.get::<i64, _>("auto_scan_on_startup") != 0,
        log_enabled: r.get::<i64, _>("log_enabled") != 0,
        updated_at: r.get("updated_at"),
    })
}

/// The one value the ranking and sampling paths need.
pub async fn play_weight(pool: &SqlitePool) -> Result<f64, sqlx::Error> {
    sqlx::query_scalar("SELECT play_weight FROM settings WHERE id = 1")
        .fetch_one(pool)
        .await
}

pub async fn update_settings(pool: &SqlitePool, settings: &Settings) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE settings SET
            confirm_before_delete = ?,
            delete_original_file  = ?,
            video_extensions      = ?,
            play_weight           = ?,
            auto_scan_on_startup  = ?,
            log_enabled           = ?,
            updated_at            = strftime('%s','now')
        WHERE id = 1
        "#,
    )
    .bind(settings.confirm_before_delete as i64)
    .bind(settings.delete_original_file as i64)
    .bind(&settings.video_extensions)
    .bind(settings.play_weight)
    .bind(settings.auto_scan_on_startup as i64)
    .bind(settings.log_enabled as i64)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::local::open_test_pool;

    #[tokio::test]
    async fn defaults_are_seeded_once() {
        let pool = open_test_pool().await;
        // seeding again must not reset anything
        seed_default_settings(&pool).await.unwrap();

        let settings = get_settings(&pool).await.unwrap();
        assert_eq!(settings.play_weight, 2.0);
        assert!(settings.confirm_before_delete);
        assert!(!settings.auto_scan_on_startup);
        assert_eq!(settings.video_extensions, DEFAULT_VIDEO_EXTENSIONS);
    }

    #[tokio::test]
    async fn update_round_trips() {
        let pool = open_test_pool().await;
        let mut settings = get_settings(&pool).await.unwrap();
        settings.play_weight = 3.5;
        settings.auto_scan_on_startup = true;
        settings.video_extensions = ".mp4,.mkv".to_string();
        update_settings(&pool, &settings).await.unwrap();

        let reloaded = get_settings(&pool).await.unwrap();
        assert_eq!(reloaded.play_weight, 3.5);
        assert!(reloaded.auto_scan_on_startup);
        assert_eq!(reloaded.video_extensions, ".mp4,.mkv");
        assert_eq!(play_weight(&pool).await.unwrap(), 3.5);
    }
}
