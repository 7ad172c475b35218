use std::path::Path;

use crate::db;
use crate::db::videos::{NewVideo, PageFilter, VideoRecord};
use crate::error::Error;
use crate::ranking::cursor::PageCursor;
use crate::ranking::sampler;
use crate::scan;
use crate::state::AppState;

/// One page of the library in play-priority order.
pub async fn list_page(
    state: &AppState,
    cursor: PageCursor,
    limit: i64,
) -> Result<Vec<VideoRecord>, Error> {
    let videos = db::videos::query_page(&state.db, &PageFilter::default(), &cursor, limit)
        .await
        .map_err(Error::db("list videos"))?;
    log::info!(
        "list_page cursor_score={:.4} cursor_size={} cursor_id={} limit={} result={}",
        cursor.score,
        cursor.size,
        cursor.id,
        limit,
        videos.len()
    );
    Ok(videos)
}

/// Keyword search, paginated like `list_page`.
pub async fn search(
    state: &AppState,
    keyword: &str,
    cursor: PageCursor,
    limit: i64,
) -> Result<Vec<VideoRecord>, Error> {
    search_with_filters(state, keyword, &[], cursor, limit).await
}

/// Multi-tag search with AND semantics, paginated like `list_page`.
pub async fn search_by_tags(
    state: &AppState,
    tag_ids: &[i64],
    cursor: PageCursor,
    limit: i64,
) -> Result<Vec<VideoRecord>, Error> {
    search_with_filters(state, "", tag_ids, cursor, limit).await
}

/// Combined keyword + required-tags search. With a blank keyword and no tags
/// this is exactly `list_page`.
pub async fn search_with_filters(
    state: &AppState,
    keyword: &str,
    tag_ids: &[i64],
    cursor: PageCursor,
    limit: i64,
) -> Result<Vec<VideoRecord>, Error> {
    let filter = PageFilter {
        keyword: Some(keyword),
        tag_ids,
    };
    let videos = db::videos::query_page(&state.db, &filter, &cursor, limit)
        .await
        .map_err(Error::db("search videos"))?;
    log::info!(
        "search_with_filters keyword={keyword:?} tags={tag_ids:?} cursor_id={} limit={} result={}",
        cursor.id,
        limit,
        videos.len()
    );
    Ok(videos)
}

/// Register a file in the library. The path must exist on disk; registering
/// an already-active path returns [`Error::VideoExists`] carrying the
/// canonical record.
pub async fn add_video(state: &AppState, raw_path: &str) -> Result<VideoRecord, Error> {
    let path = raw_path.trim();
    let meta = std::fs::metadata(path).map_err(|source| Error::Io {
        path: path.to_string(),
        source,
    })?;

    if let Some(existing) = db::videos::find_active_by_path(&state.db, path)
        .await
        .map_err(Error::db("look up video by path"))?
    {
        log::info!("add_video skipped, already registered path={path} id={}", existing.id);
        return Err(Error::VideoExists {
            existing: Box::new(existing),
        });
    }

    let p = Path::new(path);
    let name = p
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    let directory = p
        .parent()
        .map(|d| d.to_string_lossy().into_owned())
        .unwrap_or_default();

    // TODO: probe duration with ffprobe; stays 0 until then
    let new = NewVideo {
        name: &name,
        path,
        directory: &directory,
        size: meta.len() as i64,
    };
    let id = match db::videos::insert_video(&state.db, &new).await {
        Ok(id) => id,
        // lost a race against a concurrent registration of the same path
        Err(err) if db::is_unique_violation(&err) => {
            if let Some(existing) = db::videos::find_active_by_path(&state.db, path)
                .await
                .map_err(Error::db("look up video by path"))?
            {
                return Err(Error::VideoExists {
                    existing: Box::new(existing),
                });
            }
            return Err(Error::db("insert video")(err));
        }
        Err(err) => return Err(Error::db("insert video")(err)),
    };

    let video = db::videos::get_video(&state.db, id)
        .await
        .map_err(Error::db("load inserted video"))?
        .ok_or(Error::NotFound { what: "video", id })?;
    log::info!("add_video path={path} id={id}");
    Ok(video)
}

/// Soft-delete a record, optionally removing the file on disk first.
pub async fn delete_video(state: &AppState, id: i64, delete_file: bool) -> Result<(), Error> {
    let video = db::videos::get_video(&state.db, id)
        .await
        .map_err(Error::db("load video"))?
        .ok_or(Error::NotFound { what: "video", id })?;

    if delete_file {
        if let Err(err) = std::fs::remove_file(&video.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                return Err(Error::Io {
                    path: video.path.clone(),
                    source: err,
                });
            }
        }
    }

    db::videos::soft_delete_video(&state.db, id)
        .await
        .map_err(Error::db("delete video"))?;
    log::info!("delete_video id={id} delete_file={delete_file}");
    Ok(())
}

/// Play a specific record with the default handler, counting the play first.
pub async fn play_video(state: &AppState, id: i64) -> Result<(), Error> {
    let video = db::videos::get_video(&state.db, id)
        .await
        .map_err(Error::db("load video"))?
        .ok_or(Error::NotFound { what: "video", id })?;

    db::videos::record_play(&state.db, id)
        .await
        .map_err(Error::db("record play"))?;

    if let Err(err) = state.opener.open_path(Path::new(&video.path), false) {
        log::warn!("play_video open failed id={id}: {err}");
        return Err(Error::OpenFailed {
            video: Box::new(video),
            reason: err.to_string(),
        });
    }
    log::info!("play_video id={id}");
    Ok(())
}

/// Weighted random pick across the whole active library.
pub async fn play_random(state: &AppState) -> Result<VideoRecord, Error> {
    let result = sampler::pick_random(&state.db, state.opener.as_ref()).await;
    match &result {
        Ok(video) => log::info!("play_random id={}", video.id),
        Err(err) => log::warn!("play_random failed: {err}"),
    }
    result
}

/// Open the folder containing a record in the file manager.
pub async fn open_video_directory(state: &AppState, id: i64) -> Result<(), Error> {
    let video = db::videos::get_video(&state.db, id)
        .await
        .map_err(Error::db("load video"))?
        .ok_or(Error::NotFound { what: "video", id })?;

    if let Err(err) = state.opener.open_path(Path::new(&video.directory), true) {
        return Err(Error::OpenFailed {
            video: Box::new(video),
            reason: err.to_string(),
        });
    }
    Ok(())
}

/// All active records under a directory (including subdirectories).
pub async fn videos_by_directory(state: &AppState, dir: &str) -> Result<Vec<VideoRecord>, Error> {
    let videos = db::videos::videos_in_directory(&state.db, dir)
        .await
        .map_err(Error::db("list videos by directory"))?;
    log::info!("videos_by_directory dir={dir} result={}", videos.len());
    Ok(videos)
}

/// Walk a directory for video files, using the configured extension list.
pub async fn scan_directory(state: &AppState, dir: &str) -> Result<Vec<String>, Error> {
    let settings = db::settings::get_settings(&state.db)
        .await
        .map_err(Error::db("read settings"))?;
    let extensions = scan::parse_extensions(&settings.video_extensions);

    let files: Vec<String> = scan::scan_directory(Path::new(dir), &extensions)
        .into_iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    log::info!("scan_directory dir={dir} result={}", files.len());
    Ok(files)
}
