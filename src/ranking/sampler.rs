use std::path::Path;

use rand::Rng;
use sqlx::SqlitePool;

use crate::db;
use crate::db::videos::VideoRecord;
use crate::error::Error;
use crate::ranking::score::ScoreExpr;
use crate::shell_open::PathOpener;

/// Minimal per-record projection the sampler works on. Full records (and
/// their tag joins) are only hydrated for the single winner.
#[derive(Debug, Clone, Copy)]
pub struct PlayProjection {
    pub id: i64,
    pub play_count: i64,
    pub random_play_count: i64,
}

/// Selection weight per projection, in projection order:
/// `max_score - score + 1.0`, always >= 1.0.
///
/// Fresher (lower-scored) records get strictly larger weight; nothing ever
/// drops to zero, so every record keeps a chance.
pub fn selection_weights(projections: &[PlayProjection], expr: &ScoreExpr) -> Vec<f64> {
    let max_score = projections
        .iter()
        .map(|p| expr.score(p.play_count, p.random_play_count))
        .fold(0.0, f64::max);

    projections
        .iter()
        .map(|p| max_score - expr.score(p.play_count, p.random_play_count) + 1.0)
        .collect()
}

/// Walk the cumulative weight sums and return the first index whose running
/// sum reaches `roll`. `None` only for an empty slice.
///
/// When accumulated floating-point error leaves the final sum fractionally
/// short of `roll`, the last index is returned; the fallback is required
/// behavior, not a safety net that can be dropped.
pub fn pick_index(weights: &[f64], roll: f64) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }

    let mut cumulative = 0.0;
    for (i, w) in weights.iter().enumerate() {
        cumulative += w;
        if roll <= cumulative {
            return Some(i);
        }
    }
    Some(weights.len() - 1)
}

/// Pick one active video, biased toward under-played records, bump its
/// random-play counter, and open it with the default handler.
///
/// The counter bump is a store-side increment and is not rolled back when the
/// open fails — an attempted play still counts.
pub async fn pick_random(pool: &SqlitePool, opener: &dyn PathOpener) -> Result<VideoRecord, Error> {
    let raw_weight = db::settings::play_weight(pool)
        .await
        .map_err(Error::db("read play weight"))?;
    let expr = ScoreExpr::new(raw_weight);

    let projections = db::videos::play_projections(pool)
        .await
        .map_err(Error::db("load play projections"))?;
    if projections.is_empty() {
        return Err(Error::NoPlayableVideos);
    }

    let weights = selection_weights(&projections, &expr);
    let total: f64 = weights.iter().sum();
    let roll = rand::thread_rng().gen_range(0.0..total);
    let Some(index) = pick_index(&weights, roll) else {
        return Err(Error::NoPlayableVideos);
    };

    let id = projections[index].id;
    let video = db::videos::get_video(pool, id)
        .await
        .map_err(Error::db("load selected video"))?
        .ok_or(Error::NotFound { what: "video", id })?;

    db::videos::record_random_play(pool, id)
        .await
        .map_err(Error::db("record random play"))?;

    if let Err(err) = opener.open_path(Path::new(&video.path), false) {
        return Err(Error::OpenFailed {
            video: Box::new(video),
            reason: err.to_string(),
        });
    }

    Ok(video)
}
