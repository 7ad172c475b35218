use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite};

use crate::db::videos::VideoRecord;
use crate::ranking::score::ScoreExpr;

/// Resume position in the `(score ASC, size DESC, id DESC)` listing order.
///
/// `id == 0` is the "no cursor" sentinel: the first page. Otherwise a page
/// request returns records strictly after this position. Chaining the last
/// row of each page through [`PageCursor::after`] visits every record of a
/// static snapshot exactly once; a play event between fetches can move a
/// record across the cursor and get it skipped or repeated — accepted
/// trade-off, not masked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageCursor {
    pub score: f64,
    pub size: i64,
    pub id: i64,
}

impl PageCursor {
    /// First-page sentinel.
    pub const NONE: PageCursor = PageCursor {
        score: 0.0,
        size: 0,
        id: 0,
    };

    pub fn is_set(&self) -> bool {
        self.id > 0
    }

    /// Cursor resuming after `video`, scored under `expr`.
    pub fn after(video: &VideoRecord, expr: &ScoreExpr) -> Self {
        Self {
            score: expr.score(video.play_count, video.random_play_count),
            size: video.size,
            id: video.id,
        }
    }

    /// Append the strictly-after predicate to a query that already has a
    /// WHERE clause:
    ///
    /// `score > s OR (score = s AND size < z) OR (score = s AND size = z AND id < i)`
    pub fn push_after_predicate(&self, expr: &ScoreExpr, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" AND (");
        expr.push(qb);
        qb.push(" > ");
        qb.push_bind(self.score);
        qb.push(" OR (");
        expr.push(qb);
        qb.push(" = ");
        qb.push_bind(self.score);
        qb.push(" AND size < ");
        qb.push_bind(self.size);
        qb.push(") OR (");
        expr.push(qb);
        qb.push(" = ");
        qb.push_bind(self.score);
        qb.push(" AND size = ");
        qb.push_bind(self.size);
        qb.push(" AND id < ");
        qb.push_bind(self.id);
        qb.push("))");
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_not_set() {
        assert!(!PageCursor::NONE.is_set());
        assert!(PageCursor {
            score: 0.0,
            size: 0,
            id: 1
        }
        .is_set());
    }

    #[test]
    fn after_carries_score_size_id() {
        let video = VideoRecord {
            id: 7,
            size: 1024,
            play_count: 2,
            random_play_count: 1,
            ..VideoRecord::default()
        };
        let cursor = PageCursor::after(&video, &ScoreExpr::new(2.0));
        assert_eq!(cursor.score, 5.0);
        assert_eq!(cursor.size, 1024);
        assert_eq!(cursor.id, 7);
    }
}
