use crate::db::tags::TagRecord;
use crate::db::videos::VideoRecord;

/// Unified error surface for the library core.
///
/// Store-level failures are wrapped with the name of the failing operation so
/// callers can log something actionable; domain conditions that callers act on
/// (duplicate path, empty library, open failure) carry the records involved.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: i64 },

    /// Registering a path that already has an active record. Carries the
    /// canonical record so the caller can surface it instead of a bare error.
    #[error("video already registered: {} (id {})", .existing.path, .existing.id)]
    VideoExists { existing: Box<VideoRecord> },

    #[error("tag already exists: {} (id {})", .existing.name, .existing.id)]
    TagExists { existing: Box<TagRecord> },

    #[error("no playable videos in the library")]
    NoPlayableVideos,

    /// The default-handler open failed after a record was selected and its
    /// counters bumped. The selection stands; the record rides in the error.
    #[error("failed to open {} ({}): {reason}", .video.name, .video.path)]
    OpenFailed { video: Box<VideoRecord>, reason: String },

    /// Fatal startup failure. The process must not serve queries after this.
    #[error("initialization failed: {0}")]
    Init(String),

    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("{op}: {source}")]
    Db {
        op: &'static str,
        source: sqlx::Error,
    },
}

impl Error {
    /// Wrap a store error with the name of the failing operation.
    pub fn db(op: &'static str) -> impl Fn(sqlx::Error) -> Error {
        move |source| Error::Db { op, source }
    }
}
