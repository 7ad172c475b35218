pub mod local;
pub mod scan_dirs;
pub mod settings;
pub mod tags;
pub mod videos;

/// True when a store error is a UNIQUE-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.message().to_lowercase().contains("unique"),
        _ => false,
    }
}
