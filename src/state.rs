use sqlx::SqlitePool;

use crate::shell_open::{PathOpener, SystemOpener};

/// Shared application state — one per process, handed to every command.
///
/// Built only after `db::local::init_db` has finished, which is what
/// guarantees reconciliation completed before any query traffic.
pub struct AppState {
    pub db: SqlitePool,
    /// OS shell-open integration; swapped for a fake in tests.
    pub opener: Box<dyn PathOpener>,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            opener: Box::new(SystemOpener),
        }
    }

    pub fn with_opener(mut self, opener: Box<dyn PathOpener>) -> Self {
        self.opener = opener;
        self
    }
}
