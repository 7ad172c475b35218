use std::path::Path;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Seam for the OS "open with default handler" integration.
///
/// `as_directory` marks container-open requests (open the folder holding a
/// file) as opposed to playing the file itself; the default implementation
/// treats both the same way, but tests and alternative frontends can tell
/// them apart.
pub trait PathOpener: Send + Sync {
    fn open_path(&self, path: &Path, as_directory: bool) -> Result<(), BoxError>;
}

impl<T: PathOpener + ?Sized> PathOpener for std::sync::Arc<T> {
    fn open_path(&self, path: &Path, as_directory: bool) -> Result<(), BoxError> {
        (**self).open_path(path, as_directory)
    }
}

/// Platform default handler via the `opener` crate (xdg-open / `open` /
/// ShellExecute under the hood).
pub struct SystemOpener;

impl PathOpener for SystemOpener {
    fn open_path(&self, path: &Path, _as_directory: bool) -> Result<(), BoxError> {
        opener::open(path).map_err(Into::into)
    }
}
