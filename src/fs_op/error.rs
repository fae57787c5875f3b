use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the filesystem helpers used to build fixture trees.
#[derive(Error, Debug)]
pub enum FsOpError {
    /// Wrapper for underlying IO errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context message.
    #[error("Filesystem operation failed: {0}")]
    Message(String),

    /// Contextual error that includes source and destination paths.
    #[error("Operation failed from `{src}` to `{dst}`: {msg}")]
    PathContext {
        src: PathBuf,
        dst: PathBuf,
        msg: String,
    },

    /// A write was attempted outside the directory it is allowed to touch.
    #[error("Only files in the test data area should be created with this method: `{path}` is outside `{area}`")]
    OutsideArea { path: PathBuf, area: PathBuf },
}

impl From<String> for FsOpError {
    fn from(s: String) -> Self {
        FsOpError::Message(s)
    }
}

impl From<walkdir::Error> for FsOpError {
    fn from(e: walkdir::Error) -> Self {
        let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
        FsOpError::Message(format!("walking `{}`: {}", path, e))
    }
}
