use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Errors returned from filesystem remove operations in this module.
///
/// A path that does not exist is treated as already removed, so callers can
/// clear a location without checking for it first.
#[derive(Debug, Error)]
#[error("filesystem remove error: {0}")]
pub struct RemoveError(#[from] pub io::Error);

/// Remove a file or directory at `path`, recursing into directories.
///
/// # Examples
///
/// ```no_run
/// use pipeline_fixture::fs_op::remove::remove_path;
/// remove_path("/tmp/tankTemporaryTestData_1.0/project_code.old").expect("remove failed");
/// ```
pub fn remove_path(path: impl AsRef<Path>) -> Result<(), RemoveError> {
    let p = path.as_ref();

    // symlink_metadata so a dangling link is still removed
    let meta = match fs::symlink_metadata(p) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    if meta.is_dir() {
        fs::remove_dir_all(p)?;
    } else {
        fs::remove_file(p)?;
    }

    Ok(())
}
