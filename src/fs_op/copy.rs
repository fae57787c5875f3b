use std::fs;
use std::path::{Path, PathBuf};

use fs_extra::file::{copy as fs_extra_copy, CopyOptions};
use walkdir::WalkDir;

use crate::fs_op::error::FsOpError;

/// Extensions that are made executable after copying.
const SCRIPT_EXTENSIONS: &[&str] = &["sh", "bat"];

/// One step of a recursive copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyAction {
    /// Create `destination` (and parents) if missing.
    CreateDir { destination: PathBuf },
    /// Copy `source` over `destination`; `executable` files get open
    /// permissions once written.
    CopyFile {
        source: PathBuf,
        destination: PathBuf,
        executable: bool,
    },
}

/// Walk `src` and describe how to mirror it into `dst` without touching the
/// destination.
///
/// The first action always creates `dst`. Directories come before their
/// contents and entries are sorted by name, so the plan is deterministic.
/// Symlinks and other special files are skipped.
pub fn plan_copy(src: &Path, dst: &Path) -> Result<Vec<CopyAction>, FsOpError> {
    if !src.is_dir() {
        return Err(FsOpError::PathContext {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
            msg: "source is not a directory".to_string(),
        });
    }

    let mut actions = vec![CopyAction::CreateDir {
        destination: dst.to_path_buf(),
    }];

    let walker = WalkDir::new(src)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| FsOpError::Message(e.to_string()))?;
        let destination = dst.join(rel);
        let ft = entry.file_type();

        if ft.is_dir() {
            actions.push(CopyAction::CreateDir { destination });
        } else if ft.is_file() {
            actions.push(CopyAction::CopyFile {
                executable: is_script(&destination),
                source: entry.path().to_path_buf(),
                destination,
            });
        }
    }
    Ok(actions)
}

/// Execute a plan produced by [`plan_copy`]. Existing files are overwritten.
///
/// Returns the source paths of every copied file.
pub fn apply_copy(actions: &[CopyAction]) -> Result<Vec<PathBuf>, FsOpError> {
    let mut options = CopyOptions::new();
    options.overwrite = true;
    options.buffer_size = 64 * 1024;

    let mut copied = Vec::new();
    for action in actions {
        match action {
            CopyAction::CreateDir { destination } => {
                fs::create_dir_all(destination)?;
            }
            CopyAction::CopyFile {
                source,
                destination,
                executable,
            } => {
                fs_extra_copy(source, destination, &options).map_err(|e| {
                    FsOpError::PathContext {
                        src: source.clone(),
                        dst: destination.clone(),
                        msg: e.to_string(),
                    }
                })?;
                if *executable {
                    set_open_permissions(destination)?;
                }
                copied.push(source.clone());
            }
        }
    }
    Ok(copied)
}

/// Recursively copy the contents of `src` into `dst`.
pub fn copy_folder(src: &Path, dst: &Path) -> Result<Vec<PathBuf>, FsOpError> {
    let plan = plan_copy(src, dst)?;
    tracing::debug!("copying {} -> {} ({} actions)", src.display(), dst.display(), plan.len());
    apply_copy(&plan)
}

fn is_script(p: &Path) -> bool {
    p.extension()
        .and_then(|e| e.to_str())
        .map(|e| SCRIPT_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

#[cfg(unix)]
fn set_open_permissions(p: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(p, fs::Permissions::from_mode(0o777))
}

#[cfg(not(unix))]
fn set_open_permissions(_p: &Path) -> std::io::Result<()> {
    Ok(())
}
