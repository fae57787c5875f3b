use std::path::{Component, Path};

use crate::fs_op::error::FsOpError;
use crate::fs_op::helpers::atomic_write;

/// Create (or overwrite) a file at `path` containing `data`, creating any
/// missing parent directories. `path` must live under `area`; anything else
/// is rejected before touching the disk, including paths that climb out of
/// `area` through `..`.
pub fn create_file_within<P: AsRef<Path>, A: AsRef<Path>>(
    area: A,
    path: P,
    data: &str,
) -> Result<(), FsOpError> {
    let area = area.as_ref();
    let p = path.as_ref();
    let climbs = p.components().any(|c| matches!(c, Component::ParentDir));
    if climbs || !p.starts_with(area) {
        return Err(FsOpError::OutsideArea {
            path: p.to_path_buf(),
            area: area.to_path_buf(),
        });
    }
    atomic_write(p, data.as_bytes())?;
    tracing::debug!("wrote {} ({} bytes)", p.display(), data.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_file_and_parents_inside_area() {
        let td = tempdir().unwrap();
        let file = td.path().join("project_code/tank/config/tank_configs.yml");
        create_file_within(td.path(), &file, "- {linux2: '/x'}").unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "- {linux2: '/x'}");
    }

    #[test]
    fn rejects_paths_outside_area() {
        let area = tempdir().unwrap();
        let elsewhere = tempdir().unwrap();
        let file = elsewhere.path().join("stray.yml");
        let err = create_file_within(area.path(), &file, "").unwrap_err();
        assert!(matches!(err, FsOpError::OutsideArea { .. }));
        assert!(!file.exists());
    }

    #[test]
    fn sibling_with_common_prefix_is_outside() {
        let td = tempdir().unwrap();
        let area = td.path().join("tankTemporaryTestData_1");
        let file = td.path().join("tankTemporaryTestData_10/f.yml");
        assert!(create_file_within(&area, &file, "").is_err());
    }

    #[test]
    fn parent_dir_components_cannot_escape_area() {
        let td = tempdir().unwrap();
        let area = td.path().join("data");
        std::fs::create_dir_all(&area).unwrap();
        let escaped = area.join("..").join("escaped.txt");

        let err = create_file_within(&area, &escaped, "boom").unwrap_err();
        assert!(matches!(err, FsOpError::OutsideArea { .. }));
        assert!(!td.path().join("escaped.txt").exists());

        let inner = area.join("a/../b.txt");
        assert!(create_file_within(&area, &inner, "").is_err());
    }
}
