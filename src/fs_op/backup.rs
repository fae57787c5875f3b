//! Rotating stale fixture directories out of the way.
//!
//! Fixture trees live in a temp area shared by a whole test run. Before a tree
//! is rebuilt, whatever is already at its location is renamed to a sibling
//! `<name>.old`, replacing any older backup. Backups are never deleted
//! outright except by the next rotation.
//!
//! On some platforms the rename fails while the embedded path cache database
//! is still held open. In that case the database is located, deleted with
//! bounded retries, and the rename is attempted one more time.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::pipeline::PipelineConfiguration;
use crate::fs_op::remove::{remove_path, RemoveError};

/// Suffix appended to the file name of a rotated directory.
pub const BACKUP_SUFFIX: &str = ".old";

/// How the wait between deletion attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// `step * attempt`: 0, step, 2*step, ...
    Linear,
    /// `step * 2^attempt`: step, 2*step, 4*step, ...
    Exponential,
}

/// Bounded retry schedule for the forced database cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub step_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Backoff::Linear,
            step_ms: 2000,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries `max_attempts` times without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Linear,
            step_ms: 0,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (zero based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ms = match self.backoff {
            Backoff::Linear => self.step_ms.saturating_mul(u64::from(attempt)),
            Backoff::Exponential => self
                .step_ms
                .saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX)),
        };
        Duration::from_millis(ms)
    }
}

/// Successful result of [`BackupRotator::rotate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotateOutcome {
    /// Nothing existed at the path.
    Absent,
    /// The path was renamed to `backup`.
    Renamed { backup: PathBuf },
    /// The first rename failed; `database` was force-deleted and the retried
    /// rename succeeded.
    RenamedAfterForcedCleanup { backup: PathBuf, database: PathBuf },
}

/// Rotation failure. This is the `Failed(reason)` arm of a rotation.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("cannot derive a backup name for `{0}`")]
    NoFileName(PathBuf),

    #[error("removing previous backup `{path}`: {source}")]
    RemoveBackup {
        path: PathBuf,
        #[source]
        source: RemoveError,
    },

    #[error("renaming `{src}` to `{dst}` failed: {source}")]
    Rename {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Performs the actual rename; replaceable so platform failures can be
/// reproduced.
pub type RenameFn = fn(&Path, &Path) -> io::Result<()>;

/// Finds the database file that may block renaming the tree at the given path.
pub type LocateDatabaseFn = fn(&Path) -> Option<PathBuf>;

/// Moves existing directories to `<name>.old`. See the module docs.
#[derive(Clone)]
pub struct BackupRotator {
    policy: RetryPolicy,
    rename: RenameFn,
    locate_database: LocateDatabaseFn,
}

impl std::fmt::Debug for BackupRotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupRotator")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for BackupRotator {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl BackupRotator {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            rename: std_rename,
            locate_database: path_cache_database,
        }
    }

    pub fn with_rename(mut self, rename: RenameFn) -> Self {
        self.rename = rename;
        self
    }

    pub fn with_database_locator(mut self, locate: LocateDatabaseFn) -> Self {
        self.locate_database = locate;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Sibling backup location for `path`: `/a/b/name` -> `/a/b/name.old`.
    pub fn backup_path_for(path: &Path) -> Result<PathBuf, BackupError> {
        let name = path
            .file_name()
            .ok_or_else(|| BackupError::NoFileName(path.to_path_buf()))?;
        let mut backup_name = name.to_os_string();
        backup_name.push(BACKUP_SUFFIX);
        Ok(path.with_file_name(backup_name))
    }

    /// Move whatever is at `path` to its backup location.
    pub fn rotate(&self, path: &Path) -> Result<RotateOutcome, BackupError> {
        if !path.exists() {
            return Ok(RotateOutcome::Absent);
        }

        let backup = Self::backup_path_for(path)?;
        remove_path(&backup).map_err(|source| BackupError::RemoveBackup {
            path: backup.clone(),
            source,
        })?;

        match (self.rename)(path, &backup) {
            Ok(()) => {
                tracing::debug!("moved {} -> {}", path.display(), backup.display());
                return Ok(RotateOutcome::Renamed { backup });
            }
            Err(e) => tracing::warn!(
                "renaming {} failed ({}), trying forced database cleanup",
                path.display(),
                e
            ),
        }

        let deleted = self.force_delete_database(path);

        (self.rename)(path, &backup).map_err(|source| BackupError::Rename {
            src: path.to_path_buf(),
            dst: backup.clone(),
            source,
        })?;

        Ok(match deleted {
            Some(database) => RotateOutcome::RenamedAfterForcedCleanup { backup, database },
            None => RotateOutcome::Renamed { backup },
        })
    }

    // Returns the database path if it was deleted.
    fn force_delete_database(&self, tree: &Path) -> Option<PathBuf> {
        let db = (self.locate_database)(tree)?;
        if !db.exists() {
            return None;
        }

        tracing::warn!("removing db {}", db.display());
        for attempt in 0..self.policy.max_attempts {
            match fs::remove_file(&db) {
                Ok(()) => return Some(db),
                Err(e) => {
                    tracing::debug!("attempt {} to remove {} failed: {}", attempt + 1, db.display(), e);
                    thread::sleep(self.policy.delay_for(attempt));
                }
            }
        }
        tracing::warn!(
            "giving up on {} after {} attempts",
            db.display(),
            self.policy.max_attempts
        );
        None
    }
}

fn std_rename(src: &Path, dst: &Path) -> io::Result<()> {
    fs::rename(src, dst)
}

/// Default locator: resolve the pipeline configuration at `tree` and return
/// its path cache file.
pub fn path_cache_database(tree: &Path) -> Option<PathBuf> {
    PipelineConfiguration::from_path(tree)
        .ok()
        .map(|pc| pc.path_cache_location())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const LOCK_FILE: &str = "cache/path_cache.db";

    fn rename_blocked_by_db(src: &Path, dst: &Path) -> io::Result<()> {
        if src.join(LOCK_FILE).exists() {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "database in use"));
        }
        fs::rename(src, dst)
    }

    fn always_fail(_src: &Path, _dst: &Path) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
    }

    fn locate_lock_file(tree: &Path) -> Option<PathBuf> {
        Some(tree.join(LOCK_FILE))
    }

    #[test]
    fn missing_path_is_noop() {
        let td = tempdir().unwrap();
        let outcome = BackupRotator::default().rotate(&td.path().join("nope")).unwrap();
        assert_eq!(outcome, RotateOutcome::Absent);
    }

    #[test]
    fn renames_to_old_sibling() {
        let td = tempdir().unwrap();
        let project = td.path().join("project_code");
        fs::create_dir_all(project.join("tank")).unwrap();

        let outcome = BackupRotator::default().rotate(&project).unwrap();
        let backup = td.path().join("project_code.old");
        assert_eq!(outcome, RotateOutcome::Renamed { backup: backup.clone() });
        assert!(!project.exists());
        assert!(backup.join("tank").is_dir());
    }

    #[test]
    fn repeated_rotation_keeps_single_backup() {
        let td = tempdir().unwrap();
        let project = td.path().join("project_code");
        let rotator = BackupRotator::default();

        fs::create_dir_all(&project).unwrap();
        fs::write(project.join("marker"), "first").unwrap();
        rotator.rotate(&project).unwrap();

        fs::create_dir_all(&project).unwrap();
        fs::write(project.join("marker"), "second").unwrap();
        rotator.rotate(&project).unwrap();
        rotator.rotate(&project).unwrap();

        let backup = td.path().join("project_code.old");
        assert_eq!(fs::read_to_string(backup.join("marker")).unwrap(), "second");
        assert!(!backup.join("project_code.old").exists());
        let entries: Vec<_> = fs::read_dir(td.path()).unwrap().filter_map(Result::ok).collect();
        assert_eq!(entries.len(), 1, "only the backup should remain");
    }

    #[test]
    fn locked_database_is_force_deleted_then_renamed() {
        let td = tempdir().unwrap();
        let tree = td.path().join("tank");
        fs::create_dir_all(tree.join("cache")).unwrap();
        fs::write(tree.join(LOCK_FILE), b"sqlite").unwrap();

        let rotator = BackupRotator::new(RetryPolicy::immediate(3))
            .with_rename(rename_blocked_by_db)
            .with_database_locator(locate_lock_file);
        let outcome = rotator.rotate(&tree).unwrap();

        assert_eq!(
            outcome,
            RotateOutcome::RenamedAfterForcedCleanup {
                backup: td.path().join("tank.old"),
                database: tree.join(LOCK_FILE),
            }
        );
        assert!(td.path().join("tank.old/cache").is_dir());
        assert!(!td.path().join("tank.old").join(LOCK_FILE).exists());
    }

    #[test]
    fn exhausted_recovery_propagates_error() {
        let td = tempdir().unwrap();
        let tree = td.path().join("tank");
        fs::create_dir_all(&tree).unwrap();

        let rotator = BackupRotator::new(RetryPolicy::immediate(2))
            .with_rename(always_fail)
            .with_database_locator(locate_lock_file);
        let err = rotator.rotate(&tree).unwrap_err();
        assert!(matches!(err, BackupError::Rename { .. }));
        assert!(tree.exists(), "source stays in place after a failed rotation");
    }

    #[test]
    fn retry_delays_follow_schedule() {
        let linear = RetryPolicy::default();
        let delays: Vec<u64> = (0..5).map(|a| linear.delay_for(a).as_millis() as u64).collect();
        assert_eq!(delays, vec![0, 2000, 4000, 6000, 8000]);

        let exp = RetryPolicy {
            max_attempts: 4,
            backoff: Backoff::Exponential,
            step_ms: 10,
        };
        let delays: Vec<u64> = (0..4).map(|a| exp.delay_for(a).as_millis() as u64).collect();
        assert_eq!(delays, vec![10, 20, 40, 80]);
    }

    #[test]
    fn backup_name_appends_suffix() {
        assert_eq!(
            BackupRotator::backup_path_for(Path::new("/tmp/run/alternate_1/project_code")).unwrap(),
            PathBuf::from("/tmp/run/alternate_1/project_code.old")
        );
        assert!(BackupRotator::backup_path_for(Path::new("/")).is_err());
    }
}
