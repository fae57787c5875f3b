//! Filesystem operations used to build and recycle fixture trees.

pub mod backup;
pub mod copy;
pub mod create;
pub mod error;
pub mod helpers;
pub mod remove;

pub use backup::{BackupError, BackupRotator, Backoff, RetryPolicy, RotateOutcome};
pub use copy::{apply_copy, copy_folder, plan_copy, CopyAction};
pub use error::FsOpError;
