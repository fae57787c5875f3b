//! Per-run and per-test fixture lifecycle.
//!
//! A [`TestRun`] owns the temp data area shared by every test of a run. Each
//! test builds a [`ProjectFixture`] inside it, exercises the configuration
//! and mock record store it wires up, and tears it down again, which rotates
//! the project tree to a `.old` backup.

pub mod fixture;
pub mod run;
pub mod state;

use std::fmt::{Debug, Display};
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::fs_op::{BackupError, FsOpError};
use crate::path_cache::PathCacheError;
use crate::record_store::RecordStoreError;
use crate::toolkit::ToolkitError;

pub use fixture::{ProjectFixture, MULTI_ROOT_CORE};
pub use run::TestRun;
pub use state::FixtureState;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error(transparent)]
    Fs(#[from] FsOpError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Toolkit(#[from] ToolkitError),

    #[error(transparent)]
    PathCache(#[from] PathCacheError),

    #[error(transparent)]
    RecordStore(#[from] RecordStoreError),

    #[error("{action} `{path}`: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("fixture cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: FixtureState, to: FixtureState },

    #[error("fixture is {0:?}; operation needs a set-up fixture")]
    NotActive(FixtureState),
}

pub(crate) fn io_err(action: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> FixtureError {
    let path = path.into();
    move |source| FixtureError::Io { action, path, source }
}

/// Assert that `result` failed with an error whose message is exactly
/// `expected`.
#[track_caller]
pub fn assert_error_message<T: Debug, E: Display>(result: Result<T, E>, expected: &str) {
    match result {
        Ok(v) => panic!("expected error `{}`, got Ok({:?})", expected, v),
        Err(e) => assert_eq!(e.to_string(), expected),
    }
}
