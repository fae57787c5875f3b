pub mod config;
pub mod fs_op;
pub mod harness;
pub mod logging;
pub mod path_cache;
pub mod record_store;
pub mod toolkit;
pub mod url_clean;

pub use crate::config::{HarnessConfig, PipelineConfiguration};
pub use crate::harness::{FixtureError, FixtureState, ProjectFixture, TestRun};
pub use crate::record_store::{Entity, LinkReference, MockRecordStore, RecordStore};
pub use crate::toolkit::Toolkit;
pub use crate::url_clean::cleanup_url;
