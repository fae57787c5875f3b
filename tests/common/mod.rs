use pipeline_fixture::fs_op::RetryPolicy;
use pipeline_fixture::logging::init_test_logging;
use pipeline_fixture::{HarnessConfig, TestRun};
use tempfile::TempDir;

/// A run rooted in its own temp dir so tests never share a data area.
pub fn start_run() -> anyhow::Result<(TempDir, TestRun)> {
    init_test_logging();
    let td = tempfile::tempdir()?;
    let config = HarnessConfig::default()
        .with_temp_root(td.path())
        .with_retry(RetryPolicy::immediate(3));
    let run = TestRun::start(config)?;
    Ok((td, run))
}
