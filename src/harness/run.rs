use std::fs;
use std::path::{Path, PathBuf};

use crate::config::HarnessConfig;
use crate::fs_op::backup::{BackupRotator, RotateOutcome};
use crate::harness::{io_err, FixtureError};

/// The data area shared by every test of one run.
///
/// Created once per run, it holds a studio-level `tank` directory plus one
/// directory per project fixture.
#[derive(Debug)]
pub struct TestRun {
    config: HarnessConfig,
    tank_temp: PathBuf,
    rotator: BackupRotator,
}

impl TestRun {
    /// Create `<temp_root>/<prefix>_<secs>.<micros>` and the studio layout
    /// inside it. Anything already at that location is rotated away first.
    pub fn start(config: HarnessConfig) -> Result<Self, FixtureError> {
        let now = chrono::Utc::now();
        let dir_name = format!(
            "{}_{}.{:06}",
            config.data_dir_prefix,
            now.timestamp(),
            now.timestamp_subsec_micros()
        );
        let tank_temp = config.temp_root().join(dir_name);
        tracing::info!("Tank test data location: {}", tank_temp.display());

        let rotator = BackupRotator::new(config.retry.clone());
        rotator.rotate(&tank_temp)?;
        fs::create_dir_all(&tank_temp).map_err(io_err("creating", &tank_temp))?;

        let run = Self {
            config,
            tank_temp,
            rotator,
        };
        let studio = run.studio_root();
        for dir in [
            studio.join("config").join("core"),
            studio.join("doc"),
            studio.join("install").join("engines"),
        ] {
            fs::create_dir_all(&dir).map_err(io_err("creating", &dir))?;
        }
        Ok(run)
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn tank_temp(&self) -> &Path {
        &self.tank_temp
    }

    /// Studio-level `tank` directory.
    pub fn studio_root(&self) -> PathBuf {
        self.tank_temp.join("tank")
    }

    pub fn test_data_path(&self) -> &Path {
        &self.config.test_data_path
    }

    pub fn rotator(&self) -> &BackupRotator {
        &self.rotator
    }

    /// Rotate `path` to its backup using this run's retry policy.
    pub fn rotate(&self, path: &Path) -> Result<RotateOutcome, FixtureError> {
        Ok(self.rotator.rotate(path)?)
    }
}
