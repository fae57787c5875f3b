//! Descriptor files written into a fixture tree.
//!
//! Layout relative to a pipeline configuration root (`<project>/tank`):
//!
//! ```text
//! config/tank_configs.yml              back-link, platform -> config root
//! config/core/pipeline_configuration.yml
//! config/core/install_location.yml
//! config/core/roots.yml                root name -> per-OS paths
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

pub const BACK_LINK_FILE: &str = "config/tank_configs.yml";
pub const PIPELINE_CONFIG_FILE: &str = "config/core/pipeline_configuration.yml";
pub const INSTALL_LOCATION_FILE: &str = "config/core/install_location.yml";
pub const ROOTS_FILE: &str = "config/core/roots.yml";
pub const TEMPLATES_FILE: &str = "config/core/templates.yml";

/// Name of the primary storage root.
pub const PRIMARY_ROOT: &str = "primary";

/// Key used for the running platform in back-link files.
pub fn platform_key() -> &'static str {
    if cfg!(target_os = "windows") {
        "win32"
    } else if cfg!(target_os = "macos") {
        "darwin"
    } else {
        "linux2"
    }
}

// YAML single-quoted scalar
fn quoted(p: &Path) -> String {
    format!("'{}'", p.display().to_string().replace('\'', "''"))
}

/// One entry of a back-link file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackLink {
    #[serde(default)]
    pub darwin: Option<PathBuf>,
    #[serde(default)]
    pub linux2: Option<PathBuf>,
    #[serde(default)]
    pub win32: Option<PathBuf>,
}

impl BackLink {
    /// Same path for every platform.
    pub fn uniform(path: &Path) -> Self {
        Self {
            darwin: Some(path.to_path_buf()),
            linux2: Some(path.to_path_buf()),
            win32: Some(path.to_path_buf()),
        }
    }

    pub fn for_current_platform(&self) -> Option<&Path> {
        match platform_key() {
            "win32" => self.win32.as_deref(),
            "darwin" => self.darwin.as_deref(),
            _ => self.linux2.as_deref(),
        }
    }

    /// Render a back-link file holding just this entry.
    pub fn render(&self) -> String {
        let field = |p: &Option<PathBuf>| p.as_deref().map(quoted).unwrap_or_else(|| "null".to_string());
        format!(
            "- {{darwin: {}, linux2: {}, win32: {}}}",
            field(&self.darwin),
            field(&self.linux2),
            field(&self.win32)
        )
    }
}

/// `pipeline_configuration.yml`: which project and configuration this is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfigDescriptor {
    pub project_name: String,
    pub pc_id: i64,
    pub project_id: i64,
    pub pc_name: String,
}

impl PipelineConfigDescriptor {
    pub fn render(&self) -> String {
        format!(
            "{{ project_name: '{}', pc_id: {}, project_id: {}, pc_name: '{}'}}\n\n",
            self.project_name.replace('\'', "''"),
            self.pc_id,
            self.project_id,
            self.pc_name.replace('\'', "''")
        )
    }
}

/// `install_location.yml`: where the core install lives, per OS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallLocation {
    #[serde(rename = "Windows")]
    pub windows: PathBuf,
    #[serde(rename = "Darwin")]
    pub darwin: PathBuf,
    #[serde(rename = "Linux")]
    pub linux: PathBuf,
}

impl InstallLocation {
    pub fn uniform(path: &Path) -> Self {
        Self {
            windows: path.to_path_buf(),
            darwin: path.to_path_buf(),
            linux: path.to_path_buf(),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "Windows: {}\nDarwin: {}\nLinux: {}",
            quoted(&self.windows),
            quoted(&self.darwin),
            quoted(&self.linux)
        )
    }
}

/// Per-OS location of one storage root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootPaths {
    pub windows_path: PathBuf,
    pub linux_path: PathBuf,
    pub mac_path: PathBuf,
}

impl RootPaths {
    pub fn uniform(path: &Path) -> Self {
        Self {
            windows_path: path.to_path_buf(),
            linux_path: path.to_path_buf(),
            mac_path: path.to_path_buf(),
        }
    }

    pub fn current(&self) -> &Path {
        if cfg!(target_os = "windows") {
            &self.windows_path
        } else if cfg!(target_os = "macos") {
            &self.mac_path
        } else {
            &self.linux_path
        }
    }
}

/// `roots.yml`: root name -> per-OS paths.
pub type RootsConfig = BTreeMap<String, RootPaths>;

pub fn render_roots(roots: &RootsConfig) -> Result<String, ConfigError> {
    serde_saphyr::to_string(roots).map_err(|e| ConfigError::Serialize(e.to_string()))
}
