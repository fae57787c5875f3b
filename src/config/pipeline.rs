use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::descriptors::{
    BackLink, InstallLocation, PipelineConfigDescriptor, RootPaths, RootsConfig, BACK_LINK_FILE,
    INSTALL_LOCATION_FILE, PIPELINE_CONFIG_FILE, ROOTS_FILE, TEMPLATES_FILE,
};
use crate::config::{read_yaml, ConfigError};

/// Location of the path cache database relative to the configuration root.
pub const PATH_CACHE_FILE: &str = "cache/path_cache.db";

/// Directory inside a storage root that holds the back-link file.
const STORAGE_CONFIG_DIR: &str = "tank";

/// A pipeline configuration loaded from a fixture tree.
#[derive(Debug, Clone)]
pub struct PipelineConfiguration {
    root: PathBuf,
    descriptor: PipelineConfigDescriptor,
    roots: RootsConfig,
    install_location: Option<InstallLocation>,
}

impl PipelineConfiguration {
    /// Load the configuration at `path`.
    ///
    /// `path` is either a configuration root (it contains
    /// `config/core/pipeline_configuration.yml`) or a project storage root
    /// whose `tank/config/tank_configs.yml` back-link names one for the
    /// running platform.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let root = resolve_config_root(path)?;
        let descriptor: PipelineConfigDescriptor = read_yaml(&root.join(PIPELINE_CONFIG_FILE))?;

        let roots_file = root.join(ROOTS_FILE);
        let roots = if roots_file.is_file() {
            read_yaml(&roots_file)?
        } else {
            RootsConfig::new()
        };

        let install_file = root.join(INSTALL_LOCATION_FILE);
        let install_location = if install_file.is_file() {
            Some(read_yaml(&install_file)?)
        } else {
            None
        };

        tracing::debug!(
            "loaded pipeline configuration `{}` for {} from {}",
            descriptor.pc_name,
            descriptor.project_name,
            root.display()
        );
        Ok(Self {
            root,
            descriptor,
            roots,
            install_location,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_location(&self) -> PathBuf {
        self.root.join("config")
    }

    pub fn templates_location(&self) -> PathBuf {
        self.root.join(TEMPLATES_FILE)
    }

    pub fn path_cache_location(&self) -> PathBuf {
        self.root.join(PATH_CACHE_FILE)
    }

    pub fn descriptor(&self) -> &PipelineConfigDescriptor {
        &self.descriptor
    }

    pub fn project_name(&self) -> &str {
        &self.descriptor.project_name
    }

    pub fn install_location(&self) -> Option<&InstallLocation> {
        self.install_location.as_ref()
    }

    pub fn roots(&self) -> &RootsConfig {
        &self.roots
    }

    pub fn root_names(&self) -> Vec<&str> {
        self.roots.keys().map(String::as_str).collect()
    }

    pub fn storage_root(&self, name: &str) -> Result<&RootPaths, ConfigError> {
        self.roots
            .get(name)
            .ok_or_else(|| ConfigError::MissingRoot(name.to_string()))
    }

    /// Project directory under each root on the running platform.
    pub fn project_roots(&self) -> BTreeMap<String, PathBuf> {
        self.roots
            .iter()
            .map(|(name, paths)| (name.clone(), self.project_root_under(paths.current())))
            .collect()
    }

    pub fn project_root(&self, root_name: &str) -> Result<PathBuf, ConfigError> {
        Ok(self.project_root_under(self.storage_root(root_name)?.current()))
    }

    fn project_root_under(&self, storage: &Path) -> PathBuf {
        self.descriptor
            .project_name
            .split('/')
            .fold(storage.to_path_buf(), |acc, part| acc.join(part))
    }
}

fn resolve_config_root(path: &Path) -> Result<PathBuf, ConfigError> {
    if path.join(PIPELINE_CONFIG_FILE).is_file() {
        return Ok(path.to_path_buf());
    }

    let back_link = path.join(STORAGE_CONFIG_DIR).join(BACK_LINK_FILE);
    if !back_link.is_file() {
        return Err(ConfigError::NotAPipelineConfiguration(path.to_path_buf()));
    }

    let links: Vec<BackLink> = read_yaml(&back_link)?;
    let target = links
        .iter()
        .find_map(BackLink::for_current_platform)
        .ok_or_else(|| ConfigError::NoBackLinkForPlatform {
            path: back_link.clone(),
            platform: crate::config::descriptors::platform_key(),
        })?;

    if target.join(PIPELINE_CONFIG_FILE).is_file() {
        Ok(target.to_path_buf())
    } else {
        Err(ConfigError::NotAPipelineConfiguration(target.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::descriptors::{render_roots, PRIMARY_ROOT};
    use assert_fs::prelude::*;

    fn write_config(temp: &assert_fs::TempDir) -> PathBuf {
        let tank = temp.child("project_code/tank");
        tank.child(PIPELINE_CONFIG_FILE)
            .write_str(
                &PipelineConfigDescriptor {
                    project_name: "project_code".into(),
                    pc_id: 123,
                    project_id: 1,
                    pc_name: "Primary".into(),
                }
                .render(),
            )
            .unwrap();
        tank.child(BACK_LINK_FILE)
            .write_str(&BackLink::uniform(tank.path()).render())
            .unwrap();
        let mut roots = RootsConfig::new();
        roots.insert(PRIMARY_ROOT.into(), RootPaths::uniform(temp.path()));
        tank.child(ROOTS_FILE).write_str(&render_roots(&roots).unwrap()).unwrap();
        tank.path().to_path_buf()
    }

    #[test]
    fn loads_from_config_root() {
        let temp = assert_fs::TempDir::new().unwrap();
        let tank = write_config(&temp);

        let pc = PipelineConfiguration::from_path(&tank).unwrap();
        assert_eq!(pc.root(), tank.as_path());
        assert_eq!(pc.project_name(), "project_code");
        assert_eq!(pc.descriptor().pc_id, 123);
        assert_eq!(pc.path_cache_location(), tank.join("cache/path_cache.db"));
        assert_eq!(pc.root_names(), vec!["primary"]);
        assert_eq!(pc.project_root("primary").unwrap(), temp.path().join("project_code"));
        assert!(pc.install_location().is_none());
    }

    #[test]
    fn follows_back_link_from_storage_root() {
        let temp = assert_fs::TempDir::new().unwrap();
        let tank = write_config(&temp);

        let pc = PipelineConfiguration::from_path(&temp.path().join("project_code")).unwrap();
        assert_eq!(pc.root(), tank.as_path());
    }

    #[test]
    fn unrelated_directory_is_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();
        let err = PipelineConfiguration::from_path(temp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NotAPipelineConfiguration(_)));
    }

    #[test]
    fn unknown_root_name_is_an_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        let tank = write_config(&temp);
        let pc = PipelineConfiguration::from_path(&tank).unwrap();
        assert!(matches!(pc.project_root("alternate_9"), Err(ConfigError::MissingRoot(_))));
    }
}
