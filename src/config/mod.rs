//! Reading and writing the on-disk configuration a fixture tree provides.

pub mod descriptors;
pub mod harness;
pub mod pipeline;
pub mod templates;

use std::path::PathBuf;

use thiserror::Error;

pub use descriptors::{BackLink, InstallLocation, PipelineConfigDescriptor, RootPaths, RootsConfig};
pub use harness::HarnessConfig;
pub use pipeline::PipelineConfiguration;
pub use templates::PathTemplate;

/// Errors raised while resolving configuration from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in `{path}`: {message}")]
    Yaml { path: PathBuf, message: String },

    #[error("serializing descriptor: {0}")]
    Serialize(String),

    #[error("`{0}` is not a pipeline configuration or a storage root that links to one")]
    NotAPipelineConfiguration(PathBuf),

    #[error("back-link file `{path}` has no entry for platform `{platform}`")]
    NoBackLinkForPlatform { path: PathBuf, platform: &'static str },

    #[error("root `{0}` is not defined in the roots descriptor")]
    MissingRoot(String),

    #[error("template `{template}` refers to undefined root `{root}`")]
    UnknownRoot { template: String, root: String },

    #[error("invalid harness configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

pub(crate) fn read_yaml<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_saphyr::from_str(&text).map_err(|e| ConfigError::Yaml {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
