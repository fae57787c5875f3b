use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::pipeline::PipelineConfiguration;
use crate::config::templates::{load_templates, PathTemplate};
use crate::config::ConfigError;
use crate::path_cache::{PathCache, PathCacheError};
use crate::record_store::{RecordStore, RecordStoreError};

#[derive(Debug, Error)]
pub enum ToolkitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    PathCache(#[from] PathCacheError),

    #[error(transparent)]
    RecordStore(#[from] RecordStoreError),

    #[error("creating folder `{path}`: {source}")]
    CreateFolder {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A loaded pipeline configuration bound to a record store.
#[derive(Debug)]
pub struct Toolkit<S: RecordStore> {
    pipeline_configuration: PipelineConfiguration,
    store: S,
    templates: BTreeMap<String, PathTemplate>,
}

impl<S: RecordStore> Toolkit<S> {
    /// Bind `store` to `pc`. Templates are not read until
    /// [`reload_templates`](Self::reload_templates).
    pub fn new(pipeline_configuration: PipelineConfiguration, store: S) -> Self {
        Self {
            pipeline_configuration,
            store,
            templates: BTreeMap::new(),
        }
    }

    pub fn pipeline_configuration(&self) -> &PipelineConfiguration {
        &self.pipeline_configuration
    }

    /// Swap in a freshly loaded configuration. Loaded templates are kept
    /// until the next reload.
    pub fn set_pipeline_configuration(&mut self, pc: PipelineConfiguration) {
        self.pipeline_configuration = pc;
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Replace the record backend, returning the previous one.
    pub fn replace_store(&mut self, store: S) -> S {
        std::mem::replace(&mut self.store, store)
    }

    pub fn templates(&self) -> &BTreeMap<String, PathTemplate> {
        &self.templates
    }

    pub fn reload_templates(&mut self) -> Result<(), ToolkitError> {
        self.templates = load_templates(&self.pipeline_configuration)?;
        Ok(())
    }

    /// Create every folder the path cache maps to `(entity_type, id)`.
    /// Returns how many folders did not exist before.
    pub fn create_filesystem_structure(&self, entity_type: &str, id: i64) -> Result<usize, ToolkitError> {
        if self.store.find_one(entity_type, id).is_none() {
            return Err(RecordStoreError::NotFound {
                entity_type: entity_type.to_string(),
                id,
            }
            .into());
        }

        let cache = PathCache::open(&self.pipeline_configuration)?;
        let paths = cache.mappings_for_entity(entity_type, id);
        cache.close()?;

        let mut created = 0;
        for path in paths? {
            if path.is_dir() {
                continue;
            }
            std::fs::create_dir_all(&path).map_err(|source| ToolkitError::CreateFolder {
                path: path.clone(),
                source,
            })?;
            created += 1;
        }
        tracing::info!("created {} folders for {} {}", created, entity_type, id);
        Ok(created)
    }
}
