//! Path templates declared in `config/core/templates.yml`.
//!
//! ```yaml
//! keys:
//!     Shot: { type: str }
//! paths:
//!     shot_root: 'shots/{Shot}'
//!     alt_shot_root:
//!         definition: 'shots/{Shot}/alt'
//!         root_name: alternate_1
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::config::descriptors::PRIMARY_ROOT;
use crate::config::pipeline::PipelineConfiguration;
use crate::config::{read_yaml, ConfigError};

#[derive(Debug, Default, Deserialize)]
struct TemplatesFile {
    #[serde(default)]
    paths: BTreeMap<String, TemplateEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TemplateEntry {
    Short(String),
    Full {
        definition: String,
        #[serde(default)]
        root_name: Option<String>,
    },
}

/// A path pattern anchored at one storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    pub name: String,
    pub definition: String,
    pub root_name: String,
}

impl PathTemplate {
    /// Substitute `{Key}` tokens from `fields` and anchor the result at the
    /// project directory of this template's root. Returns `None` when a token
    /// has no value.
    pub fn apply_fields(
        &self,
        pc: &PipelineConfiguration,
        fields: &BTreeMap<String, String>,
    ) -> Result<Option<PathBuf>, ConfigError> {
        let mut resolved = String::with_capacity(self.definition.len());
        let mut rest = self.definition.as_str();
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}') else { break };
            let key = &rest[open + 1..open + close];
            let Some(value) = fields.get(key) else { return Ok(None) };
            resolved.push_str(&rest[..open]);
            resolved.push_str(value);
            rest = &rest[open + close + 1..];
        }
        resolved.push_str(rest);

        let base = pc.project_root(&self.root_name)?;
        Ok(Some(
            resolved
                .split('/')
                .filter(|s| !s.is_empty())
                .fold(base, |acc, part| acc.join(part)),
        ))
    }
}

/// Read the templates of `pc`. A configuration without a templates file has
/// no templates. Every template must name a root defined for `pc`.
pub fn load_templates(
    pc: &PipelineConfiguration,
) -> Result<BTreeMap<String, PathTemplate>, ConfigError> {
    let file = pc.templates_location();
    let parsed: TemplatesFile = if file.is_file() {
        read_yaml(&file)?
    } else {
        TemplatesFile::default()
    };

    let mut templates = BTreeMap::new();
    for (name, entry) in parsed.paths {
        let (definition, root_name) = match entry {
            TemplateEntry::Short(definition) => (definition, None),
            TemplateEntry::Full { definition, root_name } => (definition, root_name),
        };
        let root_name = root_name.unwrap_or_else(|| PRIMARY_ROOT.to_string());
        if !pc.roots().contains_key(&root_name) {
            return Err(ConfigError::UnknownRoot {
                template: name,
                root: root_name,
            });
        }
        templates.insert(
            name.clone(),
            PathTemplate {
                name,
                definition,
                root_name,
            },
        );
    }
    tracing::debug!("loaded {} templates from {}", templates.len(), file.display());
    Ok(templates)
}
