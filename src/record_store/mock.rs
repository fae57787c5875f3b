use std::collections::BTreeMap;

use crate::record_store::{Entity, RecordStore, RecordStoreError};
use crate::url_clean::cleanup_url;

/// In-memory stand-in for the record service.
///
/// Records are keyed by `(type, id)`. Nested entity mappings are replaced by
/// link references on insert, so stored records are at most one level deep.
#[derive(Debug, Default, Clone)]
pub struct MockRecordStore {
    base_url: String,
    script_name: String,
    api_key: String,
    db: BTreeMap<String, BTreeMap<i64, Entity>>,
}

impl MockRecordStore {
    /// Create an empty store that reports itself as connected to
    /// `server_url` (reduced to `scheme://netloc`).
    pub fn connect(server_url: &str, script_name: &str, api_key: &str) -> Self {
        Self {
            base_url: cleanup_url(server_url),
            script_name: script_name.to_string(),
            api_key: api_key.to_string(),
            db: BTreeMap::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Lookup that also sees retired records.
    pub fn get(&self, entity_type: &str, id: i64) -> Option<&Entity> {
        self.db.get(entity_type).and_then(|by_id| by_id.get(&id))
    }

    /// Soft-delete a record. It stays in the store but `find_one` no longer
    /// returns it.
    pub fn retire(&mut self, entity_type: &str, id: i64) -> Result<(), RecordStoreError> {
        let entity = self
            .db
            .get_mut(entity_type)
            .and_then(|by_id| by_id.get_mut(&id))
            .ok_or_else(|| RecordStoreError::NotFound {
                entity_type: entity_type.to_string(),
                id,
            })?;
        entity.retired = true;
        Ok(())
    }

    /// Live records of one type, ordered by id.
    pub fn entities_of_type<'a>(&'a self, entity_type: &str) -> impl Iterator<Item = &'a Entity> + 'a {
        self.db
            .get(entity_type)
            .into_iter()
            .flat_map(|by_id| by_id.values())
            .filter(|e| !e.retired)
    }

    pub fn len(&self) -> usize {
        self.db.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pretty JSON of every record, grouped by type.
    pub fn dump(&self) -> String {
        serde_json::to_string_pretty(&self.db).unwrap_or_else(|e| format!("<unprintable: {}>", e))
    }
}

impl RecordStore for MockRecordStore {
    fn insert(&mut self, mut entity: Entity) -> Result<(), RecordStoreError> {
        entity.normalize_links()?;
        tracing::debug!("mock store <- {} {}", entity.entity_type, entity.id);
        self.db
            .entry(entity.entity_type.clone())
            .or_default()
            .insert(entity.id, entity);
        Ok(())
    }

    fn find_one(&self, entity_type: &str, id: i64) -> Option<&Entity> {
        self.get(entity_type, id).filter(|e| !e.retired)
    }
}
