//! Entity records and the backends that store them.

pub mod entity;
pub mod mock;

use thiserror::Error;

pub use entity::{Entity, LinkReference};
pub use mock::MockRecordStore;

#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("entity is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` of {entity_type} {id} is a mapping without an integer `id` and string `type`")]
    MalformedLink {
        entity_type: String,
        id: i64,
        field: String,
    },

    #[error("no {entity_type} with id {id}")]
    NotFound { entity_type: String, id: i64 },

    #[error("invalid entity: {0}")]
    Json(#[from] serde_json::Error),
}

/// Insert/lookup contract shared by the production client and the
/// in-memory substitute.
pub trait RecordStore {
    /// Insert or replace `entity`, keyed by `(type, id)`.
    fn insert(&mut self, entity: Entity) -> Result<(), RecordStoreError>;

    fn find_one(&self, entity_type: &str, id: i64) -> Option<&Entity>;

    fn insert_many<I>(&mut self, entities: I) -> Result<(), RecordStoreError>
    where
        I: IntoIterator<Item = Entity>,
        Self: Sized,
    {
        for entity in entities {
            self.insert(entity)?;
        }
        Ok(())
    }
}
