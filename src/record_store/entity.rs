use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record_store::RecordStoreError;

/// Entity type whose display name lives in `content`.
pub const TASK_TYPE: &str = "Task";

/// A typed record. `entity_type` and `id` form its key; anything beyond the
/// known fields lives in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "__retired", default)]
    pub retired: bool,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>, id: i64) -> Self {
        Self {
            entity_type: entity_type.into(),
            id,
            name: None,
            retired: false,
            fields: Map::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Build an entity from a JSON object such as
    /// `{"type": "Shot", "id": 5, "code": "sh_010"}`.
    pub fn from_value(value: Value) -> Result<Self, RecordStoreError> {
        let Value::Object(map) = &value else {
            return Err(RecordStoreError::MissingField("type"));
        };
        if !map.get("type").is_some_and(Value::is_string) {
            return Err(RecordStoreError::MissingField("type"));
        }
        if !map.get("id").is_some_and(|v| v.as_i64().is_some()) {
            return Err(RecordStoreError::MissingField("id"));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn code(&self) -> Option<&str> {
        self.fields.get("code").and_then(Value::as_str)
    }

    /// Copy `code` into `name` when no name is set.
    pub fn fill_name_from_code(&mut self) {
        if self.name.is_none() {
            self.name = self.code().map(str::to_string);
        }
    }

    pub fn to_link(&self) -> LinkReference {
        let name = self
            .name
            .clone()
            .or_else(|| self.code().map(str::to_string))
            .unwrap_or_else(|| autogenerated_name(&self.entity_type, self.id));
        LinkReference {
            entity_type: self.entity_type.clone(),
            id: self.id,
            name,
        }
    }

    /// Rewrite every nested entity-shaped mapping into a [`LinkReference`].
    pub(crate) fn normalize_links(&mut self) -> Result<(), RecordStoreError> {
        let entity_type = &self.entity_type;
        let id = self.id;
        for (key, value) in self.fields.iter_mut() {
            if let Value::Object(nested) = value {
                let link = LinkReference::from_nested(nested).ok_or_else(|| {
                    RecordStoreError::MalformedLink {
                        entity_type: entity_type.clone(),
                        id,
                        field: key.clone(),
                    }
                })?;
                *value = link.to_value();
            }
        }
        Ok(())
    }
}

/// A `{type, id, name}` pointer to another entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkReference {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub id: i64,
    pub name: String,
}

impl LinkReference {
    /// Derive a link from a nested entity mapping. The name comes from, in
    /// order: `name`, `content` for tasks, `code`, else a synthesized
    /// `autogenerated_<type>_id_<id>`.
    pub fn from_nested(nested: &Map<String, Value>) -> Option<Self> {
        let entity_type = nested.get("type")?.as_str()?.to_string();
        let id = nested.get("id")?.as_i64()?;
        let text = |key: &str| nested.get(key).and_then(Value::as_str).map(str::to_string);

        let name = text("name")
            .or_else(|| (entity_type == TASK_TYPE).then(|| text("content")).flatten())
            .or_else(|| text("code"))
            .unwrap_or_else(|| autogenerated_name(&entity_type, id));

        Some(Self {
            entity_type,
            id,
            name,
        })
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "type": self.entity_type,
            "id": self.id,
            "name": self.name,
        })
    }
}

fn autogenerated_name(entity_type: &str, id: i64) -> String {
    format!("autogenerated_{}_id_{}", entity_type, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn link_of(v: Value) -> LinkReference {
        let Value::Object(map) = v else { panic!("not an object") };
        LinkReference::from_nested(&map).expect("link")
    }

    #[test]
    fn code_fills_missing_name_only() {
        let mut shot = Entity::new("Shot", 2).with_field("code", "sh_020");
        shot.fill_name_from_code();
        assert_eq!(shot.name.as_deref(), Some("sh_020"));

        let mut named = Entity::new("Shot", 3).with_name("hero").with_field("code", "sh_030");
        named.fill_name_from_code();
        assert_eq!(named.name.as_deref(), Some("hero"));

        let mut bare = Entity::new("Shot", 4);
        bare.fill_name_from_code();
        assert!(bare.name.is_none());
    }

    #[test]
    fn link_name_precedence() {
        assert_eq!(
            link_of(json!({"type": "Camera", "id": 9, "name": "main", "code": "camA"})).name,
            "main"
        );
        assert_eq!(
            link_of(json!({"type": "Task", "id": 3, "content": "Animate", "code": "anim"})).name,
            "Animate"
        );
        assert_eq!(link_of(json!({"type": "Camera", "id": 9, "code": "camA"})).name, "camA");
        assert_eq!(
            link_of(json!({"type": "Sequence", "id": 4})).name,
            "autogenerated_Sequence_id_4"
        );
    }

    #[test]
    fn content_only_counts_for_tasks() {
        assert_eq!(
            link_of(json!({"type": "Note", "id": 2, "content": "hello"})).name,
            "autogenerated_Note_id_2"
        );
    }

    #[test]
    fn from_value_requires_type_and_id() {
        assert!(Entity::from_value(json!({"id": 1})).is_err());
        assert!(Entity::from_value(json!({"type": "Shot", "id": "x"})).is_err());
        assert!(Entity::from_value(json!([1, 2])).is_err());

        let e = Entity::from_value(json!({"type": "Shot", "id": 5, "code": "sh_010"})).unwrap();
        assert_eq!(e.entity_type, "Shot");
        assert_eq!(e.id, 5);
        assert_eq!(e.code(), Some("sh_010"));
        assert!(!e.retired);
    }

    #[test]
    fn serializes_flat() {
        let e = Entity::new("Project", 1)
            .with_name("project_name")
            .with_field("tank_name", "project_code");
        assert_eq!(
            serde_json::to_value(&e).unwrap(),
            json!({
                "type": "Project",
                "id": 1,
                "name": "project_name",
                "__retired": false,
                "tank_name": "project_code",
            })
        );
    }
}
