//! Content item abstraction shared by every listing
//!
//! Videos, external links, users, notifications and the rest all expose the
//! same shape to the query pipeline: a stable id plus named fields that can
//! be searched, filtered and sorted. [`ContentItem`] captures that shape;
//! [`Record`] is the dynamic JSON-backed implementation used for mock data,
//! the REST exposure and remote payloads.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::core::error::MutationError;
use crate::core::field::{FieldValue, ItemId};

/// A listable record the query pipeline can search, filter and sort
pub trait ContentItem: Clone + Send + Sync + 'static {
    /// Stable identifier of this item
    fn id(&self) -> ItemId;

    /// Get the value of a field by name
    ///
    /// Absent fields return `None`; the pipeline excludes such items from
    /// any filter on that field instead of failing.
    fn field_value(&self, field: &str) -> Option<FieldValue>;

    /// The stored JSON value of a field, exactly as a patch would write it
    ///
    /// Rollback captures fields through this, so it must not lose nesting or
    /// element types. `None` means the field is not stored on the item.
    fn raw_field(&self, field: &str) -> Option<Value>;

    /// Produce a copy of this item shallow-merged with `patch`
    fn with_patch(&self, patch: &Patch) -> Result<Self, MutationError>;

    /// Produce a copy of this item without the given fields
    ///
    /// Items with a fixed shape cannot drop fields; they reset them to null.
    fn without_fields(&self, fields: &[String]) -> Result<Self, MutationError> {
        let nulls = fields
            .iter()
            .fold(Patch::new(), |patch, field| patch.set(field.clone(), Value::Null));
        self.with_patch(&nulls)
    }
}

impl<T: ContentItem> ContentItem for Arc<T> {
    fn id(&self) -> ItemId {
        self.as_ref().id()
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        self.as_ref().field_value(field)
    }

    fn raw_field(&self, field: &str) -> Option<Value> {
        self.as_ref().raw_field(field)
    }

    fn with_patch(&self, patch: &Patch) -> Result<Self, MutationError> {
        self.as_ref().with_patch(patch).map(Arc::new)
    }

    fn without_fields(&self, fields: &[String]) -> Result<Self, MutationError> {
        self.as_ref().without_fields(fields).map(Arc::new)
    }
}

/// A shallow set of field updates
///
/// # Example
/// ```rust,ignore
/// let like = Patch::new().set("likes", 893);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch(Map<String, Value>);

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any earlier value for it
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Patch {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Shallow-merge a patch into any serde-representable item
///
/// Typed items implement [`ContentItem::with_patch`] with this helper: the
/// item is rendered to a JSON object, patched fields overwrite, and the
/// result is decoded back. A patch value of the wrong type, or a field the
/// item does not serialize, surfaces as [`MutationError::InvalidPatch`].
pub fn merge_patch<T>(item: &T, id: ItemId, patch: &Patch) -> Result<T, MutationError>
where
    T: Serialize + DeserializeOwned,
{
    let invalid = |message: String| MutationError::InvalidPatch {
        id: id.clone(),
        message,
    };

    let mut object = match serde_json::to_value(item).map_err(|e| invalid(e.to_string()))? {
        Value::Object(object) => object,
        other => return Err(invalid(format!("item is not an object: {}", other))),
    };

    for (field, value) in patch.fields() {
        match object.get_mut(field) {
            Some(slot) => *slot = value.clone(),
            None => return Err(invalid(format!("unknown field `{}`", field))),
        }
    }

    serde_json::from_value(Value::Object(object)).map_err(|e| invalid(e.to_string()))
}

/// A dynamic content item backed by a JSON object
///
/// The `id` field provides the identifier. Records without one share the
/// empty string id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Build a record from a JSON value; non-objects yield `None`
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl ContentItem for Record {
    fn id(&self) -> ItemId {
        self.0
            .get("id")
            .map(FieldValue::from_json)
            .and_then(|v| ItemId::from_field(&v))
            .unwrap_or_else(|| ItemId::String(String::new()))
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        self.0.get(field).map(FieldValue::from_json)
    }

    fn raw_field(&self, field: &str) -> Option<Value> {
        self.0.get(field).cloned()
    }

    fn with_patch(&self, patch: &Patch) -> Result<Self, MutationError> {
        let mut map = self.0.clone();
        for (field, value) in patch.fields() {
            map.insert(field.clone(), value.clone());
        }
        Ok(Self(map))
    }

    fn without_fields(&self, fields: &[String]) -> Result<Self, MutationError> {
        let mut map = self.0.clone();
        for field in fields {
            map.remove(field);
        }
        Ok(Self(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_json(value).expect("object")
    }

    #[test]
    fn test_record_id_and_fields() {
        let r = record(json!({"id": 1, "title": "Epic Adventure", "views": 15420}));
        assert_eq!(r.id(), ItemId::Integer(1));
        assert_eq!(r.field_value("views"), Some(FieldValue::Integer(15420)));
        assert_eq!(r.field_value("likes"), None);
    }

    #[test]
    fn test_record_without_id() {
        let r = record(json!({"title": "orphan"}));
        assert_eq!(r.id(), ItemId::String(String::new()));
    }

    #[test]
    fn test_record_from_non_object() {
        assert!(Record::from_json(json!([1, 2])).is_none());
    }

    #[test]
    fn test_record_patch_is_shallow() {
        let r = record(json!({"id": 1, "likes": 892, "meta": {"a": 1, "b": 2}}));
        let patched = r
            .with_patch(&Patch::new().set("likes", 893).set("meta", json!({"a": 5})))
            .expect("records accept any patch");

        assert_eq!(patched.get("likes"), Some(&json!(893)));
        assert_eq!(patched.get("meta"), Some(&json!({"a": 5})));
        assert_eq!(r.get("likes"), Some(&json!(892)), "original untouched");
    }

    #[test]
    fn test_merge_patch_rejects_wrong_type() {
        #[derive(Serialize, Deserialize)]
        struct Counter {
            id: i64,
            likes: u64,
        }

        let c = Counter { id: 1, likes: 2 };
        let err = merge_patch(&c, ItemId::Integer(1), &Patch::new().set("likes", "many"))
            .err()
            .expect("string into u64 must fail");
        assert!(matches!(err, MutationError::InvalidPatch { .. }));

        let ok = merge_patch(&c, ItemId::Integer(1), &Patch::new().set("likes", 3))
            .expect("numeric patch fits");
        assert_eq!(ok.likes, 3);
    }

    #[test]
    fn test_merge_patch_rejects_unknown_field() {
        #[derive(Serialize, Deserialize)]
        struct Counter {
            id: i64,
            likes: u64,
        }

        let c = Counter { id: 1, likes: 2 };
        let err = merge_patch(&c, ItemId::Integer(1), &Patch::new().set("hearts", 3))
            .err()
            .expect("hearts is not a field");
        assert!(matches!(err, MutationError::InvalidPatch { ref message, .. } if message.contains("hearts")));
    }

    #[test]
    fn test_record_raw_field_keeps_structure() {
        let r = record(json!({"id": 1, "uploader": {"name": "ann"}, "ids": [1, 2]}));
        assert_eq!(r.raw_field("uploader"), Some(json!({"name": "ann"})));
        assert_eq!(r.raw_field("ids"), Some(json!([1, 2])));
        assert_eq!(r.raw_field("missing"), None);
    }

    #[test]
    fn test_record_without_fields_removes_keys() {
        let r = record(json!({"id": 1, "pinned": true, "likes": 4}));
        let trimmed = r
            .without_fields(&["pinned".to_string(), "absent".to_string()])
            .expect("records drop any field");
        assert_eq!(trimmed.as_map().len(), 2);
        assert!(trimmed.get("pinned").is_none());
        assert_eq!(trimmed.get("likes"), Some(&json!(4)));
    }

    #[test]
    fn test_arc_item_delegates() {
        let r = Arc::new(record(json!({"id": "a", "likes": 1})));
        assert_eq!(r.id(), ItemId::String("a".to_string()));
        let patched = r.with_patch(&Patch::new().set("likes", 2)).expect("patch");
        assert!(!Arc::ptr_eq(&r, &patched));
        assert_eq!(patched.field_value("likes"), Some(FieldValue::Integer(2)));
    }
}
