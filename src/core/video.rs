//! Typed video record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::MutationError;
use crate::core::field::{FieldValue, ItemId};
use crate::core::item::{ContentItem, Patch, merge_patch};

/// A video row as served by `/api/videos`
///
/// Durations are in seconds. `popularity` is not stored; it is computed as
/// `view_count + like_count` when the pipeline asks for it. The short names
/// `likes`, `views` and `category` read and write the stored counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default)]
    pub category_slug: Option<String>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_quality() -> String {
    "HD".to_string()
}

impl Video {
    pub fn new(id: i64, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            thumbnail_url: None,
            video_url: None,
            duration: None,
            quality: default_quality(),
            category_slug: None,
            view_count: 0,
            like_count: 0,
            is_premium: false,
            tags: Vec::new(),
            created_at,
            updated_at: None,
        }
    }

    pub fn popularity(&self) -> u64 {
        self.view_count.saturating_add(self.like_count)
    }
}

/// Stored field behind a short name
fn canonical_field(field: &str) -> &str {
    match field {
        "likes" => "like_count",
        "views" => "view_count",
        "category" => "category_slug",
        other => other,
    }
}

fn count(value: u64) -> FieldValue {
    FieldValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
}

fn optional_string(value: &Option<String>) -> Option<FieldValue> {
    value.as_ref().map(|s| FieldValue::String(s.clone()))
}

impl ContentItem for Video {
    fn id(&self) -> ItemId {
        ItemId::Integer(self.id)
    }

    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "id" => Some(FieldValue::Integer(self.id)),
            "title" => Some(FieldValue::String(self.title.clone())),
            "description" => optional_string(&self.description),
            "thumbnail_url" => optional_string(&self.thumbnail_url),
            "video_url" => optional_string(&self.video_url),
            "duration" => self.duration.map(FieldValue::Integer),
            "quality" => Some(FieldValue::String(self.quality.clone())),
            "category_slug" | "category" => optional_string(&self.category_slug),
            "view_count" | "views" => Some(count(self.view_count)),
            "like_count" | "likes" => Some(count(self.like_count)),
            "is_premium" => Some(FieldValue::Boolean(self.is_premium)),
            "tags" => Some(FieldValue::List(self.tags.clone())),
            "created_at" => Some(FieldValue::DateTime(self.created_at)),
            "updated_at" => self.updated_at.map(FieldValue::DateTime),
            "popularity" => Some(count(self.popularity())),
            _ => None,
        }
    }

    fn raw_field(&self, field: &str) -> Option<Value> {
        match serde_json::to_value(self).ok()? {
            Value::Object(mut object) => object.remove(canonical_field(field)),
            _ => None,
        }
    }

    fn with_patch(&self, patch: &Patch) -> Result<Self, MutationError> {
        let canonical = patch
            .fields()
            .fold(Patch::new(), |canonical, (field, value)| {
                canonical.set(canonical_field(field), value.clone())
            });
        merge_patch(self, self.id(), &canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Video {
        let mut video = Video::new(1, "Epic Adventure", Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
        video.view_count = 15420;
        video.like_count = 892;
        video.duration = Some(600);
        video.tags = vec!["action".to_string()];
        video
    }

    #[test]
    fn test_field_aliases() {
        let video = sample();
        assert_eq!(video.field_value("views"), video.field_value("view_count"));
        assert_eq!(video.field_value("popularity"), Some(FieldValue::Integer(16312)));
        assert_eq!(video.field_value("category"), None);
        assert_eq!(video.field_value("nonexistent"), None);
    }

    #[test]
    fn test_like_patch() {
        let video = sample();
        let liked = video
            .with_patch(&Patch::new().set("like_count", 893))
            .expect("valid patch");
        assert_eq!(liked.like_count, 893);
        assert_eq!(liked.title, video.title);
    }

    #[test]
    fn test_short_names_are_writable() {
        let video = sample();
        let patched = video
            .with_patch(&Patch::new().set("likes", 893).set("views", 15421).set("category", "drama"))
            .expect("short names map to stored fields");
        assert_eq!(patched.like_count, 893);
        assert_eq!(patched.view_count, 15421);
        assert_eq!(patched.category_slug.as_deref(), Some("drama"));
        assert_eq!(patched.field_value("likes"), Some(FieldValue::Integer(893)));
    }

    #[test]
    fn test_patch_of_computed_or_unknown_field_fails() {
        let video = sample();
        for field in ["popularity", "rating"] {
            let result = video.with_patch(&Patch::new().set(field, 1));
            assert!(
                matches!(result, Err(MutationError::InvalidPatch { .. })),
                "{} must not be silently dropped",
                field
            );
        }
    }

    #[test]
    fn test_raw_field_reads_stored_json() {
        let video = sample();
        assert_eq!(video.raw_field("likes"), Some(serde_json::json!(892)));
        assert_eq!(video.raw_field("tags"), Some(serde_json::json!(["action"])));
        assert_eq!(video.raw_field("description"), Some(Value::Null));
        assert_eq!(video.raw_field("popularity"), None);
    }

    #[test]
    fn test_huge_counters_saturate() {
        let mut video = sample();
        video.view_count = u64::MAX;
        video.like_count = 10;
        assert_eq!(video.popularity(), u64::MAX);
        assert_eq!(video.field_value("views"), Some(FieldValue::Integer(i64::MAX)));
        assert_eq!(video.field_value("popularity"), Some(FieldValue::Integer(i64::MAX)));
    }

    #[test]
    fn test_patch_with_wrong_type_fails() {
        let video = sample();
        let result = video.with_patch(&Patch::new().set("like_count", "lots"));
        assert!(matches!(result, Err(MutationError::InvalidPatch { .. })));
    }

    #[test]
    fn test_deserialize_defaults() {
        let video: Video = serde_json::from_value(serde_json::json!({
            "id": 4,
            "title": "Mystery Unveiled",
            "created_at": "2024-01-14T00:00:00Z"
        }))
        .expect("minimal video decodes");
        assert_eq!(video.quality, "HD");
        assert_eq!(video.view_count, 0);
        assert!(video.tags.is_empty());
    }
}
