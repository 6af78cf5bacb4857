//! Per-collection query schemas
//!
//! A [`QuerySchema`] declares which query-string keys a listing understands:
//! the free-text key and the fields it searches, exact-match filters,
//! numeric ranges, and the sort enum with its default. The same schema
//! drives normalization, predicate compilation, sorting and query-string
//! serialization, so a listing page only has to describe itself once.
//!
//! Schemas are plain serde types and can be declared in YAML:
//!
//! ```yaml
//! name: videos
//! response_key: videos
//! text_fields: [title, description, tags]
//! filters:
//!   - { param: category, field: category_slug }
//! ranges:
//!   - { field: duration, min_param: duration_min, max_param: duration_max, scale: 60 }
//! sorts:
//!   - { key: newest, rule: { kind: timestamp, field: created_at, descending: true } }
//!   - { key: popular, rule: { kind: numeric, field: view_count, descending: true } }
//! default_sort: newest
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

use crate::core::error::ConfigError;

/// Query-string keys every schema reserves for itself
pub const SORT_PARAM: &str = "sort";
pub const PAGE_PARAM: &str = "page";
pub const LIMIT_PARAM: &str = "limit";

fn default_text_param() -> String {
    "q".to_string()
}

fn default_page_size() -> usize {
    20
}

fn default_max_page_size() -> usize {
    100
}

fn default_scale() -> f64 {
    1.0
}

fn default_paginated() -> bool {
    true
}

/// Exact-match filter: query key `param` compared against item field `field`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDef {
    pub param: String,
    pub field: String,
}

/// Numeric range filter over `field`
///
/// Bounds arrive in UI units and are multiplied by `scale` before comparing
/// (the duration filter takes minutes while items store seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeDef {
    pub field: String,
    pub min_param: String,
    pub max_param: String,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

/// How a sort key orders items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SortRule {
    /// Order by a timestamp field (newest/oldest)
    Timestamp {
        field: String,
        #[serde(default)]
        descending: bool,
    },
    /// Order by a numeric field
    Numeric {
        field: String,
        #[serde(default)]
        descending: bool,
    },
    /// Sum of numeric fields, highest first
    Popularity { fields: Vec<String> },
    /// Count per elapsed hour since `timestamp_field`, highest first
    Trending {
        count_field: String,
        timestamp_field: String,
    },
    /// Case-insensitive lexicographic order, ascending
    Lexical { field: String },
}

impl SortRule {
    pub fn newest(field: impl Into<String>) -> Self {
        SortRule::Timestamp {
            field: field.into(),
            descending: true,
        }
    }

    pub fn oldest(field: impl Into<String>) -> Self {
        SortRule::Timestamp {
            field: field.into(),
            descending: false,
        }
    }

    pub fn highest(field: impl Into<String>) -> Self {
        SortRule::Numeric {
            field: field.into(),
            descending: true,
        }
    }

    pub fn lexical(field: impl Into<String>) -> Self {
        SortRule::Lexical {
            field: field.into(),
        }
    }
}

/// A named entry of a listing's sort enum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortDef {
    pub key: String,
    pub rule: SortRule,
}

/// Declares the query surface of one listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct QuerySchema {
    /// Collection name, also the REST path segment
    #[validate(length(min = 1))]
    pub name: String,

    /// Key of the item array in paginated responses (defaults to `name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_key: Option<String>,

    #[serde(default = "default_text_param")]
    #[validate(length(min = 1))]
    pub text_param: String,

    /// Fields searched by the free-text key, OR-ed together
    #[serde(default)]
    pub text_fields: Vec<String>,

    #[serde(default)]
    pub filters: Vec<FilterDef>,

    #[serde(default)]
    pub ranges: Vec<RangeDef>,

    #[validate(length(min = 1))]
    pub sorts: Vec<SortDef>,

    pub default_sort: String,

    #[serde(default = "default_page_size")]
    #[validate(range(min = 1))]
    pub default_page_size: usize,

    #[serde(default = "default_max_page_size")]
    #[validate(range(min = 1))]
    pub max_page_size: usize,

    /// Unpaginated collections are served as a bare array
    #[serde(default = "default_paginated")]
    pub paginated: bool,
}

impl QuerySchema {
    /// Start an empty schema; the first sort added becomes the default
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            response_key: None,
            text_param: default_text_param(),
            text_fields: Vec::new(),
            filters: Vec::new(),
            ranges: Vec::new(),
            sorts: Vec::new(),
            default_sort: String::new(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            paginated: true,
        }
    }

    pub fn response_key(mut self, key: impl Into<String>) -> Self {
        self.response_key = Some(key.into());
        self
    }

    pub fn search<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn filter(mut self, param: impl Into<String>, field: impl Into<String>) -> Self {
        self.filters.push(FilterDef {
            param: param.into(),
            field: field.into(),
        });
        self
    }

    pub fn range(
        mut self,
        field: impl Into<String>,
        min_param: impl Into<String>,
        max_param: impl Into<String>,
        scale: f64,
    ) -> Self {
        self.ranges.push(RangeDef {
            field: field.into(),
            min_param: min_param.into(),
            max_param: max_param.into(),
            scale,
        });
        self
    }

    pub fn sort(mut self, key: impl Into<String>, rule: SortRule) -> Self {
        let key = key.into();
        if self.default_sort.is_empty() {
            self.default_sort = key.clone();
        }
        self.sorts.push(SortDef { key, rule });
        self
    }

    pub fn default_sort(mut self, key: impl Into<String>) -> Self {
        self.default_sort = key.into();
        self
    }

    pub fn page_size(mut self, default: usize, max: usize) -> Self {
        self.default_page_size = default;
        self.max_page_size = max;
        self
    }

    pub fn unpaginated(mut self) -> Self {
        self.paginated = false;
        self
    }

    /// Key of the item array in paginated responses
    pub fn items_key(&self) -> &str {
        self.response_key.as_deref().unwrap_or(&self.name)
    }

    pub fn sort_rule(&self, key: &str) -> Option<&SortRule> {
        self.sorts.iter().find(|s| s.key == key).map(|s| &s.rule)
    }

    pub fn has_sort(&self, key: &str) -> bool {
        self.sort_rule(key).is_some()
    }

    pub fn filter_for_field(&self, field: &str) -> Option<&FilterDef> {
        self.filters.iter().find(|f| f.field == field)
    }

    pub fn range_for_field(&self, field: &str) -> Option<&RangeDef> {
        self.ranges.iter().find(|r| r.field == field)
    }

    /// Validate field constraints and cross-field rules
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;

        let schema_error = |message: String| ConfigError::Schema {
            collection: self.name.clone(),
            message,
        };

        if !self.has_sort(&self.default_sort) {
            return Err(schema_error(format!(
                "default sort '{}' is not declared",
                self.default_sort
            )));
        }

        if self.default_page_size > self.max_page_size {
            return Err(schema_error(format!(
                "default page size {} exceeds max page size {}",
                self.default_page_size, self.max_page_size
            )));
        }

        let mut seen: HashSet<&str> = [SORT_PARAM, PAGE_PARAM, LIMIT_PARAM].into_iter().collect();
        let params = std::iter::once(self.text_param.as_str())
            .chain(self.filters.iter().map(|f| f.param.as_str()))
            .chain(
                self.ranges
                    .iter()
                    .flat_map(|r| [r.min_param.as_str(), r.max_param.as_str()]),
            );
        for param in params {
            if !seen.insert(param) {
                return Err(schema_error(format!(
                    "query key '{}' is declared twice or reserved",
                    param
                )));
            }
        }

        let mut fields = HashSet::new();
        let filtered = self
            .filters
            .iter()
            .map(|f| f.field.as_str())
            .chain(self.ranges.iter().map(|r| r.field.as_str()));
        for field in filtered {
            if !fields.insert(field) {
                return Err(schema_error(format!("field '{}' has more than one filter", field)));
            }
        }

        let mut keys = HashSet::new();
        for sort in &self.sorts {
            if !keys.insert(sort.key.as_str()) {
                return Err(schema_error(format!("sort key '{}' is declared twice", sort.key)));
            }
        }

        if let Some(range) = self.ranges.iter().find(|r| !r.scale.is_finite() || r.scale <= 0.0) {
            return Err(schema_error(format!(
                "range on '{}' needs a positive scale",
                range.field
            )));
        }

        Ok(())
    }

    // === Presets ===

    /// Video search and category pages (`/api/videos`)
    pub fn videos() -> Self {
        Self::new("videos")
            .response_key("videos")
            .search(["title", "description", "tags"])
            .filter("category", "category_slug")
            .filter("tag", "tags")
            .filter("quality", "quality")
            .range("duration", "duration_min", "duration_max", 60.0)
            .sort("newest", SortRule::newest("created_at"))
            .sort("oldest", SortRule::oldest("created_at"))
            .sort("popular", SortRule::highest("view_count"))
            .sort("rating", SortRule::highest("like_count"))
    }

    /// Content directory mixing video embeds and external links
    pub fn directory() -> Self {
        Self::new("directory")
            .response_key("items")
            .search(["title", "description", "tags"])
            .filter("type", "type")
            .filter("category", "category_slug")
            .filter("tag", "tags")
            .sort("newest", SortRule::newest("created_at"))
            .sort("oldest", SortRule::oldest("created_at"))
            .sort(
                "popular",
                SortRule::Popularity {
                    fields: vec!["view_count".to_string(), "click_count".to_string()],
                },
            )
            .sort("title", SortRule::lexical("title"))
    }

    /// A user's favorited videos
    pub fn favorites() -> Self {
        Self::new("favorites")
            .response_key("videos")
            .search(["title"])
            .sort("newest", SortRule::newest("favorited_at"))
            .sort("oldest", SortRule::oldest("favorited_at"))
            .sort("title", SortRule::lexical("title"))
            .sort("duration", SortRule::highest("duration"))
    }

    /// Community discussions
    pub fn community() -> Self {
        Self::new("discussions")
            .response_key("discussions")
            .search(["title", "content", "tags"])
            .filter("category", "category")
            .sort(
                "trending",
                SortRule::Trending {
                    count_field: "views".to_string(),
                    timestamp_field: "createdAt".to_string(),
                },
            )
            .sort(
                "popular",
                SortRule::Popularity {
                    fields: vec!["views".to_string(), "likes".to_string()],
                },
            )
            .sort("newest", SortRule::newest("createdAt"))
            .default_sort("trending")
    }

    /// Admin user management table
    pub fn users() -> Self {
        Self::new("users")
            .response_key("users")
            .search(["username", "email"])
            .filter("status", "status")
            .filter("role", "role")
            .sort("newest", SortRule::newest("joinDate"))
            .sort("reputation", SortRule::highest("reputation"))
            .sort("username", SortRule::lexical("username"))
            .page_size(25, 100)
    }

    /// Notification center
    pub fn notifications() -> Self {
        Self::new("notifications")
            .response_key("notifications")
            .search(["title", "message"])
            .filter("type", "type")
            .filter("read", "isRead")
            .sort("newest", SortRule::newest("timestamp"))
            .sort("oldest", SortRule::oldest("timestamp"))
    }

    /// Category list, served as a bare array
    pub fn categories() -> Self {
        Self::new("categories")
            .search(["name", "description"])
            .sort("name", SortRule::lexical("name"))
            .page_size(100, 1000)
            .unpaginated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_pass_checks() {
        for schema in [
            QuerySchema::videos(),
            QuerySchema::directory(),
            QuerySchema::favorites(),
            QuerySchema::community(),
            QuerySchema::users(),
            QuerySchema::notifications(),
            QuerySchema::categories(),
        ] {
            schema
                .check()
                .unwrap_or_else(|e| panic!("{} preset invalid: {}", schema.name, e));
        }
    }

    #[test]
    fn test_first_sort_is_default() {
        let schema = QuerySchema::new("x")
            .sort("a", SortRule::lexical("title"))
            .sort("b", SortRule::newest("created_at"));
        assert_eq!(schema.default_sort, "a");
        assert_eq!(QuerySchema::community().default_sort, "trending");
    }

    #[test]
    fn test_undeclared_default_sort_rejected() {
        let schema = QuerySchema::videos().default_sort("hot");
        let err = schema.check().expect_err("hot is not a sort key");
        assert!(err.to_string().contains("default sort 'hot'"));
    }

    #[test]
    fn test_reserved_param_rejected() {
        let schema = QuerySchema::videos().filter("page", "page_number");
        assert!(schema.check().is_err());
    }

    #[test]
    fn test_page_size_bounds() {
        let schema = QuerySchema::videos().page_size(0, 10);
        assert!(matches!(schema.check(), Err(ConfigError::Invalid(_))));

        let schema = QuerySchema::videos().page_size(50, 10);
        assert!(matches!(schema.check(), Err(ConfigError::Schema { .. })));
    }

    #[test]
    fn test_items_key_defaults_to_name() {
        assert_eq!(QuerySchema::categories().items_key(), "categories");
        assert_eq!(QuerySchema::directory().items_key(), "items");
    }

    #[test]
    fn test_yaml_roundtrip() {
        let schema = QuerySchema::videos();
        let yaml = serde_yaml::to_string(&schema).expect("serialize should succeed");
        assert!(yaml.contains("kind: timestamp"));
        let parsed: QuerySchema = serde_yaml::from_str(&yaml).expect("parse should succeed");
        assert_eq!(parsed, schema);
    }
}
