//! Query normalization and paginated results
//!
//! [`QuerySpec`] is the normalized form of a listing's current query. It is
//! built from URL-style key/value pairs by [`QuerySpec::normalize`], which
//! never fails: malformed input degrades to "no filter" or to the schema's
//! defaults, because a listing must never show an error for a bad query
//! string.
//!
//! # Example
//! ```rust,ignore
//! let schema = QuerySchema::videos();
//! let spec = QuerySpec::from_query_string("q=Epic&sort=popular&page=2&limit=10", &schema);
//! assert_eq!(spec.text, "epic");
//! assert_eq!(spec.to_query_string(&schema), "q=epic&sort=popular&page=2&limit=10");
//! ```

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::core::error::SourceError;
use crate::core::schema::{LIMIT_PARAM, PAGE_PARAM, QuerySchema, SORT_PARAM};

/// Value of an active filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterValue {
    /// Exact string match (membership for list fields)
    Exact(String),
    /// Inclusive numeric range in UI units; `None` is unbounded
    Range { min: Option<f64>, max: Option<f64> },
}

/// Normalized search/filter/sort/page state of a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Trimmed, lower-cased free text; empty means no text filter
    pub text: String,

    /// Active filters keyed by item field, in schema declaration order
    pub filters: IndexMap<String, FilterValue>,

    /// One of the schema's sort keys
    pub sort: String,

    /// Page number (starts at 1)
    pub page: usize,

    /// Items per page (at least 1)
    pub page_size: usize,
}

fn parse_bound(raw: Option<&String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

fn parse_positive(raw: Option<&String>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
}

fn format_bound(value: f64) -> String {
    value.to_string()
}

fn is_no_filter(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("all")
}

impl QuerySpec {
    /// The query a listing shows before any user input
    pub fn defaults(schema: &QuerySchema) -> Self {
        Self {
            text: String::new(),
            filters: IndexMap::new(),
            sort: schema.default_sort.clone(),
            page: 1,
            page_size: schema.default_page_size.max(1),
        }
    }

    /// Normalize raw key/value pairs against a schema
    ///
    /// Repeated keys keep their last value. Unknown keys are ignored.
    pub fn normalize<I, K, V>(pairs: I, schema: &QuerySchema) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let raw: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();

        let text = raw
            .get(&schema.text_param)
            .map(|t| t.trim().to_lowercase())
            .unwrap_or_default();

        let mut filters = IndexMap::new();

        for def in &schema.filters {
            let Some(value) = raw.get(&def.param).map(|v| v.trim()) else {
                continue;
            };
            if is_no_filter(value) {
                continue;
            }
            filters.insert(def.field.clone(), FilterValue::Exact(value.to_string()));
        }

        for def in &schema.ranges {
            let min = parse_bound(raw.get(&def.min_param));
            let max = parse_bound(raw.get(&def.max_param));
            if min.is_none() && max.is_none() {
                continue;
            }
            filters.insert(def.field.clone(), FilterValue::Range { min, max });
        }

        let requested_sort = raw.get(SORT_PARAM).map(|s| s.trim()).unwrap_or_default();
        let sort = if schema.has_sort(requested_sort) {
            requested_sort.to_string()
        } else {
            if !requested_sort.is_empty() {
                tracing::debug!(
                    collection = %schema.name,
                    requested = %requested_sort,
                    fallback = %schema.default_sort,
                    "Unknown sort key, using default"
                );
            }
            schema.default_sort.clone()
        };

        let page = parse_positive(raw.get(PAGE_PARAM)).unwrap_or(1).max(1);
        let page_size = parse_positive(raw.get(LIMIT_PARAM))
            .unwrap_or(schema.default_page_size)
            .clamp(1, schema.max_page_size.max(1));

        Self {
            text,
            filters,
            sort,
            page,
            page_size,
        }
    }

    /// Normalize a URL query string (with or without the leading `?`)
    pub fn from_query_string(query: &str, schema: &QuerySchema) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::normalize(url::form_urlencoded::parse(query.as_bytes()), schema)
    }

    /// Serialize back to the schema's query keys
    ///
    /// Normalizing the returned pairs reproduces an equal spec.
    pub fn to_query_pairs(&self, schema: &QuerySchema) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        if !self.text.is_empty() {
            pairs.push((schema.text_param.clone(), self.text.clone()));
        }

        for (field, value) in &self.filters {
            match value {
                FilterValue::Exact(v) => {
                    if let Some(def) = schema.filter_for_field(field) {
                        pairs.push((def.param.clone(), v.clone()));
                    }
                }
                FilterValue::Range { min, max } => {
                    if let Some(def) = schema.range_for_field(field) {
                        if let Some(min) = min {
                            pairs.push((def.min_param.clone(), format_bound(*min)));
                        }
                        if let Some(max) = max {
                            pairs.push((def.max_param.clone(), format_bound(*max)));
                        }
                    }
                }
            }
        }

        pairs.push((SORT_PARAM.to_string(), self.sort.clone()));
        pairs.push((PAGE_PARAM.to_string(), self.page.to_string()));
        pairs.push((LIMIT_PARAM.to_string(), self.page_size.to_string()));
        pairs
    }

    /// Serialize to a form-urlencoded query string
    pub fn to_query_string(&self, schema: &QuerySchema) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.to_query_pairs(schema))
            .finish()
    }

    // === Builder-style setters ===

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.trim().to_lowercase();
        self
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into().trim().to_string();
        let field = field.into();
        if is_no_filter(&value) {
            self.filters.shift_remove(&field);
        } else {
            self.filters.insert(field, FilterValue::Exact(value));
        }
        self
    }

    pub fn with_range(mut self, field: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        let field = field.into();
        let min = min.filter(|n| n.is_finite());
        let max = max.filter(|n| n.is_finite());
        if min.is_none() && max.is_none() {
            self.filters.shift_remove(&field);
        } else {
            self.filters.insert(field, FilterValue::Range { min, max });
        }
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = sort.into();
        self
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

/// One page of a filtered, sorted listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// The contiguous slice for this page
    pub items: Vec<T>,

    /// Number of items after filtering
    pub total: usize,

    /// Page number (starts at 1, clamped to `total_pages`)
    pub page: usize,

    /// Requested page size
    pub page_size: usize,

    /// `max(1, ceil(total / page_size))`
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Pagination metadata in the wire shape
    pub fn pagination(&self) -> PaginationMeta {
        PaginationMeta::new(self.page, self.page_size, self.total)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

impl<T: Serialize> Page<T> {
    /// Render as `{ <key>: [...], pagination: {...} }`
    pub fn to_envelope(&self, key: &str) -> serde_json::Result<Value> {
        let mut envelope = serde_json::Map::new();
        envelope.insert(key.to_string(), serde_json::to_value(&self.items)?);
        envelope.insert("pagination".to_string(), serde_json::to_value(self.pagination())?);
        Ok(Value::Object(envelope))
    }
}

impl<T: DeserializeOwned> Page<T> {
    /// Decode a listing response
    ///
    /// Accepts the paginated envelope (items under `key`, falling back to
    /// `data` or `items`) or a bare array, which decodes as a single page
    /// holding every item.
    pub fn from_envelope(body: Value, key: &str) -> Result<Self, SourceError> {
        let decode = |e: serde_json::Error| SourceError::Decode(e.to_string());

        let mut object = match body {
            Value::Array(values) => {
                let items: Vec<T> = serde_json::from_value(Value::Array(values)).map_err(decode)?;
                let total = items.len();
                return Ok(Self {
                    items,
                    total,
                    page: 1,
                    page_size: total.max(1),
                    total_pages: 1,
                });
            }
            Value::Object(object) => object,
            other => {
                return Err(SourceError::Decode(format!(
                    "expected an object or array, got {}",
                    other
                )));
            }
        };

        let raw_items = [key, "data", "items"]
            .iter()
            .find_map(|k| object.remove(*k))
            .ok_or_else(|| SourceError::Decode(format!("missing '{}' array", key)))?;
        let items: Vec<T> = serde_json::from_value(raw_items).map_err(decode)?;

        let meta = match object.remove("pagination") {
            Some(raw) => serde_json::from_value::<PaginationMeta>(raw).map_err(decode)?,
            None => PaginationMeta::new(1, items.len(), items.len()),
        };

        Ok(Self {
            items,
            total: meta.total,
            page: meta.page.max(1),
            page_size: meta.limit.max(1),
            total_pages: meta.total_pages.max(1),
        })
    }
}

/// Pagination metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub page: usize,

    /// Number of items per page
    pub limit: usize,

    /// Total number of items (after filters)
    pub total: usize,

    /// Total number of pages
    pub total_pages: usize,

    /// Whether there is a next page
    #[serde(default)]
    pub has_next: bool,

    /// Whether there is a previous page
    #[serde(default)]
    pub has_prev: bool,
}

impl PaginationMeta {
    /// Create pagination metadata from calculation
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        // Ensure limit is at least 1 to avoid division by zero
        let limit = limit.max(1);
        let page = page.max(1);
        let total_pages = total.div_ceil(limit).max(1);
        let start = (page - 1) * limit;

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: start + limit < total,
            has_prev: page > 1,
        }
    }
}
