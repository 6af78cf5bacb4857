//! Compiled item predicates
//!
//! A [`Predicate`] is the AND of a text match, every exact-match filter and
//! every range filter of a [`QuerySpec`]. Items missing a filtered field are
//! excluded, never an error.

use crate::core::item::ContentItem;
use crate::core::query::{FilterValue, QuerySpec};
use crate::core::schema::QuerySchema;

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Exact {
        field: String,
        value: String,
    },
    Range {
        field: String,
        min: f64,
        max: f64,
    },
}

/// A query compiled against a schema, ready to test items
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    text: String,
    text_fields: Vec<String>,
    clauses: Vec<Clause>,
}

impl Predicate {
    /// Compile the filtering part of `spec`
    ///
    /// Range bounds are scaled by the schema's per-field factor; a filter on
    /// a field the schema has no range for is compared unscaled.
    pub fn compile(spec: &QuerySpec, schema: &QuerySchema) -> Self {
        let clauses = spec
            .filters
            .iter()
            .map(|(field, value)| match value {
                FilterValue::Exact(v) => Clause::Exact {
                    field: field.clone(),
                    value: v.clone(),
                },
                FilterValue::Range { min, max } => {
                    let scale = schema.range_for_field(field).map(|r| r.scale).unwrap_or(1.0);
                    Clause::Range {
                        field: field.clone(),
                        min: min.map(|m| m * scale).unwrap_or(f64::NEG_INFINITY),
                        max: max.map(|m| m * scale).unwrap_or(f64::INFINITY),
                    }
                }
            })
            .collect();

        Self {
            text: spec.text.trim().to_lowercase(),
            text_fields: schema.text_fields.clone(),
            clauses,
        }
    }

    /// True when nothing would be filtered out
    pub fn is_trivial(&self) -> bool {
        self.text.is_empty() && self.clauses.is_empty()
    }

    /// Test one item
    pub fn matches<T: ContentItem>(&self, item: &T) -> bool {
        self.matches_text(item) && self.clauses.iter().all(|clause| Self::matches_clause(clause, item))
    }

    fn matches_text<T: ContentItem>(&self, item: &T) -> bool {
        if self.text.is_empty() {
            return true;
        }
        self.text_fields.iter().any(|field| {
            item.field_value(field)
                .is_some_and(|value| value.contains_text(&self.text))
        })
    }

    fn matches_clause<T: ContentItem>(clause: &Clause, item: &T) -> bool {
        match clause {
            Clause::Exact { field, value } => item
                .field_value(field)
                .is_some_and(|v| v.matches_exact(value)),
            Clause::Range { field, min, max } => item
                .field_value(field)
                .and_then(|v| v.as_f64())
                .is_some_and(|n| *min <= n && n <= *max),
        }
    }

    /// Filter a collection, keeping the original order
    pub fn filter<T: ContentItem>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items.into_iter().filter(|item| self.matches(item)).collect()
    }
}
