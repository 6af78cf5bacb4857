//! Comparators compiled from sort keys
//!
//! Sorting is stable: items with equal keys keep their insertion order, so
//! re-running an unchanged query never reorders a listing. Items without a
//! value for the sort key go after every item that has one, whatever the
//! direction.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use crate::core::item::ContentItem;
use crate::core::query::QuerySpec;
use crate::core::schema::{QuerySchema, SortRule};

#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Number(f64),
    Text { folded: String, raw: String },
}

impl SortKey {
    fn cmp_ascending(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (
                SortKey::Text { folded: fa, raw: ra },
                SortKey::Text { folded: fb, raw: rb },
            ) => fa.cmp(fb).then_with(|| ra.cmp(rb)),
            (SortKey::Number(_), SortKey::Text { .. }) => Ordering::Less,
            (SortKey::Text { .. }, SortKey::Number(_)) => Ordering::Greater,
        }
    }
}

/// Total order over content items for one sort rule
#[derive(Debug, Clone)]
pub struct Comparator {
    rule: Option<SortRule>,
    now: DateTime<Utc>,
}

impl Comparator {
    /// Build a comparator; `now` anchors trending computations
    pub fn new(rule: &SortRule, now: DateTime<Utc>) -> Self {
        Self {
            rule: Some(rule.clone()),
            now,
        }
    }

    /// Resolve the spec's sort key against the schema
    ///
    /// Unknown keys fall back to the schema default. A schema that declares
    /// neither leaves the input order untouched.
    pub fn for_spec(spec: &QuerySpec, schema: &QuerySchema, now: DateTime<Utc>) -> Self {
        let rule = schema
            .sort_rule(&spec.sort)
            .or_else(|| schema.sort_rule(&schema.default_sort))
            .cloned();
        Self { rule, now }
    }

    fn descending(&self) -> bool {
        match &self.rule {
            Some(SortRule::Timestamp { descending, .. } | SortRule::Numeric { descending, .. }) => {
                *descending
            }
            Some(SortRule::Popularity { .. } | SortRule::Trending { .. }) => true,
            Some(SortRule::Lexical { .. }) | None => false,
        }
    }

    fn key<T: ContentItem>(&self, item: &T) -> Option<SortKey> {
        match self.rule.as_ref()? {
            SortRule::Timestamp { field, .. } => item
                .field_value(field)?
                .as_timestamp()
                .map(|ts| SortKey::Number(ts.timestamp_millis() as f64)),
            SortRule::Numeric { field, .. } => {
                item.field_value(field)?.as_f64().map(SortKey::Number)
            }
            SortRule::Popularity { fields } => {
                let counts: Vec<f64> = fields
                    .iter()
                    .filter_map(|f| item.field_value(f).and_then(|v| v.as_f64()))
                    .collect();
                if counts.is_empty() {
                    None
                } else {
                    Some(SortKey::Number(counts.iter().sum()))
                }
            }
            SortRule::Trending {
                count_field,
                timestamp_field,
            } => {
                let count = item.field_value(count_field)?.as_f64()?;
                let created = item.field_value(timestamp_field)?.as_timestamp()?;
                // Whole hours since creation, at least one
                let hours = (self.now - created).num_hours().max(1) as f64;
                Some(SortKey::Number(count / hours))
            }
            SortRule::Lexical { field } => {
                let raw = item.field_value(field)?.to_filter_string()?;
                Some(SortKey::Text {
                    folded: raw.to_lowercase(),
                    raw,
                })
            }
        }
    }

    fn compare_keys(&self, a: &Option<SortKey>, b: &Option<SortKey>) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => {
                let ord = a.cmp_ascending(b);
                if self.descending() { ord.reverse() } else { ord }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    /// Compare two items
    pub fn compare<T: ContentItem>(&self, a: &T, b: &T) -> Ordering {
        self.compare_keys(&self.key(a), &self.key(b))
    }

    /// Sort a collection stably
    ///
    /// Keys are computed once per item before sorting.
    pub fn sort<T: ContentItem>(&self, items: Vec<T>) -> Vec<T> {
        if self.rule.is_none() {
            return items;
        }
        let mut keyed: Vec<(Option<SortKey>, T)> =
            items.into_iter().map(|item| (self.key(&item), item)).collect();
        keyed.sort_by(|(a, _), (b, _)| self.compare_keys(a, b));
        keyed.into_iter().map(|(_, item)| item).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::item::Record;
    use chrono::{Duration, TimeZone};
    use serde_json::{Value, json};

    fn item(value: Value) -> Record {
        Record::from_json(value).expect("object")
    }

    fn ids(items: &[Record]) -> Vec<i64> {
        items
            .iter()
            .map(|r| r.get("id").and_then(|v| v.as_i64()).expect("id"))
            .collect()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_newest_and_oldest() {
        let items = vec![
            item(json!({"id": 1, "created_at": "2024-01-15"})),
            item(json!({"id": 2, "created_at": "2024-01-14"})),
            item(json!({"id": 3, "created_at": "2024-01-16 08:00:00"})),
        ];
        let newest = Comparator::new(&SortRule::newest("created_at"), now());
        assert_eq!(ids(&newest.sort(items.clone())), vec![3, 1, 2]);

        let oldest = Comparator::new(&SortRule::oldest("created_at"), now());
        assert_eq!(ids(&oldest.sort(items)), vec![2, 1, 3]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let items: Vec<Record> = (1..=6)
            .map(|id| {
                let views = if id % 2 == 0 { 10 } else { 20 };
                item(json!({"id": id, "views": views}))
            })
            .collect();
        let popular = Comparator::new(&SortRule::highest("views"), now());
        let once = popular.sort(items.clone());
        assert_eq!(ids(&once), vec![1, 3, 5, 2, 4, 6]);
        assert_eq!(popular.sort(once.clone()), once);
    }

    #[test]
    fn test_missing_values_sort_last_in_both_directions() {
        let items = vec![
            item(json!({"id": 1})),
            item(json!({"id": 2, "rating": 3})),
            item(json!({"id": 3, "rating": 5})),
        ];
        let desc = Comparator::new(&SortRule::highest("rating"), now());
        assert_eq!(ids(&desc.sort(items.clone())), vec![3, 2, 1]);

        let asc = Comparator::new(
            &SortRule::Numeric {
                field: "rating".to_string(),
                descending: false,
            },
            now(),
        );
        assert_eq!(ids(&asc.sort(items)), vec![2, 3, 1]);
    }

    #[test]
    fn test_popularity_sums_fields() {
        let rule = SortRule::Popularity {
            fields: vec!["view_count".to_string(), "click_count".to_string()],
        };
        let items = vec![
            item(json!({"id": 1, "view_count": 40})),
            item(json!({"id": 2, "click_count": 90})),
            item(json!({"id": 3, "view_count": 50, "click_count": 45})),
        ];
        assert_eq!(ids(&Comparator::new(&rule, now()).sort(items)), vec![3, 2, 1]);
    }

    #[test]
    fn test_trending_guards_fresh_items() {
        let rule = SortRule::Trending {
            count_field: "views".to_string(),
            timestamp_field: "createdAt".to_string(),
        };
        let just_now = now().to_rfc3339();
        let two_days = (now() - Duration::hours(48)).to_rfc3339();
        let future = (now() + Duration::hours(3)).to_rfc3339();
        let items = vec![
            item(json!({"id": 1, "views": 960, "createdAt": two_days})), // 20/h
            item(json!({"id": 2, "views": 30, "createdAt": just_now})),  // 30/h
            item(json!({"id": 3, "views": 25, "createdAt": future})),    // 25/h
        ];
        assert_eq!(ids(&Comparator::new(&rule, now()).sort(items)), vec![2, 3, 1]);
    }

    #[test]
    fn test_lexical_ignores_case() {
        let items = vec![
            item(json!({"id": 1, "title": "beta"})),
            item(json!({"id": 2, "title": "Alpha"})),
            item(json!({"id": 3, "title": "alpha"})),
        ];
        let by_title = Comparator::new(&SortRule::lexical("title"), now());
        assert_eq!(ids(&by_title.sort(items)), vec![2, 3, 1]);
    }

    #[test]
    fn test_for_spec_falls_back_to_default() {
        let schema = QuerySchema::videos();
        let spec = QuerySpec::defaults(&schema).with_sort("bogus");
        let items = vec![
            item(json!({"id": 1, "created_at": "2024-01-01"})),
            item(json!({"id": 2, "created_at": "2024-01-02"})),
        ];
        let sorted = Comparator::for_spec(&spec, &schema, now()).sort(items);
        assert_eq!(ids(&sorted), vec![2, 1]);
    }
}
