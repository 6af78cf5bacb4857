//! The content query pipeline
//!
//! ```text
//! raw pairs ──▶ QuerySpec::normalize ──▶ Predicate ──▶ Comparator ──▶ paginate ──▶ Page
//! ```
//!
//! Every stage is a pure function of its inputs; the pipeline holds only the
//! schema, so it is cheap to clone and safe to run on every keystroke.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::core::item::ContentItem;
use crate::core::paginate::paginate;
use crate::core::predicate::Predicate;
use crate::core::query::{Page, QuerySpec};
use crate::core::schema::QuerySchema;
use crate::core::sort::Comparator;

/// Search, filter, sort and paginate collections described by one schema
#[derive(Debug, Clone)]
pub struct QueryPipeline {
    schema: Arc<QuerySchema>,
}

impl QueryPipeline {
    pub fn new(schema: QuerySchema) -> Self {
        Self {
            schema: Arc::new(schema),
        }
    }

    pub fn from_shared(schema: Arc<QuerySchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &QuerySchema {
        &self.schema
    }

    /// Normalize raw query pairs against this pipeline's schema
    pub fn normalize<I, K, V>(&self, pairs: I) -> QuerySpec
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        QuerySpec::normalize(pairs, &self.schema)
    }

    /// Filtered and sorted items, without pagination
    pub fn select_at<T, I>(&self, items: I, spec: &QuerySpec, now: DateTime<Utc>) -> Vec<T>
    where
        T: ContentItem,
        I: IntoIterator<Item = T>,
    {
        let predicate = Predicate::compile(spec, &self.schema);
        let comparator = Comparator::for_spec(spec, &self.schema, now);
        comparator.sort(predicate.filter(items))
    }

    /// Run the full pipeline at a fixed instant
    pub fn run_at<T, I>(&self, items: I, spec: &QuerySpec, now: DateTime<Utc>) -> Page<T>
    where
        T: ContentItem,
        I: IntoIterator<Item = T>,
    {
        let selected = self.select_at(items, spec, now);
        let page = paginate(selected, spec.page, spec.page_size);

        tracing::debug!(
            collection = %self.schema.name,
            sort = %spec.sort,
            total = page.total,
            page = page.page,
            total_pages = page.total_pages,
            "Query pipeline produced page"
        );

        page
    }

    /// Run the full pipeline now
    pub fn run<T, I>(&self, items: I, spec: &QuerySpec) -> Page<T>
    where
        T: ContentItem,
        I: IntoIterator<Item = T>,
    {
        self.run_at(items, spec, Utc::now())
    }
}
