//! Item source trait

use async_trait::async_trait;

use crate::core::error::SourceError;
use crate::core::item::ContentItem;
use crate::core::query::{Page, QuerySpec};
use crate::core::schema::QuerySchema;

/// A backend that answers listing queries
///
/// Implementations either run the query pipeline locally over items they
/// hold, or forward the normalized query to a remote listing endpoint. The
/// caller never needs to know which.
#[async_trait]
pub trait ItemSource<T: ContentItem>: Send + Sync {
    /// Schema the source's listing is queried with
    fn schema(&self) -> &QuerySchema;

    /// Fetch one page of items for a normalized query
    async fn fetch_page(&self, spec: &QuerySpec) -> Result<Page<T>, SourceError>;
}
