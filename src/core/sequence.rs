//! Last-query-wins sequencing
//!
//! A listing re-queries on every keystroke. Responses can arrive out of
//! order, and only the newest query may update the view. [`QuerySequence`]
//! hands out monotonically increasing tickets; a response is accepted only
//! while its ticket is still the latest one issued.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::error::SourceError;
use crate::core::item::ContentItem;
use crate::core::query::{Page, QuerySpec};
use crate::core::source::ItemSource;

/// Marker for one issued query
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Issues tickets and tells whether one is still current
#[derive(Debug, Default)]
pub struct QuerySequence {
    latest: AtomicU64,
}

impl QuerySequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new query, superseding every earlier ticket
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Keep `value` only if `ticket` is still current
    pub fn accept<V>(&self, ticket: Ticket, value: V) -> Option<V> {
        self.is_current(ticket).then_some(value)
    }
}

/// An item source whose stale responses are dropped
///
/// ```rust,ignore
/// let listing = LatestQuery::new(source);
/// // typing "e", "ep", "epic" in quick succession
/// if let Some(page) = listing.fetch(&spec).await? {
///     render(page);
/// }
/// ```
pub struct LatestQuery<T, S> {
    source: S,
    sequence: QuerySequence,
    _item: PhantomData<fn() -> T>,
}

impl<T, S> LatestQuery<T, S>
where
    T: ContentItem,
    S: ItemSource<T>,
{
    pub fn new(source: S) -> Self {
        Self {
            source,
            sequence: QuerySequence::new(),
            _item: PhantomData,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch a page, or `None` if a newer query was issued meanwhile
    ///
    /// Errors from superseded queries are discarded too.
    pub async fn fetch(&self, spec: &QuerySpec) -> Result<Option<Page<T>>, SourceError> {
        let ticket = self.sequence.issue();
        let result = self.source.fetch_page(spec).await;

        if !self.sequence.is_current(ticket) {
            tracing::debug!(
                ticket = ticket.value(),
                collection = %self.source.schema().name,
                "Discarding superseded query response"
            );
            return Ok(None);
        }

        result.map(Some)
    }
}
