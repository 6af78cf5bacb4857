//! # vidir
//!
//! A content query pipeline for video directories: every listing (search
//! results, category pages, the link directory, favorites, the community
//! feed, user and notification lists) is searched, filtered, sorted and
//! paginated the same way.
//!
//! ## Features
//!
//! - **Normalized queries**: URL-style pairs become a [`QuerySpec`](core::QuerySpec);
//!   bad input degrades to defaults instead of failing
//! - **Declarative schemas**: each listing's keys, filters, ranges and sort
//!   orders live in a [`QuerySchema`](core::QuerySchema), loadable from YAML
//! - **Stable sorting**: newest, oldest, popular, trending and title orders
//!   with missing values last
//! - **Optimistic mutations**: local patches that share untouched items and
//!   roll back when the backend refuses
//! - **Last query wins**: stale responses are dropped
//! - **REST exposure**: an axum router serving in-memory collections
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vidir::prelude::*;
//!
//! let pipeline = QueryPipeline::new(QuerySchema::videos());
//! let spec = pipeline.normalize([("q", "epic"), ("sort", "popular"), ("limit", "10")]);
//! let page = pipeline.run(videos, &spec);
//!
//! println!("{} of {} results", page.items.len(), page.total);
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Types ===
    pub use crate::core::{
        Comparator, ContentItem, FieldValue, FilterValue, ItemId, Page, PaginationMeta, Patch,
        Predicate, QueryPipeline, QuerySchema, QuerySpec, Record, SortRule, Video, paginate,
    };

    // === Mutations ===
    pub use crate::core::{
        Mutation, MutationId, MutationState, OptimisticCollection, apply_mutation, remove_item,
    };

    // === Sources ===
    pub use crate::core::{ItemSource, LatestQuery, QuerySequence};
    pub use crate::storage::InMemoryItemSource;
    #[cfg(feature = "remote")]
    pub use crate::storage::HttpItemSource;

    // === Errors ===
    pub use crate::core::{ConfigError, MutationError, RequestError, SourceError, VidirError};

    // === Config ===
    pub use crate::config::{AppConfig, ServerConfig};

    // === Server ===
    pub use crate::server::ServerBuilder;
}
