//! Core module containing the content query pipeline and its types

pub mod error;
pub mod field;
pub mod item;
pub mod mutation;
pub mod paginate;
pub mod pipeline;
pub mod predicate;
pub mod query;
pub mod schema;
pub mod sequence;
pub mod sort;
pub mod source;
pub mod video;

pub use error::{ConfigError, MutationError, RequestError, SourceError, VidirError};
pub use field::{FieldValue, ItemId};
pub use item::{ContentItem, Patch, Record};
pub use mutation::{
    Mutation, MutationId, MutationState, OptimisticCollection, apply_mutation, remove_item,
};
pub use paginate::paginate;
pub use pipeline::QueryPipeline;
pub use predicate::Predicate;
pub use query::{FilterValue, Page, PaginationMeta, QuerySpec};
pub use schema::{FilterDef, QuerySchema, RangeDef, SortDef, SortRule};
pub use sequence::{LatestQuery, QuerySequence, Ticket};
pub use sort::Comparator;
pub use source::ItemSource;
pub use video::Video;
