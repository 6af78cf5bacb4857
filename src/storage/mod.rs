//! Item source implementations

pub mod in_memory;
#[cfg(feature = "remote")]
pub mod remote;

pub use in_memory::InMemoryItemSource;
#[cfg(feature = "remote")]
pub use remote::HttpItemSource;
