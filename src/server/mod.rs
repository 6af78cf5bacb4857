//! Server module exposing collections over REST
//!
//! `ServerBuilder` registers one in-memory source per collection and serves:
//! - listing routes driven by each collection's query schema
//! - item routes for detail, patch, like and delete

pub mod builder;
pub mod handlers;
pub mod router;

pub use builder::ServerBuilder;
pub use handlers::AppState;
