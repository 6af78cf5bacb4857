//! Typed error handling for vidir
//!
//! The query pipeline itself never fails: malformed input degrades to the
//! nearest valid default. Errors only arise at the edges:
//!
//! - [`SourceError`]: fetching items from a backend
//! - [`MutationError`]: applying or settling optimistic mutations
//! - [`ConfigError`]: loading and validating configuration
//! - [`RequestError`]: REST exposure lookups
//!
//! # Example
//!
//! ```rust,ignore
//! match source.fetch_page(&spec).await {
//!     Ok(page) => render(page),
//!     Err(SourceError::Http { status, .. }) if status == 404 => render_empty(),
//!     Err(e) => toast(e.to_string()),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::core::field::ItemId;

/// The main error type for vidir
#[derive(Debug, Error)]
pub enum VidirError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Request(#[from] RequestError),

    /// Internal errors (should not happen in normal operation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl VidirError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            VidirError::Source(e) => e.status_code(),
            VidirError::Mutation(e) => e.status_code(),
            VidirError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            VidirError::Request(e) => e.status_code(),
            VidirError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            VidirError::Source(e) => e.error_code(),
            VidirError::Mutation(e) => e.error_code(),
            VidirError::Config(e) => e.error_code(),
            VidirError::Request(e) => e.error_code(),
            VidirError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            VidirError::Request(RequestError::ItemNotFound { collection, id }) => {
                Some(serde_json::json!({
                    "collection": collection,
                    "id": id.to_string(),
                }))
            }
            VidirError::Mutation(MutationError::InvalidPatch { id, .. }) => {
                Some(serde_json::json!({ "id": id.to_string() }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for VidirError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Source Errors
// =============================================================================

/// Errors raised while fetching items from a backend
#[derive(Debug, Error)]
pub enum SourceError {
    /// The backend answered with a non-success status
    #[error("backend returned HTTP {status} for {url}")]
    Http { status: u16, url: String },

    /// The request never produced a response
    #[error("request to backend failed: {0}")]
    Transport(String),

    /// The response body did not match the listing contract
    #[error("failed to decode backend response: {0}")]
    Decode(String),

    /// The local store could not be read
    #[error("item store unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SourceError::Http { .. } | SourceError::Transport(_) | SourceError::Decode(_) => {
                StatusCode::BAD_GATEWAY
            }
            SourceError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            SourceError::Http { .. } => "SOURCE_HTTP_ERROR",
            SourceError::Transport(_) => "SOURCE_TRANSPORT_ERROR",
            SourceError::Decode(_) => "SOURCE_DECODE_ERROR",
            SourceError::Unavailable(_) => "SOURCE_UNAVAILABLE",
        }
    }
}

// =============================================================================
// Mutation Errors
// =============================================================================

/// Errors related to optimistic mutations
#[derive(Debug, Error)]
pub enum MutationError {
    /// The patch could not be merged into the item
    #[error("patch for item '{id}' is invalid: {message}")]
    InvalidPatch { id: ItemId, message: String },

    /// No mutation with this id was ever recorded
    #[error("unknown mutation #{0}")]
    UnknownMutation(u64),

    /// The mutation was already confirmed or rejected
    #[error("mutation #{0} is already settled")]
    AlreadySettled(u64),
}

impl MutationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            MutationError::InvalidPatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            MutationError::UnknownMutation(_) => StatusCode::NOT_FOUND,
            MutationError::AlreadySettled(_) => StatusCode::CONFLICT,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            MutationError::InvalidPatch { .. } => "INVALID_PATCH",
            MutationError::UnknownMutation(_) => "UNKNOWN_MUTATION",
            MutationError::AlreadySettled(_) => "MUTATION_ALREADY_SETTLED",
        }
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration loading and validation
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    /// Cross-field rule violated (e.g. default sort not declared)
    #[error("collection '{collection}': {message}")]
    Schema { collection: String, message: String },

    #[error("invalid bind address '{0}'")]
    Bind(String),
}

impl ConfigError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } | ConfigError::Yaml(_) => "CONFIG_LOAD_ERROR",
            ConfigError::Invalid(_) | ConfigError::Schema { .. } | ConfigError::Bind(_) => {
                "CONFIG_ERROR"
            }
        }
    }
}

// =============================================================================
// Request Errors
// =============================================================================

/// Errors raised by the REST exposure
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("{collection} item '{id}' not found")]
    ItemNotFound { collection: String, id: ItemId },

    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::UnknownCollection(_) | RequestError::ItemNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            RequestError::InvalidBody(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RequestError::UnknownCollection(_) => "UNKNOWN_COLLECTION",
            RequestError::ItemNotFound { .. } => "ITEM_NOT_FOUND",
            RequestError::InvalidBody(_) => "INVALID_BODY",
        }
    }
}
