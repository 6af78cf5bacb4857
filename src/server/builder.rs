//! ServerBuilder for fluent API to build HTTP servers

use anyhow::Result;
use axum::Router;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::AppState;
use super::router::build_collection_routes;
use crate::config::AppConfig;
use crate::core::error::{ConfigError, RequestError, VidirError};
use crate::core::item::Record;
use crate::core::schema::QuerySchema;
use crate::core::source::ItemSource;
use crate::storage::InMemoryItemSource;

/// Builder for creating HTTP servers over in-memory collections
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .register_collection(InMemoryItemSource::new(QuerySchema::videos()))?
///     .seed("videos", serde_json::from_str(&json)?)?
///     .build();
/// ```
pub struct ServerBuilder {
    collections: HashMap<String, InMemoryItemSource<Record>>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            collections: HashMap::new(),
        }
    }

    /// Register an empty collection for every schema in `config`
    pub fn with_config(self, config: &AppConfig) -> Result<Self, ConfigError> {
        config
            .collections
            .iter()
            .cloned()
            .try_fold(self, |builder, schema| builder.register_schema(schema))
    }

    /// Register an empty collection for `schema`
    pub fn register_schema(self, schema: QuerySchema) -> Result<Self, ConfigError> {
        self.register_collection(InMemoryItemSource::new(schema))
    }

    /// Register a collection
    ///
    /// The source's schema is checked, and its name must be unused.
    pub fn register_collection(
        mut self,
        source: InMemoryItemSource<Record>,
    ) -> Result<Self, ConfigError> {
        let schema = source.schema();
        schema.check()?;

        let name = schema.name.clone();
        if self.collections.contains_key(&name) {
            return Err(ConfigError::Schema {
                collection: name,
                message: "collection is registered twice".to_string(),
            });
        }

        tracing::debug!(collection = %name, "Registered collection");
        self.collections.insert(name, source);
        Ok(self)
    }

    /// Load items into a registered collection
    ///
    /// Values that are not JSON objects are skipped.
    pub fn seed(self, collection: &str, items: Vec<Value>) -> Result<Self, VidirError> {
        let source = self
            .collections
            .get(collection)
            .ok_or_else(|| RequestError::UnknownCollection(collection.to_string()))?;

        let total = items.len();
        let mut loaded = 0;
        for record in items.into_iter().filter_map(Record::from_json) {
            source.insert(record)?;
            loaded += 1;
        }
        if loaded < total {
            tracing::warn!(collection, skipped = total - loaded, "Skipped non-object seed values");
        }

        Ok(self)
    }

    /// Shared handle to a registered collection
    pub fn collection(&self, name: &str) -> Option<InMemoryItemSource<Record>> {
        self.collections.get(name).cloned()
    }

    /// Build the final router
    pub fn build(self) -> Router {
        let state = AppState {
            collections: Arc::new(self.collections),
        };

        build_collection_routes(state).layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    ///
    /// # Example
    ///
    /// ```ignore
    /// ServerBuilder::new()
    ///     .with_config(&AppConfig::default_config())?
    ///     .serve("127.0.0.1:3000").await?;
    /// ```
    pub async fn serve(self, addr: &str) -> Result<()> {
        let collections = self.collections.len();
        let app = self.build();
        let listener = TcpListener::bind(addr).await?;

        tracing::info!(collections, "Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for a shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
