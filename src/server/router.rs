//! Router for collection routes

use axum::{
    Router,
    routing::{get, post},
};

use super::handlers::{
    AppState, delete_item, get_item, health, like_item, list_items, patch_item,
};

/// Build collection routes
///
/// These routes are generic and work for every registered collection:
/// - GET /health - Liveness probe
/// - GET /api/{collection} - Search, filter, sort and paginate a listing
/// - GET /api/{collection}/{id} - Get one item
/// - PATCH /api/{collection}/{id} - Shallow-merge fields into an item
/// - DELETE /api/{collection}/{id} - Delete an item
/// - POST /api/{collection}/{id}/like - Increment an item's like counter
pub fn build_collection_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/{collection}", get(list_items))
        .route(
            "/api/{collection}/{id}",
            get(get_item).patch(patch_item).delete(delete_item),
        )
        .route("/api/{collection}/{id}/like", post(like_item))
        .with_state(state)
}
