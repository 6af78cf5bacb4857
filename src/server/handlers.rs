//! HTTP handlers for collection listings
//!
//! Every handler is collection-agnostic: the collection name in the path
//! selects an in-memory source and its schema.

use axum::{
    Json,
    extract::{Path, RawQuery, State},
    http::StatusCode,
};
use chrono::Utc;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::error::{RequestError, VidirError};
use crate::core::field::ItemId;
use crate::core::item::{Patch, Record};
use crate::core::mutation::Mutation;
use crate::core::query::QuerySpec;
use crate::core::source::ItemSource;
use crate::storage::InMemoryItemSource;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub collections: Arc<HashMap<String, InMemoryItemSource<Record>>>,
}

impl AppState {
    pub fn collection(&self, name: &str) -> Result<&InMemoryItemSource<Record>, RequestError> {
        self.collections
            .get(name)
            .ok_or_else(|| RequestError::UnknownCollection(name.to_string()))
    }
}

fn not_found(collection: &str, id: ItemId) -> VidirError {
    RequestError::ItemNotFound {
        collection: collection.to_string(),
        id,
    }
    .into()
}

/// Counter bumped by a like: `like_count` on backend rows, `likes` on
/// community posts
fn like_field(item: &Record) -> &'static str {
    if item.get("like_count").is_none() && item.get("likes").is_some() {
        "likes"
    } else {
        "like_count"
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/{collection}
pub async fn list_items(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Json<Value>, VidirError> {
    let source = state.collection(&collection)?;
    let schema = source.schema();
    let spec = QuerySpec::from_query_string(query.as_deref().unwrap_or_default(), schema);

    if !schema.paginated {
        let items = source
            .pipeline()
            .select_at(source.all_items()?, &spec, Utc::now());
        let body = items
            .into_iter()
            .map(|item| item.as_ref().clone().into_value())
            .collect();
        return Ok(Json(Value::Array(body)));
    }

    let page = source
        .fetch_page(&spec)
        .await?
        .map(|item| item.as_ref().clone());
    let body = page
        .to_envelope(schema.items_key())
        .map_err(|e| VidirError::Internal(e.to_string()))?;
    Ok(Json(body))
}

/// GET /api/{collection}/{id}
pub async fn get_item(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Record>, VidirError> {
    let source = state.collection(&collection)?;
    let id = ItemId::parse(&id);

    match source.get(&id)? {
        Some(item) => Ok(Json(item.as_ref().clone())),
        None => Err(not_found(&collection, id)),
    }
}

/// PATCH /api/{collection}/{id}
///
/// Shallow-merges the JSON object body into the item. The id is not
/// patchable.
pub async fn patch_item(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Record>, VidirError> {
    let source = state.collection(&collection)?;
    let id = ItemId::parse(&id);

    let Value::Object(mut fields) = body else {
        return Err(RequestError::InvalidBody("expected a JSON object".to_string()).into());
    };
    fields.remove("id");

    match source.apply(&Mutation::new(id.clone(), Patch::from(fields)))? {
        Some(item) => Ok(Json(item.as_ref().clone())),
        None => Err(not_found(&collection, id)),
    }
}

/// One more than a stored counter; missing or non-numeric counters start at 1
fn incremented(count: Option<&Value>) -> Value {
    let Some(Value::Number(n)) = count else {
        return Value::from(1);
    };
    if let Some(i) = n.as_i64() {
        Value::from(i.saturating_add(1))
    } else if let Some(u) = n.as_u64() {
        Value::from(u.saturating_add(1))
    } else {
        n.as_f64().map_or(Value::from(1), |f| Value::from(f + 1.0))
    }
}

/// POST /api/{collection}/{id}/like
pub async fn like_item(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Record>, VidirError> {
    let source = state.collection(&collection)?;
    let id = ItemId::parse(&id);

    let liked = source.update_with(&id, |item| {
        let field = like_field(item);
        Patch::new().set(field, incremented(item.get(field)))
    })?;

    match liked {
        Some(item) => {
            tracing::debug!(collection = %collection, item_id = %id, "Item liked");
            Ok(Json(item.as_ref().clone()))
        }
        None => Err(not_found(&collection, id)),
    }
}

/// DELETE /api/{collection}/{id}
pub async fn delete_item(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<StatusCode, VidirError> {
    let source = state.collection(&collection)?;
    let id = ItemId::parse(&id);

    match source.remove(&id)? {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(not_found(&collection, id)),
    }
}
