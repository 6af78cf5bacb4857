//! HTTP item source speaking the listing API

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;

use crate::core::error::SourceError;
use crate::core::field::ItemId;
use crate::core::item::{ContentItem, Patch};
use crate::core::pipeline::QueryPipeline;
use crate::core::query::{Page, QuerySpec};
use crate::core::schema::QuerySchema;
use crate::core::source::ItemSource;

/// Item source backed by a remote `/api/{collection}` endpoint
///
/// The normalized query is forwarded as a query string. Paginated
/// responses are trusted as-is; a bare array is taken to be the whole
/// collection and run through the local pipeline.
pub struct HttpItemSource<T> {
    client: reqwest::Client,
    base_url: String,
    pipeline: QueryPipeline,
    _item: PhantomData<fn() -> T>,
}

impl<T> HttpItemSource<T> {
    pub fn new(base_url: impl Into<String>, schema: QuerySchema) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, schema)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, schema: QuerySchema) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            pipeline: QueryPipeline::new(schema),
            _item: PhantomData,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/api/{}", self.base_url, self.pipeline.schema().name)
    }

    /// Item URL with the id percent-encoded as a single path segment
    pub fn item_url(&self, id: &ItemId) -> String {
        let segment: String = url::form_urlencoded::byte_serialize(id.to_string().as_bytes())
            .collect::<String>()
            .replace('+', "%20");
        format!("{}/{}", self.collection_url(), segment)
    }

    /// Listing URL for a query
    pub fn listing_url(&self, spec: &QuerySpec) -> String {
        let query = spec.to_query_string(self.pipeline.schema());
        if query.is_empty() {
            self.collection_url()
        } else {
            format!("{}?{}", self.collection_url(), query)
        }
    }
}

async fn read_json(response: reqwest::Response, url: &str) -> Result<Value, SourceError> {
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| SourceError::Decode(e.to_string()))
}

fn transport(e: reqwest::Error) -> SourceError {
    SourceError::Transport(e.to_string())
}

impl<T> HttpItemSource<T>
where
    T: ContentItem + DeserializeOwned,
{
    /// Fetch one item; a 404 reads as `None`
    pub async fn fetch_item(&self, id: &ItemId) -> Result<Option<T>, SourceError> {
        let url = self.item_url(id);
        let response = self.client.get(&url).send().await.map_err(transport)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = read_json(response, &url).await?;
        serde_json::from_value(body)
            .map(Some)
            .map_err(|e| SourceError::Decode(e.to_string()))
    }

    /// Send a patch to the backend and return the item it stored
    ///
    /// Pair with an optimistic collection: apply locally, then confirm or
    /// reject depending on this call's outcome.
    pub async fn patch_item(&self, id: &ItemId, patch: &Patch) -> Result<T, SourceError> {
        let url = self.item_url(id);
        let response = self
            .client
            .patch(&url)
            .json(patch)
            .send()
            .await
            .map_err(transport)?;

        let body = read_json(response, &url).await?;
        serde_json::from_value(body).map_err(|e| SourceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl<T> ItemSource<T> for HttpItemSource<T>
where
    T: ContentItem + DeserializeOwned,
{
    fn schema(&self) -> &QuerySchema {
        self.pipeline.schema()
    }

    #[tracing::instrument(skip(self, spec), fields(collection = %self.pipeline.schema().name))]
    async fn fetch_page(&self, spec: &QuerySpec) -> Result<Page<T>, SourceError> {
        let url = self.listing_url(spec);
        let response = self.client.get(&url).send().await.map_err(transport)?;
        let body = read_json(response, &url).await?;

        let bare = body.is_array();
        let page = Page::from_envelope(body, self.pipeline.schema().items_key())?;
        if bare {
            tracing::debug!(total = page.total, "Unpaginated response, querying locally");
            return Ok(self.pipeline.run(page.items, spec));
        }

        Ok(page)
    }
}
