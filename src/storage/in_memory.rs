//! In-memory item source for mock data, tests and the REST exposure

use async_trait::async_trait;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::error::{SourceError, VidirError};
use crate::core::field::ItemId;
use crate::core::item::{ContentItem, Patch};
use crate::core::mutation::Mutation;
use crate::core::pipeline::QueryPipeline;
use crate::core::query::{Page, QuerySpec};
use crate::core::schema::QuerySchema;
use crate::core::source::ItemSource;

/// In-memory item source
///
/// Holds items in insertion order behind a `RwLock`. Clones share the same
/// collection.
pub struct InMemoryItemSource<T> {
    items: Arc<RwLock<Vec<Arc<T>>>>,
    pipeline: QueryPipeline,
}

impl<T> Clone for InMemoryItemSource<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            pipeline: self.pipeline.clone(),
        }
    }
}

impl<T: ContentItem> InMemoryItemSource<T> {
    /// Create an empty source
    pub fn new(schema: QuerySchema) -> Self {
        Self::with_items(schema, Vec::new())
    }

    /// Create a source seeded with `items`
    pub fn with_items(schema: QuerySchema, items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items.into_iter().map(Arc::new).collect())),
            pipeline: QueryPipeline::new(schema),
        }
    }

    pub fn pipeline(&self) -> &QueryPipeline {
        &self.pipeline
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Arc<T>>>, SourceError> {
        self.items
            .read()
            .map_err(|e| SourceError::Unavailable(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Arc<T>>>, SourceError> {
        self.items
            .write()
            .map_err(|e| SourceError::Unavailable(format!("Failed to acquire write lock: {}", e)))
    }

    /// Snapshot of every item, in insertion order
    pub fn all_items(&self) -> Result<Vec<Arc<T>>, SourceError> {
        Ok(self.read()?.clone())
    }

    pub fn len(&self) -> Result<usize, SourceError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, SourceError> {
        Ok(self.read()?.is_empty())
    }

    /// Insert an item, replacing any item with the same id in place
    pub fn insert(&self, item: T) -> Result<Arc<T>, SourceError> {
        let item = Arc::new(item);
        let id = item.id();
        let mut items = self.write()?;

        match items.iter().position(|existing| existing.id() == id) {
            Some(index) => items[index] = Arc::clone(&item),
            None => items.push(Arc::clone(&item)),
        }

        Ok(item)
    }

    pub fn get(&self, id: &ItemId) -> Result<Option<Arc<T>>, SourceError> {
        Ok(self.read()?.iter().find(|item| &item.id() == id).cloned())
    }

    /// Patch one item, building the patch from its current state
    ///
    /// The patch is built and merged under one write lock.
    /// Returns the updated item, or `None` when no item has that id.
    pub fn update_with<F>(&self, id: &ItemId, build: F) -> Result<Option<Arc<T>>, VidirError>
    where
        F: FnOnce(&T) -> Patch,
    {
        let mut items = self.write()?;
        let Some(index) = items.iter().position(|item| &item.id() == id) else {
            return Ok(None);
        };

        let patch = build(items[index].as_ref());
        let updated = Arc::new(items[index].as_ref().with_patch(&patch)?);
        items[index] = Arc::clone(&updated);

        Ok(Some(updated))
    }

    /// Apply a mutation to one item
    pub fn apply(&self, mutation: &Mutation) -> Result<Option<Arc<T>>, VidirError> {
        self.update_with(&mutation.item_id, |_| mutation.patch.clone())
    }

    /// Remove an item, returning it if it existed
    pub fn remove(&self, id: &ItemId) -> Result<Option<Arc<T>>, SourceError> {
        let mut items = self.write()?;
        Ok(items
            .iter()
            .position(|item| &item.id() == id)
            .map(|index| items.remove(index)))
    }
}

#[async_trait]
impl<T: ContentItem> ItemSource<Arc<T>> for InMemoryItemSource<T> {
    fn schema(&self) -> &QuerySchema {
        self.pipeline.schema()
    }

    async fn fetch_page(&self, spec: &QuerySpec) -> Result<Page<Arc<T>>, SourceError> {
        let items = self.all_items()?;
        Ok(self.pipeline.run(items, spec))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::FieldValue;
    use crate::core::item::Record;
    use crate::core::video::Video;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn videos() -> InMemoryItemSource<Video> {
        let day = |d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();
        let mut epic = Video::new(1, "Epic Adventure", day(15));
        epic.view_count = 15420;
        let mut mystery = Video::new(2, "Mystery Unveiled", day(14));
        mystery.view_count = 23100;
        InMemoryItemSource::with_items(QuerySchema::videos(), vec![epic, mystery])
    }

    #[tokio::test]
    async fn test_fetch_page_runs_pipeline() {
        let source = videos();
        let spec = QuerySpec::normalize([("sort", "popular"), ("limit", "1")], source.schema());

        let page = source.fetch_page(&spec).await.expect("fetch");
        assert_eq!(page.items[0].id, 2);
        assert_eq!((page.total, page.total_pages), (2, 2));
    }

    #[test]
    fn test_insert_replaces_same_id() {
        let source = InMemoryItemSource::new(QuerySchema::categories());
        source
            .insert(Record::from_json(json!({"id": 1, "name": "Action"})).expect("object"))
            .expect("insert");
        source
            .insert(Record::from_json(json!({"id": 1, "name": "Drama"})).expect("object"))
            .expect("insert");

        assert_eq!(source.len().expect("len"), 1);
        let item = source.get(&ItemId::Integer(1)).expect("get").expect("present");
        assert_eq!(item.field_value("name"), Some(FieldValue::String("Drama".to_string())));
    }

    #[test]
    fn test_apply_and_remove() {
        let source = videos();
        let updated = source
            .apply(&Mutation::new(1, Patch::new().set("like_count", 5)))
            .expect("apply")
            .expect("present");
        assert_eq!(updated.like_count, 5);

        let missing = source
            .apply(&Mutation::new(99, Patch::new().set("like_count", 5)))
            .expect("apply");
        assert!(missing.is_none());

        assert!(source.remove(&ItemId::Integer(1)).expect("remove").is_some());
        assert!(source.remove(&ItemId::Integer(1)).expect("remove").is_none());
        assert_eq!(source.len().expect("len"), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let source = videos();
        let other = source.clone();
        other.remove(&ItemId::Integer(2)).expect("remove");
        assert_eq!(source.len().expect("len"), 1);
    }
}
