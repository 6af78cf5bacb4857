//! Optimistic mutations
//!
//! Listings apply likes, favorites, deletes and read-marks locally before
//! the backend answers. [`apply_mutation`] and [`remove_item`] are the pure
//! merge operations: untouched items stay the same `Arc`, so a renderer can
//! skip them with a pointer comparison.
//!
//! [`OptimisticCollection`] adds a ledger on top. Each mutation is
//! `Pending` until the caller reports the backend's answer; a rejection
//! rolls the local change back.
//!
//! ```rust,ignore
//! let mut videos = OptimisticCollection::from_items(page.items);
//! let id = videos.apply(Mutation::new(1, Patch::new().set("likes", 893)))?;
//! match client.like(1).await {
//!     Ok(_) => videos.confirm(id)?,
//!     Err(_) => videos.reject(id)?,
//! }
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::error::MutationError;
use crate::core::field::ItemId;
use crate::core::item::{ContentItem, Patch};

/// A local change to one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    pub item_id: ItemId,
    pub patch: Patch,
}

impl Mutation {
    pub fn new(item_id: impl Into<ItemId>, patch: Patch) -> Self {
        Self {
            item_id: item_id.into(),
            patch,
        }
    }
}

/// Apply a mutation to a collection
///
/// The first item whose id matches is replaced by its patched copy; every
/// other entry is shared with the input. An unknown id returns the
/// collection unchanged. A patch the item rejects leaves nothing modified.
pub fn apply_mutation<T: ContentItem>(
    items: &[Arc<T>],
    mutation: &Mutation,
) -> Result<Vec<Arc<T>>, MutationError> {
    let Some(index) = items.iter().position(|item| item.id() == mutation.item_id) else {
        tracing::debug!(item_id = %mutation.item_id, "Mutation target not in collection");
        return Ok(items.to_vec());
    };

    let patched = Arc::new(items[index].as_ref().with_patch(&mutation.patch)?);
    let mut next = items.to_vec();
    next[index] = patched;
    Ok(next)
}

/// Remove an item, sharing every remaining entry
pub fn remove_item<T: ContentItem>(items: &[Arc<T>], item_id: &ItemId) -> Vec<Arc<T>> {
    items
        .iter()
        .filter(|item| &item.id() != item_id)
        .cloned()
        .collect()
}

/// Identifier of a recorded mutation
pub type MutationId = u64;

/// Lifecycle of an optimistic mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationState {
    Pending,
    Confirmed,
    Rejected,
}

#[derive(Debug)]
enum Undo<T> {
    /// Previous values of the patched fields, and the fields that were absent
    Patch {
        item_id: ItemId,
        restore: Patch,
        absent: Vec<String>,
    },
    /// The removed item and where it was
    Remove { item: Arc<T>, index: usize },
    /// The target was absent; nothing to undo
    Noop,
}

#[derive(Debug)]
struct Entry<T> {
    state: MutationState,
    undo: Undo<T>,
}

/// A collection with a ledger of optimistic mutations
#[derive(Debug)]
pub struct OptimisticCollection<T> {
    items: Vec<Arc<T>>,
    ledger: IndexMap<MutationId, Entry<T>>,
    next_id: MutationId,
}

impl<T: ContentItem> OptimisticCollection<T> {
    pub fn new(items: Vec<Arc<T>>) -> Self {
        Self {
            items,
            ledger: IndexMap::new(),
            next_id: 1,
        }
    }

    pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        Self::new(items.into_iter().map(Arc::new).collect())
    }

    /// Current local view, including pending changes
    pub fn items(&self) -> &[Arc<T>] {
        &self.items
    }

    pub fn get(&self, item_id: &ItemId) -> Option<&Arc<T>> {
        self.items.iter().find(|item| &item.id() == item_id)
    }

    fn record(&mut self, undo: Undo<T>) -> MutationId {
        let id = self.next_id;
        self.next_id += 1;
        self.ledger.insert(
            id,
            Entry {
                state: MutationState::Pending,
                undo,
            },
        );
        id
    }

    /// Apply a patch locally and record how to undo it
    pub fn apply(&mut self, mutation: Mutation) -> Result<MutationId, MutationError> {
        let undo = match self.get(&mutation.item_id) {
            Some(item) => {
                let mut restore = Patch::new();
                let mut absent = Vec::new();
                for (field, _) in mutation.patch.fields() {
                    match item.raw_field(field) {
                        Some(previous) => restore = restore.set(field.clone(), previous),
                        None => absent.push(field.clone()),
                    }
                }
                Undo::Patch {
                    item_id: mutation.item_id.clone(),
                    restore,
                    absent,
                }
            }
            None => Undo::Noop,
        };

        self.items = apply_mutation(&self.items, &mutation)?;
        Ok(self.record(undo))
    }

    /// Remove an item locally and record where it was
    ///
    /// Returns `None`, recording nothing, when no item has that id.
    pub fn remove(&mut self, item_id: &ItemId) -> Option<MutationId> {
        let index = self.items.iter().position(|item| &item.id() == item_id)?;
        let item = self.items.remove(index);
        Some(self.record(Undo::Remove { item, index }))
    }

    fn pending_entry(&mut self, id: MutationId) -> Result<&mut Entry<T>, MutationError> {
        let entry = self
            .ledger
            .get_mut(&id)
            .ok_or(MutationError::UnknownMutation(id))?;
        if entry.state != MutationState::Pending {
            return Err(MutationError::AlreadySettled(id));
        }
        Ok(entry)
    }

    /// The backend accepted the mutation
    pub fn confirm(&mut self, id: MutationId) -> Result<(), MutationError> {
        self.pending_entry(id)?.state = MutationState::Confirmed;
        Ok(())
    }

    /// The backend refused the mutation; roll the local change back
    ///
    /// Patches are undone by re-applying the previous field values and
    /// dropping fields the patch introduced, so later edits to other fields
    /// of the same item survive. Removed items go back
    /// to their former position, or the end if the collection has shrunk.
    ///
    /// If the rollback itself fails the mutation stays pending.
    pub fn reject(&mut self, id: MutationId) -> Result<(), MutationError> {
        self.pending_entry(id)?;

        let restored = match self.ledger.get(&id).map(|entry| &entry.undo) {
            Some(Undo::Patch {
                item_id,
                restore,
                absent,
            }) => {
                let mut items = self.items.clone();
                if let Some(slot) = items.iter_mut().find(|item| &item.id() == item_id) {
                    let mut previous = slot.as_ref().with_patch(restore)?;
                    if !absent.is_empty() {
                        previous = previous.without_fields(absent)?;
                    }
                    *slot = Arc::new(previous);
                }
                items
            }
            Some(Undo::Remove { item, index }) => {
                let mut items = self.items.clone();
                items.insert((*index).min(items.len()), Arc::clone(item));
                items
            }
            Some(Undo::Noop) | None => self.items.clone(),
        };

        tracing::warn!(mutation_id = id, "Optimistic mutation rejected, rolled back");
        self.items = restored;
        if let Some(entry) = self.ledger.get_mut(&id) {
            entry.state = MutationState::Rejected;
            entry.undo = Undo::Noop;
        }
        Ok(())
    }

    pub fn state(&self, id: MutationId) -> Option<MutationState> {
        self.ledger.get(&id).map(|entry| entry.state)
    }

    /// Ids of mutations still awaiting the backend, oldest first
    pub fn pending(&self) -> Vec<MutationId> {
        self.ledger
            .iter()
            .filter(|(_, entry)| entry.state == MutationState::Pending)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Forget settled mutations
    pub fn prune_settled(&mut self) {
        self.ledger
            .retain(|_, entry| entry.state == MutationState::Pending);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::FieldValue;
    use crate::core::item::Record;
    use serde_json::json;

    fn collection() -> Vec<Arc<Record>> {
        vec![
            Arc::new(Record::from_json(json!({"id": 1, "title": "Epic Adventure", "likes": 892})).expect("object")),
            Arc::new(Record::from_json(json!({"id": 2, "title": "Mystery Unveiled", "likes": 1204})).expect("object")),
        ]
    }

    fn likes(item: &Arc<Record>) -> Option<FieldValue> {
        item.field_value("likes")
    }

    #[test]
    fn test_like_shares_untouched_items() {
        let before = collection();
        let after = apply_mutation(&before, &Mutation::new(1, Patch::new().set("likes", 893)))
            .expect("records accept any patch");

        assert_eq!(likes(&after[0]), Some(FieldValue::Integer(893)));
        assert!(Arc::ptr_eq(&before[1], &after[1]));
        assert!(!Arc::ptr_eq(&before[0], &after[0]));
        assert_eq!(likes(&before[0]), Some(FieldValue::Integer(892)));
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let before = collection();
        let after = apply_mutation(&before, &Mutation::new(99, Patch::new().set("likes", 0)))
            .expect("noop");
        assert!(before.iter().zip(&after).all(|(a, b)| Arc::ptr_eq(a, b)));
    }

    #[test]
    fn test_remove_item() {
        let before = collection();
        let after = remove_item(&before, &ItemId::Integer(1));
        assert_eq!(after.len(), 1);
        assert!(Arc::ptr_eq(&before[1], &after[0]));
    }

    #[test]
    fn test_confirm_keeps_change() {
        let mut videos = OptimisticCollection::new(collection());
        let id = videos
            .apply(Mutation::new(1, Patch::new().set("likes", 893)))
            .expect("apply");
        assert_eq!(videos.state(id), Some(MutationState::Pending));

        videos.confirm(id).expect("confirm");
        assert_eq!(videos.state(id), Some(MutationState::Confirmed));
        assert_eq!(likes(&videos.items()[0]), Some(FieldValue::Integer(893)));
        assert!(videos.pending().is_empty());
    }

    #[test]
    fn test_reject_restores_previous_value() {
        let mut videos = OptimisticCollection::new(collection());
        let id = videos
            .apply(Mutation::new(1, Patch::new().set("likes", 893)))
            .expect("apply");

        videos.reject(id).expect("reject");
        assert_eq!(videos.state(id), Some(MutationState::Rejected));
        assert_eq!(likes(&videos.items()[0]), Some(FieldValue::Integer(892)));
    }

    #[test]
    fn test_reject_keeps_later_edits_to_other_fields() {
        let mut videos = OptimisticCollection::new(collection());
        let like = videos
            .apply(Mutation::new(1, Patch::new().set("likes", 893)))
            .expect("apply");
        videos
            .apply(Mutation::new(1, Patch::new().set("title", "Renamed")))
            .expect("apply");

        videos.reject(like).expect("reject");
        let item = &videos.items()[0];
        assert_eq!(likes(item), Some(FieldValue::Integer(892)));
        assert_eq!(
            item.field_value("title"),
            Some(FieldValue::String("Renamed".to_string()))
        );
    }

    #[test]
    fn test_reject_restores_structured_values() {
        let mut videos = OptimisticCollection::from_items([Record::from_json(json!({
            "id": 1,
            "uploader": {"name": "ann", "verified": true},
            "ids": [1, 2],
            "ratio": 0.5,
        }))
        .expect("object")]);

        let id = videos
            .apply(Mutation::new(
                1,
                Patch::new()
                    .set("uploader", json!({"name": "bob"}))
                    .set("ids", json!([3]))
                    .set("ratio", json!(null)),
            ))
            .expect("apply");
        videos.reject(id).expect("reject");

        let item = &videos.items()[0];
        assert_eq!(item.get("uploader"), Some(&json!({"name": "ann", "verified": true})));
        assert_eq!(item.get("ids"), Some(&json!([1, 2])));
        assert_eq!(item.get("ratio"), Some(&json!(0.5)));
    }

    #[test]
    fn test_reject_removes_fields_the_patch_added() {
        let mut videos = OptimisticCollection::new(collection());
        let id = videos
            .apply(Mutation::new(
                2,
                Patch::new().set("isFavorite", true).set("likes", 1205),
            ))
            .expect("apply");
        assert_eq!(videos.items()[1].get("isFavorite"), Some(&json!(true)));
        let untouched = Arc::clone(&videos.items()[0]);

        videos.reject(id).expect("reject");
        let item = &videos.items()[1];
        assert!(item.get("isFavorite").is_none(), "absent field must not come back as null");
        assert_eq!(item.get("likes"), Some(&json!(1204)));
        assert!(Arc::ptr_eq(&untouched, &videos.items()[0]));
    }

    #[test]
    fn test_reject_removal_reinserts_in_place() {
        let mut videos = OptimisticCollection::new(collection());
        let id = videos.remove(&ItemId::Integer(1)).expect("present");
        assert_eq!(videos.items().len(), 1);

        videos.reject(id).expect("reject");
        assert_eq!(videos.items().len(), 2);
        assert_eq!(videos.items()[0].id(), ItemId::Integer(1));
    }

    #[test]
    fn test_settling_twice_fails() {
        let mut videos = OptimisticCollection::new(collection());
        let id = videos.remove(&ItemId::Integer(2)).expect("present");
        videos.confirm(id).expect("confirm");

        assert!(matches!(videos.reject(id), Err(MutationError::AlreadySettled(_))));
        assert!(matches!(videos.confirm(404), Err(MutationError::UnknownMutation(404))));
    }

    #[test]
    fn test_remove_unknown_records_nothing() {
        let mut videos = OptimisticCollection::new(collection());
        assert_eq!(videos.remove(&ItemId::Integer(7)), None);
        assert!(videos.pending().is_empty());
    }

    #[test]
    fn test_prune_settled() {
        let mut videos = OptimisticCollection::new(collection());
        let a = videos.remove(&ItemId::Integer(1)).expect("present");
        let b = videos.remove(&ItemId::Integer(2)).expect("present");
        videos.confirm(a).expect("confirm");

        videos.prune_settled();
        assert_eq!(videos.state(a), None);
        assert_eq!(videos.pending(), vec![b]);
    }
}
