//! Ordered, id-unique favorites collection persisted through a storage port.

use std::collections::HashSet;

use log::{debug, error, info, warn};

use crate::favorites::{favorite_item::FavoriteItem, storage::KeyValueStorage};

/// Storage key used when none is configured.
pub const DEFAULT_FAVORITES_STORAGE_KEY: &str = "my-movies-favorites";

/// How the initial collection was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// Stored collection parsed successfully.
    Restored { count: usize, dropped_duplicates: usize },
    /// Nothing stored under the key yet.
    Empty,
    /// Stored value was unreadable or malformed; started empty.
    Recovered { reason: String },
}

/// Result of a mutating call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteChange {
    Added,
    Removed,
    Unchanged,
}

impl FavoriteChange {
    pub fn is_change(self) -> bool {
        self != Self::Unchanged
    }
}

/// Favorites collection that writes itself through after every mutation.
///
/// Constructed only via [`FavoritesStore::load`], so no write can happen
/// before the stored collection has been read.
pub struct FavoritesStore<S: KeyValueStorage> {
    storage: S,
    storage_key: String,
    items: Vec<FavoriteItem>,
    load_status: LoadStatus,
    last_write_failed: bool,
}

fn dedupe_by_id(items: Vec<FavoriteItem>) -> (Vec<FavoriteItem>, usize) {
    let mut seen_ids: HashSet<String> = HashSet::new();
    let total = items.len();
    let unique: Vec<FavoriteItem> = items
        .into_iter()
        .filter(|item| seen_ids.insert(item.id.clone()))
        .collect();
    let dropped = total - unique.len();
    (unique, dropped)
}

impl<S: KeyValueStorage> FavoritesStore<S> {
    /// Reads the stored collection once. Never fails: bad data yields an empty store.
    pub fn load(storage: S, storage_key: impl Into<String>) -> Self {
        let storage_key = storage_key.into();
        let (items, load_status) = match storage.read(&storage_key) {
            Ok(Some(stored)) if !stored.trim().is_empty() => {
                match serde_json::from_str::<Vec<FavoriteItem>>(&stored) {
                    Ok(parsed) => {
                        let (items, dropped_duplicates) = dedupe_by_id(parsed);
                        if dropped_duplicates > 0 {
                            warn!(
                                "Dropped {} duplicate favorite(s) from '{}'",
                                dropped_duplicates, storage_key
                            );
                        }
                        info!("Loaded {} favorite(s) from '{}'", items.len(), storage_key);
                        let count = items.len();
                        (
                            items,
                            LoadStatus::Restored {
                                count,
                                dropped_duplicates,
                            },
                        )
                    }
                    Err(err) => {
                        warn!(
                            "Failed to parse favorites from '{}'. Starting empty. error={}",
                            storage_key, err
                        );
                        (
                            Vec::new(),
                            LoadStatus::Recovered {
                                reason: format!("Stored favorites were corrupted: {}", err),
                            },
                        )
                    }
                }
            }
            Ok(_) => {
                info!("No favorites stored under '{}'", storage_key);
                (Vec::new(), LoadStatus::Empty)
            }
            Err(err) => {
                warn!(
                    "Failed to read favorites from '{}'. Starting empty. error={}",
                    storage_key, err
                );
                (
                    Vec::new(),
                    LoadStatus::Recovered {
                        reason: format!("Could not read stored favorites: {}", err),
                    },
                )
            }
        };

        Self {
            storage,
            storage_key,
            items,
            load_status,
            last_write_failed: false,
        }
    }

    pub fn load_status(&self) -> &LoadStatus {
        &self.load_status
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// `true` if the most recent write-through failed.
    pub fn last_write_failed(&self) -> bool {
        self.last_write_failed
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&FavoriteItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Appends `item` unless its id is already present (the first copy wins).
    pub fn add(&mut self, item: FavoriteItem) -> FavoriteChange {
        if self.is_favorite(&item.id) {
            return FavoriteChange::Unchanged;
        }
        debug!("Adding favorite id={}", item.id);
        self.items.push(item);
        self.persist();
        FavoriteChange::Added
    }

    pub fn remove(&mut self, id: &str) -> FavoriteChange {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        if self.items.len() == before {
            return FavoriteChange::Unchanged;
        }
        debug!("Removed favorite id={}", id);
        self.persist();
        FavoriteChange::Removed
    }

    pub fn toggle(&mut self, item: FavoriteItem) -> FavoriteChange {
        if self.is_favorite(&item.id) {
            self.remove(&item.id)
        } else {
            self.add(item)
        }
    }

    /// Current collection in insertion order.
    pub fn list(&self) -> &[FavoriteItem] {
        &self.items
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Hands the storage back, e.g. to reload from it.
    #[cfg(test)]
    pub fn into_storage(self) -> S {
        self.storage
    }

    // In-memory state stays authoritative: failures are logged, never rolled back.
    fn persist(&mut self) {
        let payload = match serde_json::to_string(&self.items) {
            Ok(payload) => payload,
            Err(err) => {
                error!("Failed to serialize favorites: {}", err);
                self.last_write_failed = true;
                return;
            }
        };
        match self.storage.write(&self.storage_key, &payload) {
            Ok(()) => self.last_write_failed = false,
            Err(err) => {
                error!(
                    "Failed to persist {} favorite(s) to '{}': {}",
                    self.items.len(),
                    self.storage_key,
                    err
                );
                self.last_write_failed = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::favorites::storage::{MemoryStorage, StorageError};

    const KEY: &str = DEFAULT_FAVORITES_STORAGE_KEY;

    fn movie(id: &str) -> FavoriteItem {
        FavoriteItem {
            description: format!("Description {id}"),
            image: format!("image{id}.jpg"),
            year: Some("2021".to_string()),
            rating: Some(8.5),
            ..FavoriteItem::new(id, format!("Movie {id}"))
        }
    }

    fn ids<S: KeyValueStorage>(store: &FavoritesStore<S>) -> Vec<&str> {
        store.list().iter().map(|item| item.id.as_str()).collect()
    }

    /// Storage whose reads/writes can be made to fail, with a write log.
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        fail_reads: bool,
        fail_writes: bool,
        writes: Rc<RefCell<Vec<String>>>,
    }

    impl KeyValueStorage for FlakyStorage {
        fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
            if self.fail_reads {
                return Err(StorageError::Unavailable("read disabled".to_string()));
            }
            self.inner.read(key)
        }

        fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            self.writes.borrow_mut().push(value.to_string());
            if self.fail_writes {
                return Err(StorageError::Unavailable("quota exceeded".to_string()));
            }
            self.inner.write(key, value)
        }
    }

    #[test]
    fn test_load_from_empty_storage_starts_empty() {
        let store = FavoritesStore::load(MemoryStorage::new(), KEY);

        assert_eq!(store.count(), 0);
        assert_eq!(store.load_status(), &LoadStatus::Empty);
    }

    #[test]
    fn test_load_with_malformed_value_starts_empty() {
        let store = FavoritesStore::load(MemoryStorage::with_value(KEY, "invalid json"), KEY);

        assert_eq!(store.count(), 0);
        assert!(matches!(store.load_status(), LoadStatus::Recovered { .. }));
    }

    #[test]
    fn test_load_with_wrong_shape_starts_empty() {
        for stored in ["null", "{\"id\":\"1\"}", "[1,2,3]"] {
            let store = FavoritesStore::load(MemoryStorage::with_value(KEY, stored), KEY);
            assert_eq!(store.count(), 0, "stored value {stored}");
        }
    }

    #[test]
    fn test_load_with_read_failure_starts_empty() {
        let storage = FlakyStorage {
            fail_reads: true,
            ..FlakyStorage::default()
        };
        let store = FavoritesStore::load(storage, KEY);

        assert_eq!(store.count(), 0);
        assert!(matches!(store.load_status(), LoadStatus::Recovered { .. }));
    }

    #[test]
    fn test_load_does_not_write() {
        let writes = Rc::new(RefCell::new(Vec::new()));
        let storage = FlakyStorage {
            writes: writes.clone(),
            ..FlakyStorage::default()
        };

        let store = FavoritesStore::load(storage, KEY);

        assert_eq!(store.count(), 0);
        assert!(writes.borrow().is_empty());
    }

    #[test]
    fn test_load_drops_duplicate_ids_keeping_first() {
        let stored = r#"[{"id":"1","title":"First"},{"id":"2"},{"id":"1","title":"Second"}]"#;
        let store = FavoritesStore::load(MemoryStorage::with_value(KEY, stored), KEY);

        assert_eq!(ids(&store), vec!["1", "2"]);
        assert_eq!(store.get("1").map(|item| item.title.as_str()), Some("First"));
        assert_eq!(
            store.load_status(),
            &LoadStatus::Restored {
                count: 2,
                dropped_duplicates: 1
            }
        );
    }

    #[test]
    fn test_add_appends_in_insertion_order() {
        let mut store = FavoritesStore::load(MemoryStorage::new(), KEY);

        assert_eq!(store.add(movie("3")), FavoriteChange::Added);
        assert_eq!(store.add(movie("1")), FavoriteChange::Added);
        assert_eq!(store.add(movie("2")), FavoriteChange::Added);

        assert_eq!(ids(&store), vec!["3", "1", "2"]);
        assert!(store.is_favorite("1"));
        assert!(!store.is_favorite("4"));
    }

    #[test]
    fn test_add_is_idempotent_and_keeps_first_copy() {
        let mut store = FavoritesStore::load(MemoryStorage::new(), KEY);
        store.add(movie("1"));
        let snapshot = store.list().to_vec();

        let renamed = FavoriteItem::new("1", "Different title");
        assert_eq!(store.add(renamed), FavoriteChange::Unchanged);

        assert_eq!(store.count(), 1);
        assert_eq!(store.list(), snapshot.as_slice());
    }

    #[test]
    fn test_remove_missing_id_is_noop() {
        let mut store = FavoritesStore::load(MemoryStorage::new(), KEY);
        store.add(movie("1"));

        assert_eq!(store.remove("404"), FavoriteChange::Unchanged);
        assert_eq!(store.remove("1"), FavoriteChange::Removed);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_toggle_twice_restores_membership_and_order() {
        let mut store = FavoritesStore::load(MemoryStorage::new(), KEY);
        store.add(movie("1"));
        store.add(movie("2"));
        let before = store.list().to_vec();

        assert_eq!(store.toggle(movie("3")), FavoriteChange::Added);
        assert!(store.is_favorite("3"));
        assert_eq!(store.toggle(movie("3")), FavoriteChange::Removed);

        assert_eq!(store.list(), before.as_slice());
    }

    #[test]
    fn test_toggle_removes_present_item() {
        let mut store = FavoritesStore::load(MemoryStorage::new(), KEY);
        store.add(movie("1"));
        store.add(movie("2"));

        assert_eq!(store.toggle(movie("1")), FavoriteChange::Removed);
        assert_eq!(ids(&store), vec!["2"]);
        assert_eq!(store.toggle(movie("1")), FavoriteChange::Added);
        assert_eq!(ids(&store), vec!["2", "1"]);
    }

    #[test]
    fn test_every_mutation_writes_full_collection() {
        let writes = Rc::new(RefCell::new(Vec::new()));
        let storage = FlakyStorage {
            writes: writes.clone(),
            ..FlakyStorage::default()
        };
        let mut store = FavoritesStore::load(storage, KEY);

        store.add(movie("1"));
        store.add(movie("2"));
        store.add(movie("2"));
        store.remove("1");

        let writes = writes.borrow();
        assert_eq!(writes.len(), 3);
        let last: Vec<FavoriteItem> =
            serde_json::from_str(writes.last().expect("last write")).expect("valid json");
        assert_eq!(last, vec![movie("2")]);
    }

    #[test]
    fn test_persisted_collection_reloads_identically() {
        let mut store = FavoritesStore::load(MemoryStorage::new(), KEY);
        store.add(movie("1"));
        store.add(movie("2"));
        let expected = store.list().to_vec();

        let reloaded = FavoritesStore::load(store.into_storage(), KEY);

        assert_eq!(reloaded.list(), expected.as_slice());
        assert_eq!(ids(&reloaded), vec!["1", "2"]);
    }

    #[test]
    fn test_write_failure_keeps_in_memory_change() {
        let storage = FlakyStorage {
            fail_writes: true,
            ..FlakyStorage::default()
        };
        let mut store = FavoritesStore::load(storage, KEY);

        assert_eq!(store.add(movie("1")), FavoriteChange::Added);

        assert!(store.is_favorite("1"));
        assert_eq!(store.count(), 1);
        assert!(store.last_write_failed());
    }

    #[test]
    fn test_list_returns_view_that_cannot_mutate_store() {
        let mut store = FavoritesStore::load(MemoryStorage::new(), KEY);
        store.add(movie("1"));

        let mut copy = store.list().to_vec();
        copy[0].title = "Changed".to_string();
        copy.push(movie("2"));

        assert_eq!(store.count(), 1);
        assert_eq!(store.list()[0].title, "Movie 1");
    }
}
