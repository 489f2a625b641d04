//! Keyed and indexed in-memory store of realized NSX resources.
//!
//! A [`ResourceStore`] caches confirmed-realized NSX objects so services can
//! answer lookups without a remote query. Every record is reachable by its
//! primary key and by every key its index functions derive for it.
//!
//! # Index maintenance
//!
//! A record's index keys can change between versions (its port list or tags
//! change), so an upsert first removes the index entries computed from the
//! previous version before inserting the new ones. Deletion removes the
//! record from the primary map and from every index under the same write
//! lock, so readers never observe a half-applied record.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

/// Error type for store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A record without a primary key was applied.
    #[error("{kind} record has no primary key")]
    MissingKey { kind: &'static str },
}

/// A resource that can live in a [`ResourceStore`].
///
/// Implemented once per resource type; the store resolves keys and index
/// keys through this trait instead of inspecting records at runtime.
pub trait Indexed: Send + Sync + 'static {
    /// Human-readable resource kind, used in logs and errors.
    const KIND: &'static str;

    /// Primary key of the record, usually the NSX object id.
    fn primary_key(&self) -> Option<&str>;

    /// Keys this record is reachable under for the named index.
    ///
    /// Returning an empty vector leaves the record out of that index.
    fn index_keys(&self, index: &str) -> Vec<String>;

    /// Returns true if NSX reports the object as deleted.
    fn is_tombstone(&self) -> bool;
}

struct Inner<T> {
    items: HashMap<String, Arc<T>>,
    /// index name -> index key -> primary keys
    indices: HashMap<&'static str, HashMap<String, HashSet<String>>>,
}

impl<T: Indexed> Inner<T> {
    fn unindex(&mut self, key: &str, record: &T) {
        for (name, index) in self.indices.iter_mut() {
            for index_key in record.index_keys(name) {
                if let Some(keys) = index.get_mut(&index_key) {
                    keys.remove(key);
                    if keys.is_empty() {
                        index.remove(&index_key);
                    }
                }
            }
        }
    }

    fn index(&mut self, key: &str, record: &T) {
        for (name, index) in self.indices.iter_mut() {
            for index_key in record.index_keys(name) {
                index.entry(index_key).or_default().insert(key.to_string());
            }
        }
    }

    fn remove(&mut self, key: &str) -> Option<Arc<T>> {
        let old = self.items.remove(key)?;
        self.unindex(key, &old);
        Some(old)
    }

    fn upsert(&mut self, key: String, record: Arc<T>) {
        if let Some(old) = self.items.remove(&key) {
            self.unindex(&key, &old);
        }
        self.index(&key, &record);
        self.items.insert(key, record);
    }
}

/// In-memory cache of NSX resources with secondary indexes.
///
/// Readers share a read lock; each [`apply`](Self::apply) takes the write
/// lock once, so index membership and the primary map always change
/// together.
///
/// # Example
///
/// ```ignore
/// let store: ResourceStore<LbVirtualServer> =
///     ResourceStore::new(&[index::SERVICE_UID, index::SERVICE_AND_PORT]);
/// store.apply(vs)?;
/// let by_service = store.get_by_index(index::SERVICE_UID, "uid-1");
/// ```
pub struct ResourceStore<T> {
    inner: RwLock<Inner<T>>,
    index_names: Vec<&'static str>,
}

impl<T> fmt::Debug for ResourceStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceStore")
            .field("len", &self.inner.read().items.len())
            .field("indices", &self.index_names)
            .finish()
    }
}

impl<T: Indexed> ResourceStore<T> {
    /// Creates an empty store maintaining the given indexes.
    pub fn new(index_names: &[&'static str]) -> Self {
        let indices = index_names
            .iter()
            .map(|name| (*name, HashMap::new()))
            .collect();
        Self {
            inner: RwLock::new(Inner {
                items: HashMap::new(),
                indices,
            }),
            index_names: index_names.to_vec(),
        }
    }

    /// Returns the names of the maintained indexes.
    pub fn index_names(&self) -> &[&'static str] {
        &self.index_names
    }

    /// Applies a record snapshot.
    ///
    /// A tombstoned record is removed from the primary map and every index;
    /// anything else replaces the stored version wholesale.
    pub fn apply(&self, record: T) -> Result<(), StoreError> {
        let key = record
            .primary_key()
            .ok_or(StoreError::MissingKey { kind: T::KIND })?
            .to_string();

        if record.is_tombstone() {
            let removed = self.inner.write().remove(&key).is_some();
            debug!(kind = T::KIND, key = %key, removed, "deleted record from store");
        } else {
            self.inner.write().upsert(key.clone(), Arc::new(record));
            debug!(kind = T::KIND, key = %key, "applied record to store");
        }
        Ok(())
    }

    /// Removes the record stored under `key`, returning it if present.
    pub fn delete_by_key(&self, key: &str) -> Option<Arc<T>> {
        let removed = self.inner.write().remove(key);
        if removed.is_some() {
            debug!(kind = T::KIND, key = %key, "deleted record from store");
        }
        removed
    }

    /// Returns the record stored under `key`.
    ///
    /// **This never creates entries.**
    pub fn get_by_key(&self, key: &str) -> Option<Arc<T>> {
        self.inner.read().items.get(key).cloned()
    }

    /// Returns the records reachable under `value` in the named index.
    ///
    /// Order is unspecified. An unknown index yields an empty vector.
    pub fn get_by_index(&self, index: &str, value: &str) -> Vec<Arc<T>> {
        let inner = self.inner.read();
        let Some(keys) = Self::index_entry(&inner, index, value) else {
            return Vec::new();
        };
        keys.iter()
            .filter_map(|key| inner.items.get(key).cloned())
            .collect()
    }

    /// Returns the primary keys reachable under `value` in the named index.
    pub fn get_keys_by_index(&self, index: &str, value: &str) -> Vec<String> {
        let inner = self.inner.read();
        Self::index_entry(&inner, index, value)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns a snapshot of every stored record.
    pub fn list(&self) -> Vec<Arc<T>> {
        self.inner.read().items.values().cloned().collect()
    }

    /// Returns every primary key.
    pub fn list_keys(&self) -> Vec<String> {
        self.inner.read().items.keys().cloned().collect()
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.inner.read().items.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().items.is_empty()
    }

    fn index_entry<'a>(
        inner: &'a Inner<T>,
        index: &str,
        value: &str,
    ) -> Option<&'a HashSet<String>> {
        match inner.indices.get(index) {
            Some(entries) => entries.get(value),
            None => {
                warn!(kind = T::KIND, index = %index, "lookup on unregistered index");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BY_OWNER: &str = "owner";
    const BY_PORT: &str = "port";

    #[derive(Debug, Clone, PartialEq)]
    struct Record {
        id: Option<String>,
        owner: String,
        ports: Vec<u16>,
        deleted: bool,
    }

    impl Record {
        fn new(id: &str, owner: &str, ports: &[u16]) -> Self {
            Self {
                id: Some(id.to_string()),
                owner: owner.to_string(),
                ports: ports.to_vec(),
                deleted: false,
            }
        }

        fn tombstone(mut self) -> Self {
            self.deleted = true;
            self
        }
    }

    impl Indexed for Record {
        const KIND: &'static str = "record";

        fn primary_key(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn index_keys(&self, index: &str) -> Vec<String> {
            match index {
                BY_OWNER => vec![self.owner.clone()],
                BY_PORT => self.ports.iter().map(|p| format!("{}|{}", self.owner, p)).collect(),
                _ => Vec::new(),
            }
        }

        fn is_tombstone(&self) -> bool {
            self.deleted
        }
    }

    fn store() -> ResourceStore<Record> {
        ResourceStore::new(&[BY_OWNER, BY_PORT])
    }

    fn sorted(mut keys: Vec<String>) -> Vec<String> {
        keys.sort();
        keys
    }

    #[test]
    fn test_apply_and_lookup() {
        let store = store();
        store.apply(Record::new("a", "svc-1", &[80, 443])).unwrap();
        store.apply(Record::new("b", "svc-1", &[8080])).unwrap();
        store.apply(Record::new("c", "svc-2", &[80])).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.get_by_key("a").unwrap().ports, vec![80, 443]);
        assert!(store.get_by_key("missing").is_none());
        assert_eq!(sorted(store.get_keys_by_index(BY_OWNER, "svc-1")), vec!["a", "b"]);
        assert_eq!(store.get_keys_by_index(BY_PORT, "svc-1|443"), vec!["a"]);
        assert_eq!(store.get_by_index(BY_PORT, "svc-2|80").len(), 1);
        assert!(store.get_by_index(BY_OWNER, "svc-3").is_empty());
    }

    #[test]
    fn test_reapply_clears_stale_index_keys() {
        let store = store();
        store.apply(Record::new("a", "svc-1", &[80, 443])).unwrap();
        store.apply(Record::new("a", "svc-2", &[8443])).unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.get_keys_by_index(BY_OWNER, "svc-1").is_empty());
        assert!(store.get_keys_by_index(BY_PORT, "svc-1|80").is_empty());
        assert!(store.get_keys_by_index(BY_PORT, "svc-1|443").is_empty());
        assert_eq!(store.get_keys_by_index(BY_PORT, "svc-2|8443"), vec!["a"]);
    }

    #[test]
    fn test_reapply_same_record_is_idempotent() {
        let store = store();
        let record = Record::new("a", "svc-1", &[80]);
        store.apply(record.clone()).unwrap();
        store.apply(record).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get_keys_by_index(BY_OWNER, "svc-1"), vec!["a"]);
        assert_eq!(store.get_keys_by_index(BY_PORT, "svc-1|80"), vec!["a"]);
    }

    #[test]
    fn test_tombstone_removes_from_all_indexes() {
        let store = store();
        store.apply(Record::new("a", "svc-1", &[80])).unwrap();
        store.apply(Record::new("a", "svc-1", &[80]).tombstone()).unwrap();

        assert!(store.is_empty());
        assert!(store.get_by_key("a").is_none());
        assert!(store.get_by_index(BY_OWNER, "svc-1").is_empty());
        assert!(store.get_by_index(BY_PORT, "svc-1|80").is_empty());
    }

    #[test]
    fn test_tombstone_for_unknown_key_is_noop() {
        let store = store();
        store.apply(Record::new("a", "svc-1", &[80]).tombstone()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_missing_primary_key() {
        let store = store();
        let mut record = Record::new("a", "svc-1", &[80]);
        record.id = None;

        assert_eq!(
            store.apply(record),
            Err(StoreError::MissingKey { kind: "record" })
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_by_key() {
        let store = store();
        store.apply(Record::new("a", "svc-1", &[80])).unwrap();

        assert_eq!(store.delete_by_key("a").unwrap().owner, "svc-1");
        assert!(store.delete_by_key("a").is_none());
        assert!(store.get_keys_by_index(BY_OWNER, "svc-1").is_empty());
    }

    #[test]
    fn test_unregistered_index_is_empty() {
        let store = store();
        store.apply(Record::new("a", "svc-1", &[80])).unwrap();
        assert!(store.get_by_index("nope", "svc-1").is_empty());
        assert!(store.get_keys_by_index("nope", "svc-1").is_empty());
        assert_eq!(store.index_names(), &[BY_OWNER, BY_PORT]);
    }

    #[test]
    fn test_mixed_sequence_matches_model() {
        let store = store();
        let ops = vec![
            Record::new("a", "svc-1", &[80]),
            Record::new("b", "svc-2", &[80, 81]),
            Record::new("a", "svc-2", &[81]),
            Record::new("c", "svc-1", &[]),
            Record::new("b", "svc-2", &[]).tombstone(),
            Record::new("d", "svc-1", &[90]),
        ];
        let mut model: HashMap<String, Record> = HashMap::new();
        for op in ops {
            let key = op.id.clone().unwrap();
            if op.deleted {
                model.remove(&key);
            } else {
                model.insert(key, op.clone());
            }
            store.apply(op).unwrap();

            assert_eq!(sorted(store.list_keys()), sorted(model.keys().cloned().collect()));
            for owner in ["svc-1", "svc-2"] {
                let expected: Vec<String> = model
                    .values()
                    .filter(|r| r.owner == owner)
                    .filter_map(|r| r.id.clone())
                    .collect();
                assert_eq!(sorted(store.get_keys_by_index(BY_OWNER, owner)), sorted(expected));
            }
            for value in ["svc-1|80", "svc-2|80", "svc-2|81", "svc-1|90"] {
                let expected: Vec<String> = model
                    .values()
                    .filter(|r| r.index_keys(BY_PORT).iter().any(|k| k == value))
                    .filter_map(|r| r.id.clone())
                    .collect();
                assert_eq!(sorted(store.get_keys_by_index(BY_PORT, value)), sorted(expected));
            }
        }
    }

    #[test]
    fn test_concurrent_apply() {
        let store = Arc::new(store());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .apply(Record::new(&format!("r{}", i), "svc-1", &[80]))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 16);
        for i in 0..16 {
            assert!(store.get_by_key(&format!("r{}", i)).is_some());
        }
        assert_eq!(store.get_keys_by_index(BY_OWNER, "svc-1").len(), 16);
    }
}
