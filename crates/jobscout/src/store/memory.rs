//! In-process record store.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use super::{CollectionSnapshot, Document, RecordStore, StoreError, Subscription};

const DEFAULT_CAPACITY: usize = 64;

type Collections = HashMap<String, BTreeMap<String, Map<String, Value>>>;

/// Record store held in memory. Documents list in id order.
///
/// Every write publishes the collection's new contents to subscribers while
/// the write lock is held, so snapshots arrive in write order. Each
/// collection has its own change channel, so a subscriber that lags only
/// ever skips stale snapshots of the collection it watches.
pub struct MemoryStore {
    collections: RwLock<Collections>,
    channels: Mutex<HashMap<String, broadcast::Sender<CollectionSnapshot>>>,
    capacity: usize,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            channels: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            offline: AtomicBool::new(false),
        }
    }

    pub fn shared(capacity: usize) -> Arc<Self> {
        Arc::new(Self::new(capacity))
    }

    /// While offline every operation fails with `StoreError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Live subscriptions across all collections.
    pub fn subscriber_count(&self) -> usize {
        self.channels()
            .values()
            .map(broadcast::Sender::receiver_count)
            .sum()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store is offline".to_string()))
        } else {
            Ok(())
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Collections> {
        match self.collections.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Memory store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn channels(&self) -> MutexGuard<'_, HashMap<String, broadcast::Sender<CollectionSnapshot>>> {
        match self.channels.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Memory store channel lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn snapshot_of(collections: &Collections, collection: &str) -> Vec<Document> {
        collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn publish(&self, collections: &Collections, collection: &str) {
        let mut channels = self.channels();
        let Some(sender) = channels.get(collection).cloned() else {
            return;
        };
        if sender.receiver_count() == 0 {
            channels.remove(collection);
            return;
        }
        let snapshot = CollectionSnapshot {
            collection: collection.to_string(),
            documents: Arc::new(Self::snapshot_of(collections, collection)),
        };
        let _ = sender.send(snapshot);
    }

    fn not_found(collection: &str, id: &str) -> StoreError {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.check_online()?;
        let collections = match self.collections.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Memory store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        Ok(Self::snapshot_of(&collections, collection))
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        self.check_online()?;
        let collections = match self.collections.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(id, fields.clone()))
            .ok_or_else(|| Self::not_found(collection, id))
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        self.check_online()?;
        if document.id.is_empty() {
            return Err(StoreError::InvalidDocument {
                collection: collection.to_string(),
                id: document.id,
                reason: "document id must not be empty".to_string(),
            });
        }

        let mut collections = self.write();
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(document.id, document.fields);
        self.publish(&collections, collection);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<Document, StoreError> {
        self.check_online()?;
        let mut collections = self.write();
        let fields = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| Self::not_found(collection, id))?;
        fields.extend(patch);
        let updated = Document::new(id, fields.clone());
        self.publish(&collections, collection);
        log::debug!("Updated {}/{}", collection, id);
        Ok(updated)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check_online()?;
        let mut collections = self.write();
        let removed = collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id));
        if removed.is_none() {
            return Err(Self::not_found(collection, id));
        }
        self.publish(&collections, collection);
        log::debug!("Deleted {}/{}", collection, id);
        Ok(())
    }

    async fn watch(&self, collection: &str) -> Result<Subscription, StoreError> {
        self.check_online()?;
        // Subscribe under the lock so no write falls between the initial
        // contents and the first published change.
        let collections = self.write();
        let receiver = self
            .channels()
            .entry(collection.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        let initial = Self::snapshot_of(&collections, collection);
        Ok(Subscription::new(collection, initial, receiver))
    }
}
