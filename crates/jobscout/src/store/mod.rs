//! Shared record store seam.
//!
//! Job postings, schedules and datasources live in an external document store
//! that several writers touch (this crate, the scraping backend, other
//! operators). Writes are last-write-wins. Readers subscribe to a collection
//! and receive its full contents again after every change.

mod error;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::broadcast::{self, error::RecvError};

pub use error::StoreError;
pub use memory::MemoryStore;

/// One stored record: an id plus its top-level fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Builds a document from a JSON value, which must be an object.
    pub fn from_value(id: impl Into<String>, value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self::new(id, fields)),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn get_u64(&self, field: &str) -> Option<u64> {
        self.fields.get(field).and_then(Value::as_u64)
    }

    pub fn get_timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        self.fields.get(field).and_then(parse_timestamp)
    }
}

/// Reads a timestamp field.
///
/// Accepts an RFC 3339 string, integer epoch seconds, or a server timestamp
/// object carrying `seconds` (and optionally `nanoseconds`). Anything else is
/// treated as absent.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok(),
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        Value::Object(map) => {
            let secs = map.get("seconds").and_then(Value::as_i64)?;
            let nanos = map
                .get("nanoseconds")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(0);
            DateTime::from_timestamp(secs, nanos)
        }
        _ => None,
    }
}

/// Timestamp encoding used for fields this crate writes.
pub fn timestamp_value(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339())
}

/// Full contents of one collection after a change.
#[derive(Debug, Clone)]
pub struct CollectionSnapshot {
    pub collection: String,
    pub documents: Arc<Vec<Document>>,
}

/// Live view of one collection.
///
/// Yields the contents current at subscription time first, then a fresh
/// snapshot after every change. Dropping it unregisters the listener.
pub struct Subscription {
    collection: String,
    initial: Option<Arc<Vec<Document>>>,
    receiver: broadcast::Receiver<CollectionSnapshot>,
}

impl Subscription {
    /// `receiver` must be the collection's own change channel.
    pub fn new(
        collection: impl Into<String>,
        initial: Vec<Document>,
        receiver: broadcast::Receiver<CollectionSnapshot>,
    ) -> Self {
        Self {
            collection: collection.into(),
            initial: Some(Arc::new(initial)),
            receiver,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Next snapshot, or `None` once the store has shut down.
    pub async fn next(&mut self) -> Option<Arc<Vec<Document>>> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }
        loop {
            match self.receiver.recv().await {
                Ok(snapshot) if snapshot.collection == self.collection => {
                    return Some(snapshot.documents)
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    // The channel is per collection and snapshots are complete,
                    // so skipped ones are all superseded.
                    log::debug!(
                        "Subscription to '{}' skipped {} stale snapshots",
                        self.collection,
                        skipped
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Document store shared with external writers.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All documents of a collection; missing collections are empty.
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Document, StoreError>;

    /// Writes the whole document, replacing any existing one with that id.
    async fn insert(&self, collection: &str, document: Document) -> Result<(), StoreError>;

    /// Merges `patch` into the document's top-level fields.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<Document, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    async fn watch(&self, collection: &str) -> Result<Subscription, StoreError>;
}
