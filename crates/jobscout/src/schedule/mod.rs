//! Recurring pipeline schedules.

mod datasource;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ScheduleError;
use crate::store::{Document, RecordStore, StoreError, Subscription};

pub use datasource::{Datasource, DatasourceDirectory, DatasourceSubscription};

/// Interval applied to a schedule when the stored record has none.
const DEFAULT_INTERVAL: ScheduleInterval = ScheduleInterval::Daily;

/// The permitted run intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ScheduleInterval {
    SixHours,
    EightHours,
    TwelveHours,
    Daily,
    Weekly,
}

impl ScheduleInterval {
    pub const ALL: [ScheduleInterval; 5] = [
        ScheduleInterval::SixHours,
        ScheduleInterval::EightHours,
        ScheduleInterval::TwelveHours,
        ScheduleInterval::Daily,
        ScheduleInterval::Weekly,
    ];

    pub fn minutes(self) -> u32 {
        match self {
            ScheduleInterval::SixHours => 360,
            ScheduleInterval::EightHours => 480,
            ScheduleInterval::TwelveHours => 720,
            ScheduleInterval::Daily => 1440,
            ScheduleInterval::Weekly => 10080,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScheduleInterval::SixHours => "Every 6h",
            ScheduleInterval::EightHours => "Every 8h",
            ScheduleInterval::TwelveHours => "Every 12h",
            ScheduleInterval::Daily => "Daily",
            ScheduleInterval::Weekly => "Weekly",
        }
    }

    pub fn duration(self) -> Duration {
        Duration::minutes(i64::from(self.minutes()))
    }
}

impl TryFrom<u32> for ScheduleInterval {
    type Error = ScheduleError;

    fn try_from(minutes: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|interval| interval.minutes() == minutes)
            .ok_or(ScheduleError::InvalidInterval(minutes))
    }
}

impl From<ScheduleInterval> for u32 {
    fn from(interval: ScheduleInterval) -> Self {
        interval.minutes()
    }
}

impl std::fmt::Display for ScheduleInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of the most recent scheduled run, written by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastRunStats {
    pub total_jobs: u64,
    /// Job title to number of postings found.
    pub breakdown: BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl LastRunStats {
    fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let breakdown = map
            .get("breakdown")
            .and_then(Value::as_object)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|(title, count)| Some((title.clone(), count.as_u64()?)))
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            total_jobs: map.get("totalJobs").and_then(Value::as_u64).unwrap_or(0),
            breakdown,
            completed_at: map.get("timestamp").and_then(crate::store::parse_timestamp),
        })
    }
}

/// A recurring run of one datasource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    pub id: String,
    pub source_id: String,
    pub interval: ScheduleInterval,
    pub max_scrolls: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run_stats: Option<LastRunStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ScheduleConfig {
    /// Reads a stored schedule. Records without a source or with an interval
    /// outside the permitted set are rejected.
    pub fn from_document(collection: &str, doc: &Document) -> Result<Self, StoreError> {
        let invalid = |reason: String| StoreError::InvalidDocument {
            collection: collection.to_string(),
            id: doc.id.clone(),
            reason,
        };

        let source_id = match doc.get("groupID") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(invalid("missing groupID".to_string())),
        };

        let interval = match doc.get("interval") {
            None | Some(Value::Null) => DEFAULT_INTERVAL,
            Some(value) => value
                .as_u64()
                .and_then(|m| u32::try_from(m).ok())
                .ok_or_else(|| invalid(format!("interval is not a number: {}", value)))
                .and_then(|m| ScheduleInterval::try_from(m).map_err(|e| invalid(e.to_string())))?,
        };

        let max_scrolls = doc
            .get_u64("maxScrolls")
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)
            .ok_or_else(|| invalid("maxScrolls must be a positive integer".to_string()))?;

        Ok(Self {
            id: doc.id.clone(),
            source_id,
            interval,
            max_scrolls,
            last_run_stats: doc.get("lastRunStats").and_then(LastRunStats::from_value),
            created_at: doc.get_timestamp("createdAt"),
        })
    }

    /// A schedule that never ran is due; otherwise it is due once its
    /// interval has elapsed since the last completed run.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_run_stats.as_ref().and_then(|s| s.completed_at) {
            None => true,
            Some(last) => now >= last + self.interval.duration(),
        }
    }

    pub fn next_run_at(&self) -> Option<DateTime<Utc>> {
        self.last_run_stats
            .as_ref()
            .and_then(|s| s.completed_at)
            .map(|last| last + self.interval.duration())
    }
}

/// Parses every readable schedule, newest `created_at` first.
fn schedules_from(collection: &str, documents: &[Document]) -> Vec<ScheduleConfig> {
    let mut schedules: Vec<ScheduleConfig> = documents
        .iter()
        .filter_map(|doc| match ScheduleConfig::from_document(collection, doc) {
            Ok(schedule) => Some(schedule),
            Err(e) => {
                log::warn!("Skipping unreadable schedule: {}", e);
                None
            }
        })
        .collect();
    // `None` sorts before `Some`, so reversing puts undated schedules last.
    schedules.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    schedules
}

/// Reads and edits the schedule collection.
pub struct ScheduleEditor {
    store: Arc<dyn RecordStore>,
    collection: String,
}

impl ScheduleEditor {
    pub fn new(store: Arc<dyn RecordStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Changes a schedule's interval.
    ///
    /// The value and the record it lands in are both validated before any
    /// write, so a rejected change leaves the store untouched.
    pub async fn set_interval(
        &self,
        schedule_id: &str,
        minutes: u32,
    ) -> Result<ScheduleConfig, ScheduleError> {
        let interval = ScheduleInterval::try_from(minutes)?;
        let value = json!(interval.minutes());

        let mut candidate = self
            .store
            .get(&self.collection, schedule_id)
            .await
            .map_err(|e| self.map_store_error(schedule_id, e))?;
        candidate.fields.insert("interval".to_string(), value.clone());
        ScheduleConfig::from_document(&self.collection, &candidate).map_err(|e| {
            ScheduleError::Unreadable {
                id: schedule_id.to_string(),
                reason: e.to_string(),
            }
        })?;

        let mut patch = Map::new();
        patch.insert("interval".to_string(), value);

        let doc = self
            .store
            .update(&self.collection, schedule_id, patch)
            .await
            .map_err(|e| self.map_store_error(schedule_id, e))?;

        log::info!(
            "Schedule {} now runs {}",
            schedule_id,
            interval.label().to_lowercase()
        );
        Ok(ScheduleConfig::from_document(&self.collection, &doc)?)
    }

    pub async fn remove(&self, schedule_id: &str) -> Result<(), ScheduleError> {
        self.store
            .delete(&self.collection, schedule_id)
            .await
            .map_err(|e| self.map_store_error(schedule_id, e))?;
        log::info!("Removed schedule {}", schedule_id);
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<ScheduleConfig>, ScheduleError> {
        let documents = self.store.list(&self.collection).await?;
        Ok(schedules_from(&self.collection, &documents))
    }

    /// Schedules whose next run is due at `now`.
    pub async fn due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduleConfig>, ScheduleError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|s| s.is_due(now))
            .collect())
    }

    /// Live schedule set, re-emitted after every change by any writer.
    pub async fn subscribe(&self) -> Result<ScheduleSubscription, ScheduleError> {
        let inner = self.store.watch(&self.collection).await?;
        Ok(ScheduleSubscription { inner })
    }

    fn map_store_error(&self, schedule_id: &str, error: StoreError) -> ScheduleError {
        match error {
            StoreError::NotFound { .. } => ScheduleError::NotFound(schedule_id.to_string()),
            other => ScheduleError::Store(other),
        }
    }
}

/// Stream of full schedule sets. Dropping it stops the listener.
pub struct ScheduleSubscription {
    inner: Subscription,
}

impl ScheduleSubscription {
    pub async fn next(&mut self) -> Option<Vec<ScheduleConfig>> {
        let documents = self.inner.next().await?;
        Some(schedules_from(self.inner.collection(), &documents))
    }
}
