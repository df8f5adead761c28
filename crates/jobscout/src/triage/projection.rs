//! Live partition of the jobs collection into review buckets.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;

use super::model::{JobPosting, TriageStatus};
use crate::store::{Document, RecordStore, StoreError, Subscription};

/// Every job in exactly one bucket, newest posting first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TriageBoard {
    pub new: Vec<JobPosting>,
    pub shortlisted: Vec<JobPosting>,
    pub contacted: Vec<JobPosting>,
    pub rejected: Vec<JobPosting>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BoardCounts {
    pub new: usize,
    pub shortlisted: usize,
    pub contacted: usize,
    pub rejected: usize,
    pub total: usize,
}

impl TriageBoard {
    pub fn from_documents(documents: &[Document]) -> Self {
        let mut board = Self::default();
        for doc in documents {
            let job = JobPosting::from_document(doc);
            board.bucket_mut(job.status).push(job);
        }
        for status in TriageStatus::ALL {
            // Stable, so equal or missing dates keep collection order.
            board.bucket_mut(status).sort_by(newest_first);
        }
        board
    }

    pub fn bucket(&self, status: TriageStatus) -> &[JobPosting] {
        match status {
            TriageStatus::New => &self.new,
            TriageStatus::Shortlisted => &self.shortlisted,
            TriageStatus::Contacted => &self.contacted,
            TriageStatus::Rejected => &self.rejected,
        }
    }

    fn bucket_mut(&mut self, status: TriageStatus) -> &mut Vec<JobPosting> {
        match status {
            TriageStatus::New => &mut self.new,
            TriageStatus::Shortlisted => &mut self.shortlisted,
            TriageStatus::Contacted => &mut self.contacted,
            TriageStatus::Rejected => &mut self.rejected,
        }
    }

    pub fn counts(&self) -> BoardCounts {
        BoardCounts {
            new: self.new.len(),
            shortlisted: self.shortlisted.len(),
            contacted: self.contacted.len(),
            rejected: self.rejected.len(),
            total: self.len(),
        }
    }

    pub fn len(&self) -> usize {
        TriageStatus::ALL.iter().map(|s| self.bucket(*s).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, job_id: &str) -> Option<&JobPosting> {
        TriageStatus::ALL
            .iter()
            .flat_map(|s| self.bucket(*s))
            .find(|job| job.id == job_id)
    }
}

/// Descending `posted_at`; undated postings go last.
fn newest_first(a: &JobPosting, b: &JobPosting) -> Ordering {
    match (a.posted_at, b.posted_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Derives boards from the jobs collection.
pub struct TriageProjection {
    store: Arc<dyn RecordStore>,
    collection: String,
}

impl TriageProjection {
    pub fn new(store: Arc<dyn RecordStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// One-off board of the current contents.
    pub async fn board(&self) -> Result<TriageBoard, StoreError> {
        let documents = self.store.list(&self.collection).await?;
        Ok(TriageBoard::from_documents(&documents))
    }

    /// Boards re-derived after every change to the collection, by any writer.
    pub async fn subscribe(&self) -> Result<TriageSubscription, StoreError> {
        let inner = self.store.watch(&self.collection).await?;
        Ok(TriageSubscription { inner })
    }
}

/// Dropping the subscription stops delivery.
pub struct TriageSubscription {
    inner: Subscription,
}

impl TriageSubscription {
    pub async fn next(&mut self) -> Option<TriageBoard> {
        let documents = self.inner.next().await?;
        Some(TriageBoard::from_documents(&documents))
    }
}
