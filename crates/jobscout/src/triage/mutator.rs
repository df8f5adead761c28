//! Status changes and deletions on job postings.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map};

use super::model::{JobPosting, TriageStatus};
use crate::error::TriageError;
use crate::store::{timestamp_value, RecordStore};

/// Decides which status changes are allowed.
pub trait TransitionPolicy: Send + Sync {
    fn allows(&self, from: TriageStatus, to: TriageStatus) -> bool;

    /// Policies that accept every change can skip reading the current status.
    fn requires_current(&self) -> bool {
        true
    }
}

/// Any status may follow any other.
#[derive(Debug, Clone, Copy, Default)]
pub struct Permissive;

impl TransitionPolicy for Permissive {
    fn allows(&self, _from: TriageStatus, _to: TriageStatus) -> bool {
        true
    }

    fn requires_current(&self) -> bool {
        false
    }
}

/// Forward review flow, with a way back to `new` from every other status.
#[derive(Debug, Clone, Copy, Default)]
pub struct Strict;

impl TransitionPolicy for Strict {
    fn allows(&self, from: TriageStatus, to: TriageStatus) -> bool {
        use TriageStatus::*;

        from == to
            || matches!(
                (from, to),
                (New, Shortlisted)
                    | (New, Rejected)
                    | (Shortlisted, Contacted)
                    | (Shortlisted, Rejected)
                    | (Shortlisted, New)
                    | (Contacted, Rejected)
                    | (Contacted, New)
                    | (Rejected, New)
            )
    }
}

/// Writes triage decisions to the jobs collection.
///
/// Nothing is patched locally; boards pick the change up from the store.
pub struct TriageMutator {
    store: Arc<dyn RecordStore>,
    collection: String,
    policy: Box<dyn TransitionPolicy>,
}

impl TriageMutator {
    pub fn new(store: Arc<dyn RecordStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            policy: Box::new(Permissive),
        }
    }

    pub fn with_policy(mut self, policy: impl TransitionPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Sets the job's status and stamps `lastUpdated`.
    pub async fn set_status(
        &self,
        job_id: &str,
        status: TriageStatus,
    ) -> Result<JobPosting, TriageError> {
        if self.policy.requires_current() {
            let current = self
                .store
                .get(&self.collection, job_id)
                .await
                .map_err(|source| TriageError::UpdateFailed {
                    job_id: job_id.to_string(),
                    source,
                })?;
            let from = TriageStatus::normalize(current.get_str("status"));
            if !self.policy.allows(from, status) {
                return Err(TriageError::IllegalTransition {
                    job_id: job_id.to_string(),
                    from,
                    to: status,
                });
            }
        }

        let mut patch = Map::new();
        patch.insert("status".to_string(), json!(status.as_str()));
        patch.insert("lastUpdated".to_string(), timestamp_value(Utc::now()));

        let doc = self
            .store
            .update(&self.collection, job_id, patch)
            .await
            .map_err(|source| {
                log::error!("Failed to update status of job {}: {}", job_id, source);
                TriageError::UpdateFailed {
                    job_id: job_id.to_string(),
                    source,
                }
            })?;

        log::info!("Job {} marked {}", job_id, status);
        Ok(JobPosting::from_document(&doc))
    }

    /// Deletes the job. Irreversible; confirming is up to the caller.
    pub async fn remove(&self, job_id: &str) -> Result<(), TriageError> {
        self.store
            .delete(&self.collection, job_id)
            .await
            .map_err(|source| {
                log::error!("Failed to delete job {}: {}", job_id, source);
                TriageError::DeleteFailed {
                    job_id: job_id.to_string(),
                    source,
                }
            })?;
        log::info!("Job {} deleted", job_id);
        Ok(())
    }
}
