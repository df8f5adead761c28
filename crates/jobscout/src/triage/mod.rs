//! Review workflow for extracted job postings.

mod model;
mod mutator;
mod projection;

pub use model::{JobPosting, TriageStatus};
pub use mutator::{Permissive, Strict, TransitionPolicy, TriageMutator};
pub use projection::{BoardCounts, TriageBoard, TriageProjection, TriageSubscription};
