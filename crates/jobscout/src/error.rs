use std::path::PathBuf;
use thiserror::Error;

use crate::monitor::RunError;
use crate::store::StoreError;
use crate::triage::TriageStatus;

#[derive(Error, Debug)]
pub enum JobscoutError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline run error: {0}")]
    Run(#[from] RunError),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Triage error: {0}")]
    Triage(#[from] TriageError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid schedule interval: {0} minutes (allowed: 360, 480, 720, 1440, 10080)")]
    InvalidInterval(u32),

    #[error("Schedule '{0}' not found")]
    NotFound(String),

    #[error("Schedule '{id}' is unreadable: {reason}")]
    Unreadable { id: String, reason: String },

    #[error("Schedule store write failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Failed to update job '{job_id}': {source}")]
    UpdateFailed {
        job_id: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to delete job '{job_id}': {source}")]
    DeleteFailed {
        job_id: String,
        #[source]
        source: StoreError,
    },

    #[error("Illegal status transition for job '{job_id}': {from} -> {to}")]
    IllegalTransition {
        job_id: String,
        from: TriageStatus,
        to: TriageStatus,
    },
}

pub type Result<T> = std::result::Result<T, JobscoutError>;
