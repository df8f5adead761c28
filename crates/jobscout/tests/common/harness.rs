//! Test harness for isolated test execution.
//!
//! `TestHarness` owns a `MemoryStore` standing in for the shared document
//! store, plus a temp directory for config files. `ScriptedTransport` replays
//! fixed run output in place of the scraping backend.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use jobscout::config::{load_config, Config};
use jobscout::monitor::{ChunkStream, PipelineTransport, RunRequest, TransportError};
use jobscout::schedule::ScheduleEditor;
use jobscout::store::{Document, MemoryStore, RecordStore};
use jobscout::triage::{TriageMutator, TriageProjection};

/// Isolated store plus config directory.
pub struct TestHarness {
    temp_dir: TempDir,
    pub store: Arc<MemoryStore>,
    pub config: Config,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        Self {
            temp_dir,
            store: MemoryStore::shared(config.broadcast_capacity),
            config,
        }
    }

    /// Writes `json` as a config file and builds a harness from it.
    pub fn from_config_json(json: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, json).expect("Failed to write config");
        let config = load_config(&path).expect("Failed to load config");
        Self {
            store: MemoryStore::shared(config.broadcast_capacity),
            temp_dir,
            config,
        }
    }

    pub fn config_dir(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    pub fn shared_store(&self) -> Arc<dyn RecordStore> {
        self.store.clone()
    }

    pub async fn seed_jobs(&self, docs: Vec<Document>) {
        for doc in docs {
            self.store
                .insert(&self.config.collections.jobs, doc)
                .await
                .expect("Failed to seed job");
        }
    }

    pub async fn seed_schedules(&self, docs: Vec<Document>) {
        for doc in docs {
            self.store
                .insert(&self.config.collections.schedules, doc)
                .await
                .expect("Failed to seed schedule");
        }
    }

    pub fn projection(&self) -> TriageProjection {
        TriageProjection::new(self.shared_store(), self.config.collections.jobs.clone())
    }

    pub fn mutator(&self) -> TriageMutator {
        TriageMutator::new(self.shared_store(), self.config.collections.jobs.clone())
    }

    pub fn schedule_editor(&self) -> ScheduleEditor {
        ScheduleEditor::new(self.shared_store(), self.config.collections.schedules.clone())
    }
}

/// Replays scripted chunks for every run it opens.
pub struct ScriptedTransport {
    items: Vec<Result<Vec<u8>, TransportError>>,
    open_error: Option<TransportError>,
    requests: Mutex<Vec<RunRequest>>,
}

impl ScriptedTransport {
    pub fn chunks<S: AsRef<[u8]>>(chunks: &[S]) -> Self {
        Self {
            items: chunks.iter().map(|c| Ok(c.as_ref().to_vec())).collect(),
            open_error: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Chunks followed by a mid-stream failure.
    pub fn failing_after<S: AsRef<[u8]>>(chunks: &[S], error: TransportError) -> Self {
        let mut transport = Self::chunks(chunks);
        transport.items.push(Err(error));
        transport
    }

    pub fn refusing(error: TransportError) -> Self {
        Self {
            items: Vec::new(),
            open_error: Some(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<RunRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PipelineTransport for ScriptedTransport {
    async fn open(&self, request: &RunRequest) -> Result<ChunkStream, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(error) = &self.open_error {
            return Err(error.clone());
        }
        Ok(Box::pin(futures_util::stream::iter(self.items.clone())))
    }
}

/// Splits `text` into chunks at the given byte offsets.
pub fn split_at_offsets(text: &str, cuts: &[usize]) -> Vec<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut chunks = Vec::new();
    let mut start = 0;
    for &cut in cuts {
        chunks.push(bytes[start..cut].to_vec());
        start = cut;
    }
    chunks.push(bytes[start..].to_vec());
    chunks
}
