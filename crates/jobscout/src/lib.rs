pub mod config;
pub mod error;
pub mod monitor;
pub mod schedule;
pub mod store;
pub mod telemetry;
pub mod triage;

pub use config::{load_config, resolve_config, Config};
pub use error::{ConfigError, JobscoutError, Result, ScheduleError, TriageError};
pub use monitor::{
    HttpPipelineTransport, PipelineRunState, PipelineTransport, RunController, RunError,
    RunHandle, RunMode, RunPhase, RunRequest, TransportError,
};
pub use schedule::{DatasourceDirectory, ScheduleConfig, ScheduleEditor, ScheduleInterval};
pub use store::{Document, MemoryStore, RecordStore, StoreError};
pub use telemetry::{init_tracing, LogFormat};
pub use triage::{TriageBoard, TriageMutator, TriageProjection, TriageStatus};
