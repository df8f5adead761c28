//! Opening the remote run stream.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::TransportError;
use crate::config::ApiConfig;
use crate::schedule::ScheduleInterval;

/// Raw response chunks, in arrival order. Boundaries are arbitrary.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// How the run was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Auto,
    Manual,
}

impl std::str::FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(RunMode::Auto),
            "manual" => Ok(RunMode::Manual),
            other => Err(format!("unknown run mode '{}'", other)),
        }
    }
}

/// Parameters for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub source_id: String,
    pub max_scrolls: u32,
    pub mode: Option<RunMode>,
    pub interval: Option<ScheduleInterval>,
}

impl RunRequest {
    pub fn new(source_id: impl Into<String>, max_scrolls: u32) -> Self {
        Self {
            source_id: source_id.into(),
            max_scrolls,
            mode: None,
            interval: None,
        }
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_interval(mut self, interval: ScheduleInterval) -> Self {
        self.interval = Some(interval);
        self
    }

    fn body(&self) -> RunRequestBody<'_> {
        RunRequestBody {
            group_id: &self.source_id,
            max_scrolls: self.max_scrolls,
            mode: self.mode,
            interval_minutes: self.interval.map(ScheduleInterval::minutes),
        }
    }
}

/// JSON body expected by the run endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunRequestBody<'a> {
    #[serde(rename = "groupID")]
    group_id: &'a str,
    max_scrolls: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<RunMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interval_minutes: Option<u32>,
}

/// Starts a remote run and hands back its output stream.
#[async_trait]
pub trait PipelineTransport: Send + Sync {
    async fn open(&self, request: &RunRequest) -> Result<ChunkStream, TransportError>;
}

/// Starts runs by POSTing to the backend's run endpoint.
pub struct HttpPipelineTransport {
    client: Client,
    endpoint: String,
}

impl HttpPipelineTransport {
    /// Only the connect phase is bounded; a run may stream for a long time.
    pub fn new(api: &ApiConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(api.connect_timeout_secs))
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: api.run_endpoint(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PipelineTransport for HttpPipelineTransport {
    async fn open(&self, request: &RunRequest) -> Result<ChunkStream, TransportError> {
        log::debug!("POST {} for source {}", self.endpoint, request.source_id);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request.body())
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let chunks = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| TransportError::Stream(e.to_string()))
        });

        Ok(Box::pin(chunks))
    }
}
