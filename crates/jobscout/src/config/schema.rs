use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub collections: CollectionsConfig,
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

fn default_broadcast_capacity() -> usize {
    64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            collections: CollectionsConfig::default(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

/// Scraping backend endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_run_path")]
    pub run_path: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_run_path() -> String {
    "/api/run-pipeline".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            run_path: default_run_path(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// Full URL of the run endpoint.
    pub fn run_endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.run_path)
    }
}

/// Collection names in the shared record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionsConfig {
    #[serde(default = "default_jobs")]
    pub jobs: String,
    #[serde(default = "default_schedules")]
    pub schedules: String,
    #[serde(default = "default_datasources")]
    pub datasources: String,
}

fn default_jobs() -> String {
    "jobs".to_string()
}

fn default_schedules() -> String {
    "schedulingPipelines".to_string()
}

fn default_datasources() -> String {
    "platformGroups".to_string()
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            schedules: default_schedules(),
            datasources: default_datasources(),
        }
    }
}
