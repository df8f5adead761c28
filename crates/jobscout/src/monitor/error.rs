use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("A pipeline run is already in progress")]
    AlreadyRunning,

    #[error("Invalid run request: {0}")]
    InvalidRequest(String),

    #[error("Pipeline transport failed: {0}")]
    Transport(#[from] TransportError),
}

/// Failures opening or reading the run stream. Terminal for the run.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("Request to pipeline endpoint failed: {0}")]
    Request(String),

    #[error("HTTP error! status: {status}{}", body_suffix(.body))]
    Status { status: u16, body: String },

    #[error("Stream read failed: {0}")]
    Stream(String),
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(" ({})", body)
    }
}
