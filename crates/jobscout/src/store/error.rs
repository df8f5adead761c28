//! Record store error types.

use thiserror::Error;

/// Errors from the shared record store.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// The addressed document does not exist.
    #[error("Document '{id}' not found in collection '{collection}'")]
    NotFound { collection: String, id: String },

    /// A write carried a payload the store cannot hold.
    #[error("Invalid document '{id}' in collection '{collection}': {reason}")]
    InvalidDocument {
        collection: String,
        id: String,
        reason: String,
    },

    /// The backing store rejected or could not serve the request.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
