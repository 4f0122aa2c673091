use thiserror::Error;
use trellis_editor::{ClientId, RecordId};

/// Failure reported by a menu items backend
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteError {
    #[error("{0}")]
    Transport(String),

    #[error("Menu item {0} not found")]
    NotFound(RecordId),

    #[error("Request rejected ({code}): {message}")]
    Rejected { code: String, message: String },
}

/// Failure of a navigation save
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// The backend could not be reached; message is passed through verbatim
    #[error("{0}")]
    Transport(String),

    #[error("Failed to create menu item for block {client_id}: {message}")]
    PlaceholderCreation { client_id: ClientId, message: String },

    #[error("Failed to save menu items: {failed:?}")]
    PartialFailure { failed: Vec<RecordId> },

    #[error("Save token is held for {actual}, not {expected}")]
    LockMismatch { expected: String, actual: String },

    #[error("Navigation block {0} is not in the tree")]
    MissingRoot(ClientId),
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Transport(message) => SyncError::Transport(message),
            other => SyncError::Transport(other.to_string()),
        }
    }
}
