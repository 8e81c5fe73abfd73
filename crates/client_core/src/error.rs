use std::fmt;

use shared::domain::ListId;
use thiserror::Error;

/// Login and registration failures. Bad credentials and transport failures
/// are deliberately reported through the same type.
#[derive(Debug, Clone, Error)]
#[error("authentication failed: {reason}")]
pub struct AuthError {
    reason: String,
}

impl AuthError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
    FetchLists,
    FetchTasks,
    PushTaskOrder,
    CreateTask,
    CreateList,
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SyncOperation::FetchLists => "fetch lists",
            SyncOperation::FetchTasks => "fetch tasks",
            SyncOperation::PushTaskOrder => "push task order",
            SyncOperation::CreateTask => "create task",
            SyncOperation::CreateList => "create list",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error("no signed-in session")]
    NotAuthenticated,
    #[error("{operation} failed: remote returned status {status}")]
    Status { operation: SyncOperation, status: u16 },
    #[error("{operation} failed: {message}")]
    Transport {
        operation: SyncOperation,
        message: String,
    },
    #[error("{operation} failed: malformed response: {message}")]
    Decode {
        operation: SyncOperation,
        message: String,
    },
}

impl SyncError {
    pub fn operation(&self) -> Option<SyncOperation> {
        match self {
            SyncError::NotAuthenticated => None,
            SyncError::Status { operation, .. }
            | SyncError::Transport { operation, .. }
            | SyncError::Decode { operation, .. } => Some(*operation),
        }
    }

    pub(crate) fn from_reqwest(operation: SyncOperation, err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            SyncError::Status {
                operation,
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            SyncError::Decode {
                operation,
                message: err.to_string(),
            }
        } else {
            SyncError::Transport {
                operation,
                message: err.to_string(),
            }
        }
    }
}

/// Caller bugs: a drag source that does not match the current workspace.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("unknown list {0}")]
    UnknownList(ListId),
    #[error("task index {index} out of range for list {list_id} (len {len})")]
    IndexOutOfRange {
        list_id: ListId,
        index: usize,
        len: usize,
    },
}

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("credential storage io failure at '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to encode credential storage: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("credential storage lock poisoned")]
    Poisoned,
}
