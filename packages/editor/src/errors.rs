//! Error types for the editor

use thiserror::Error;

use crate::id_generator::NodeKey;

/// An invariant was violated while a transaction was open
///
/// The transaction that produced it is discarded and the previous snapshot
/// stays current.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeKey),

    #[error("Parent not found: {0}")]
    ParentNotFound(NodeKey),

    #[error("Child {child} listed by {parent} does not exist")]
    DanglingChild { parent: NodeKey, child: NodeKey },

    #[error("Node {child} is listed by {expected} but points at {found:?}")]
    ParentMismatch {
        child: NodeKey,
        expected: NodeKey,
        found: Option<NodeKey>,
    },

    #[error("Node {0} is not reachable from the root")]
    Orphan(NodeKey),

    #[error("Node {0} is reachable more than once")]
    CycleDetected(NodeKey),

    #[error("Node {0} is not an element")]
    NotAnElement(NodeKey),

    #[error("Node {0} is not text")]
    NotText(NodeKey),

    #[error("Node {child} cannot be placed under {parent}")]
    InvalidChild { parent: NodeKey, child: NodeKey },

    #[error("Offset {offset} out of range for {key} (size {len})")]
    OffsetOutOfRange {
        key: NodeKey,
        offset: usize,
        len: usize,
    },

    #[error("The root node cannot be moved, replaced or removed")]
    RootMutation,
}

/// A JSON document could not be turned into a snapshot
#[derive(Error, Debug)]
pub enum DeserializationError {
    #[error("Malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported document version: {0}")]
    UnsupportedVersion(u32),

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("Invalid field `{field}`: {message}")]
    InvalidField { field: &'static str, message: String },
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] DeserializationError),

    #[error("Invalid payload for {command}: {message}")]
    InvalidPayload {
        command: &'static str,
        message: String,
    },

    #[error("Update aborted: {0}")]
    Aborted(String),
}

impl EditorError {
    pub fn invalid_payload(command: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            command,
            message: message.into(),
        }
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::Aborted(message.into())
    }
}

/// Non-fatal conditions reported alongside a committed update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorWarning {
    /// The selection referenced removed nodes or out-of-range offsets and
    /// was repaired (`cleared == false`) or dropped (`cleared == true`)
    SelectionInvalidated { cleared: bool },
}
