use looks_core::{FieldKind, LookId, RevisionId};
use looks_storage::StorageError;
use thiserror::Error;

use crate::editor::ReorderError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("rejected reorder: {0}")]
    Reorder(#[from] ReorderError),

    #[error("look not found: {0}")]
    LookNotFound(LookId),

    #[error("revision not found: {0}")]
    RevisionNotFound(RevisionId),

    #[error("look {look} cannot be placed under {parent}: it would become its own ancestor")]
    CyclicParent { look: LookId, parent: LookId },

    #[error("unknown look field: {0}")]
    UnknownField(String),

    #[error("field {field} expects a {} value", .expected.as_str())]
    FieldKindMismatch { field: String, expected: FieldKind },

    #[error("invalid mapping for {field} in theme {theme}: {reason}")]
    InvalidMapping {
        theme: String,
        field: String,
        reason: String,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}
