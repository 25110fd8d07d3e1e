use crate::domain::EntityKind;
use thiserror::Error;

/// Reasons a store command declined to mutate.
///
/// Every variant is raised before any change is applied, so an `Err`
/// always leaves the store exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0} name cannot be empty")]
    EmptyName(EntityKind),

    #[error("no current user; create or switch to a user first")]
    NoCurrentUser,

    #[error("{kind} `{id}` not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("no {0} given and none selected")]
    NothingSelected(EntityKind),
}

impl StoreError {
    pub fn not_found(kind: EntityKind, id: &str) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Failures while decoding a persisted or imported document
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("duplicate {kind} id `{id}` in document")]
    DuplicateId { kind: EntityKind, id: String },

    #[error("user `{0}` not found")]
    UnknownUser(String),
}
