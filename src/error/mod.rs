//! Failure taxonomy for the sync engine and the workspace.
//!
//! Nothing here is fatal: every variant is reported to the user and the
//! application returns to idle.

use crate::models::RecordKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The record store, notifier or narrative service could not be reached
    /// or answered with an error.
    #[error("transport failure: {0:#}")]
    Transport(anyhow::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// One of the sequential collection writes failed. Collections listed in
    /// `committed` were already written and are not rolled back.
    #[error("save failed while writing {failed} (already written: {committed:?}): {source:#}")]
    PartialSave {
        failed: RecordKind,
        committed: Vec<RecordKind>,
        source: anyhow::Error,
    },

    #[error("local cache error: {0:#}")]
    Storage(anyhow::Error),
}

impl SyncError {
    /// Collections that were written before a save failed.
    pub fn committed(&self) -> &[RecordKind] {
        match self {
            SyncError::PartialSave { committed, .. } => committed,
            _ => &[],
        }
    }
}

/// Rejected form input. Raised before any state is touched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("no {kind} with id {id}")]
    UnknownId { kind: RecordKind, id: String },

    #[error("{0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_save_reports_committed_kinds() {
        let err = SyncError::PartialSave {
            failed: RecordKind::Deals,
            committed: vec![RecordKind::Accounts],
            source: anyhow::anyhow!("HTTP 500"),
        };
        assert_eq!(err.committed(), &[RecordKind::Accounts]);
        let msg = err.to_string();
        assert!(msg.contains("deals"));
        assert!(msg.contains("HTTP 500"));
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(ValidationError::MissingField("email").to_string(), "email is required");
        let wrapped: SyncError = ValidationError::MissingField("name").into();
        assert_eq!(wrapped.to_string(), "name is required");
        assert!(wrapped.committed().is_empty());
    }
}
