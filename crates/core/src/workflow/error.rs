use thiserror::Error;

use crate::session::SessionStore;
use crate::shared::constants::DATASET_ID_LEN;
use crate::store::domain::dataset_store::StoreError;

/// Failure taxonomy of the annotation workflow.
///
/// Validation and auth variants are raised before any network call and
/// leave local state untouched. Auth variants additionally clear the
/// cached session. Persistence and network variants come back from the
/// store; reconciliation only happens on success.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("label must not be empty")]
    EmptyLabel,
    #[error("dataset id must be a 24-character hex identifier, got {0:?}")]
    MalformedDatasetId(String),
    #[error("no crop candidates to commit")]
    NothingToCommit,
    #[error("no dataset selected")]
    NoDataset,
    #[error("no image selected")]
    NoImage,
    #[error("crop rectangle must have positive width and height")]
    EmptyCropRect,
    #[error("a crop commit is already in flight for this image")]
    CommitInFlight,

    #[error("no active session, sign in first")]
    NoSession,
    #[error("session expired, sign in again")]
    SessionExpired,

    #[error("remote store rejected the write: {0}")]
    WriteFailed(String),
    #[error("remote store rejected the delete: {0}")]
    DeleteFailed(String),

    #[error("network error: {0}")]
    Network(String),
}

impl WorkflowError {
    /// Caught before any network call; surfaced inline, never fatal.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            WorkflowError::EmptyLabel
                | WorkflowError::MalformedDatasetId(_)
                | WorkflowError::NothingToCommit
                | WorkflowError::NoDataset
                | WorkflowError::NoImage
                | WorkflowError::EmptyCropRect
                | WorkflowError::CommitInFlight
        )
    }

    /// Requires a transition to the login flow before retrying.
    pub fn is_auth(&self) -> bool {
        matches!(self, WorkflowError::NoSession | WorkflowError::SessionExpired)
    }

    /// Maps a failed write, invalidating the session on an auth failure.
    pub fn from_write(err: StoreError, sessions: &SessionStore) -> Self {
        match err {
            StoreError::Unauthorized => {
                sessions.invalidate();
                WorkflowError::SessionExpired
            }
            StoreError::Network(message) => WorkflowError::Network(message),
            other => WorkflowError::WriteFailed(other.to_string()),
        }
    }

    /// Maps a failed delete, invalidating the session on an auth failure.
    pub fn from_delete(err: StoreError, sessions: &SessionStore) -> Self {
        match err {
            StoreError::Unauthorized => {
                sessions.invalidate();
                WorkflowError::SessionExpired
            }
            StoreError::Network(message) => WorkflowError::Network(message),
            other => WorkflowError::DeleteFailed(other.to_string()),
        }
    }
}

/// Checks the 24-hex dataset identifier shape before any network call.
pub fn ensure_dataset_id(dataset_id: &str) -> Result<(), WorkflowError> {
    if dataset_id.is_empty() {
        return Err(WorkflowError::NoDataset);
    }
    if dataset_id.len() != DATASET_ID_LEN
        || !dataset_id.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(WorkflowError::MalformedDatasetId(dataset_id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_valid_dataset_id() {
        assert!(ensure_dataset_id("64b0f3a1c2d3e4f5a6b7c8d9").is_ok());
        assert!(ensure_dataset_id("64B0F3A1C2D3E4F5A6B7C8D9").is_ok());
    }

    #[rstest]
    #[case("64b0f3a1c2d3e4f5a6b7c8")] // too short
    #[case("64b0f3a1c2d3e4f5a6b7c8d9ab")] // too long
    #[case("64b0f3a1c2d3e4f5a6b7c8dz")] // non-hex
    fn test_malformed_dataset_id(#[case] id: &str) {
        assert!(matches!(
            ensure_dataset_id(id),
            Err(WorkflowError::MalformedDatasetId(_))
        ));
    }

    #[test]
    fn test_empty_dataset_id_is_no_dataset() {
        assert!(matches!(ensure_dataset_id(""), Err(WorkflowError::NoDataset)));
    }

    #[test]
    fn test_auth_mapping_invalidates_session() {
        let sessions = SessionStore::with_session(crate::session::Session::new("a@b.c", "t"));
        let rx = sessions.subscribe();

        let err = WorkflowError::from_write(StoreError::Unauthorized, &sessions);
        assert!(matches!(err, WorkflowError::SessionExpired));
        assert!(sessions.get().is_none());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_write_mapping_keeps_session_for_other_failures() {
        let sessions = SessionStore::with_session(crate::session::Session::new("a@b.c", "t"));
        let err = WorkflowError::from_write(
            StoreError::Status {
                status: 500,
                message: "boom".to_string(),
            },
            &sessions,
        );
        assert!(matches!(err, WorkflowError::WriteFailed(_)));
        assert!(sessions.get().is_some());
    }

    #[test]
    fn test_taxonomy_partitions() {
        assert!(WorkflowError::EmptyLabel.is_validation());
        assert!(!WorkflowError::EmptyLabel.is_auth());
        assert!(WorkflowError::SessionExpired.is_auth());
        assert!(!WorkflowError::WriteFailed("x".into()).is_validation());
    }
}
