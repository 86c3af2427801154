use std::sync::Arc;

use crate::session::SessionStore;
use crate::shared::crop::CropCandidate;
use crate::shared::image::ImageRecord;
use crate::store::domain::dataset_store::DatasetStore;
use crate::workflow::error::{ensure_dataset_id, WorkflowError};
use crate::workflow::image_queue::ImageQueue;
use crate::workflow::labeled_history::LabeledHistory;

/// Lifecycle of a crop batch against one source image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CropPhase {
    Idle,
    Accumulating,
    Committing,
    Committed,
    Failed,
}

/// Accumulates crop candidates for a single source image.
///
/// Candidates are transient: nothing is persisted until `CommitCrops`
/// uploads the whole batch. A failed commit keeps the batch intact so
/// it can be retried without re-drawing every rectangle.
pub struct CropSession {
    source: ImageRecord,
    candidates: Vec<CropCandidate>,
    phase: CropPhase,
}

impl CropSession {
    pub fn new(source: ImageRecord) -> Self {
        Self {
            source,
            candidates: Vec::new(),
            phase: CropPhase::Idle,
        }
    }

    pub fn source(&self) -> &ImageRecord {
        &self.source
    }

    pub fn candidates(&self) -> &[CropCandidate] {
        &self.candidates
    }

    pub fn phase(&self) -> CropPhase {
        self.phase
    }

    /// Adds a rendered candidate to the batch.
    pub fn add_candidate(&mut self, candidate: CropCandidate) -> Result<(), WorkflowError> {
        if self.phase == CropPhase::Committing {
            return Err(WorkflowError::CommitInFlight);
        }
        if candidate.label.trim().is_empty() {
            return Err(WorkflowError::EmptyLabel);
        }
        if candidate.rect.is_empty() {
            return Err(WorkflowError::EmptyCropRect);
        }
        self.candidates.push(candidate);
        self.phase = CropPhase::Accumulating;
        Ok(())
    }

    /// Discards one candidate by position; the batch order is preserved.
    pub fn remove_candidate(&mut self, index: usize) -> Option<CropCandidate> {
        if self.phase == CropPhase::Committing || index >= self.candidates.len() {
            return None;
        }
        let removed = self.candidates.remove(index);
        if self.candidates.is_empty() {
            self.phase = CropPhase::Idle;
        }
        Some(removed)
    }
}

/// What a successful commit did.
#[derive(Debug)]
pub struct CropCommitOutcome {
    /// Labeled records the store created, one per candidate.
    pub created: Vec<ImageRecord>,
    /// Whether the source image was also removed remotely. The commit
    /// itself succeeds even when this cleanup fails.
    pub source_deleted: bool,
}

/// Uploads a crop batch as new labeled samples, then retires the source.
pub struct CommitCrops {
    store: Arc<dyn DatasetStore>,
    sessions: Arc<SessionStore>,
}

impl CommitCrops {
    pub fn new(store: Arc<dyn DatasetStore>, sessions: Arc<SessionStore>) -> Self {
        Self { store, sessions }
    }

    /// Commits the batch: one multi-part upload, then a best-effort
    /// delete of the source image.
    ///
    /// On upload failure the session keeps its candidates and moves to
    /// `Failed`; local queue and history are untouched. On success the
    /// source leaves the queue and the created records enter the
    /// labeled history, newest first.
    pub fn execute(
        &self,
        crops: &mut CropSession,
        queue: &mut ImageQueue,
        history: &mut LabeledHistory,
        dataset_id: &str,
    ) -> Result<CropCommitOutcome, WorkflowError> {
        if crops.phase == CropPhase::Committing {
            return Err(WorkflowError::CommitInFlight);
        }
        if crops.candidates.is_empty() {
            return Err(WorkflowError::NothingToCommit);
        }
        ensure_dataset_id(dataset_id)?;
        let session = self.sessions.get().ok_or(WorkflowError::NoSession)?;

        crops.phase = CropPhase::Committing;
        let created = match self.store.upload_crops(
            dataset_id,
            &crops.source,
            &session.email,
            &crops.candidates,
        ) {
            Ok(created) => created,
            Err(e) => {
                crops.phase = CropPhase::Failed;
                return Err(WorkflowError::from_write(e, &self.sessions));
            }
        };

        // The samples exist remotely now; a failed source cleanup must
        // not undo the commit.
        let source_deleted = match self.store.delete_image(dataset_id, &crops.source.id) {
            Ok(()) => true,
            Err(e) => {
                log::warn!(
                    "crop source {} left behind after commit: {e}",
                    crops.source.id
                );
                false
            }
        };

        crops.candidates.clear();
        crops.phase = CropPhase::Committed;
        queue.remove(&crops.source.id);
        for record in created.iter().rev() {
            history.upsert_front(record.clone());
        }

        Ok(CropCommitOutcome {
            created,
            source_deleted,
        })
    }
}
