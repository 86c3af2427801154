use std::sync::Arc;

use chrono::Utc;

use crate::session::SessionStore;
use crate::shared::image::{ImageRecord, LabelEntry};
use crate::store::domain::dataset_store::{DatasetStore, LabelWrite};
use crate::workflow::error::{ensure_dataset_id, WorkflowError};
use crate::workflow::image_queue::ImageQueue;
use crate::workflow::label_stats::LabelStatsCache;
use crate::workflow::labeled_history::LabeledHistory;

/// What happened to the cursor after a successful save.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The queue moved to the next unlabeled image.
    Advanced,
    /// The labeled image was the last one; the cursor stayed put.
    QueueExhausted,
}

/// Persists a label for the current image and reconciles local state.
///
/// All validation happens before the network call; a failed write leaves
/// the queue, history and stats exactly as they were. Local state only
/// changes after the store confirms the write.
pub struct SaveLabel {
    store: Arc<dyn DatasetStore>,
    sessions: Arc<SessionStore>,
}

impl SaveLabel {
    pub fn new(store: Arc<dyn DatasetStore>, sessions: Arc<SessionStore>) -> Self {
        Self { store, sessions }
    }

    /// Labels the current queue image, then advances the cursor.
    pub fn execute(
        &self,
        queue: &mut ImageQueue,
        history: &mut LabeledHistory,
        stats: &mut LabelStatsCache,
        dataset_id: &str,
        label_text: &str,
    ) -> Result<SaveOutcome, WorkflowError> {
        let label = label_text.trim();
        if label.is_empty() {
            return Err(WorkflowError::EmptyLabel);
        }
        ensure_dataset_id(dataset_id)?;
        let current = queue.current().cloned().ok_or(WorkflowError::NoImage)?;
        let session = self.sessions.get().ok_or(WorkflowError::NoSession)?;

        let image_id = current.id.clone();
        let write = LabelWrite {
            label: label.to_string(),
            labeled_by: session.email.clone(),
            bounding_box: current.coordinates,
        };
        let confirmed = self
            .store
            .put_label(dataset_id, &image_id, &write)
            .map_err(|e| WorkflowError::from_write(e, &self.sessions))?;

        let reconciled = reconcile(current, confirmed, &write);
        queue.update(reconciled.clone());
        history.upsert_front(reconciled);
        stats.invalidate(&image_id);

        if queue.next() {
            Ok(SaveOutcome::Advanced)
        } else {
            Ok(SaveOutcome::QueueExhausted)
        }
    }

    /// Relabels an already-labeled image without touching the cursor.
    pub fn relabel(
        &self,
        queue: &mut ImageQueue,
        history: &mut LabeledHistory,
        stats: &mut LabelStatsCache,
        dataset_id: &str,
        image_id: &str,
        label_text: &str,
    ) -> Result<(), WorkflowError> {
        let label = label_text.trim();
        if label.is_empty() {
            return Err(WorkflowError::EmptyLabel);
        }
        ensure_dataset_id(dataset_id)?;
        let prior = history
            .entries()
            .iter()
            .find(|img| img.id == image_id)
            .or_else(|| queue.images().iter().find(|img| img.id == image_id))
            .cloned()
            .ok_or(WorkflowError::NoImage)?;
        let session = self.sessions.get().ok_or(WorkflowError::NoSession)?;

        let write = LabelWrite {
            label: label.to_string(),
            labeled_by: session.email.clone(),
            bounding_box: prior.coordinates,
        };
        let confirmed = self
            .store
            .put_label(dataset_id, image_id, &write)
            .map_err(|e| WorkflowError::from_write(e, &self.sessions))?;

        let reconciled = reconcile(prior, confirmed, &write);
        queue.update(reconciled.clone());
        if !history.update(reconciled.clone()) {
            history.upsert_front(reconciled);
        }
        stats.invalidate(image_id);
        Ok(())
    }
}

/// Merges the server's confirmed record over the local one.
///
/// The server's history wins when it reports one; otherwise the local
/// history is extended with the entry that was just written so the
/// consistency view stays accurate until the next fetch.
fn reconcile(local: ImageRecord, confirmed: ImageRecord, write: &LabelWrite) -> ImageRecord {
    let mut merged = local;
    merged.label = confirmed.label.or_else(|| Some(write.label.clone()));
    merged.labeled_by = confirmed
        .labeled_by
        .or_else(|| Some(write.labeled_by.clone()));
    let labeled_at = confirmed.labeled_at.unwrap_or_else(Utc::now);
    merged.labeled_at = Some(labeled_at);
    if confirmed.history.is_empty() {
        merged.history.push(LabelEntry {
            label: write.label.clone(),
            labeled_by: write.labeled_by.clone(),
            labeled_at,
        });
    } else {
        merged.history = confirmed.history;
    }
    merged
}
