use std::sync::Arc;

use crate::session::SessionStore;
use crate::store::domain::dataset_store::DatasetStore;
use crate::workflow::error::{ensure_dataset_id, WorkflowError};
use crate::workflow::image_queue::ImageQueue;
use crate::workflow::label_stats::LabelStatsCache;
use crate::workflow::labeled_history::LabeledHistory;

/// Destructive dataset maintenance: deleting images and resetting labels.
///
/// Both operations write remotely first and only touch local state after
/// the store confirms, so a rejected request leaves the queue and
/// history unchanged.
pub struct Curation {
    store: Arc<dyn DatasetStore>,
    sessions: Arc<SessionStore>,
}

impl Curation {
    pub fn new(store: Arc<dyn DatasetStore>, sessions: Arc<SessionStore>) -> Self {
        Self { store, sessions }
    }

    /// Removes an image from the dataset, the queue and the history.
    pub fn delete_image(
        &self,
        queue: &mut ImageQueue,
        history: &mut LabeledHistory,
        stats: &mut LabelStatsCache,
        dataset_id: &str,
        image_id: &str,
    ) -> Result<(), WorkflowError> {
        ensure_dataset_id(dataset_id)?;
        self.store
            .delete_image(dataset_id, image_id)
            .map_err(|e| WorkflowError::from_delete(e, &self.sessions))?;

        queue.remove(image_id);
        history.remove(image_id);
        stats.invalidate(image_id);
        Ok(())
    }

    /// Resets an image's label so it re-enters the unlabeled pool.
    pub fn clear_label(
        &self,
        queue: &mut ImageQueue,
        history: &mut LabeledHistory,
        stats: &mut LabelStatsCache,
        dataset_id: &str,
        image_id: &str,
    ) -> Result<(), WorkflowError> {
        ensure_dataset_id(dataset_id)?;
        self.store
            .clear_label(dataset_id, image_id)
            .map_err(|e| WorkflowError::from_write(e, &self.sessions))?;

        if let Some(mut image) = queue
            .images()
            .iter()
            .find(|img| img.id == image_id)
            .cloned()
        {
            image.label = None;
            image.labeled_by = None;
            image.labeled_at = None;
            queue.update(image);
        }
        history.remove(image_id);
        stats.invalidate(image_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::session::Session;
    use crate::shared::image::{ImageRecord, LabeledPage};
    use crate::store::stub::{StubFailure, StubStore};

    const DATASET: &str = "64b0f3a1c2d3e4f5a6b7c8d9";

    fn image(id: &str) -> ImageRecord {
        serde_json::from_str(&format!(r#"{{"_id": "{id}"}}"#)).unwrap()
    }

    fn labeled(id: &str) -> ImageRecord {
        let mut img = image(id);
        img.label = Some("red".to_string());
        img.labeled_by = Some("annotator@example.com".to_string());
        img
    }

    fn fixture(store: StubStore) -> (Curation, ImageQueue, LabeledHistory, LabelStatsCache) {
        let sessions = Arc::new(SessionStore::with_session(Session::new(
            "annotator@example.com",
            "tok",
        )));
        let curation = Curation::new(Arc::new(store), sessions);
        let mut queue = ImageQueue::new();
        queue.load(vec![labeled("a"), image("b")]);
        let mut history = LabeledHistory::new();
        history.load(
            0,
            LabeledPage {
                images: vec![labeled("a")],
                total: 1,
            },
        );
        (curation, queue, history, LabelStatsCache::new())
    }

    #[test]
    fn test_delete_removes_everywhere() {
        let (curation, mut queue, mut history, mut stats) = fixture(StubStore::new());

        curation
            .delete_image(&mut queue, &mut history, &mut stats, DATASET, "a")
            .unwrap();

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.current().unwrap().id, "b");
        assert!(history.entries().is_empty());
        assert_eq!(history.total(), 0);
    }

    #[test]
    fn test_failed_delete_keeps_local_state() {
        let store = StubStore {
            fail_delete: StubFailure::ServerError,
            ..StubStore::new()
        };
        let (curation, mut queue, mut history, mut stats) = fixture(store);

        let err = curation
            .delete_image(&mut queue, &mut history, &mut stats, DATASET, "a")
            .unwrap_err();

        assert!(matches!(err, WorkflowError::DeleteFailed(_)));
        assert_eq!(queue.len(), 2);
        assert_eq!(history.entries().len(), 1);
    }

    #[test]
    fn test_clear_label_resets_fields_and_leaves_history() {
        let (curation, mut queue, mut history, mut stats) = fixture(StubStore::new());

        curation
            .clear_label(&mut queue, &mut history, &mut stats, DATASET, "a")
            .unwrap();

        // The image stays in the queue as unlabeled work.
        assert_eq!(queue.len(), 2);
        let reset = &queue.images()[0];
        assert!(reset.label.is_none());
        assert!(reset.labeled_by.is_none());
        assert!(reset.labeled_at.is_none());
        // But it no longer counts as recently labeled.
        assert!(history.entries().is_empty());
    }

    #[test]
    fn test_malformed_dataset_id_checked_before_network() {
        let store = Arc::new(StubStore::new());
        let sessions = Arc::new(SessionStore::with_session(Session::new("a@b.c", "t")));
        let curation = Curation::new(store.clone(), sessions);

        let err = curation
            .delete_image(
                &mut ImageQueue::new(),
                &mut LabeledHistory::new(),
                &mut LabelStatsCache::new(),
                "nope",
                "a",
            )
            .unwrap_err();

        assert!(matches!(err, WorkflowError::MalformedDatasetId(_)));
        assert!(store.deleted_ids().is_empty());
    }

    #[test]
    fn test_unauthorized_delete_invalidates_session() {
        let store = StubStore {
            fail_delete: StubFailure::Unauthorized,
            ..StubStore::new()
        };
        let sessions = Arc::new(SessionStore::with_session(Session::new("a@b.c", "t")));
        let curation = Curation::new(Arc::new(store), sessions.clone());

        let err = curation
            .delete_image(
                &mut ImageQueue::new(),
                &mut LabeledHistory::new(),
                &mut LabelStatsCache::new(),
                DATASET,
                "a",
            )
            .unwrap_err();

        assert!(err.is_auth());
        assert!(sessions.get().is_none());
    }
}
