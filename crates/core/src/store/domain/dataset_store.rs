use serde::Serialize;
use thiserror::Error;

use crate::shared::crop::CropCandidate;
use crate::shared::image::{Dataset, ImageRecord, LabelCount, LabeledPage};
use crate::shared::rect::CropRect;

#[derive(Error, Debug)]
pub enum StoreError {
    /// 401/403 from the store; the session-expiry signal.
    #[error("remote store rejected the credential")]
    Unauthorized,
    #[error("remote store returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("could not decode remote store response: {0}")]
    Decode(String),
    /// The image record carries no resolvable file reference.
    #[error("image has no file reference")]
    MissingFile,
}

/// Body of a label write, as the remote store expects it.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelWrite {
    pub label: String,
    pub labeled_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<CropRect>,
}

/// The remote annotation store, abstracted at its interface boundary.
///
/// Transport is an infrastructure concern; workflow code only sees this
/// trait, which keeps every use case testable against an in-memory stub.
pub trait DatasetStore: Send + Sync {
    fn list_datasets(&self) -> Result<Vec<Dataset>, StoreError>;

    /// Full dataset snapshot with embedded images and label history.
    fn fetch_dataset(&self, dataset_id: &str) -> Result<Dataset, StoreError>;

    /// Ordered image list for queue loading.
    fn list_images(&self, dataset_id: &str) -> Result<Vec<ImageRecord>, StoreError>;

    /// One page of recently labeled images, page size fixed server-side.
    fn labeled_page(&self, dataset_id: &str, page: usize) -> Result<LabeledPage, StoreError>;

    /// Persists one label. Carries the authorization credential; a
    /// 401/403 response surfaces as [`StoreError::Unauthorized`].
    fn put_label(
        &self,
        dataset_id: &str,
        image_id: &str,
        write: &LabelWrite,
    ) -> Result<ImageRecord, StoreError>;

    /// Resets an image's current label fields.
    fn clear_label(&self, dataset_id: &str, image_id: &str) -> Result<(), StoreError>;

    /// Uploads one batch of crop candidates; each becomes a new image
    /// with `isCropped` set and a back-reference to `source`.
    fn upload_crops(
        &self,
        dataset_id: &str,
        source: &ImageRecord,
        labeled_by: &str,
        candidates: &[CropCandidate],
    ) -> Result<Vec<ImageRecord>, StoreError>;

    fn delete_image(&self, dataset_id: &str, image_id: &str) -> Result<(), StoreError>;

    /// Per-image label frequency distribution.
    fn label_stats(&self, dataset_id: &str, image_id: &str)
        -> Result<Vec<LabelCount>, StoreError>;

    /// CSV byte stream of labeled images; opaque to the workflow.
    fn export_csv(&self, dataset_id: &str) -> Result<Vec<u8>, StoreError>;

    /// Raw pixel bytes for an image, via its resolved location.
    fn fetch_file(&self, image: &ImageRecord) -> Result<Vec<u8>, StoreError>;
}
