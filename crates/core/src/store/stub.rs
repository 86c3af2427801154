use std::sync::Mutex;

use chrono::{TimeZone, Utc};

use crate::shared::crop::CropCandidate;
use crate::shared::image::{Dataset, ImageRecord, LabelCount, LabeledPage, LabelEntry};
use crate::store::domain::dataset_store::{DatasetStore, LabelWrite, StoreError};

/// How a stubbed write-side operation should respond.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum StubFailure {
    #[default]
    None,
    Unauthorized,
    ServerError,
    Network,
}

impl StubFailure {
    fn into_result(self) -> Result<(), StoreError> {
        match self {
            StubFailure::None => Ok(()),
            StubFailure::Unauthorized => Err(StoreError::Unauthorized),
            StubFailure::ServerError => Err(StoreError::Status {
                status: 500,
                message: "internal error".to_string(),
            }),
            StubFailure::Network => Err(StoreError::Network("connection refused".to_string())),
        }
    }
}

/// In-memory `DatasetStore` for workflow tests.
///
/// Records every write so tests can assert exactly which network calls
/// happened; failure modes are switchable per operation.
#[derive(Default)]
pub(crate) struct StubStore {
    pub fail_put: StubFailure,
    pub fail_upload: StubFailure,
    pub fail_delete: StubFailure,
    pub stats: Vec<LabelCount>,
    pub fail_stats: bool,
    /// Records created by a successful `upload_crops`.
    pub created_on_upload: Vec<ImageRecord>,
    pub puts: Mutex<Vec<(String, String, LabelWrite)>>,
    pub uploads: Mutex<usize>,
    pub deletes: Mutex<Vec<String>>,
    pub clears: Mutex<Vec<String>>,
    pub stats_fetches: Mutex<usize>,
}

impl StubStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_count(&self) -> usize {
        self.puts.lock().unwrap().len()
    }

    pub fn upload_count(&self) -> usize {
        *self.uploads.lock().unwrap()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

impl DatasetStore for StubStore {
    fn list_datasets(&self) -> Result<Vec<Dataset>, StoreError> {
        Ok(Vec::new())
    }

    fn fetch_dataset(&self, dataset_id: &str) -> Result<Dataset, StoreError> {
        Ok(Dataset {
            id: dataset_id.to_string(),
            name: "stub".to_string(),
            images: Vec::new(),
        })
    }

    fn list_images(&self, _dataset_id: &str) -> Result<Vec<ImageRecord>, StoreError> {
        Ok(Vec::new())
    }

    fn labeled_page(&self, _dataset_id: &str, _page: usize) -> Result<LabeledPage, StoreError> {
        Ok(LabeledPage::default())
    }

    fn put_label(
        &self,
        dataset_id: &str,
        image_id: &str,
        write: &LabelWrite,
    ) -> Result<ImageRecord, StoreError> {
        self.fail_put.into_result()?;
        self.puts.lock().unwrap().push((
            dataset_id.to_string(),
            image_id.to_string(),
            write.clone(),
        ));
        let labeled_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut image: ImageRecord =
            serde_json::from_str(&format!(r#"{{"_id": "{image_id}"}}"#)).unwrap();
        image.label = Some(write.label.clone());
        image.labeled_by = Some(write.labeled_by.clone());
        image.labeled_at = Some(labeled_at);
        image.history = vec![LabelEntry {
            label: write.label.clone(),
            labeled_by: write.labeled_by.clone(),
            labeled_at,
        }];
        Ok(image)
    }

    fn clear_label(&self, _dataset_id: &str, image_id: &str) -> Result<(), StoreError> {
        self.fail_put.into_result()?;
        self.clears.lock().unwrap().push(image_id.to_string());
        Ok(())
    }

    fn upload_crops(
        &self,
        _dataset_id: &str,
        _source: &ImageRecord,
        _labeled_by: &str,
        _candidates: &[CropCandidate],
    ) -> Result<Vec<ImageRecord>, StoreError> {
        self.fail_upload.into_result()?;
        *self.uploads.lock().unwrap() += 1;
        Ok(self.created_on_upload.clone())
    }

    fn delete_image(&self, _dataset_id: &str, image_id: &str) -> Result<(), StoreError> {
        self.fail_delete.into_result()?;
        self.deletes.lock().unwrap().push(image_id.to_string());
        Ok(())
    }

    fn label_stats(&self, _dataset_id: &str, _image_id: &str) -> Result<Vec<LabelCount>, StoreError> {
        *self.stats_fetches.lock().unwrap() += 1;
        if self.fail_stats {
            return Err(StoreError::Network("down".to_string()));
        }
        Ok(self.stats.clone())
    }

    fn export_csv(&self, _dataset_id: &str) -> Result<Vec<u8>, StoreError> {
        Ok(b"filename,label\n".to_vec())
    }

    fn fetch_file(&self, _image: &ImageRecord) -> Result<Vec<u8>, StoreError> {
        Err(StoreError::MissingFile)
    }
}
