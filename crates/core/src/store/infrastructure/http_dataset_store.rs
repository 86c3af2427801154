use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::session::SessionStore;
use crate::shared::constants::HTTP_TIMEOUT_SECS;
use crate::shared::crop::CropCandidate;
use crate::shared::image::{Dataset, ImageRecord, LabelCount, LabeledPage};
use crate::shared::location::{resolve_image_location, ImageLocation};
use crate::store::domain::dataset_store::{DatasetStore, LabelWrite, StoreError};

/// `DatasetStore` over the annotation server's REST API.
///
/// Reads the shared session store on every request so a bearer token is
/// attached the moment one exists and dropped the moment it is cleared.
pub struct HttpDatasetStore {
    base_url: String,
    client: Client,
    sessions: Arc<SessionStore>,
}

/// The upload endpoint answers with one object for a single file and an
/// array for a batch.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<ImageRecord>),
    One(ImageRecord),
}

impl From<OneOrMany> for Vec<ImageRecord> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::Many(images) => images,
            OneOrMany::One(image) => vec![image],
        }
    }
}

impl HttpDatasetStore {
    pub fn new(base_url: &str, sessions: Arc<SessionStore>) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            sessions,
        })
    }

    fn api(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.sessions.get() {
            Some(session) => request.bearer_auth(session.token),
            None => request,
        }
    }

    fn send(request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request
            .send()
            .map_err(|e| StoreError::Network(e.to_string()))?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StoreError::Unauthorized);
        }
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        let response = Self::send(self.authorized(self.client.get(self.api(path))))?;
        response.json().map_err(|e| StoreError::Decode(e.to_string()))
    }

    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, StoreError> {
        let response = Self::send(self.authorized(self.client.get(url)))?;
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| StoreError::Network(e.to_string()))
    }
}

impl DatasetStore for HttpDatasetStore {
    fn list_datasets(&self) -> Result<Vec<Dataset>, StoreError> {
        self.get_json("dataset")
    }

    fn fetch_dataset(&self, dataset_id: &str) -> Result<Dataset, StoreError> {
        self.get_json(&format!("dataset/{dataset_id}"))
    }

    fn list_images(&self, dataset_id: &str) -> Result<Vec<ImageRecord>, StoreError> {
        self.get_json(&format!("dataset/{dataset_id}/images"))
    }

    fn labeled_page(&self, dataset_id: &str, page: usize) -> Result<LabeledPage, StoreError> {
        self.get_json(&format!("dataset/{dataset_id}/labeled?page={page}"))
    }

    fn put_label(
        &self,
        dataset_id: &str,
        image_id: &str,
        write: &LabelWrite,
    ) -> Result<ImageRecord, StoreError> {
        let url = self.api(&format!("dataset/{dataset_id}/images/{image_id}"));
        let response = Self::send(self.authorized(self.client.put(url).json(write)))?;
        response.json().map_err(|e| StoreError::Decode(e.to_string()))
    }

    fn clear_label(&self, dataset_id: &str, image_id: &str) -> Result<(), StoreError> {
        let url = self.api(&format!("dataset/{dataset_id}/images/{image_id}"));
        let body = serde_json::json!({
            "label": "",
            "labeledBy": "",
            "labeledAt": null,
        });
        Self::send(self.authorized(self.client.put(url).json(&body)))?;
        Ok(())
    }

    fn upload_crops(
        &self,
        dataset_id: &str,
        source: &ImageRecord,
        labeled_by: &str,
        candidates: &[CropCandidate],
    ) -> Result<Vec<ImageRecord>, StoreError> {
        let labeled_at = Utc::now().to_rfc3339();
        let mut form = Form::new();
        for candidate in candidates {
            let part = Part::bytes(candidate.jpeg.clone())
                .file_name(candidate.file_name())
                .mime_str("image/jpeg")
                .map_err(|e| StoreError::Network(e.to_string()))?;
            let coordinates = serde_json::to_string(&candidate.rect)
                .map_err(|e| StoreError::Decode(e.to_string()))?;
            form = form
                .part("images", part)
                .text("label[]", candidate.label.clone())
                .text("coordinates[]", coordinates)
                .text("labeledBy[]", labeled_by.to_string())
                .text("labeledAt[]", labeled_at.clone())
                .text("isCropped[]", "true")
                .text("originalImageId[]", source.id.clone())
                .text("originalImageName[]", source.filename.clone());
        }
        form = form.text("dataset", dataset_id.to_string());

        let url = self.api(&format!("dataset/{dataset_id}/upload"));
        let response = Self::send(self.authorized(self.client.post(url).multipart(form)))?;
        let created: OneOrMany = response
            .json()
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(created.into())
    }

    fn delete_image(&self, dataset_id: &str, image_id: &str) -> Result<(), StoreError> {
        let url = self.api(&format!("dataset/{dataset_id}/images/{image_id}"));
        Self::send(self.authorized(self.client.delete(url)))?;
        Ok(())
    }

    fn label_stats(
        &self,
        dataset_id: &str,
        image_id: &str,
    ) -> Result<Vec<LabelCount>, StoreError> {
        self.get_json(&format!(
            "dataset/{dataset_id}/images/{image_id}/label-stats"
        ))
    }

    fn export_csv(&self, dataset_id: &str) -> Result<Vec<u8>, StoreError> {
        self.get_bytes(&self.api(&format!("dataset/{dataset_id}/export")))
    }

    fn fetch_file(&self, image: &ImageRecord) -> Result<Vec<u8>, StoreError> {
        match resolve_image_location(image, &self.base_url) {
            ImageLocation::Url(url) => self.get_bytes(&url),
            ImageLocation::NotAvailable => Err(StoreError::MissingFile),
        }
    }
}
