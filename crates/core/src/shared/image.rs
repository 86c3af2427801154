use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::rect::CropRect;

/// One immutable labeling event.
///
/// An image accumulates one entry per accepted save; entries are never
/// edited afterwards, only the image's current-label pointer moves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelEntry {
    pub label: String,
    pub labeled_by: String,
    pub labeled_at: DateTime<Utc>,
}

/// One annotatable image, wire-compatible with the remote store.
///
/// `label`/`labeled_by`/`labeled_at` are the latest accepted label;
/// `history` holds every labeling event and feeds consistency analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub filename: String,
    /// Direct storage key, when the store assigned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    /// Server-relative file route, the older reference shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labeled_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labeled_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "labels")]
    pub history: Vec<LabelEntry>,
    /// Pixel rectangle within the original image; set only on crop derivatives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<CropRect>,
    #[serde(default)]
    pub is_cropped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_image_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_image_name: Option<String>,
}

impl ImageRecord {
    /// Whether the current label pointer holds a non-blank value.
    pub fn is_labeled(&self) -> bool {
        self.label.as_deref().is_some_and(|l| !l.trim().is_empty())
    }

    /// The set of distinct label values across the full history.
    ///
    /// Order- and duplicate-insensitive by construction; this is the
    /// input to consistency classification.
    pub fn distinct_labels(&self) -> BTreeSet<&str> {
        self.history.iter().map(|e| e.label.as_str()).collect()
    }
}

/// A dataset snapshot with embedded images, as the remote store returns it.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub images: Vec<ImageRecord>,
}

/// One page of the labeled-history endpoint.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LabeledPage {
    #[serde(default)]
    pub images: Vec<ImageRecord>,
    /// Total labeled images in the dataset, across all pages.
    #[serde(default)]
    pub total: usize,
}

/// One label-frequency bucket from the per-image stats endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LabelCount {
    pub label: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(label: &str) -> LabelEntry {
        LabelEntry {
            label: label.to_string(),
            labeled_by: "tester@example.com".to_string(),
            labeled_at: Utc::now(),
        }
    }

    pub(crate) fn image(id: &str) -> ImageRecord {
        ImageRecord {
            id: id.to_string(),
            filename: format!("{id}.jpg"),
            file_id: None,
            url: None,
            label: None,
            labeled_by: None,
            labeled_at: None,
            history: Vec::new(),
            coordinates: None,
            is_cropped: false,
            original_image_id: None,
            original_image_name: None,
        }
    }

    #[test]
    fn test_deserializes_remote_shape() {
        let json = r#"{
            "_id": "64b000000000000000000001",
            "filename": "car.jpg",
            "fileId": "f-123",
            "label": "red",
            "labeledBy": "a@example.com",
            "labeledAt": "2024-05-01T10:00:00Z",
            "labels": [
                {"label": "red", "labeledBy": "a@example.com", "labeledAt": "2024-05-01T10:00:00Z"}
            ],
            "isCropped": true,
            "coordinates": {"x": 1, "y": 2, "width": 30, "height": 40},
            "originalImageId": "64b000000000000000000000"
        }"#;
        let img: ImageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(img.id, "64b000000000000000000001");
        assert_eq!(img.file_id.as_deref(), Some("f-123"));
        assert_eq!(img.history.len(), 1);
        assert!(img.is_cropped);
        assert_eq!(img.coordinates.unwrap().width, 30);
        assert_eq!(
            img.original_image_id.as_deref(),
            Some("64b000000000000000000000")
        );
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let img: ImageRecord = serde_json::from_str(r#"{"_id": "x"}"#).unwrap();
        assert_eq!(img.id, "x");
        assert!(img.history.is_empty());
        assert!(!img.is_cropped);
        assert!(!img.is_labeled());
    }

    #[test]
    fn test_is_labeled_ignores_blank() {
        let mut img = image("a");
        assert!(!img.is_labeled());
        img.label = Some("  ".to_string());
        assert!(!img.is_labeled());
        img.label = Some("red".to_string());
        assert!(img.is_labeled());
    }

    #[test]
    fn test_distinct_labels_collapses_repeats() {
        let mut img = image("a");
        img.history = vec![entry("red"), entry("blue"), entry("red")];
        let distinct = img.distinct_labels();
        assert_eq!(distinct.len(), 2);
        assert!(distinct.contains("red"));
        assert!(distinct.contains("blue"));
    }

    #[test]
    fn test_labeled_page_defaults_are_empty() {
        let page: LabeledPage = serde_json::from_str("{}").unwrap();
        assert!(page.images.is_empty());
        assert_eq!(page.total, 0);
    }
}
