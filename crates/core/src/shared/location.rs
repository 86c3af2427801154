use crate::shared::constants::FILE_ROUTE_PREFIX;
use crate::shared::image::ImageRecord;

/// Where an image's pixels can be fetched from, if anywhere.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageLocation {
    Url(String),
    NotAvailable,
}

impl ImageLocation {
    pub fn url(&self) -> Option<&str> {
        match self {
            ImageLocation::Url(url) => Some(url),
            ImageLocation::NotAvailable => None,
        }
    }
}

/// Normalizes the two reference shapes an image may carry into one URI.
///
/// A direct storage key wins over the older route-prefixed `url` field;
/// anything else means the store has no pixels for this record.
pub fn resolve_image_location(image: &ImageRecord, base_url: &str) -> ImageLocation {
    let base = base_url.trim_end_matches('/');
    if let Some(file_id) = image.file_id.as_deref().filter(|id| !id.is_empty()) {
        return ImageLocation::Url(format!("{base}{FILE_ROUTE_PREFIX}{file_id}"));
    }
    if let Some(url) = image
        .url
        .as_deref()
        .filter(|u| u.starts_with(FILE_ROUTE_PREFIX))
    {
        return ImageLocation::Url(format!("{base}{url}"));
    }
    ImageLocation::NotAvailable
}
