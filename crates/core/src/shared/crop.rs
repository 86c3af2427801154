use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use thiserror::Error;

use crate::shared::constants::CROP_JPEG_QUALITY;
use crate::shared::rect::CropRect;

#[derive(Error, Debug)]
pub enum CropRenderError {
    #[error("crop rectangle has no area inside the image")]
    EmptyRect,
    #[error("jpeg encoding failed: {0}")]
    Encode(#[source] image::ImageError),
}

/// A transient proposed sub-image with its own label.
///
/// Never persisted individually; lives in a crop session until the
/// whole batch is committed or discarded.
#[derive(Clone)]
pub struct CropCandidate {
    pub label: String,
    /// Pixel rectangle within the source image, already clamped.
    pub rect: CropRect,
    /// Encoded pixels, ready for upload.
    pub jpeg: Vec<u8>,
}

impl CropCandidate {
    /// Cuts `rect` out of the source pixels and encodes it as JPEG.
    ///
    /// The rectangle is intersected with the image bounds first, so a
    /// cropper box dragged past an edge still yields the visible part.
    pub fn render(
        source: &DynamicImage,
        rect: CropRect,
        label: &str,
    ) -> Result<Self, CropRenderError> {
        let clamped = rect
            .clamped_to(source.width(), source.height())
            .ok_or(CropRenderError::EmptyRect)?;
        let cropped = source.crop_imm(
            clamped.x as u32,
            clamped.y as u32,
            clamped.width as u32,
            clamped.height as u32,
        );

        let mut jpeg = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut jpeg, CROP_JPEG_QUALITY);
        cropped
            .to_rgb8()
            .write_with_encoder(encoder)
            .map_err(CropRenderError::Encode)?;

        Ok(Self {
            label: label.to_string(),
            rect: clamped,
            jpeg,
        })
    }

    /// Upload filename for this candidate, derived from its label.
    pub fn file_name(&self) -> String {
        format!("{}.jpg", self.label)
    }
}

impl std::fmt::Debug for CropCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CropCandidate")
            .field("label", &self.label)
            .field("rect", &self.rect)
            .field("jpeg_bytes", &self.jpeg.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn source(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb([120, 60, 30]),
        ))
    }

    #[test]
    fn test_render_produces_decodable_jpeg() {
        let candidate =
            CropCandidate::render(&source(100, 80), CropRect::new(10, 10, 40, 30), "wheel")
                .unwrap();
        assert_eq!(candidate.label, "wheel");
        assert_eq!(candidate.rect, CropRect::new(10, 10, 40, 30));

        let decoded = image::load_from_memory(&candidate.jpeg).unwrap();
        assert_eq!(decoded.width(), 40);
        assert_eq!(decoded.height(), 30);
    }

    #[test]
    fn test_render_clamps_overhanging_rect() {
        let candidate =
            CropCandidate::render(&source(50, 50), CropRect::new(40, 40, 30, 30), "edge").unwrap();
        assert_eq!(candidate.rect, CropRect::new(40, 40, 10, 10));
    }

    #[test]
    fn test_render_rejects_rect_outside_image() {
        let err = CropCandidate::render(&source(50, 50), CropRect::new(60, 60, 10, 10), "x")
            .unwrap_err();
        assert!(matches!(err, CropRenderError::EmptyRect));
    }

    #[test]
    fn test_render_rejects_zero_area_rect() {
        let err =
            CropCandidate::render(&source(50, 50), CropRect::new(0, 0, 0, 10), "x").unwrap_err();
        assert!(matches!(err, CropRenderError::EmptyRect));
    }

    #[test]
    fn test_file_name_appends_extension() {
        let candidate =
            CropCandidate::render(&source(10, 10), CropRect::new(0, 0, 5, 5), "door").unwrap();
        assert_eq!(candidate.file_name(), "door.jpg");
    }
}
