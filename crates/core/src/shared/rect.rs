use serde::{Deserialize, Serialize};

/// An integer pixel rectangle, as produced by the cropper.
///
/// Coordinates are rounded to whole pixels before a candidate is ever
/// built; a rectangle is committable only when both sides are positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl CropRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rounds float cropper output to whole pixels.
    pub fn from_f64(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x: x.round() as i32,
            y: y.round() as i32,
            width: width.round() as i32,
            height: height.round() as i32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Intersects the rectangle with an image of the given dimensions.
    ///
    /// Returns `None` when nothing of the rectangle lies inside the image.
    pub fn clamped_to(&self, image_width: u32, image_height: u32) -> Option<CropRect> {
        if self.is_empty() {
            return None;
        }
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = (self.x + self.width).min(image_width as i32);
        let y2 = (self.y + self.height).min(image_height as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(CropRect::new(x1, y1, x2 - x1, y2 - y1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_from_f64_rounds_to_whole_pixels() {
        let rect = CropRect::from_f64(10.4, 19.6, 100.5, 49.4);
        assert_eq!(rect, CropRect::new(10, 20, 101, 49));
    }

    #[rstest]
    #[case(CropRect::new(0, 0, 0, 10), true)]
    #[case(CropRect::new(0, 0, 10, 0), true)]
    #[case(CropRect::new(0, 0, -5, 10), true)]
    #[case(CropRect::new(0, 0, 1, 1), false)]
    fn test_is_empty(#[case] rect: CropRect, #[case] empty: bool) {
        assert_eq!(rect.is_empty(), empty);
    }

    #[test]
    fn test_clamp_inside_is_identity() {
        let rect = CropRect::new(10, 10, 50, 40);
        assert_eq!(rect.clamped_to(100, 100), Some(rect));
    }

    #[test]
    fn test_clamp_trims_overhang() {
        let rect = CropRect::new(-10, 80, 50, 40);
        assert_eq!(rect.clamped_to(100, 100), Some(CropRect::new(0, 80, 40, 20)));
    }

    #[test]
    fn test_clamp_fully_outside_returns_none() {
        let rect = CropRect::new(200, 200, 50, 40);
        assert_eq!(rect.clamped_to(100, 100), None);
    }

    #[test]
    fn test_clamp_empty_returns_none() {
        assert_eq!(CropRect::new(0, 0, 0, 0).clamped_to(100, 100), None);
    }

    #[test]
    fn test_serializes_as_plain_fields() {
        let rect = CropRect::new(1, 2, 3, 4);
        let json = serde_json::to_string(&rect).unwrap();
        assert_eq!(json, r#"{"x":1,"y":2,"width":3,"height":4}"#);
    }
}
