//! Logo localizer boundary: the detection model is an external collaborator,
//! exposed to the pipeline only through [`LogoDetector`].

use anyhow::Result;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned logo bounding box in image-pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogoBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
    /// Detection score assigned by the localizer.
    pub score: f32,
}

impl LogoBox {
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32, score: f32) -> Self {
        Self { x_min, y_min, x_max, y_max, score }
    }

    pub fn width(&self) -> f32 {
        (self.x_max - self.x_min).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y_max - self.y_min).max(0.0)
    }

    /// Integer crop rectangle clamped to the image bounds.
    ///
    /// Returns `None` when the clamped region is degenerate (zero area),
    /// which can happen for boxes entirely outside the image.
    pub fn crop_rect(&self, img_width: u32, img_height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = self.x_min.max(0.0).min(img_width as f32) as u32;
        let y0 = self.y_min.max(0.0).min(img_height as f32) as u32;
        let x1 = self.x_max.max(0.0).min(img_width as f32) as u32;
        let y1 = self.y_max.max(0.0).min(img_height as f32) as u32;

        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0, y0, x1 - x0, y1 - y0))
    }
}

/// Logo detection collaborator.
///
/// Contract: boxes are returned in score-descending order — "first match
/// wins" downstream relies on this ordering, so it is part of the interface
/// rather than an implementation detail. An empty vec means no logo was
/// found and is a valid benign signal, not an error.
pub trait LogoDetector: Send + Sync {
    fn detect(&self, screenshot: &DynamicImage) -> Result<Vec<LogoBox>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_rect_clamps_to_image() {
        let b = LogoBox::new(-10.0, -5.0, 50.0, 40.0, 0.9);
        assert_eq!(b.crop_rect(100, 100), Some((0, 0, 50, 40)));

        let b = LogoBox::new(80.0, 90.0, 200.0, 300.0, 0.9);
        assert_eq!(b.crop_rect(100, 100), Some((80, 90, 20, 10)));
    }

    #[test]
    fn test_crop_rect_degenerate() {
        let b = LogoBox::new(150.0, 150.0, 200.0, 200.0, 0.9);
        assert_eq!(b.crop_rect(100, 100), None);

        let b = LogoBox::new(10.0, 10.0, 10.0, 30.0, 0.9);
        assert_eq!(b.crop_rect(100, 100), None);
    }

    #[test]
    fn test_dimensions() {
        let b = LogoBox::new(10.0, 20.0, 60.0, 50.0, 0.5);
        assert_eq!(b.width(), 50.0);
        assert_eq!(b.height(), 30.0);
    }
}
