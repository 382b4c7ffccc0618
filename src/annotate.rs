//! Screenshot annotation.
//!
//! Every analysis produces an annotated copy of the input: detected boxes are
//! always drawn; a text label is added only on a PHISH verdict. Label drawing
//! needs a font, which is loaded once from the configured path — when it is
//! missing the annotator degrades to boxes-only instead of failing analyses.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::warn;

use crate::detect::LogoBox;

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

pub struct Annotator {
    font: Option<FontVec>,
    font_scale: f32,
    box_thickness: u32,
}

impl Annotator {
    /// Load the label font from `font_path`. A missing or unparsable font is
    /// reported once and disables labels only.
    pub fn new(font_path: &Path, font_scale: f32, box_thickness: u32) -> Self {
        let font = match std::fs::read(font_path) {
            Ok(bytes) => match FontVec::try_from_vec(bytes) {
                Ok(font) => Some(font),
                Err(e) => {
                    warn!(path = %font_path.display(), error = %e, "annotation font unusable, labels disabled");
                    None
                }
            },
            Err(e) => {
                warn!(path = %font_path.display(), error = %e, "annotation font unavailable, labels disabled");
                None
            }
        };

        Self { font, font_scale, box_thickness: box_thickness.max(1) }
    }

    /// Annotator with no font, used by tests and headless embeddings.
    pub fn without_font() -> Self {
        Self { font: None, font_scale: 22.0, box_thickness: 2 }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw every detected box outline.
    pub fn draw_boxes(&self, canvas: &mut RgbImage, boxes: &[LogoBox]) {
        for b in boxes {
            let Some((x, y, w, h)) = b.crop_rect(canvas.width(), canvas.height()) else {
                continue;
            };
            for inset in 0..self.box_thickness {
                let (w, h) = (w.saturating_sub(2 * inset), h.saturating_sub(2 * inset));
                if w == 0 || h == 0 {
                    break;
                }
                let rect = Rect::at((x + inset) as i32, (y + inset) as i32).of_size(w, h);
                draw_hollow_rect_mut(canvas, rect, BOX_COLOR);
            }
        }
    }

    /// Label a logo-match verdict at the matched box, offset (+20, +20) from
    /// its top-left corner.
    pub fn label_brand_match(
        &self,
        canvas: &mut RgbImage,
        matched: &LogoBox,
        brand_id: &str,
        confidence: f32,
    ) {
        let text = format!("Target: {} with confidence {:.4}", brand_id, confidence);
        let x = (matched.x_min + 20.0).max(0.0) as i32;
        let y = (matched.y_min + 20.0).max(0.0) as i32;
        self.draw_label(canvas, x, y, &text);
    }

    /// Label an email-fallback verdict in the top-left corner.
    pub fn label_email_warning(&self, canvas: &mut RgbImage) {
        self.draw_label(canvas, 20, 20, "No logo but asks for email credentials");
    }

    fn draw_label(&self, canvas: &mut RgbImage, x: i32, y: i32, text: &str) {
        let Some(font) = &self.font else {
            return;
        };
        let scale = PxScale::from(self.font_scale);
        draw_text_mut(canvas, TEXT_COLOR, x, y, scale, font, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_boxes_marks_outline() {
        let annotator = Annotator::without_font();
        let mut canvas = RgbImage::new(100, 100);
        let boxes = [LogoBox::new(10.0, 10.0, 40.0, 30.0, 0.9)];

        annotator.draw_boxes(&mut canvas, &boxes);

        assert_eq!(*canvas.get_pixel(10, 10), BOX_COLOR);
        assert_eq!(*canvas.get_pixel(39, 10), BOX_COLOR);
        // Second ring from box_thickness = 2.
        assert_eq!(*canvas.get_pixel(11, 11), BOX_COLOR);
        // Interior untouched.
        assert_eq!(*canvas.get_pixel(25, 20), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_out_of_bounds_box_ignored() {
        let annotator = Annotator::without_font();
        let mut canvas = RgbImage::new(50, 50);
        annotator.draw_boxes(&mut canvas, &[LogoBox::new(60.0, 60.0, 90.0, 90.0, 0.9)]);
        assert!(canvas.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_missing_font_degrades_to_boxes_only() {
        let annotator = Annotator::new(Path::new("/nonexistent/font.ttf"), 22.0, 2);
        assert!(!annotator.has_font());

        // Labeling without a font is a no-op, not a panic.
        let mut canvas = RgbImage::new(100, 100);
        annotator.label_email_warning(&mut canvas);
        annotator.label_brand_match(&mut canvas, &LogoBox::new(0.0, 0.0, 10.0, 10.0, 0.9), "x", 0.9);
    }
}
