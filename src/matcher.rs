//! Embedding matcher: decides which known brand, if any, a screenshot's
//! detected logo belongs to.
//!
//! Selection policy (part of the contract, not an accident of the loop): the
//! localizer supplies boxes score-descending, and the *first* box whose best
//! brand similarity clears the threshold wins. Later boxes are never
//! consulted once a box qualifies, even if they would score higher.

use anyhow::Result;
use image::DynamicImage;
use tracing::debug;

use crate::brand::ReferenceStore;
use crate::detect::LogoBox;
use crate::embedding::Embedding;

/// Logo embedding collaborator.
pub trait LogoEmbedder: Send + Sync {
    fn embed(&self, crop: &DynamicImage) -> Result<Embedding>;
}

/// A brand match for one screenshot.
#[derive(Debug, Clone)]
pub struct BrandMatch {
    pub brand_id: String,
    /// The brand's canonical domains at match time, for audit output.
    pub matched_domains: Vec<String>,
    /// The box that produced the match.
    pub coordinates: LogoBox,
    /// Cosine similarity of the winning reference embedding, in [0, 1].
    pub similarity: f32,
}

/// Find the first qualifying brand match across the detected boxes.
///
/// Returns `None` when no box reaches the threshold anywhere in the store,
/// when the box list is empty, or when the store is empty. A failed crop or
/// embed for one box skips that box; absence of a match is a result, not an
/// error.
pub fn match_logo_boxes(
    screenshot: &DynamicImage,
    boxes: &[LogoBox],
    embedder: &dyn LogoEmbedder,
    store: &ReferenceStore,
    threshold: f32,
) -> Option<BrandMatch> {
    if boxes.is_empty() || store.is_empty() {
        return None;
    }

    let (img_w, img_h) = (screenshot.width(), screenshot.height());

    for logo_box in boxes {
        let Some((x, y, w, h)) = logo_box.crop_rect(img_w, img_h) else {
            debug!(?logo_box, "skipping degenerate logo box");
            continue;
        };
        let crop = screenshot.crop_imm(x, y, w, h);

        let probe = match embedder.embed(&crop) {
            Ok(e) => e,
            Err(e) => {
                debug!(error = %e, "embedding failed for logo box, skipping");
                continue;
            }
        };

        if let Some((brand_idx, similarity)) = best_brand(&probe, store) {
            if similarity >= threshold {
                let brand = &store.brands[brand_idx];
                debug!(brand = %brand.brand_id, similarity, "logo box matched brand");
                return Some(BrandMatch {
                    brand_id: brand.brand_id.clone(),
                    matched_domains: brand.domains.clone(),
                    coordinates: *logo_box,
                    similarity,
                });
            }
        }
    }

    None
}

/// Best (brand index, similarity) across every reference embedding.
fn best_brand(probe: &Embedding, store: &ReferenceStore) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;

    for (idx, brand) in store.brands.iter().enumerate() {
        for reference in &brand.embeddings {
            let sim = probe.confidence_against(&reference.embedding());
            if best.map_or(true, |(_, b)| sim > b) {
                best = Some((idx, sim));
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brand::{BrandEntry, ReferenceEmbedding};

    /// Embedder that returns a fixed vector per crop size, letting tests
    /// steer which box "looks like" which brand.
    struct StubEmbedder;

    impl LogoEmbedder for StubEmbedder {
        fn embed(&self, crop: &DynamicImage) -> Result<Embedding> {
            // Encode the crop width into the vector direction.
            let w = crop.width() as f32;
            Ok(Embedding::new(vec![w, 1.0]))
        }
    }

    fn store_with(brands: Vec<(&str, Vec<f32>)>) -> ReferenceStore {
        ReferenceStore {
            brands: brands
                .into_iter()
                .map(|(id, vector)| BrandEntry {
                    brand_id: id.to_string(),
                    domains: vec![id.to_string()],
                    embeddings: vec![ReferenceEmbedding { source: format!("{}.png", id), vector }],
                })
                .collect(),
        }
    }

    fn blank(w: u32, h: u32) -> DynamicImage {
        DynamicImage::new_rgb8(w, h)
    }

    #[test]
    fn test_empty_boxes_no_match() {
        let store = store_with(vec![("paypal", vec![1.0, 0.0])]);
        let img = blank(100, 100);
        assert!(match_logo_boxes(&img, &[], &StubEmbedder, &store, 0.5).is_none());
    }

    #[test]
    fn test_empty_store_no_match() {
        let store = ReferenceStore { brands: vec![] };
        let img = blank(100, 100);
        let boxes = [LogoBox::new(0.0, 0.0, 50.0, 50.0, 0.9)];
        assert!(match_logo_boxes(&img, &boxes, &StubEmbedder, &store, 0.5).is_none());
    }

    #[test]
    fn test_first_qualifying_box_wins() {
        // Brand "a" aligns with a 30px-wide crop, brand "b" aligns perfectly
        // with a 60px-wide crop. Both boxes clear the threshold, so the first
        // box must win even though the second would score higher.
        let store = store_with(vec![("a", vec![30.0, 1.0]), ("b", vec![60.0, 1.0])]);
        let img = blank(200, 200);
        let boxes = [
            LogoBox::new(0.0, 0.0, 30.0, 30.0, 0.95),
            LogoBox::new(0.0, 0.0, 60.0, 60.0, 0.90),
        ];

        let m = match_logo_boxes(&img, &boxes, &StubEmbedder, &store, 0.8).unwrap();
        assert_eq!(m.brand_id, "a");
        assert_eq!(m.coordinates, boxes[0]);
        assert!((m.similarity - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_below_threshold_falls_through_to_next_box() {
        // Only the second box reaches the threshold.
        let store = store_with(vec![("b", vec![60.0, 1.0])]);
        let img = blank(200, 200);
        let boxes = [
            LogoBox::new(0.0, 0.0, 1.0, 1.0, 0.99), // 1px crop, poor alignment
            LogoBox::new(0.0, 0.0, 60.0, 60.0, 0.90),
        ];

        let m = match_logo_boxes(&img, &boxes, &StubEmbedder, &store, 0.999).unwrap();
        assert_eq!(m.brand_id, "b");
        assert_eq!(m.coordinates, boxes[1]);
    }

    #[test]
    fn test_no_box_reaches_threshold() {
        let store = store_with(vec![("a", vec![-1.0, 0.0])]);
        let img = blank(100, 100);
        let boxes = [LogoBox::new(0.0, 0.0, 50.0, 50.0, 0.9)];
        assert!(match_logo_boxes(&img, &boxes, &StubEmbedder, &store, 0.5).is_none());
    }

    #[test]
    fn test_embed_failure_is_absorbed() {
        struct FailingEmbedder;
        impl LogoEmbedder for FailingEmbedder {
            fn embed(&self, _: &DynamicImage) -> Result<Embedding> {
                anyhow::bail!("model exploded")
            }
        }

        let store = store_with(vec![("a", vec![1.0, 0.0])]);
        let img = blank(100, 100);
        let boxes = [LogoBox::new(0.0, 0.0, 50.0, 50.0, 0.9)];
        assert!(match_logo_boxes(&img, &boxes, &FailingEmbedder, &store, 0.5).is_none());
    }

    #[test]
    fn test_pick_best_brand_within_box() {
        // One box, two brands: the closer one must be reported.
        let store = store_with(vec![("far", vec![-50.0, 1.0]), ("near", vec![50.0, 1.0])]);
        let img = blank(100, 100);
        let boxes = [LogoBox::new(0.0, 0.0, 50.0, 50.0, 0.9)];

        let m = match_logo_boxes(&img, &boxes, &StubEmbedder, &store, 0.5).unwrap();
        assert_eq!(m.brand_id, "near");
    }
}
