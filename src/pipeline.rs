//! Pipeline orchestrator.
//!
//! One `analyze` call walks the state machine:
//! detect → (no boxes ⇒ benign) → match → (brand on foreign domain ⇒ phish)
//! → credential-request fallback → (foreign email ⇒ phish) → benign.
//!
//! The pipeline is an explicit immutable context constructed at startup —
//! model handles and the reference store are shared read-only, never ambient
//! globals — so concurrent batch workers can each hold a cheap clone.

use std::sync::Arc;
use std::time::Instant;

use image::{DynamicImage, RgbImage};
use tracing::debug;

use crate::annotate::Annotator;
use crate::brand::ReferenceStore;
use crate::detect::LogoDetector;
use crate::domain;
use crate::matcher::{self, LogoEmbedder};
use crate::ocr::{self, OcrEngine};
use crate::verdict::{Category, PhishReason, StageTimings, Verdict};

/// Result of one analysis: the verdict plus the annotated screenshot copy.
pub struct Analysis {
    pub verdict: Verdict,
    pub annotated: RgbImage,
}

#[derive(Clone)]
pub struct Pipeline {
    detector: Arc<dyn LogoDetector>,
    embedder: Arc<dyn LogoEmbedder>,
    ocr: Option<Arc<dyn OcrEngine>>,
    store: Arc<ReferenceStore>,
    annotator: Arc<Annotator>,
    similarity_threshold: f32,
    ocr_min_confidence: f32,
}

impl Pipeline {
    pub fn new(
        detector: Arc<dyn LogoDetector>,
        embedder: Arc<dyn LogoEmbedder>,
        ocr: Option<Arc<dyn OcrEngine>>,
        store: Arc<ReferenceStore>,
        annotator: Arc<Annotator>,
        similarity_threshold: f32,
        ocr_min_confidence: f32,
    ) -> Self {
        Self {
            detector,
            embedder,
            ocr,
            store,
            annotator,
            similarity_threshold,
            ocr_min_confidence,
        }
    }

    pub fn store(&self) -> &ReferenceStore {
        &self.store
    }

    /// Analyze one (url, screenshot) pair.
    ///
    /// Never fails for "no match" outcomes; absence of a detection, of a
    /// brand match, or of OCR text all route to a BENIGN verdict.
    pub fn analyze(&self, url: &str, screenshot: &DynamicImage) -> Analysis {
        let mut annotated = screenshot.to_rgb8();

        // Stage 1: logo localization.
        let started = Instant::now();
        let boxes = match self.detector.detect(screenshot) {
            Ok(boxes) => boxes,
            Err(e) => {
                // A per-item detector hiccup reads as "nothing detected";
                // init-time model failures are caught before any analyze call.
                debug!(url, error = %e, "detector failed, treating as no detection");
                Vec::new()
            }
        };
        let detection_secs = started.elapsed().as_secs_f64();

        self.annotator.draw_boxes(&mut annotated, &boxes);

        if boxes.is_empty() {
            debug!(url, "no logo detected, benign");
            let timings = StageTimings { detection_secs, matching_secs: 0.0 };
            return Analysis { verdict: Verdict::benign(timings), annotated };
        }

        // Stage 2: brand matching over all boxes, first qualifying box wins.
        let started = Instant::now();
        let brand_match = matcher::match_logo_boxes(
            screenshot,
            &boxes,
            self.embedder.as_ref(),
            &self.store,
            self.similarity_threshold,
        );
        let matching_secs = started.elapsed().as_secs_f64();
        let timings = StageTimings { detection_secs, matching_secs };

        if let Some(m) = brand_match {
            let check = domain::check_consistency(url, &m.matched_domains);
            if check.is_inconsistent {
                debug!(url, brand = %m.brand_id, similarity = m.similarity, "brand logo on foreign domain, phish");
                self.annotator.label_brand_match(&mut annotated, &m.coordinates, &m.brand_id, m.similarity);
                let verdict = Verdict {
                    category: Category::Phish,
                    reason: Some(PhishReason::LogoMatch),
                    target_brand: Some(m.brand_id),
                    matched_domains: Some(m.matched_domains),
                    confidence: Some(m.similarity),
                    timings,
                };
                return Analysis { verdict, annotated };
            }
            // The page shows the brand's logo on a domain the brand owns:
            // the match is discarded and the fallback still runs, mirroring
            // the historical flow.
            debug!(url, brand = %m.brand_id, "brand match on own domain, discarded");
        }

        // Stage 3: credential-request fallback.
        if let Some(engine) = &self.ocr {
            let signal = ocr::check_credential_request(engine.as_ref(), screenshot, self.ocr_min_confidence);
            if let Some(email) = signal.email {
                if !domain::email_matches_url(&email, url) {
                    let email_domain = domain::email_domain(&email);
                    debug!(url, email = %email, "credential request for foreign domain, phish");
                    self.annotator.label_email_warning(&mut annotated);
                    let verdict = Verdict {
                        category: Category::Phish,
                        reason: Some(PhishReason::EmailMismatch),
                        target_brand: Some(email_domain),
                        matched_domains: None,
                        confidence: None,
                        timings,
                    };
                    return Analysis { verdict, annotated };
                }
                debug!(url, email = %email, "credential email matches page domain, benign");
            }
        }

        Analysis { verdict: Verdict::benign(timings), annotated }
    }
}
