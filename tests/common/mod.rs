//! Shared fixtures: stub collaborators and reference-store builders used by
//! the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{anyhow, Result};
use image::DynamicImage;

use phishlens::annotate::Annotator;
use phishlens::brand::{BrandEntry, ReferenceEmbedding, ReferenceStore};
use phishlens::detect::{LogoBox, LogoDetector};
use phishlens::embedding::Embedding;
use phishlens::matcher::LogoEmbedder;
use phishlens::ocr::{OcrEngine, TextLine};
use phishlens::pipeline::Pipeline;

/// Detector that always reports the same boxes.
pub struct StubDetector(pub Vec<LogoBox>);

impl LogoDetector for StubDetector {
    fn detect(&self, _screenshot: &DynamicImage) -> Result<Vec<LogoBox>> {
        Ok(self.0.clone())
    }
}

/// Detector that always errors, for recovery-path tests.
pub struct BrokenDetector;

impl LogoDetector for BrokenDetector {
    fn detect(&self, _screenshot: &DynamicImage) -> Result<Vec<LogoBox>> {
        Err(anyhow!("model crashed"))
    }
}

/// Embedder that returns one fixed vector for every crop.
pub struct FixedEmbedder(pub Vec<f32>);

impl LogoEmbedder for FixedEmbedder {
    fn embed(&self, _crop: &DynamicImage) -> Result<Embedding> {
        Ok(Embedding::new(self.0.clone()))
    }
}

/// Embedder keyed by crop width: returns the vector registered for the
/// crop's width, so tests can make different boxes match different brands.
pub struct WidthKeyedEmbedder(pub Vec<(u32, Vec<f32>)>);

impl LogoEmbedder for WidthKeyedEmbedder {
    fn embed(&self, crop: &DynamicImage) -> Result<Embedding> {
        let width = crop.width();
        self.0
            .iter()
            .find(|(w, _)| *w == width)
            .map(|(_, v)| Embedding::new(v.clone()))
            .ok_or_else(|| anyhow!("no vector registered for crop width {}", width))
    }
}

/// OCR engine that returns fixed lines.
pub struct FixedOcr(pub Vec<TextLine>);

impl OcrEngine for FixedOcr {
    fn recognize(&self, _screenshot: &DynamicImage) -> Result<Vec<TextLine>> {
        Ok(self.0.clone())
    }
}

pub fn text_line(text: &str, confidence: f32) -> TextLine {
    TextLine {
        text: text.to_string(),
        confidence,
        bounds: (0.0, 0.0, 100.0, 20.0),
    }
}

pub fn brand(id: &str, domains: &[&str], vector: &[f32]) -> BrandEntry {
    BrandEntry {
        brand_id: id.to_string(),
        domains: domains.iter().map(|d| d.to_string()).collect(),
        embeddings: vec![ReferenceEmbedding {
            source: format!("{}_0.png", id),
            vector: vector.to_vec(),
        }],
    }
}

pub fn store(brands: Vec<BrandEntry>) -> Arc<ReferenceStore> {
    let store = ReferenceStore { brands };
    store.validate().expect("test store must be valid");
    Arc::new(store)
}

pub fn screenshot(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(image::RgbImage::new(width, height))
}

pub struct PipelineBuilder {
    detector: Arc<dyn LogoDetector>,
    embedder: Arc<dyn LogoEmbedder>,
    ocr: Option<Arc<dyn OcrEngine>>,
    store: Arc<ReferenceStore>,
    threshold: f32,
}

impl PipelineBuilder {
    pub fn new(store: Arc<ReferenceStore>) -> Self {
        Self {
            detector: Arc::new(StubDetector(Vec::new())),
            embedder: Arc::new(FixedEmbedder(vec![1.0, 0.0, 0.0, 0.0])),
            ocr: None,
            store,
            threshold: 0.8,
        }
    }

    pub fn detector(mut self, detector: impl LogoDetector + 'static) -> Self {
        self.detector = Arc::new(detector);
        self
    }

    pub fn embedder(mut self, embedder: impl LogoEmbedder + 'static) -> Self {
        self.embedder = Arc::new(embedder);
        self
    }

    pub fn ocr(mut self, ocr: impl OcrEngine + 'static) -> Self {
        self.ocr = Some(Arc::new(ocr));
        self
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline::new(
            self.detector,
            self.embedder,
            self.ocr,
            self.store,
            Arc::new(Annotator::without_font()),
            self.threshold,
            0.5,
        )
    }
}
