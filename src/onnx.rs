//! ONNX-backed logo detection and embedding.
//!
//! Only compiled with `--features onnx-models`. The default build keeps the
//! pipeline's collaborator traits but expects the models to be supplied by
//! the embedding host; this module provides the self-contained CLI variant.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use tracing::info;

use crate::detect::{LogoBox, LogoDetector};
use crate::embedding::Embedding;
use crate::matcher::LogoEmbedder;

// ImageNet channel statistics, matching the models' training preprocessing.
const CHANNEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const CHANNEL_STD: [f32; 3] = [0.229, 0.224, 0.225];

fn load_session(model_path: &Path) -> Result<Session> {
    if !model_path.exists() {
        return Err(anyhow!("Model not found: {}", model_path.display()));
    }

    let session = Session::builder()
        .context("Failed to create session builder")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .commit_from_file(model_path)
        .context(format!("Failed to load model: {}", model_path.display()))?;

    Ok(session)
}

/// NCHW float tensor with per-channel normalization.
fn image_to_tensor(img: &DynamicImage) -> Result<Value> {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut array = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            let value = pixel[c] as f32 / 255.0;
            array[[0, c, y as usize, x as usize]] = (value - CHANNEL_MEAN[c]) / CHANNEL_STD[c];
        }
    }

    Value::from_array(array)
        .map(|v| v.into_dyn())
        .context("Failed to build input tensor")
}

/// Logo localizer backed by an exported detection model.
///
/// The model takes one normalized NCHW image and produces two outputs:
/// boxes as `[N, 4]` xyxy pixel coordinates, and scores as `[N]`.
pub struct OnnxLogoDetector {
    session: Mutex<Session>,
    min_score: f32,
}

impl OnnxLogoDetector {
    pub fn load(model_path: &Path, min_score: f32) -> Result<Self> {
        info!(model = %model_path.display(), "loading logo detection model");
        let session = load_session(model_path)?;
        Ok(Self { session: Mutex::new(session), min_score })
    }
}

impl LogoDetector for OnnxLogoDetector {
    fn detect(&self, screenshot: &DynamicImage) -> Result<Vec<LogoBox>> {
        let input = image_to_tensor(screenshot)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("Detection session poisoned"))?;

        let (boxes_name, scores_name) = {
            let mut names = session.outputs.iter().map(|o| o.name.clone());
            match (names.next(), names.next()) {
                (Some(b), Some(s)) => (b, s),
                _ => return Err(anyhow!("Detection model must expose boxes and scores outputs")),
            }
        };

        let outputs = session
            .run(ort::inputs![input])
            .context("Logo detection inference failed")?;

        let boxes_value = outputs
            .get(&boxes_name)
            .ok_or_else(|| anyhow!("Missing detection output: {}", boxes_name))?;
        let scores_value = outputs
            .get(&scores_name)
            .ok_or_else(|| anyhow!("Missing detection output: {}", scores_name))?;

        let boxes_data = boxes_value
            .try_extract_tensor::<f32>()
            .context("Failed to extract boxes tensor")?
            .1;
        let scores_data = scores_value
            .try_extract_tensor::<f32>()
            .context("Failed to extract scores tensor")?
            .1;

        let count = (boxes_data.len() / 4).min(scores_data.len());
        let mut result = Vec::with_capacity(count);
        for i in 0..count {
            let score = scores_data[i];
            if score < self.min_score {
                continue;
            }
            result.push(LogoBox::new(
                boxes_data[i * 4],
                boxes_data[i * 4 + 1],
                boxes_data[i * 4 + 2],
                boxes_data[i * 4 + 3],
                score,
            ));
        }

        // Downstream "first qualifying box wins" requires score-descending
        // order regardless of how the model orders its detections.
        result.sort_by(|a, b| b.score.total_cmp(&a.score));

        Ok(result)
    }
}

/// Logo embedder backed by an exported feature-extraction model.
///
/// Crops are resized to a fixed square input; the model's single output is
/// the flattened feature vector.
pub struct OnnxLogoEmbedder {
    session: Mutex<Session>,
    input_size: u32,
}

impl OnnxLogoEmbedder {
    pub fn load(model_path: &Path, input_size: u32) -> Result<Self> {
        info!(model = %model_path.display(), "loading logo embedding model");
        let session = load_session(model_path)?;
        Ok(Self { session: Mutex::new(session), input_size })
    }
}

impl LogoEmbedder for OnnxLogoEmbedder {
    fn embed(&self, crop: &DynamicImage) -> Result<Embedding> {
        let resized = crop.resize_exact(
            self.input_size,
            self.input_size,
            image::imageops::FilterType::Triangle,
        );
        let input = image_to_tensor(&resized)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("Embedding session poisoned"))?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| anyhow!("Embedding model has no output"))?;

        let outputs = session
            .run(ort::inputs![input])
            .context("Logo embedding inference failed")?;

        let value = outputs
            .get(&output_name)
            .ok_or_else(|| anyhow!("Missing embedding output: {}", output_name))?;
        let data = value
            .try_extract_tensor::<f32>()
            .context("Failed to extract embedding tensor")?
            .1;

        if data.is_empty() {
            return Err(anyhow!("Embedding model produced an empty vector"));
        }

        Ok(Embedding::new(data.to_vec()))
    }
}
