// Allow dead code for public API functions that may not be used internally
// but are part of the library's exposed interface
#![allow(dead_code)]

pub mod annotate;
pub mod batch;
pub mod brand;
pub mod cli;
pub mod config;
pub mod detect;
pub mod domain;
pub mod embedding;
pub mod logger;
pub mod matcher;
pub mod ocr;
pub mod pipeline;
pub mod result_log;
pub mod verdict;

#[cfg(feature = "onnx-models")]
pub mod onnx;

pub use brand::{BrandEntry, ReferenceStore};
pub use detect::{LogoBox, LogoDetector};
pub use matcher::{BrandMatch, LogoEmbedder};
pub use ocr::OcrEngine;
pub use pipeline::{Analysis, Pipeline};
pub use verdict::{Category, PhishReason, Verdict};
