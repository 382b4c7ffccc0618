//! Configuration management for phishlens
//!
//! All configuration is loaded from `./config/phishlens.toml`.
//! No hardcoded defaults exist in source code - all defaults are in the
//! config template.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use std::io::{self, Write};
use thiserror::Error;
use regex::Regex;

/// Configuration file path relative to working directory
pub const CONFIG_PATH: &str = "./config/phishlens.toml";

/// Default configuration file content - this is the ONLY place defaults exist
pub const DEFAULT_CONFIG: &str = include_str!("../config/phishlens.toml");

/// Upper bound on batch workers; past this, model contention beats
/// throughput on every machine we measured.
const MAX_PARALLEL_JOBS: usize = 32;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid regex pattern '{pattern_name}': {error}\n  Pattern: {pattern}")]
    InvalidRegex {
        pattern_name: String,
        pattern: String,
        error: String,
    },

    #[error("Configuration field '{field}' cannot be empty")]
    EmptyRequired { field: String },

    #[error("Configuration field '{field}' must be within {range}, got {value}")]
    OutOfRange {
        field: String,
        range: String,
        value: String,
    },
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub reference: ReferenceConfig,
    pub matching: MatchingConfig,
    pub detection: DetectionConfig,
    pub embedding: EmbeddingConfig,
    pub ocr: OcrConfig,
    pub annotation: AnnotationConfig,
    pub batch: BatchConfig,
}

/// Brand reference store location
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceConfig {
    pub store_path: String,
}

/// Similarity acceptance settings
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// Minimum cosine similarity to accept a brand match, in [0, 1]
    pub similarity_threshold: f32,
}

/// Logo detection model settings (consumed by the onnx-models feature)
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    pub model_path: String,
    /// Detections below this score are discarded before matching
    pub min_score: f32,
}

/// Logo embedding model settings (consumed by the onnx-models feature)
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub model_path: String,
    /// Crops are resized to input_size x input_size before embedding
    pub input_size: u32,
}

/// Credential-request fallback settings
#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    pub enabled: bool,
    /// Recognized lines below this confidence are ignored
    pub min_confidence: f32,
}

/// Annotated-screenshot rendering settings
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationConfig {
    pub font_path: String,
    pub font_scale: f32,
    pub box_thickness: u32,
}

/// Batch runner settings
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    /// Concurrent screenshot analyses
    pub parallel_jobs: usize,
    /// Items whose URL matches this pattern are skipped entirely
    pub forbidden_url_suffixes: String,
}

impl BatchConfig {
    /// Compile the forbidden-suffix pattern. Case-insensitive so that
    /// download suffixes match regardless of URL casing.
    pub fn forbidden_suffix_regex(&self) -> Result<Regex, ConfigError> {
        Regex::new(&format!("(?i){}", self.forbidden_url_suffixes)).map_err(|e| {
            ConfigError::InvalidRegex {
                pattern_name: "batch.forbidden_url_suffixes".to_string(),
                pattern: self.forbidden_url_suffixes.clone(),
                error: e.to_string(),
            }
        })
    }
}

impl AppConfig {
    /// Load configuration from the default path
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(Path::new(CONFIG_PATH))
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reference.store_path.is_empty() {
            return Err(ConfigError::EmptyRequired {
                field: "reference.store_path".to_string(),
            });
        }

        self.check_unit_range("matching.similarity_threshold", self.matching.similarity_threshold)?;
        self.check_unit_range("detection.min_score", self.detection.min_score)?;
        self.check_unit_range("ocr.min_confidence", self.ocr.min_confidence)?;

        if self.embedding.input_size == 0 {
            return Err(ConfigError::EmptyRequired {
                field: "embedding.input_size".to_string(),
            });
        }

        if self.batch.parallel_jobs == 0 || self.batch.parallel_jobs > MAX_PARALLEL_JOBS {
            return Err(ConfigError::OutOfRange {
                field: "batch.parallel_jobs".to_string(),
                range: format!("[1, {}]", MAX_PARALLEL_JOBS),
                value: self.batch.parallel_jobs.to_string(),
            });
        }

        self.batch.forbidden_suffix_regex()?;

        Ok(())
    }

    fn check_unit_range(&self, field: &str, value: f32) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::OutOfRange {
                field: field.to_string(),
                range: "[0, 1]".to_string(),
                value: value.to_string(),
            });
        }
        Ok(())
    }

    /// Create default configuration file at the standard location
    pub fn create_default_config() -> Result<PathBuf, ConfigError> {
        let path = Path::new(CONFIG_PATH);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_CONFIG.as_bytes())?;

        Ok(path.to_path_buf())
    }

    /// Check if stdin is a TTY (interactive terminal)
    pub fn is_interactive() -> bool {
        atty::is(atty::Stream::Stdin)
    }

    /// Prompt user to create default config (only in interactive mode)
    pub fn prompt_create_config() -> Result<Option<PathBuf>, ConfigError> {
        if !Self::is_interactive() {
            return Ok(None);
        }

        print!("Configuration file not found. Create default config? [Y/n] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim().to_lowercase();

        if input.is_empty() || input == "y" || input == "yes" {
            let path = Self::create_default_config()?;
            Ok(Some(path))
        } else {
            Ok(None)
        }
    }
}
