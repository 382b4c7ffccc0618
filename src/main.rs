// Allow dead code for functions that are part of the API surface but not used in all code paths
#![allow(dead_code)]

use anyhow::Result;
use clap::Parser;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;

mod annotate;
mod batch;
mod brand;
mod cli;
mod config;
mod detect;
mod domain;
mod embedding;
mod logger;
mod matcher;
mod ocr;
mod pipeline;
mod result_log;
mod verdict;

#[cfg(feature = "onnx-models")]
mod onnx;

use annotate::Annotator;
use batch::BatchRunner;
use brand::ReferenceStore;
use cli::Cli;
use config::AppConfig;
use detect::LogoDetector;
use logger::{AnalysisLogger, VerbosityLevel};
use matcher::LogoEmbedder;
use pipeline::Pipeline;
use result_log::ResultLog;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle --init flag first (before any other processing)
    if cli.init {
        match AppConfig::create_default_config() {
            Ok(path) => {
                println!("✅ Created default configuration file at: {}", path.display());
                println!("   Edit this file to customize settings, then run phishlens again.");
                std::process::exit(0);
            }
            Err(e) => {
                eprintln!("❌ Failed to create configuration file: {}", e);
                std::process::exit(1);
            }
        }
    }

    // Load configuration
    let app_config = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(config::ConfigError::FileNotFound(path)) => {
            // Config not found - prompt to create if interactive
            match AppConfig::prompt_create_config() {
                Ok(Some(created_path)) => {
                    println!("✅ Created default configuration file at: {}", created_path.display());
                    println!("   Edit this file to customize settings, then run phishlens again.");
                    std::process::exit(0);
                }
                Ok(None) => {
                    eprintln!("❌ Configuration file not found at: {}", path.display());
                    eprintln!("   Run with --init to create a default configuration file.");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("❌ Failed to create configuration file: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let verbosity = VerbosityLevel::from_verbose_count(cli.verbose);
    let logger = match &cli.log_file {
        Some(log_file_path) => AnalysisLogger::with_log_file(verbosity, log_file_path.clone()),
        None => AnalysisLogger::new(verbosity),
    };

    // Validate arguments
    if let Err(e) = cli.validate() {
        logger.error(&format!("Invalid arguments: {}", e));
        std::process::exit(1);
    }

    // Load the brand reference store
    let store = match ReferenceStore::load(Path::new(&app_config.reference.store_path)) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("❌ Failed to load reference store: {}", e);
            std::process::exit(1);
        }
    };

    // Load the detection and embedding models
    let (detector, embedder) = match build_models(&app_config) {
        Ok(models) => models,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let ocr_enabled = app_config.ocr.enabled && !cli.no_ocr;
    let ocr_engine = if ocr_enabled { build_ocr_engine() } else { None };

    let annotator = Arc::new(Annotator::new(
        Path::new(&app_config.annotation.font_path),
        app_config.annotation.font_scale,
        app_config.annotation.box_thickness,
    ));

    // Print consolidated initialization status block
    eprintln!();
    eprintln!(
        "✅ ENABLED: Brand reference store ({} brands, {} logo embeddings)",
        store.brand_count(),
        store.embedding_count()
    );
    #[cfg(feature = "onnx-models")]
    {
        eprintln!("✅ ENABLED: Logo detection ({})", app_config.detection.model_path);
        eprintln!("✅ ENABLED: Logo embedding ({})", app_config.embedding.model_path);
    }
    if ocr_engine.is_some() {
        eprintln!("✅ ENABLED: Credential-request OCR fallback");
    } else if !ocr_enabled {
        eprintln!("❌ DISABLED: Credential-request OCR fallback (disabled by configuration)");
    } else {
        eprintln!("❌ DISABLED: Credential-request OCR fallback (no OCR engine compiled in)");
    }
    if annotator.has_font() {
        eprintln!("✅ ENABLED: Annotation labels ({})", app_config.annotation.font_path);
    } else {
        eprintln!("⚠️  Annotation labels unavailable (font not loaded), boxes only");
    }
    eprintln!();

    logger.record_brands_loaded(store.brand_count());

    let threshold = cli
        .threshold
        .unwrap_or(app_config.matching.similarity_threshold);

    let pipeline = Pipeline::new(
        detector,
        embedder,
        ocr_engine,
        store,
        annotator,
        threshold,
        app_config.ocr.min_confidence,
    );

    let output_path = Path::new(&cli.output);

    if cli.is_batch_mode() {
        run_batch(&cli, &app_config, pipeline, logger, output_path).await
    } else {
        run_single(&cli, pipeline, logger, output_path)
    }
}

async fn run_batch(
    cli: &Cli,
    app_config: &AppConfig,
    pipeline: Pipeline,
    logger: AnalysisLogger,
    output_path: &Path,
) -> Result<()> {
    // validate() guarantees the folder is present in batch mode
    let folder = match &cli.folder {
        Some(folder) => Path::new(folder),
        None => {
            logger.error("Batch mode requires --folder");
            std::process::exit(1);
        }
    };
    logger.log_initialization(&folder.display().to_string());

    let parallel_jobs = cli.parallel_jobs.unwrap_or(app_config.batch.parallel_jobs);
    let forbidden: Regex = match app_config.batch.forbidden_suffix_regex() {
        Ok(re) => re,
        Err(e) => {
            logger.error(&format!("Configuration error: {}", e));
            std::process::exit(1);
        }
    };

    let runner = BatchRunner::new(pipeline, logger.clone(), parallel_jobs, forbidden, cli.resume);

    let summary = match runner.run(folder, output_path).await {
        Ok(summary) => summary,
        Err(e) => {
            logger.error(&format!("Batch analysis failed: {}", e));
            std::process::exit(1);
        }
    };

    logger.print_final_summary();
    finish_logs(&logger);

    // Partial failures are reported but only a fully failed batch is an error
    if summary.analyzed == 0 && summary.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn run_single(
    cli: &Cli,
    pipeline: Pipeline,
    logger: AnalysisLogger,
    output_path: &Path,
) -> Result<()> {
    // validate() guarantees both are present in single mode
    let (url, screenshot_path) = match (&cli.url, &cli.screenshot) {
        (Some(url), Some(shot)) => (url.clone(), shot.clone()),
        _ => {
            logger.error("Single mode requires --url and --screenshot");
            std::process::exit(1);
        }
    };
    logger.log_initialization(&url);

    let screenshot = match image::open(&screenshot_path) {
        Ok(img) => img,
        Err(e) => {
            logger.error(&format!("Failed to load screenshot '{}': {}", screenshot_path, e));
            std::process::exit(1);
        }
    };

    let analysis = pipeline.analyze(&url, &screenshot);
    let item_id = Path::new(&screenshot_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("screenshot")
        .to_string();

    logger.log_item_verdict(&item_id, &analysis.verdict);

    let mut result_log = ResultLog::open(output_path)?;
    result_log.append(&item_id, &url, &analysis.verdict)?;
    logger.log_export_success(&output_path.display().to_string());

    if analysis.verdict.is_phish() {
        let annotated_path = Path::new(&screenshot_path).with_file_name("predict.png");
        analysis.annotated.save(&annotated_path)?;
        println!("🚨 PHISH: {}", analysis.verdict.tsv_record(&item_id, &url));
        println!("   Annotated screenshot: {}", annotated_path.display());
    } else {
        println!("✅ benign: {}", url);
    }

    finish_logs(&logger);
    Ok(())
}

fn finish_logs(logger: &AnalysisLogger) {
    if logger.is_log_export_enabled() {
        match logger.export_logs() {
            Ok(()) => {}
            Err(e) => eprintln!("⚠️  Failed to export logs: {}", e),
        }
    }
}

#[cfg(feature = "onnx-models")]
fn build_models(
    app_config: &AppConfig,
) -> Result<(Arc<dyn LogoDetector>, Arc<dyn LogoEmbedder>)> {
    let detector = onnx::OnnxLogoDetector::load(
        Path::new(&app_config.detection.model_path),
        app_config.detection.min_score,
    )?;
    let embedder = onnx::OnnxLogoEmbedder::load(
        Path::new(&app_config.embedding.model_path),
        app_config.embedding.input_size,
    )?;
    Ok((Arc::new(detector), Arc::new(embedder)))
}

#[cfg(not(feature = "onnx-models"))]
fn build_models(
    _app_config: &AppConfig,
) -> Result<(Arc<dyn LogoDetector>, Arc<dyn LogoEmbedder>)> {
    Err(anyhow::anyhow!(
        "Logo models not compiled in. Rebuild with --features onnx-models to analyze screenshots."
    ))
}

/// No OCR engine ships with the CLI build; the fallback activates when an
/// embedding host wires one in through the library API.
fn build_ocr_engine() -> Option<Arc<dyn ocr::OcrEngine>> {
    None
}
