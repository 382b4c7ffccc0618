//! Batch analysis over a capture folder.
//!
//! A capture folder holds one subdirectory per visited page:
//!
//! ```text
//! captures/
//!   000123/
//!     shot.png     screenshot of the rendered page
//!     info.json    {"url": "http://..."}
//! ```
//!
//! The runner discovers items, filters out download URLs, optionally skips
//! items already recorded in the result file, and analyzes the rest on a
//! bounded worker pool. Per-item failures never abort the batch.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::Semaphore;

use crate::logger::AnalysisLogger;
use crate::pipeline::Pipeline;
use crate::result_log::ResultLog;

/// Screenshot filename inside each item directory
pub const SCREENSHOT_FILE: &str = "shot.png";

/// Metadata filename inside each item directory
pub const INFO_FILE: &str = "info.json";

/// Annotated screenshot written next to the input on PHISH verdicts
pub const ANNOTATED_FILE: &str = "predict.png";

/// Per-item capture metadata
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureInfo {
    pub url: String,
}

/// One discovered item of a capture folder
#[derive(Debug, Clone)]
pub struct CaptureItem {
    /// Subdirectory name, used as the item id in result records
    pub item_id: String,
    pub url: String,
    pub dir: PathBuf,
}

impl CaptureItem {
    pub fn screenshot_path(&self) -> PathBuf {
        self.dir.join(SCREENSHOT_FILE)
    }

    pub fn annotated_path(&self) -> PathBuf {
        self.dir.join(ANNOTATED_FILE)
    }
}

/// Result of analyzing a single item in a batch
#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub item_id: String,
    pub url: String,
    /// Whether the analysis completed (a BENIGN verdict is still a success)
    pub success: bool,
    pub is_phish: bool,
    /// Error message if analysis failed
    pub error: Option<String>,
    /// Duration of analysis in seconds
    pub duration_secs: f64,
}

/// Summary of a batch analysis run
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    /// Items discovered in the capture folder
    pub total_items: usize,
    /// Items skipped before analysis (forbidden URL or already processed)
    pub skipped: usize,
    pub analyzed: usize,
    pub phish: usize,
    pub benign: usize,
    pub failed: usize,
    pub item_results: Vec<ItemResult>,
    pub total_duration_secs: f64,
    pub started_at: String,
    pub completed_at: String,
}

/// Discover capture items in a folder.
///
/// Subdirectories are returned in name order so runs are reproducible.
/// Entries missing a screenshot or a parseable info.json are skipped with a
/// warning rather than failing the batch.
pub fn discover_items(folder: &Path, logger: &AnalysisLogger) -> Result<Vec<CaptureItem>> {
    if !folder.is_dir() {
        return Err(anyhow!("Capture folder not found: {}", folder.display()));
    }

    let mut dirs: Vec<PathBuf> = fs::read_dir(folder)
        .context(format!("Failed to read capture folder: {}", folder.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();

    let mut items = Vec::new();
    for dir in dirs {
        let item_id = match dir.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };

        if !dir.join(SCREENSHOT_FILE).is_file() {
            logger.log_item_skipped(&item_id, "no screenshot");
            continue;
        }

        let info_path = dir.join(INFO_FILE);
        let info: CaptureInfo = match fs::read_to_string(&info_path)
            .map_err(anyhow::Error::from)
            .and_then(|content| serde_json::from_str(&content).map_err(anyhow::Error::from))
        {
            Ok(info) => info,
            Err(e) => {
                logger.log_item_skipped(&item_id, &format!("unreadable info.json: {}", e));
                continue;
            }
        };

        items.push(CaptureItem { item_id, url: info.url, dir });
    }

    Ok(items)
}

pub struct BatchRunner {
    pipeline: Pipeline,
    logger: AnalysisLogger,
    parallel_jobs: usize,
    forbidden_suffixes: Regex,
    resume: bool,
}

impl BatchRunner {
    pub fn new(
        pipeline: Pipeline,
        logger: AnalysisLogger,
        parallel_jobs: usize,
        forbidden_suffixes: Regex,
        resume: bool,
    ) -> Self {
        Self {
            pipeline,
            logger,
            parallel_jobs,
            forbidden_suffixes,
            resume,
        }
    }

    /// Analyze every eligible item in `folder`, appending verdict records to
    /// `output_path`. Annotated screenshots are written into the item
    /// directories for PHISH verdicts.
    pub async fn run(&self, folder: &Path, output_path: &Path) -> Result<BatchSummary> {
        let batch_start = Instant::now();
        let started_at = Utc::now().to_rfc3339();

        let items = discover_items(folder, &self.logger)?;
        let total_items = items.len();
        self.logger.info(&format!(
            "Discovered {} items in {}",
            total_items,
            folder.display()
        ));

        let already_processed: HashSet<String> = if self.resume && output_path.exists() {
            let urls = ResultLog::processed_urls(output_path)?;
            if !urls.is_empty() {
                self.logger.info(&format!(
                    "Resuming: {} URLs already present in {}",
                    urls.len(),
                    output_path.display()
                ));
            }
            urls
        } else {
            HashSet::new()
        };

        let mut skipped = 0usize;
        let mut pending = Vec::new();
        for item in items {
            if self.forbidden_suffixes.is_match(&item.url) {
                self.logger.log_item_skipped(&item.item_id, "forbidden URL suffix");
                skipped += 1;
                continue;
            }
            if already_processed.contains(&item.url) {
                self.logger.log_item_skipped(&item.item_id, "already in result file");
                skipped += 1;
                continue;
            }
            pending.push(item);
        }

        let result_log = Arc::new(Mutex::new(ResultLog::open(output_path)?));
        let semaphore = Arc::new(Semaphore::new(self.parallel_jobs));

        self.logger.start_progress(pending.len() as u64).await;

        let mut handles = Vec::with_capacity(pending.len());
        for item in pending {
            let permit_source = Arc::clone(&semaphore);
            let pipeline = self.pipeline.clone();
            let logger = self.logger.clone();
            let result_log = Arc::clone(&result_log);

            handles.push(tokio::spawn(async move {
                // Closed only on runtime shutdown, after all tasks complete.
                let _permit = match permit_source.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return analysis_failure(&item, "worker pool closed"),
                };

                logger.log_item_start(&item.item_id, &item.url);
                logger.update_progress(&item.item_id).await;

                let worker_item = item.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    analyze_item(&pipeline, &worker_item)
                })
                .await;

                let result = match outcome {
                    Ok(Ok(result)) => {
                        logger.log_item_verdict(&item.item_id, &result.verdict);
                        if let Ok(mut log) = result_log.lock() {
                            if let Err(e) = log.append(&item.item_id, &item.url, &result.verdict) {
                                logger.error(&format!(
                                    "Failed to record result for {}: {}",
                                    item.item_id, e
                                ));
                            }
                        }
                        ItemResult {
                            item_id: item.item_id.clone(),
                            url: item.url.clone(),
                            success: true,
                            is_phish: result.verdict.is_phish(),
                            error: None,
                            duration_secs: result.duration_secs,
                        }
                    }
                    Ok(Err(e)) => {
                        logger.log_item_failed(&item.item_id, &e.to_string());
                        analysis_failure(&item, &e.to_string())
                    }
                    Err(e) => {
                        logger.log_item_failed(&item.item_id, &e.to_string());
                        analysis_failure(&item, &e.to_string())
                    }
                };

                logger.advance_progress(1).await;
                result
            }));
        }

        let mut item_results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => item_results.push(result),
                Err(e) => self.logger.error(&format!("Worker task panicked: {}", e)),
            }
        }

        self.logger
            .finish_progress(&format!("Batch complete: {} items analyzed", item_results.len()))
            .await;
        self.logger.log_export_success(&output_path.display().to_string());

        let analyzed = item_results.iter().filter(|r| r.success).count();
        let phish = item_results.iter().filter(|r| r.success && r.is_phish).count();
        let benign = analyzed - phish;
        let failed = item_results.len() - analyzed;

        Ok(BatchSummary {
            total_items,
            skipped,
            analyzed,
            phish,
            benign,
            failed,
            item_results,
            total_duration_secs: batch_start.elapsed().as_secs_f64(),
            started_at,
            completed_at: Utc::now().to_rfc3339(),
        })
    }
}

struct ItemAnalysis {
    verdict: crate::verdict::Verdict,
    duration_secs: f64,
}

/// Blocking per-item work: load the screenshot, run the pipeline, persist
/// the annotated copy when the verdict is PHISH.
fn analyze_item(pipeline: &Pipeline, item: &CaptureItem) -> Result<ItemAnalysis> {
    let started = Instant::now();

    let screenshot_path = item.screenshot_path();
    let screenshot = image::open(&screenshot_path)
        .context(format!("Failed to load screenshot: {}", screenshot_path.display()))?;

    let analysis = pipeline.analyze(&item.url, &screenshot);

    if analysis.verdict.is_phish() {
        let annotated_path = item.annotated_path();
        analysis
            .annotated
            .save(&annotated_path)
            .context(format!("Failed to save annotated screenshot: {}", annotated_path.display()))?;
    }

    Ok(ItemAnalysis {
        verdict: analysis.verdict,
        duration_secs: started.elapsed().as_secs_f64(),
    })
}

fn analysis_failure(item: &CaptureItem, error: &str) -> ItemResult {
    ItemResult {
        item_id: item.item_id.clone(),
        url: item.url.clone(),
        success: false,
        is_phish: false,
        error: Some(error.to_string()),
        duration_secs: 0.0,
    }
}
