use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::RwLock;
use std::io::{self, Write};
use std::fs::OpenOptions;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum VerbosityLevel {
    Silent = 0,    // Only show progress bar and final summary
    Summary = 1,   // High-level analysis progress (default)
    Detailed = 2,  // Per-item verdicts, warnings
    Debug = 3,     // All messages including stage timings and errors
}

impl VerbosityLevel {
    pub fn from_verbose_count(count: u8) -> Self {
        match count {
            0 => VerbosityLevel::Summary,
            1 => VerbosityLevel::Detailed,
            2.. => VerbosityLevel::Debug,
        }
    }
}

#[derive(Clone)]
pub struct AnalysisLogger {
    verbosity: VerbosityLevel,
    progress_bar: Arc<RwLock<Option<ProgressBar>>>,
    analysis_metadata: Arc<Mutex<AnalysisMetadata>>,
    log_buffer: Arc<Mutex<Vec<String>>>,
    log_file_path: Option<String>,
}

#[derive(Default, Clone)]
struct AnalysisMetadata {
    start_time: Option<SystemTime>,
    end_time: Option<SystemTime>,
    items_processed: usize,
    phish_count: usize,
    benign_count: usize,
    skipped_count: usize,
    failed_count: usize,
    total_detection_secs: f64,
    total_matching_secs: f64,
    brands_loaded: usize,
    output_file: String,
}

impl AnalysisLogger {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            progress_bar: Arc::new(RwLock::new(None)),
            analysis_metadata: Arc::new(Mutex::new(AnalysisMetadata::default())),
            log_buffer: Arc::new(Mutex::new(Vec::new())),
            log_file_path: None,
        }
    }

    pub fn with_log_file(verbosity: VerbosityLevel, log_file_path: String) -> Self {
        Self {
            verbosity,
            progress_bar: Arc::new(RwLock::new(None)),
            analysis_metadata: Arc::new(Mutex::new(AnalysisMetadata::default())),
            log_buffer: Arc::new(Mutex::new(Vec::new())),
            log_file_path: Some(log_file_path),
        }
    }

    // Core logging functions with consistent timestamp formatting
    pub fn info(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Summary {
            self.print_message("INFO", message);
        }
    }

    pub fn warn(&self, message: &str) {
        // Warnings (skipped items, per-item failures) surface at the
        // default verbosity; only Silent suppresses them.
        if self.verbosity >= VerbosityLevel::Summary {
            self.print_message("WARN", message);
        }
    }

    pub fn error(&self, message: &str) {
        // ALWAYS show errors regardless of verbosity
        self.print_message("ERROR", message);
    }

    pub fn debug(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Debug {
            self.print_message("DEBUG", message);
        }
    }

    fn print_message(&self, level: &str, message: &str) {
        let timestamp = self.get_timestamp();
        // Use progress bar's println! to avoid interfering with fixed positioning
        let msg = format!("[{}] {}: {}", timestamp, level, message);

        // Store in log buffer if log file export is enabled
        if self.log_file_path.is_some() {
            if let Ok(mut buffer) = self.log_buffer.lock() {
                buffer.push(msg.clone());
            }
        }

        // Check if we have an active progress bar and use its println method
        if let Ok(guard) = self.progress_bar.try_read() {
            if let Some(pb) = guard.as_ref() {
                pb.println(msg);
                return;
            }
        }

        // Fallback if no progress bar
        eprintln!("{}", msg);
    }

    fn get_timestamp(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let secs = now.as_secs();
        let millis = now.subsec_millis();

        let hours = (secs / 3600) % 24;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;

        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    }

    // Progress bar management with visual completion tracking
    pub async fn start_progress(&self, total_items: u64) {
        let pb = ProgressBar::new(total_items);

        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| {
                    // Fallback to a simpler template if the complex one fails
                    ProgressStyle::default_bar()
                        .template("{bar:40} {pos}/{len} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                })
                .progress_chars("##-")
        );

        pb.set_message("Initializing...");

        let mut progress_guard = self.progress_bar.write().await;
        *progress_guard = Some(pb);

        // Record start time
        let mut metadata = self.analysis_metadata.lock().unwrap();
        metadata.start_time = Some(SystemTime::now());
    }

    pub async fn update_progress(&self, message: &str) {
        if let Some(pb) = self.progress_bar.read().await.as_ref() {
            pb.set_message(message.to_string());
        }
    }

    pub async fn advance_progress(&self, steps: u64) {
        if let Some(pb) = self.progress_bar.read().await.as_ref() {
            pb.inc(steps);
        }
    }

    pub async fn finish_progress(&self, final_message: &str) {
        let mut progress_guard = self.progress_bar.write().await;
        if let Some(pb) = progress_guard.take() {
            pb.finish_and_clear();
        }

        // Record end time
        let mut metadata = self.analysis_metadata.lock().unwrap();
        metadata.end_time = Some(SystemTime::now());

        if self.verbosity >= VerbosityLevel::Summary {
            self.print_message("INFO", final_message);
        }
    }

    // Metadata recording functions
    pub fn record_brands_loaded(&self, count: usize) {
        let mut metadata = self.analysis_metadata.lock().unwrap();
        metadata.brands_loaded = count;
    }

    pub fn record_item_processed(&self, is_phish: bool) {
        let mut metadata = self.analysis_metadata.lock().unwrap();
        metadata.items_processed += 1;
        if is_phish {
            metadata.phish_count += 1;
        } else {
            metadata.benign_count += 1;
        }
    }

    pub fn record_item_skipped(&self) {
        let mut metadata = self.analysis_metadata.lock().unwrap();
        metadata.skipped_count += 1;
    }

    pub fn record_item_failed(&self) {
        let mut metadata = self.analysis_metadata.lock().unwrap();
        metadata.failed_count += 1;
    }

    pub fn record_stage_times(&self, detection_secs: f64, matching_secs: f64) {
        let mut metadata = self.analysis_metadata.lock().unwrap();
        metadata.total_detection_secs += detection_secs;
        metadata.total_matching_secs += matching_secs;
    }

    pub fn record_output_file(&self, path: &str) {
        let mut metadata = self.analysis_metadata.lock().unwrap();
        metadata.output_file = path.to_string();
    }

    // Final summary message
    pub fn print_final_summary(&self) {
        let metadata = self.analysis_metadata.lock().unwrap();

        // Ensure clean output after progress bar
        print!("\x1b[2K\r"); // Clear any remaining progress bar artifacts
        let _ = io::stdout().flush();

        // Always print summary regardless of verbosity level
        println!("\n=== ANALYSIS SUMMARY ===");

        if let (Some(start), Some(end)) = (metadata.start_time, metadata.end_time) {
            let duration = end.duration_since(start).unwrap_or_default();
            println!("Analysis Duration: {:.2}s", duration.as_secs_f64());
        }

        println!("Brands In Reference Store: {}", metadata.brands_loaded);
        println!("Screenshots Analyzed: {}", metadata.items_processed);
        println!("Phishing Verdicts: {}", metadata.phish_count);
        println!("Benign Verdicts: {}", metadata.benign_count);
        println!("Skipped Items: {}", metadata.skipped_count);
        println!("Failed Items: {}", metadata.failed_count);
        println!("Detection Time Total: {:.2}s", metadata.total_detection_secs);
        println!("Matching Time Total: {:.2}s", metadata.total_matching_secs);

        if !metadata.output_file.is_empty() {
            println!("Results Exported: {}", metadata.output_file);
        }

        println!("========================\n");

        // Success message
        if metadata.phish_count > 0 {
            println!(
                "✅ Analysis completed. Flagged {} of {} screenshots as phishing.",
                metadata.phish_count, metadata.items_processed
            );
        } else {
            println!("✅ Analysis completed. No phishing detected.");
        }
    }

    // Specialized logging methods for the analysis phases
    pub fn log_initialization(&self, target: &str) {
        self.info(&format!("Starting phishing analysis for: {}", target));
    }

    pub fn log_store_loaded(&self, brand_count: usize, embedding_count: usize) {
        self.record_brands_loaded(brand_count);
        self.info(&format!(
            "Reference store loaded: {} brands, {} logo embeddings",
            brand_count, embedding_count
        ));
    }

    pub fn log_item_start(&self, item_id: &str, url: &str) {
        self.debug(&format!("Analyzing {} ({})", item_id, url));
    }

    pub fn log_item_verdict(&self, item_id: &str, verdict: &crate::verdict::Verdict) {
        self.record_item_processed(verdict.is_phish());
        self.record_stage_times(
            verdict.timings.detection_secs,
            verdict.timings.matching_secs,
        );

        if verdict.is_phish() {
            let target = verdict.target_brand.as_deref().unwrap_or("unknown");
            self.info(&format!("{}: PHISH (target: {})", item_id, target));
        } else {
            self.debug(&format!("{}: benign", item_id));
        }
    }

    pub fn log_item_skipped(&self, item_id: &str, reason: &str) {
        self.record_item_skipped();
        self.debug(&format!("Skipping {}: {}", item_id, reason));
    }

    pub fn log_item_failed(&self, item_id: &str, error: &str) {
        self.record_item_failed();
        self.warn(&format!("Failed to analyze {}: {}", item_id, error));
    }

    pub fn log_detection_result(&self, item_id: &str, box_count: usize) {
        if box_count > 0 {
            self.debug(&format!("{}: {} logo candidates detected", item_id, box_count));
        } else {
            self.debug(&format!("{}: no logos detected", item_id));
        }
    }

    pub fn log_export_success(&self, path: &str) {
        self.record_output_file(path);
        self.info(&format!("Results written: {}", path));
    }

    /// Export all collected logs to the specified file
    pub fn export_logs(&self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(ref log_file_path) = self.log_file_path {
            if let Ok(buffer) = self.log_buffer.lock() {
                // Create parent directories if they don't exist
                if let Some(parent) = Path::new(log_file_path).parent() {
                    std::fs::create_dir_all(parent)?;
                }

                let mut file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(log_file_path)?;

                for log_entry in buffer.iter() {
                    writeln!(file, "{}", log_entry)?;
                }

                file.flush()?;
                return Ok(());
            }
        }
        Ok(())
    }

    /// Check if log export is enabled
    pub fn is_log_export_enabled(&self) -> bool {
        self.log_file_path.is_some()
    }

    /// Get the current number of logged messages
    pub fn get_log_count(&self) -> usize {
        if let Ok(buffer) = self.log_buffer.lock() {
            buffer.len()
        } else {
            0
        }
    }
}
