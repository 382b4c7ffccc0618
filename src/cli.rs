use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "phishlens")]
#[command(about = "Logo-grounded phishing detection for page screenshots")]
#[command(version)]
pub struct Cli {
    /// Create default configuration file at ./config/phishlens.toml
    #[arg(long)]
    pub init: bool,

    /// Capture folder to analyze in batch mode. Each subdirectory holds one
    /// item: a shot.png screenshot and an info.json with the visited URL.
    #[arg(short = 'F', long, value_name = "DIR")]
    pub folder: Option<String>,

    /// URL of a single page to analyze (requires --screenshot)
    #[arg(short, long)]
    pub url: Option<String>,

    /// Screenshot of a single page to analyze (requires --url)
    #[arg(short, long, value_name = "FILE")]
    pub screenshot: Option<String>,

    /// Output TSV file for verdict records
    #[arg(short, long, default_value = "./results.txt")]
    pub output: String,

    /// Similarity threshold override (defaults to config value)
    #[arg(short, long, value_name = "T")]
    pub threshold: Option<f32>,

    /// Number of screenshots to analyze in parallel (defaults to config value)
    #[arg(short = 'j', long, value_name = "N")]
    pub parallel_jobs: Option<usize>,

    /// Verbose logging (use -v for INFO, -vv for DEBUG with per-item details)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Export execution logs to a file (specify file path)
    #[arg(long)]
    pub log_file: Option<String>,

    /// Skip items already present in the output file instead of re-analyzing
    #[arg(long)]
    pub resume: bool,

    /// Disable the credential-request OCR fallback (overrides config)
    #[arg(long)]
    pub no_ocr: bool,
}

impl Cli {
    /// Check if running in batch mode (--folder provided)
    pub fn is_batch_mode(&self) -> bool {
        self.folder.is_some()
    }

    pub fn validate(&self) -> Result<(), String> {
        // Input validation only applies when not using --init
        if !self.init {
            if self.is_batch_mode() {
                if self.url.is_some() || self.screenshot.is_some() {
                    return Err(
                        "--folder cannot be combined with --url/--screenshot".to_string(),
                    );
                }
            } else {
                match (&self.url, &self.screenshot) {
                    (Some(u), Some(s)) => {
                        if u.is_empty() {
                            return Err("URL cannot be empty".to_string());
                        }
                        if s.is_empty() {
                            return Err("Screenshot path cannot be empty".to_string());
                        }
                    }
                    (None, None) => {
                        return Err(
                            "Provide --folder for batch mode, or --url with --screenshot for a single page"
                                .to_string(),
                        )
                    }
                    _ => {
                        return Err("--url and --screenshot must be given together".to_string())
                    }
                }
            }
        }

        if let Some(t) = self.threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err("Threshold must be within [0, 1]".to_string());
            }
        }

        if let Some(jobs) = self.parallel_jobs {
            if jobs == 0 {
                return Err("Parallel jobs must be greater than 0".to_string());
            }
            if jobs > 32 {
                return Err("Parallel jobs cannot exceed 32".to_string());
            }
        }

        if self.output.is_empty() {
            return Err("Output path cannot be empty".to_string());
        }

        Ok(())
    }
}
