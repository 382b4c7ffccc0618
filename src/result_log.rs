//! Append-only TSV result log.
//!
//! One line per analyzed item, flushed per record so a crash mid-batch loses
//! at most the in-flight line. The log doubles as the resume marker: URLs
//! already present are skipped on re-runs. Writes are serialized by the batch
//! runner (single writer behind a lock).

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::verdict::Verdict;

pub struct ResultLog {
    writer: BufWriter<File>,
    path: PathBuf,
    count: usize,
}

impl ResultLog {
    /// Open (or create) the log in append mode.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open result log: {}", path.display()))?;

        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            count: 0,
        })
    }

    /// Append one verdict record and flush it to disk.
    pub fn append(&mut self, item_id: &str, url: &str, verdict: &Verdict) -> Result<()> {
        let record = verdict.tsv_record(item_id, url);
        writeln!(self.writer, "{}", record)
            .with_context(|| format!("Failed to append result record for {}", item_id))?;
        self.writer.flush().context("Failed to flush result log")?;
        self.count += 1;
        Ok(())
    }

    /// URLs already present in an existing log (second TSV column), so a
    /// re-run can skip work that is already recorded.
    pub fn processed_urls(path: &Path) -> Result<HashSet<String>> {
        let mut urls = HashSet::new();
        if !path.exists() {
            return Ok(urls);
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to read existing result log: {}", path.display()))?;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if let Some(url) = line.split('\t').nth(1) {
                if !url.is_empty() {
                    urls.insert(url.to_string());
                }
            }
        }
        Ok(urls)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
