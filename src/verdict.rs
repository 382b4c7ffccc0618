//! Final analysis output: category, identified target brand and timings,
//! plus the TSV record format the batch runner appends per item.

use serde::Serialize;

/// Two-variant outcome. Serialized as lowercase words rather than the legacy
/// 0/1 encoding so downstream consumers never have to guess the polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Benign,
    Phish,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Benign => write!(f, "benign"),
            Category::Phish => write!(f, "phish"),
        }
    }
}

/// Why a page was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhishReason {
    /// A known brand's logo appeared on a domain the brand does not own.
    LogoMatch,
    /// No logo matched, but the page solicits email credentials for a
    /// domain other than the one hosting it.
    EmailMismatch,
}

/// Wall-clock stage timings, in seconds.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StageTimings {
    pub detection_secs: f64,
    pub matching_secs: f64,
}

/// The verdict for one screenshot.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub category: Category,
    pub reason: Option<PhishReason>,
    /// Matched brand id, or the email's domain on the fallback path.
    pub target_brand: Option<String>,
    /// Canonical domains of the target brand, for audit.
    pub matched_domains: Option<Vec<String>>,
    /// Similarity score for logo matches; `None` on the email path.
    pub confidence: Option<f32>,
    pub timings: StageTimings,
}

impl Verdict {
    pub fn benign(timings: StageTimings) -> Self {
        Self {
            category: Category::Benign,
            reason: None,
            target_brand: None,
            matched_domains: None,
            confidence: None,
            timings,
        }
    }

    pub fn is_phish(&self) -> bool {
        self.category == Category::Phish
    }

    /// One tab-separated result line:
    /// `item_id  url  category  target_brand  matched_domain  confidence
    /// detection_time  matching_time`. Absent optionals are written as
    /// `None`, matching the historical result-file format.
    pub fn tsv_record(&self, item_id: &str, url: &str) -> String {
        let target = self.target_brand.as_deref().unwrap_or("None");
        let domains = match &self.matched_domains {
            Some(d) if !d.is_empty() => d.join(","),
            _ => "None".to_string(),
        };
        let confidence = match self.confidence {
            Some(c) => format!("{:.4}", c),
            None => "None".to_string(),
        };

        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{:.4}\t{:.4}",
            item_id,
            url,
            self.category,
            target,
            domains,
            confidence,
            self.timings.detection_secs,
            self.timings.matching_secs,
        )
    }
}
