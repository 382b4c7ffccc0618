//! Credential-request fallback.
//!
//! Invoked only when no logo brand matched: OCR the full screenshot and look
//! for email-address-like text. A page that solicits email credentials for a
//! domain it does not own is the secondary phishing signal.

use anyhow::Result;
use image::DynamicImage;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Email-address pattern applied to recognized text.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9][A-Za-z0-9.-]*\.[A-Za-z]{2,}")
        .expect("email pattern is valid")
});

/// One recognized text line with its confidence and location.
#[derive(Debug, Clone)]
pub struct TextLine {
    pub text: String,
    pub confidence: f32,
    /// (x_min, y_min, x_max, y_max) of the recognized region.
    pub bounds: (f32, f32, f32, f32),
}

/// OCR collaborator. Lines are returned in natural reading order
/// (top-to-bottom, left-to-right).
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, screenshot: &DynamicImage) -> Result<Vec<TextLine>>;
}

/// Result of scanning a screenshot for credential solicitation.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialSignal {
    pub requests_email: bool,
    /// First email address found, in reading order.
    pub email: Option<String>,
}

impl CredentialSignal {
    fn none() -> Self {
        Self { requests_email: false, email: None }
    }
}

/// Scan the screenshot for the first email-address-like token.
///
/// OCR failure is absorbed: an engine error or an unusable result reads as
/// "no credential request", never as an analysis failure.
pub fn check_credential_request(
    engine: &dyn OcrEngine,
    screenshot: &DynamicImage,
    min_confidence: f32,
) -> CredentialSignal {
    let lines = match engine.recognize(screenshot) {
        Ok(lines) => lines,
        Err(e) => {
            debug!(error = %e, "OCR failed, treating as no credential request");
            return CredentialSignal::none();
        }
    };

    for line in lines {
        if line.confidence < min_confidence {
            continue;
        }
        if let Some(m) = EMAIL_RE.find(&line.text) {
            let email = m.as_str().to_string();
            debug!(email = %email, "credential-request email found");
            return CredentialSignal { requests_email: true, email: Some(email) };
        }
    }

    CredentialSignal::none()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedOcr(Vec<TextLine>);

    impl OcrEngine for FixedOcr {
        fn recognize(&self, _: &DynamicImage) -> Result<Vec<TextLine>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenOcr;

    impl OcrEngine for BrokenOcr {
        fn recognize(&self, _: &DynamicImage) -> Result<Vec<TextLine>> {
            anyhow::bail!("ocr engine unavailable")
        }
    }

    fn line(text: &str, confidence: f32) -> TextLine {
        TextLine { text: text.to_string(), confidence, bounds: (0.0, 0.0, 10.0, 10.0) }
    }

    fn blank() -> DynamicImage {
        DynamicImage::new_rgb8(8, 8)
    }

    #[test]
    fn test_finds_first_email_in_reading_order() {
        let ocr = FixedOcr(vec![
            line("Sign in to continue", 0.99),
            line("Contact support@mybank-secure.net for help", 0.95),
            line("or admin@other.org", 0.95),
        ]);
        let signal = check_credential_request(&ocr, &blank(), 0.5);
        assert!(signal.requests_email);
        assert_eq!(signal.email.as_deref(), Some("support@mybank-secure.net"));
    }

    #[test]
    fn test_no_email_found() {
        let ocr = FixedOcr(vec![line("Welcome back", 0.99), line("Password:", 0.99)]);
        assert_eq!(check_credential_request(&ocr, &blank(), 0.5), CredentialSignal::none());
    }

    #[test]
    fn test_low_confidence_lines_ignored() {
        let ocr = FixedOcr(vec![line("ghost@noise.example", 0.2)]);
        let signal = check_credential_request(&ocr, &blank(), 0.5);
        assert!(!signal.requests_email);
    }

    #[test]
    fn test_ocr_failure_absorbed() {
        assert_eq!(check_credential_request(&BrokenOcr, &blank(), 0.5), CredentialSignal::none());
    }

    #[test]
    fn test_email_embedded_in_sentence() {
        let ocr = FixedOcr(vec![line("email help@realbank.com with your password", 0.9)]);
        let signal = check_credential_request(&ocr, &blank(), 0.5);
        assert_eq!(signal.email.as_deref(), Some("help@realbank.com"));
    }
}
