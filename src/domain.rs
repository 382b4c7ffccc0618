//! Domain consistency checking.
//!
//! The phishing signal is a page that shows BrandX's logo while being hosted
//! on a domain BrandX does not own. Comparison happens on the registrable
//! second-level label of the host ("paypal" in `login.paypal.co.uk`), which
//! is also how the reference store keys canonical domains.

use tracing::debug;
use url::{Host, Url};

use crate::brand::BrandEntry;

/// Compound public suffixes where the registrable label sits one level
/// deeper (e.g. "example" in example.co.uk).
const COMPOUND_SUFFIXES: [&str; 12] = [
    "co.uk", "org.uk", "ac.uk", "co.jp", "co.kr", "co.nz", "co.in", "com.au",
    "net.au", "com.br", "com.mx", "com.cn",
];

/// Single-label public suffixes. A host that is nothing but one of these
/// (e.g. "com") has no registrable label, same as a bare compound suffix.
const SINGLE_SUFFIXES: [&str; 14] = [
    "com", "net", "org", "edu", "gov", "mil", "int", "info", "biz", "io",
    "co", "uk", "jp", "xyz",
];

/// Outcome of the brand/URL consistency check, kept for audit output.
#[derive(Debug, Clone)]
pub struct DomainCheck {
    /// True when the URL's registrable domain is not owned by the brand.
    pub is_inconsistent: bool,
    /// The registrable label extracted from the URL (empty on failure).
    pub extracted: String,
    /// The brand's canonical domains, echoed for the result record.
    pub canonical_domains: Vec<String>,
}

/// Extract the registrable second-level label from a host name.
///
/// IP hosts and bare public suffixes yield an empty string.
pub fn registrable_label(host: &str) -> String {
    let host = host.trim().trim_end_matches('.').to_lowercase();
    if host.is_empty() || host.parse::<std::net::IpAddr>().is_ok() {
        return String::new();
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() == 1 {
        // A bare public suffix is not registrable; bare names like
        // "localhost" have no suffix to strip and stand as-is.
        if SINGLE_SUFFIXES.contains(&labels[0]) {
            return String::new();
        }
        return labels[0].to_string();
    }

    let last_two = format!("{}.{}", labels[labels.len() - 2], labels[labels.len() - 1]);
    let suffix_len = if COMPOUND_SUFFIXES.contains(&last_two.as_str()) { 2 } else { 1 };

    if labels.len() <= suffix_len {
        // The host is the public suffix itself, e.g. "co.uk".
        return String::new();
    }
    labels[labels.len() - suffix_len - 1].to_string()
}

/// Extract the registrable label from a full URL.
///
/// Malformed or schemeless input is retried with an `http://` prefix; any
/// remaining failure yields an empty string, which never matches a canonical
/// domain and therefore biases toward "inconsistent".
pub fn registrable_domain(url: &str) -> String {
    let parsed = match Url::parse(url) {
        Ok(u) => Ok(u),
        // Retry schemeless input only; re-prefixing "http://..." would turn
        // the scheme itself into a host.
        Err(e) if !url.contains("://") => {
            Url::parse(&format!("http://{}", url)).map_err(|_| e)
        }
        Err(e) => Err(e),
    };

    let parsed = match parsed {
        Ok(u) => u,
        Err(e) => {
            debug!(url, error = %e, "URL parse failed, treating registrable domain as empty");
            return String::new();
        }
    };

    match parsed.host() {
        Some(Host::Domain(host)) => registrable_label(host),
        // IP-hosted pages have no registrable domain.
        Some(_) | None => String::new(),
    }
}

/// Check whether `url` is hosted on one of the given canonical domains.
pub fn check_consistency(url: &str, canonical_domains: &[String]) -> DomainCheck {
    let extracted = registrable_domain(url);
    let is_inconsistent = extracted.is_empty()
        || !canonical_domains.iter().any(|d| d.to_lowercase() == extracted);
    DomainCheck {
        is_inconsistent,
        extracted,
        canonical_domains: canonical_domains.to_vec(),
    }
}

/// Check whether `url` is hosted on a domain the matched brand owns.
pub fn check_brand_consistency(url: &str, brand: &BrandEntry) -> DomainCheck {
    check_consistency(url, &brand.domains)
}

/// The domain part of an email address, lowercased ("" when malformed).
pub fn email_domain(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((_, domain)) if !domain.is_empty() => domain.to_lowercase(),
        _ => String::new(),
    }
}

/// Whether an email address belongs to the same registrable domain as the
/// page URL. Used by the credential-request fallback: a mismatch (or an
/// unextractable URL domain) is the phishing signal.
pub fn email_matches_url(email: &str, url: &str) -> bool {
    let email_label = registrable_label(&email_domain(email));
    let url_label = registrable_domain(url);
    !email_label.is_empty() && !url_label.is_empty() && email_label == url_label
}
