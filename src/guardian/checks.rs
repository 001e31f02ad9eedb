//! The three guardian check suites.
//!
//! Each suite is a pure function `&FetchedPage -> Vec<Finding>`.  Findings
//! carry a severity; the report layer turns weighted findings into a suite
//! score in `[0, 1]`.
//!
//! The accessibility checks are static HTML heuristics, not a full audit —
//! they catch the handful of problems that are reliably visible in markup
//! without rendering the page.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::guardian::fetch::FetchedPage;

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Serious,
}

impl Severity {
    /// Score penalty per finding.
    pub fn weight(self) -> f64 {
        match self {
            Severity::Minor => 0.05,
            Severity::Moderate => 0.10,
            Severity::Serious => 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub check: String,
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    fn new(check: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            check: check.to_string(),
            severity,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Accessibility
// ---------------------------------------------------------------------------

static IMG_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<img\b[^>]*>").expect("img regex"));
static HTML_LANG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<html\b[^>]*\blang\s*="#).expect("lang regex"));
static TITLE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>\s*\S").expect("title regex"));
static EMPTY_ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<a\b[^>]*>\s*</a>").expect("anchor regex"));

pub fn accessibility(page: &FetchedPage) -> Vec<Finding> {
    let mut findings = Vec::new();
    let body = &page.body;

    let imgs_without_alt = IMG_TAG
        .find_iter(body)
        .filter(|m| !m.as_str().to_ascii_lowercase().contains("alt="))
        .count();
    if imgs_without_alt > 0 {
        findings.push(Finding::new(
            "img-alt",
            Severity::Serious,
            format!("{imgs_without_alt} <img> tag(s) without alt text"),
        ));
    }

    if !HTML_LANG.is_match(body) {
        findings.push(Finding::new(
            "html-lang",
            Severity::Moderate,
            "<html> element has no lang attribute",
        ));
    }

    if !TITLE_TAG.is_match(body) {
        findings.push(Finding::new(
            "document-title",
            Severity::Moderate,
            "page has no non-empty <title>",
        ));
    }

    let empty_anchors = EMPTY_ANCHOR.find_iter(body).count();
    if empty_anchors > 0 {
        findings.push(Finding::new(
            "link-name",
            Severity::Moderate,
            format!("{empty_anchors} link(s) with no text content"),
        ));
    }

    findings
}

// ---------------------------------------------------------------------------
// Performance
// ---------------------------------------------------------------------------

static SCRIPT_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b").expect("script regex"));
static STYLESHEET_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<link\b[^>]*rel\s*=\s*["']?stylesheet"#).expect("css regex"));

const SLOW_MS: u64 = 2_000;
const SLUGGISH_MS: u64 = 800;
const HEAVY_BYTES: usize = 2 * 1024 * 1024;
const CHUNKY_BYTES: usize = 500 * 1024;
const COMPRESSIBLE_BYTES: usize = 50 * 1024;
const MANY_SCRIPTS: usize = 20;

pub fn performance(page: &FetchedPage) -> Vec<Finding> {
    let mut findings = Vec::new();

    if page.elapsed_ms > SLOW_MS {
        findings.push(Finding::new(
            "response-time",
            Severity::Serious,
            format!("page took {}ms to load", page.elapsed_ms),
        ));
    } else if page.elapsed_ms > SLUGGISH_MS {
        findings.push(Finding::new(
            "response-time",
            Severity::Moderate,
            format!("page took {}ms to load", page.elapsed_ms),
        ));
    }

    if page.body_bytes > HEAVY_BYTES {
        findings.push(Finding::new(
            "page-weight",
            Severity::Serious,
            format!("document is {} bytes", page.body_bytes),
        ));
    } else if page.body_bytes > CHUNKY_BYTES {
        findings.push(Finding::new(
            "page-weight",
            Severity::Moderate,
            format!("document is {} bytes", page.body_bytes),
        ));
    }

    let scripts = SCRIPT_TAG.find_iter(&page.body).count();
    let stylesheets = STYLESHEET_LINK.find_iter(&page.body).count();
    if scripts + stylesheets > MANY_SCRIPTS {
        findings.push(Finding::new(
            "resource-count",
            Severity::Moderate,
            format!("{scripts} script(s) and {stylesheets} stylesheet(s) referenced"),
        ));
    }

    if page.body_bytes > COMPRESSIBLE_BYTES && page.header("content-encoding").is_none() {
        findings.push(Finding::new(
            "compression",
            Severity::Minor,
            "response is uncompressed",
        ));
    }

    findings
}

// ---------------------------------------------------------------------------
// Security
// ---------------------------------------------------------------------------

static MIXED_CONTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)\b(?:src|href)\s*=\s*["']http://"#).expect("mixed content regex")
});

pub fn security(page: &FetchedPage) -> Vec<Finding> {
    let mut findings = Vec::new();

    if !page.is_https() {
        findings.push(Finding::new(
            "https",
            Severity::Serious,
            "page is served over plain HTTP",
        ));
    } else {
        if page.header("strict-transport-security").is_none() {
            findings.push(Finding::new(
                "hsts",
                Severity::Moderate,
                "Strict-Transport-Security header missing",
            ));
        }
        if MIXED_CONTENT.is_match(&page.body) {
            findings.push(Finding::new(
                "mixed-content",
                Severity::Serious,
                "https page references http:// subresources",
            ));
        }
    }

    if page.header("content-security-policy").is_none() {
        findings.push(Finding::new(
            "csp",
            Severity::Moderate,
            "Content-Security-Policy header missing",
        ));
    }
    if page.header("x-content-type-options").is_none() {
        findings.push(Finding::new(
            "content-type-options",
            Severity::Minor,
            "X-Content-Type-Options header missing",
        ));
    }
    if page.header("x-frame-options").is_none() {
        findings.push(Finding::new(
            "frame-options",
            Severity::Minor,
            "X-Frame-Options header missing",
        ));
    }

    findings
}
