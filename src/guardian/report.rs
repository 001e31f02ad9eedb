//! Guardian report assembly and writers.
//!
//! A suite's score is `1 - Σ finding weights`, clamped to `[0, 1]`; the
//! overall score is the mean over suites.  Reports land in `reports/` as
//! `guardian-<ts>.json` and a self-contained `guardian-<ts>.html`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::guardian::checks::{self, Finding};
use crate::guardian::fetch::FetchedPage;
use crate::workspace::{atomic_write, atomic_write_json, timestamp_id, Workspace};

// ---------------------------------------------------------------------------
// Report model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub name: String,
    pub score: f64,
    pub findings: Vec<Finding>,
}

impl SuiteResult {
    pub fn new(name: &str, findings: Vec<Finding>) -> Self {
        let penalty: f64 = findings.iter().map(|f| f.severity.weight()).sum();
        Self {
            name: name.to_string(),
            score: (1.0 - penalty).clamp(0.0, 1.0),
            findings,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardianReport {
    pub url: String,
    pub timestamp: String,
    pub status: u16,
    pub elapsed_ms: u64,
    pub suites: Vec<SuiteResult>,
    pub overall_score: f64,
    /// Set when the site could not be fetched at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GuardianReport {
    pub fn from_page(page: &FetchedPage) -> Self {
        let suites = vec![
            SuiteResult::new("accessibility", checks::accessibility(page)),
            SuiteResult::new("performance", checks::performance(page)),
            SuiteResult::new("security", checks::security(page)),
        ];
        let overall_score = suites.iter().map(|s| s.score).sum::<f64>() / suites.len() as f64;
        Self {
            url: page.url.clone(),
            timestamp: timestamp_id(),
            status: page.status,
            elapsed_ms: page.elapsed_ms,
            suites,
            overall_score,
            error: None,
        }
    }

    /// A fetch failure still produces a report: zero scores, error captured.
    pub fn unreachable(url: &str, error: &str) -> Self {
        let suites = ["accessibility", "performance", "security"]
            .iter()
            .map(|name| SuiteResult {
                name: name.to_string(),
                score: 0.0,
                findings: vec![],
            })
            .collect();
        Self {
            url: url.to_string(),
            timestamp: timestamp_id(),
            status: 0,
            elapsed_ms: 0,
            suites,
            overall_score: 0.0,
            error: Some(error.to_string()),
        }
    }

    pub fn suite(&self, name: &str) -> Option<&SuiteResult> {
        self.suites.iter().find(|s| s.name == name)
    }

    /// Write the JSON and HTML reports; returns the paths written.
    pub fn write(&self, ws: &Workspace) -> Result<Vec<PathBuf>> {
        let dir = ws.reports_dir();
        let json_path = dir.join(format!("guardian-{}.json", self.timestamp));
        let html_path = dir.join(format!("guardian-{}.html", self.timestamp));
        atomic_write_json(&json_path, self)?;
        atomic_write(&html_path, self.to_html().as_bytes())?;
        Ok(vec![json_path, html_path])
    }

    // -----------------------------------------------------------------------
    // HTML rendering
    // -----------------------------------------------------------------------

    pub fn to_html(&self) -> String {
        let mut suites_html = String::new();
        for suite in &self.suites {
            let mut rows = String::new();
            if suite.findings.is_empty() {
                rows.push_str("<tr><td colspan=\"3\" class=\"clean\">no findings</td></tr>");
            }
            for f in &suite.findings {
                rows.push_str(&format!(
                    "<tr><td>{}</td><td class=\"sev\">{:?}</td><td>{}</td></tr>",
                    escape(&f.check),
                    f.severity,
                    escape(&f.message),
                ));
            }
            suites_html.push_str(&format!(
                "<section><h2>{} <span class=\"score\">{:.0}%</span></h2>\
                 <table><tr><th>check</th><th>severity</th><th>finding</th></tr>{rows}</table></section>",
                escape(&suite.name),
                suite.score * 100.0,
            ));
        }

        let error_html = self
            .error
            .as_deref()
            .map(|e| format!("<p class=\"error\">fetch failed: {}</p>", escape(e)))
            .unwrap_or_default();

        format!(
            "<!doctype html><html lang=\"en\"><head><meta charset=\"utf-8\">\
             <title>Guardian report — {url}</title>\
             <style>\
             body{{font-family:system-ui,sans-serif;margin:2rem auto;max-width:60rem;color:#222}}\
             h1{{font-size:1.4rem}} h2{{font-size:1.1rem;margin-top:2rem}}\
             table{{border-collapse:collapse;width:100%}}\
             td,th{{border:1px solid #ddd;padding:.4rem .6rem;text-align:left;font-size:.9rem}}\
             .score{{color:#555;font-weight:normal}} .sev{{text-transform:lowercase}}\
             .clean{{color:#2a7}} .error{{color:#c33}}\
             </style></head><body>\
             <h1>Guardian report</h1>\
             <p>{url} — HTTP {status}, {elapsed}ms — overall score {overall:.0}%</p>\
             {error_html}{suites_html}\
             <p><small>generated {timestamp}</small></p>\
             </body></html>",
            url = escape(&self.url),
            status = self.status,
            elapsed = self.elapsed_ms,
            overall = self.overall_score * 100.0,
            timestamp = escape(&self.timestamp),
        )
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guardian::checks::Severity;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn finding(severity: Severity) -> Finding {
        Finding {
            check: "x".to_string(),
            severity,
            message: "msg".to_string(),
        }
    }

    fn sample_page(body: &str) -> FetchedPage {
        FetchedPage {
            url: "https://example.com".to_string(),
            final_url: "https://example.com/".to_string(),
            status: 200,
            headers: BTreeMap::new(),
            body: body.to_string(),
            elapsed_ms: 50,
            body_bytes: body.len(),
        }
    }

    #[test]
    fn test_suite_score_subtracts_weights() {
        let suite = SuiteResult::new("a", vec![finding(Severity::Serious), finding(Severity::Minor)]);
        assert!((suite.score - 0.70).abs() < 1e-9);
    }

    #[test]
    fn test_suite_score_clamps_at_zero() {
        let findings = (0..10).map(|_| finding(Severity::Serious)).collect();
        assert_eq!(SuiteResult::new("a", findings).score, 0.0);
    }

    #[test]
    fn test_report_has_three_suites_and_mean_score() {
        let report = GuardianReport::from_page(&sample_page(
            r#"<html lang="en"><head><title>t</title></head><body></body></html>"#,
        ));
        assert_eq!(report.suites.len(), 3);
        let mean = report.suites.iter().map(|s| s.score).sum::<f64>() / 3.0;
        assert!((report.overall_score - mean).abs() < 1e-9);
        assert!(report.suite("security").is_some());
    }

    #[test]
    fn test_unreachable_report_zeroes_scores() {
        let report = GuardianReport::unreachable("https://down.example", "connection refused");
        assert_eq!(report.overall_score, 0.0);
        assert_eq!(report.status, 0);
        assert!(report.error.as_deref().expect("error").contains("refused"));
    }

    #[test]
    fn test_write_emits_json_and_html() {
        let dir = TempDir::new().expect("tempdir");
        let ws = Workspace::new(dir.path());
        let report = GuardianReport::from_page(&sample_page("<html></html>"));
        let paths = report.write(&ws).expect("write");
        assert_eq!(paths.len(), 2);
        assert!(paths[0].to_string_lossy().ends_with(".json"));
        assert!(paths[1].to_string_lossy().ends_with(".html"));
        assert!(paths.iter().all(|p| p.exists()));

        let body: GuardianReport =
            serde_json::from_str(&std::fs::read_to_string(&paths[0]).expect("read"))
                .expect("parse");
        assert_eq!(body.suites.len(), 3);
    }

    #[test]
    fn test_html_is_self_contained_and_escaped() {
        let mut report = GuardianReport::from_page(&sample_page("<html></html>"));
        report.url = "https://example.com/?a=<script>".to_string();
        let html = report.to_html();
        assert!(html.starts_with("<!doctype html>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("<style>"));
    }

    #[test]
    fn test_html_lists_findings() {
        let report = GuardianReport::from_page(&sample_page("<html><img src=\"x.png\"></html>"));
        assert!(report.to_html().contains("img-alt"));
    }
}
