//! Page fetching for guardian runs.
//!
//! Captures everything the check suites need in one value so they can stay
//! pure: final URL (after redirects), status, lower-cased headers, body, and
//! wall-clock timing.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::error::Result;

/// One fetched page, ready for the check suites.
#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    pub url: String,
    /// URL after redirects; scheme checks run against this one.
    pub final_url: String,
    pub status: u16,
    /// Header names lower-cased.
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub elapsed_ms: u64,
    pub body_bytes: usize,
}

impl FetchedPage {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn is_https(&self) -> bool {
        self.final_url.starts_with("https://")
    }
}

/// Fetch `url` with redirects followed.  Network failure is an error here;
/// the guardian entry point turns it into an unreachable-site report.
pub async fn fetch_page(url: &str) -> Result<FetchedPage> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("odavl-guardian/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let started = Instant::now();
    let response = client.get(url).send().await?;
    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    let headers: BTreeMap<String, String> = response
        .headers()
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_ascii_lowercase(),
                v.to_str().unwrap_or("").to_string(),
            )
        })
        .collect();
    let body = response.text().await?;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    Ok(FetchedPage {
        url: url.to_string(),
        final_url,
        status,
        body_bytes: body.len(),
        body,
        headers,
        elapsed_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut page = FetchedPage::default();
        page.headers
            .insert("content-security-policy".to_string(), "default-src 'self'".to_string());
        assert!(page.header("Content-Security-Policy").is_some());
        assert!(page.header("x-absent").is_none());
    }

    #[test]
    fn test_is_https_follows_final_url() {
        let page = FetchedPage {
            url: "http://example.com".to_string(),
            final_url: "https://example.com/".to_string(),
            ..FetchedPage::default()
        };
        assert!(page.is_https());
    }
}
