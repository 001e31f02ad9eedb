//! # Module: guardian
//!
//! Website checks: fetch a page over HTTP and run three suites —
//! accessibility, performance, security — producing scored JSON and HTML
//! reports under `reports/`.
//!
//! The fetch is the only async I/O in the crate; the check suites are pure
//! functions over a [`fetch::FetchedPage`] so they are testable without a
//! network.  An unreachable site is a reportable result, not a crash.

pub mod checks;
pub mod fetch;
pub mod report;

use crate::error::Result;
use crate::workspace::Workspace;
use report::GuardianReport;

/// Fetch `url`, run every suite, and write both report files.  Returns the
/// report and the paths written.
pub async fn run(ws: &Workspace, url: &str) -> Result<(GuardianReport, Vec<std::path::PathBuf>)> {
    let report = match fetch::fetch_page(url).await {
        Ok(page) => GuardianReport::from_page(&page),
        Err(e) => {
            tracing::warn!(%url, error = %e, "guardian fetch failed");
            GuardianReport::unreachable(url, &e.to_string())
        }
    };
    let paths = report.write(ws)?;
    Ok((report, paths))
}
