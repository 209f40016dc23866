//! File-search backend over the system `locate` database.
//!
//! `locate` has no native offset, so pagination is emulated: each page
//! re-queries with a larger limit and slices the interesting window out
//! of the result. [`MAX_RESULTS`] is the backstop callers cap their
//! requested limits at.

use anyhow::Context;
use tokio::process::Command;
use tracing::debug;

/// Hard cap on how many paths a single invocation may request.
pub const MAX_RESULTS: usize = 500;

/// One page of file-search results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilePage {
    /// Absolute paths, backend discovery order.
    pub paths: Vec<String>,
    /// Whether another page is worth requesting.
    pub has_more: bool,
}

/// Run a case-insensitive substring search, returning at most `limit`
/// absolute paths.
///
/// Empty output and non-zero exit are zero results; only a failure to
/// spawn the binary at all is an error.
pub async fn search(query: &str, limit: usize) -> anyhow::Result<Vec<String>> {
    let output = Command::new("locate")
        .args(["-i", "-l", &limit.to_string(), query])
        .output()
        .await
        .context("Failed to spawn locate")?;

    if !output.status.success() {
        debug!("locate exited with {}: no results", output.status);
        return Ok(Vec::new());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Slice the `[offset, offset + page_size)` window out of a full result
/// set and decide whether more pages are available.
///
/// `has_more` is true iff the page came back full and the backend
/// supplied everything that was asked of it. On an exact page-boundary
/// match count this over-reports; the following append then yields zero
/// new rows and clears the flag.
pub fn paginate(all: Vec<String>, offset: usize, page_size: usize, requested: usize) -> FilePage {
    let total = all.len();
    let paths: Vec<String> = all
        .into_iter()
        .skip(offset)
        .take(page_size)
        .collect();
    let has_more = paths.len() >= page_size && total >= requested;

    FilePage { paths, has_more }
}
