//! Query pipeline: synchronous app matching, streamed file search.
//!
//! App results come straight off the in-memory index. File results are
//! one cancellable session per query: a `locate` invocation, an
//! offset-sliced page, and staggered per-item delivery so a large page
//! doesn't land on the frontend in one burst. Cancellation is
//! cooperative; a superseded session's deliveries are suppressed at
//! every callback boundary, but its external process is left to finish.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use services::{ApplicationsService, filetype, locate};
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::state::SearchResult;

/// Delay before a fresh query hits the backend, absorbing fast typing.
const FRESH_QUERY_DELAY: Duration = Duration::from_millis(50);
/// Shorter delay for append pages; the user is waiting for them.
const APPEND_DELAY: Duration = Duration::from_millis(10);
/// Gap between consecutive result deliveries.
const ITEM_STAGGER: Duration = Duration::from_millis(5);

/// Cooperative cancellation token for one search session.
///
/// Cloned into the async chain and checked before every delivery.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Owns the live search session and serves both query shapes.
pub struct SearchManager {
    apps: ApplicationsService,
    config: SearchConfig,
    session: Option<CancelToken>,
}

impl SearchManager {
    pub fn new(apps: ApplicationsService, config: SearchConfig) -> Self {
        Self {
            apps,
            config,
            session: None,
        }
    }

    pub fn update_config(&mut self, config: SearchConfig) {
        self.config = config;
    }

    /// Application results for the query, capped per the configured
    /// policy. Empty input browses the index in enumeration order.
    pub fn search_apps(&self, text: &str) -> Vec<SearchResult> {
        if text.is_empty() {
            self.apps
                .all()
                .iter()
                .take(self.config.app_results_browse)
                .cloned()
                .map(|app| SearchResult::App { app })
                .collect()
        } else {
            self.apps
                .fuzzy_query(text)
                .into_iter()
                .take(self.config.app_results_query)
                .cloned()
                .map(|app| SearchResult::App { app })
                .collect()
        }
    }

    /// Stream one page of file results.
    ///
    /// A non-append call supersedes the previous session; an append call
    /// joins it and shares its token. `on_result` fires per path unless
    /// the session is cancelled first; `on_complete` reports whether a
    /// further page is worth requesting. Backend failure completes with
    /// `false` and delivers nothing.
    pub fn search_files(
        &mut self,
        text: &str,
        offset: usize,
        append: bool,
        on_result: impl Fn(SearchResult) + Send + Sync + 'static,
        on_complete: impl FnOnce(bool) + Send + 'static,
    ) {
        let token = if append {
            self.session.get_or_insert_with(CancelToken::new).clone()
        } else {
            if let Some(previous) = self.session.take() {
                previous.cancel();
            }
            let token = CancelToken::new();
            self.session = Some(token.clone());
            token
        };

        let text = normalize_query(text);
        let page_size = self.config.page_size;
        let limit = (offset + page_size).min(self.config.max_locate_results);
        let initial_delay = if append { APPEND_DELAY } else { FRESH_QUERY_DELAY };

        tokio::spawn(async move {
            tokio::time::sleep(initial_delay).await;
            if token.is_cancelled() {
                return;
            }

            let all = match locate::search(&text, limit).await {
                Ok(all) => all,
                Err(err) => {
                    warn!("File search backend failed: {:#}", err);
                    if !token.is_cancelled() {
                        on_complete(false);
                    }
                    return;
                }
            };

            let page = locate::paginate(all, offset, page_size, limit);
            debug!(
                "File page for {:?}: offset {}, {} paths, has_more {}",
                text,
                offset,
                page.paths.len(),
                page.has_more
            );

            stream_page(page, token, on_result, on_complete).await;
        });
    }

    /// Cancel the live session, if any.
    pub fn cancel_current(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel();
        }
    }
}

/// Expand a leading `~` so home-rooted queries match the absolute paths
/// the backend indexes.
fn normalize_query(text: &str) -> String {
    if let Some(rest) = text.strip_prefix('~') {
        if let Ok(home) = std::env::var("HOME") {
            if !home.is_empty() {
                return format!("{home}{rest}");
            }
        }
    }
    text.to_string()
}

/// Deliver a page item by item, re-checking the token before every
/// callback. A cancelled session emits nothing further, completion
/// included.
async fn stream_page(
    page: locate::FilePage,
    token: CancelToken,
    on_result: impl Fn(SearchResult) + Send + Sync + 'static,
    on_complete: impl FnOnce(bool) + Send + 'static,
) {
    for path in &page.paths {
        tokio::time::sleep(ITEM_STAGGER).await;
        if token.is_cancelled() {
            return;
        }
        on_result(file_result(Path::new(path)));
    }

    if !token.is_cancelled() {
        on_complete(page.has_more);
    }
}

/// Build a file row from a backend path.
fn file_result(path: &Path) -> SearchResult {
    let class = filetype::classify(path);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    SearchResult::File {
        display_name: filetype::display_name(path),
        name,
        icon: class.icon,
        path: path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use services::Application;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn fake_apps(n: usize) -> ApplicationsService {
        let apps = (0..n)
            .map(|i| Application {
                name: format!("App {i:02}"),
                exec: format!("app-{i}"),
                icon: None,
                description: None,
                keywords: Vec::new(),
                desktop_file: PathBuf::from("/dev/null"),
            })
            .collect();
        ApplicationsService::with_apps(apps)
    }

    fn page(n: usize, has_more: bool) -> locate::FilePage {
        locate::FilePage {
            paths: (0..n).map(|i| format!("/tmp/hit-{i}")).collect(),
            has_more,
        }
    }

    #[test]
    fn test_app_results_capped_for_empty_query() {
        let manager = SearchManager::new(fake_apps(40), SearchConfig::default());
        assert_eq!(manager.search_apps("").len(), 20);
    }

    #[test]
    fn test_app_results_capped_for_typed_query() {
        let manager = SearchManager::new(fake_apps(40), SearchConfig::default());
        assert_eq!(manager.search_apps("app").len(), 6);
    }

    #[test]
    fn test_caps_follow_configuration() {
        let config = SearchConfig {
            app_results_browse: 3,
            app_results_query: 2,
            ..SearchConfig::default()
        };
        let manager = SearchManager::new(fake_apps(40), config);
        assert_eq!(manager.search_apps("").len(), 3);
        assert_eq!(manager.search_apps("app").len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_session_delivers_nothing() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(Mutex::new(None));

        let token = CancelToken::new();
        token.cancel();

        let d = delivered.clone();
        let c = completed.clone();
        stream_page(
            page(10, true),
            token,
            move |_| {
                d.fetch_add(1, Ordering::Relaxed);
            },
            move |has_more| {
                *c.lock().unwrap() = Some(has_more);
            },
        )
        .await;

        assert_eq!(delivered.load(Ordering::Relaxed), 0);
        assert!(completed.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_live_session_delivers_page_then_completes() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(Mutex::new(None));

        let d = delivered.clone();
        let c = completed.clone();
        stream_page(
            page(10, true),
            CancelToken::new(),
            move |_| {
                d.fetch_add(1, Ordering::Relaxed);
            },
            move |has_more| {
                *c.lock().unwrap() = Some(has_more);
            },
        )
        .await;

        assert_eq!(delivered.load(Ordering::Relaxed), 10);
        assert_eq!(*completed.lock().unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_mid_stream_cancellation_stops_delivery() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let token = CancelToken::new();

        let d = delivered.clone();
        let t = token.clone();
        stream_page(
            page(10, false),
            token,
            move |_| {
                // Cancel as soon as the third result lands
                if d.fetch_add(1, Ordering::Relaxed) + 1 == 3 {
                    t.cancel();
                }
            },
            |_| panic!("cancelled session must not complete"),
        )
        .await;

        assert_eq!(delivered.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_normalize_query_expands_home_prefix() {
        if let Ok(home) = std::env::var("HOME") {
            if home.is_empty() {
                return;
            }
            assert_eq!(normalize_query("~/notes"), format!("{home}/notes"));
        }
        assert_eq!(normalize_query("/etc/hosts"), "/etc/hosts");
        assert_eq!(normalize_query("report"), "report");
    }

    #[tokio::test]
    async fn test_new_search_supersedes_previous_session() {
        let mut manager = SearchManager::new(fake_apps(1), SearchConfig::default());

        let first = CancelToken::new();
        manager.session = Some(first.clone());

        // A fresh (non-append) search replaces and cancels the old token
        manager.search_files("query", 0, false, |_| {}, |_| {});
        assert!(first.is_cancelled());

        // An append joins the live session instead of replacing it
        let live = manager.session.clone().unwrap();
        manager.search_files("query", 50, true, |_| {}, |_| {});
        assert!(!live.is_cancelled());

        manager.cancel_current();
        assert!(live.is_cancelled());
    }
}
