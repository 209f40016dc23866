//! Launcher controller: the result-list state machine.
//!
//! One worker task serialises every mutation: frontend events and
//! streamed search deliveries arrive over the same channel, so merges
//! never race. State is published as whole snapshots through a
//! `Mutable`; frontends subscribe and re-render.
//!
//! Stale search sessions are fenced twice: the search manager's cancel
//! token suppresses deliveries at the source, and a per-query session id
//! drops anything already in flight through the channel.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use futures_signals::signal::{Mutable, MutableSignalCloned};
use services::thumbnails::PreviewHandle;
use services::{Services, filetype, opener};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::config::{Config, WindowConfig};
use crate::search::SearchManager;
use crate::state::{Key, LauncherEvent, LauncherState, Mode, SearchResult, mode_for_query};

/// Messages processed by the worker task.
enum Msg {
    Event(LauncherEvent),
    FileResult { session: u64, result: SearchResult },
    FileSearchDone { session: u64, has_more: bool },
}

/// Handle on the launcher core.
///
/// Cheap to clone; all clones share the same state and worker.
#[derive(Clone)]
pub struct Controller {
    state: Mutable<LauncherState>,
    previews: Mutable<HashMap<PathBuf, PreviewHandle>>,
    services: Services,
    tx: UnboundedSender<Msg>,
}

impl Controller {
    /// Start the controller worker.
    pub fn new(services: Services, config: Config) -> Self {
        let state = Mutable::new(LauncherState::new(&config));
        let previews = Mutable::new(HashMap::new());
        let (tx, rx) = mpsc::unbounded_channel();

        let worker = Worker {
            state: state.clone(),
            previews: previews.clone(),
            search: SearchManager::new(services.applications.clone(), config.search.clone()),
            services: services.clone(),
            config,
            tx: tx.clone(),
            session: 0,
            seen_paths: HashSet::new(),
        };
        tokio::spawn(worker.run(rx));

        Self {
            state,
            previews,
            services,
            tx,
        }
    }

    /// Signal emitting a snapshot on every state change.
    pub fn subscribe(&self) -> MutableSignalCloned<LauncherState> {
        self.state.signal_cloned()
    }

    /// Current state snapshot.
    pub fn state(&self) -> LauncherState {
        self.state.get_cloned()
    }

    /// Feed an event into the state machine.
    pub fn send(&self, event: LauncherEvent) {
        let _ = self.tx.send(Msg::Event(event));
    }

    /// Resolve a row's icon name against the installed icon themes.
    pub fn icon_path(&self, result: &SearchResult) -> Option<PathBuf> {
        services::applications::icons::lookup_icon(result.icon())
    }

    /// Preview handle for a row, requested lazily and cached for the
    /// current query. Returns `None` for application rows.
    pub fn preview(&self, result: &SearchResult) -> Option<PreviewHandle> {
        let path = result.path()?;
        let class = filetype::classify(path);
        let mut map = self.previews.lock_mut();
        Some(
            map.entry(path.to_path_buf())
                .or_insert_with(|| self.services.thumbnails.request(path, class))
                .clone(),
        )
    }
}

struct Worker {
    state: Mutable<LauncherState>,
    previews: Mutable<HashMap<PathBuf, PreviewHandle>>,
    search: SearchManager,
    services: Services,
    config: Config,
    tx: UnboundedSender<Msg>,
    /// Monotonic query generation; messages from older generations are
    /// dropped on arrival.
    session: u64,
    /// File paths already in the list for the current query.
    seen_paths: HashSet<PathBuf>,
}

impl Worker {
    async fn run(mut self, mut rx: UnboundedReceiver<Msg>) {
        while let Some(msg) = rx.recv().await {
            match msg {
                Msg::Event(event) => self.handle_event(event),
                Msg::FileResult { session, result } => self.merge_file_result(session, result),
                Msg::FileSearchDone { session, has_more } => {
                    self.finish_file_page(session, has_more)
                }
            }
        }
    }

    fn handle_event(&mut self, event: LauncherEvent) {
        match event {
            LauncherEvent::QueryChanged(text) => self.set_query(text),
            LauncherEvent::KeyPressed { key, alt } => self.on_key(key, alt),
            LauncherEvent::Scrolled {
                offset,
                viewport_height,
            } => self.on_scroll(offset, viewport_height),
            LauncherEvent::PointerPressed { x, y, content } => {
                if !content.contains(x, y) {
                    self.hide();
                }
            }
            LauncherEvent::Shown => {
                let empty = {
                    let mut state = self.state.lock_mut();
                    state.visible = true;
                    state.query.is_empty()
                };
                if empty {
                    self.reset_to_empty();
                }
            }
            LauncherEvent::Hidden => self.hide(),
            LauncherEvent::ConfigReloaded(config) => self.apply_config(config),
        }
    }

    /// A new query supersedes everything about the previous one.
    fn set_query(&mut self, text: String) {
        if text.is_empty() {
            self.reset_to_empty();
            return;
        }

        self.session += 1;
        self.seen_paths.clear();
        self.previews.lock_mut().clear();

        // Apps are ranked synchronously and always precede file streaming.
        let results = match mode_for_query(&text) {
            Mode::FileSearch => Vec::new(),
            _ => self.search.search_apps(&text),
        };

        {
            let mut state = self.state.lock_mut();
            state.query = text.clone();
            state.results = results;
            state.selected_index = 0;
            state.visible_start_index = 0;
            state.file_search_offset = 0;
            state.has_more_files = false;
            state.is_loading_more = false;
            resize(&mut state, &self.config.window);
        }

        self.start_file_search(text, 0, false);
    }

    /// Back to the empty view: recents, or a sample of installed apps.
    fn reset_to_empty(&mut self) {
        self.search.cancel_current();
        self.session += 1;
        self.seen_paths.clear();
        self.previews.lock_mut().clear();

        let results = self.initial_results();
        let mut state = self.state.lock_mut();
        state.query.clear();
        state.results = results;
        state.selected_index = 0;
        state.visible_start_index = 0;
        state.file_search_offset = 0;
        state.has_more_files = false;
        state.is_loading_more = false;
        resize(&mut state, &self.config.window);
    }

    fn initial_results(&self) -> Vec<SearchResult> {
        let recent = self.services.recent.load();
        let mut results: Vec<SearchResult> = recent
            .iter()
            .filter_map(|name| self.services.applications.find_by_name(name))
            .cloned()
            .map(|app| SearchResult::App { app })
            .collect();

        if results.is_empty() {
            results = self
                .services
                .applications
                .all()
                .iter()
                .take(self.config.search.recent_apps_shown)
                .cloned()
                .map(|app| SearchResult::App { app })
                .collect();
        }

        results
    }

    fn hide(&mut self) {
        self.state.lock_mut().visible = false;
        self.reset_to_empty();
    }

    fn on_key(&mut self, key: Key, alt: bool) {
        if alt {
            if let Key::Char(c) = key {
                if let Some(digit) = c.to_digit(10) {
                    self.quick_launch(digit as usize);
                }
            }
            return;
        }

        match key {
            Key::Escape => self.hide(),
            Key::Down | Key::Char('j') => self.step_selection(1),
            Key::Up | Key::Char('k') => self.step_selection(-1),
            Key::Enter => self.launch_selected(),
            Key::Char(_) => {}
        }
    }

    fn step_selection(&mut self, delta: i64) {
        let mut state = self.state.lock_mut();
        state.selected_index = step_index(state.selected_index, delta, state.results.len());
    }

    /// Launch the row a modifier+digit shortcut addresses, if any.
    fn quick_launch(&mut self, digit: usize) {
        let target = {
            let state = self.state.lock_ref();
            quick_launch_index(state.visible_start_index, digit, state.results.len())
                .map(|index| state.results[index].clone())
        };
        if let Some(result) = target {
            self.launch(result);
        }
    }

    fn launch_selected(&mut self) {
        let selected = {
            let state = self.state.lock_ref();
            state.results.get(state.selected_index).cloned()
        };
        if let Some(result) = selected {
            self.launch(result);
        }
    }

    fn launch(&mut self, result: SearchResult) {
        match &result {
            SearchResult::App { app } => {
                debug!("Launching app: {}", app.name);
                self.services.recent.record(&app.name);
                app.launch();
            }
            SearchResult::File { path, .. } => {
                debug!("Opening file: {}", path.display());
                opener::open_detached(path);
            }
        }
        self.hide();
    }

    fn on_scroll(&mut self, offset: f32, viewport_height: f32) {
        let row_height = self.config.window.row_height;

        let (load_more, query, next_offset) = {
            let mut state = self.state.lock_mut();
            state.visible_start_index = row_index_at(offset, row_height);

            let fraction =
                scrolled_fraction(offset, viewport_height, state.results.len(), row_height);
            let load_more = should_load_more(
                fraction,
                self.config.search.load_more_threshold,
                state.file_result_count(),
                self.config.search.load_more_min_results,
                state.has_more_files,
                state.is_loading_more,
            );

            if load_more {
                state.is_loading_more = true;
                state.file_search_offset += self.config.search.page_size;
            }
            (load_more, state.query.clone(), state.file_search_offset)
        };

        if load_more {
            debug!("Loading more file results at offset {}", next_offset);
            self.start_file_search(query, next_offset, true);
        }
    }

    fn start_file_search(&mut self, text: String, offset: usize, append: bool) {
        let session = self.session;
        let result_tx = self.tx.clone();
        let done_tx = self.tx.clone();

        self.search.search_files(
            &text,
            offset,
            append,
            move |result| {
                let _ = result_tx.send(Msg::FileResult { session, result });
            },
            move |has_more| {
                let _ = done_tx.send(Msg::FileSearchDone { session, has_more });
            },
        );
    }

    fn merge_file_result(&mut self, session: u64, result: SearchResult) {
        if session != self.session {
            return;
        }
        if !merge_unique_file(&mut self.seen_paths, result.clone()) {
            return;
        }

        let mut state = self.state.lock_mut();
        state.results.push(result);
        resize(&mut state, &self.config.window);
    }

    fn finish_file_page(&mut self, session: u64, has_more: bool) {
        if session != self.session {
            return;
        }
        let mut state = self.state.lock_mut();
        state.has_more_files = has_more;
        state.is_loading_more = false;
    }

    fn apply_config(&mut self, config: Config) {
        self.search.update_config(config.search.clone());
        self.config = config;

        let mut state = self.state.lock_mut();
        resize(&mut state, &self.config.window);
        info!("Configuration reloaded");
    }
}

/// Admit a file result into the seen-set; duplicates and app rows are
/// rejected.
fn merge_unique_file(seen: &mut HashSet<PathBuf>, result: SearchResult) -> bool {
    match result.path() {
        Some(path) => seen.insert(path.to_path_buf()),
        None => false,
    }
}

/// Clamp a selection step to the list.
fn step_index(current: usize, delta: i64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    if delta >= 0 {
        current.saturating_add(delta as usize).min(len - 1)
    } else {
        current.saturating_sub(delta.unsigned_abs() as usize)
    }
}

/// Absolute index a modifier+digit shortcut addresses, if in range.
fn quick_launch_index(visible_start: usize, digit: usize, len: usize) -> Option<usize> {
    if !(1..=9).contains(&digit) {
        return None;
    }
    let index = visible_start + digit - 1;
    (index < len).then_some(index)
}

/// Row index at a scroll offset.
fn row_index_at(offset: f32, row_height: f32) -> usize {
    if row_height <= 0.0 {
        return 0;
    }
    (offset / row_height).floor().max(0.0) as usize
}

/// How far through the content the viewport bottom is, 0..=1.
fn scrolled_fraction(offset: f32, viewport: f32, rows: usize, row_height: f32) -> f32 {
    let content = rows as f32 * row_height;
    if content <= 0.0 {
        return 0.0;
    }
    ((offset + viewport) / content).clamp(0.0, 1.0)
}

fn should_load_more(
    fraction: f32,
    threshold: f32,
    file_rows: usize,
    min_rows: usize,
    has_more: bool,
    loading: bool,
) -> bool {
    fraction >= threshold && file_rows >= min_rows && has_more && !loading
}

/// Recompute window bounds from the current list.
fn resize(state: &mut LauncherState, window: &WindowConfig) {
    let longest = state
        .results
        .iter()
        .map(|r| r.display_label().chars().count())
        .max()
        .unwrap_or(0)
        .max(20);

    state.window_width =
        (longest as f32 * window.char_width + window.width_padding).clamp(window.min_width, window.max_width);
    state.window_height =
        (state.results.len() as f32 * window.row_height).clamp(window.min_height, window.max_height);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Bounds;
    use services::{Application, ApplicationsService, RecentApps, ThumbnailService};
    use std::time::Duration;

    fn fake_app(name: &str) -> Application {
        Application {
            name: name.to_string(),
            exec: format!("{}-bin", name.to_lowercase()),
            icon: None,
            description: None,
            keywords: Vec::new(),
            desktop_file: PathBuf::from("/dev/null"),
        }
    }

    fn file_row(path: &str) -> SearchResult {
        SearchResult::File {
            path: PathBuf::from(path),
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            display_name: path.to_string(),
            icon: "text-x-generic",
        }
    }

    fn fake_services(dir: &tempfile::TempDir, apps: Vec<Application>) -> Services {
        Services {
            applications: ApplicationsService::with_apps(apps),
            recent: RecentApps::with_path(dir.path().join("recent.json")),
            thumbnails: ThumbnailService::with_cache_dir(dir.path().join("thumbs")),
        }
    }

    async fn wait_until(
        controller: &Controller,
        pred: impl Fn(&LauncherState) -> bool,
    ) -> LauncherState {
        for _ in 0..400 {
            let state = controller.state();
            if pred(&state) {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("controller never reached expected state");
    }

    #[test]
    fn test_step_index_clamps_at_both_ends() {
        assert_eq!(step_index(4, 1, 5), 4);
        assert_eq!(step_index(0, -1, 5), 0);
        assert_eq!(step_index(2, 1, 5), 3);
        assert_eq!(step_index(2, -1, 5), 1);
        assert_eq!(step_index(0, 1, 0), 0);
    }

    #[test]
    fn test_quick_launch_index() {
        // Alt+3 with two rows scrolled past addresses absolute index 4
        assert_eq!(quick_launch_index(2, 3, 10), Some(4));
        // ... and is a no-op when that row does not exist
        assert_eq!(quick_launch_index(2, 3, 4), None);
        assert_eq!(quick_launch_index(0, 1, 1), Some(0));
        assert_eq!(quick_launch_index(0, 0, 10), None);
    }

    #[test]
    fn test_merge_rejects_duplicates_across_pages() {
        let mut seen = HashSet::new();
        let mut results = Vec::new();

        for i in 0..50 {
            let row = file_row(&format!("/tmp/f{i}"));
            if merge_unique_file(&mut seen, row.clone()) {
                results.push(row);
            }
        }
        assert_eq!(results.len(), 50);

        // Second page overlaps the first by 10 paths
        let mut added = 0;
        for i in 40..90 {
            let row = file_row(&format!("/tmp/f{i}"));
            if merge_unique_file(&mut seen, row.clone()) {
                results.push(row);
                added += 1;
            }
        }
        assert_eq!(added, 40);
        assert_eq!(results.len(), 90);
    }

    #[test]
    fn test_merge_rejects_app_rows() {
        let mut seen = HashSet::new();
        assert!(!merge_unique_file(
            &mut seen,
            SearchResult::App {
                app: fake_app("Alpha")
            }
        ));
    }

    #[test]
    fn test_window_size_clamps() {
        let window = WindowConfig::default();
        let mut state = LauncherState::new(&Config::default());

        // Short lists stay at the minimum bounds
        state.results = vec![file_row("/a")];
        resize(&mut state, &window);
        assert_eq!(state.window_width, 450.0);
        assert_eq!(state.window_height, 200.0);

        // A long label pushes the width to its cap
        state.results = vec![file_row(&format!("/tmp/{}", "x".repeat(120)))];
        resize(&mut state, &window);
        assert_eq!(state.window_width, 800.0);

        // Ten rows exceed the height cap
        state.results = (0..10).map(|i| file_row(&format!("/f{i}"))).collect();
        resize(&mut state, &window);
        assert_eq!(state.window_height, 400.0);
    }

    #[test]
    fn test_row_index_at() {
        assert_eq!(row_index_at(0.0, 48.0), 0);
        assert_eq!(row_index_at(47.0, 48.0), 0);
        assert_eq!(row_index_at(96.0, 48.0), 2);
        assert_eq!(row_index_at(10.0, 0.0), 0);
    }

    #[test]
    fn test_should_load_more_gate() {
        // All conditions met
        assert!(should_load_more(0.85, 0.8, 50, 40, true, false));
        // Below threshold
        assert!(!should_load_more(0.5, 0.8, 50, 40, true, false));
        // Too few file rows
        assert!(!should_load_more(0.9, 0.8, 10, 40, true, false));
        // Nothing more to fetch
        assert!(!should_load_more(0.9, 0.8, 50, 40, false, false));
        // Already in flight
        assert!(!should_load_more(0.9, 0.8, 50, 40, true, true));
    }

    #[test]
    fn test_scrolled_fraction() {
        // 50 rows at 48px, viewport 400px, scrolled to 1600px
        let fraction = scrolled_fraction(1600.0, 400.0, 50, 48.0);
        assert!((fraction - (2000.0 / 2400.0)).abs() < 1e-4);
        assert_eq!(scrolled_fraction(0.0, 400.0, 0, 48.0), 0.0);
    }

    #[tokio::test]
    async fn test_empty_query_shows_recents() {
        let dir = tempfile::tempdir().unwrap();
        let services = fake_services(
            &dir,
            vec![fake_app("Alpha"), fake_app("Beta"), fake_app("Gamma")],
        );
        services.recent.record("Gamma");
        services.recent.record("Beta");

        let controller = Controller::new(services, Config::default());
        controller.send(LauncherEvent::Shown);

        let state = wait_until(&controller, |s| s.results.len() == 2).await;
        assert!(state.visible);
        assert_eq!(state.results[0].display_label(), "Beta");
        assert_eq!(state.results[1].display_label(), "Gamma");
    }

    #[tokio::test]
    async fn test_empty_recents_falls_back_to_app_sample() {
        let dir = tempfile::tempdir().unwrap();
        let services = fake_services(
            &dir,
            vec![fake_app("Alpha"), fake_app("Beta"), fake_app("Gamma")],
        );

        let controller = Controller::new(services, Config::default());
        controller.send(LauncherEvent::Shown);

        let state = wait_until(&controller, |s| s.results.len() == 3).await;
        assert_eq!(state.results[0].display_label(), "Alpha");
    }

    #[tokio::test]
    async fn test_typed_query_ranks_apps_first_and_resets_selection() {
        let dir = tempfile::tempdir().unwrap();
        let services = fake_services(&dir, vec![fake_app("Files"), fake_app("Firefox")]);

        let controller = Controller::new(services, Config::default());
        controller.send(LauncherEvent::Shown);
        controller.send(LauncherEvent::QueryChanged("firefox".into()));

        let state = wait_until(&controller, |s| {
            s.query == "firefox" && !s.results.is_empty()
        })
        .await;
        assert_eq!(state.results[0].display_label(), "Firefox");
        assert_eq!(state.selected_index, 0);
        assert_eq!(state.file_search_offset, 0);
        assert!(!state.is_loading_more);
    }

    #[tokio::test]
    async fn test_selection_clamps_via_key_events() {
        let dir = tempfile::tempdir().unwrap();
        let services = fake_services(
            &dir,
            vec![fake_app("Alpha"), fake_app("Beta"), fake_app("Gamma")],
        );

        let controller = Controller::new(services, Config::default());
        controller.send(LauncherEvent::Shown);
        wait_until(&controller, |s| s.results.len() == 3).await;

        for _ in 0..10 {
            controller.send(LauncherEvent::KeyPressed {
                key: Key::Down,
                alt: false,
            });
        }
        let state = wait_until(&controller, |s| s.selected_index == 2).await;
        assert_eq!(state.selected_index, 2);

        for _ in 0..10 {
            controller.send(LauncherEvent::KeyPressed {
                key: Key::Char('k'),
                alt: false,
            });
        }
        wait_until(&controller, |s| s.selected_index == 0).await;
    }

    #[tokio::test]
    async fn test_escape_hides_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let services = fake_services(&dir, vec![fake_app("Alpha")]);

        let controller = Controller::new(services, Config::default());
        controller.send(LauncherEvent::Shown);
        controller.send(LauncherEvent::QueryChanged("alp".into()));
        wait_until(&controller, |s| s.query == "alp").await;

        controller.send(LauncherEvent::KeyPressed {
            key: Key::Escape,
            alt: false,
        });

        let state = wait_until(&controller, |s| !s.visible).await;
        assert!(state.query.is_empty());
    }

    #[tokio::test]
    async fn test_click_away_hides_but_inside_does_not() {
        let dir = tempfile::tempdir().unwrap();
        let services = fake_services(&dir, vec![fake_app("Alpha")]);
        let content = Bounds {
            x: 100.0,
            y: 100.0,
            width: 450.0,
            height: 350.0,
        };

        let controller = Controller::new(services, Config::default());
        controller.send(LauncherEvent::Shown);
        wait_until(&controller, |s| s.visible).await;

        controller.send(LauncherEvent::PointerPressed {
            x: 200.0,
            y: 200.0,
            content,
        });
        // An inside press keeps the launcher up; give the worker a beat
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(controller.state().visible);

        controller.send(LauncherEvent::PointerPressed {
            x: 10.0,
            y: 10.0,
            content,
        });
        wait_until(&controller, |s| !s.visible).await;
    }
}
