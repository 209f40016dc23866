//! Launcher state and result model.
//!
//! Results are a tagged union over applications and files; the state is
//! a plain snapshot published through a `Mutable`, so frontends observe
//! whole-state changes instead of tracking fine-grained dependencies.

use std::path::{Path, PathBuf};

use services::Application;

use crate::config::Config;

/// One row in the result list.
#[derive(Debug, Clone)]
pub enum SearchResult {
    /// An installed application.
    App { app: Application },
    /// A file found by the search backend.
    File {
        path: PathBuf,
        /// Basename.
        name: String,
        /// Label with the abbreviated directory.
        display_name: String,
        /// Row icon, freedesktop naming.
        icon: &'static str,
    },
}

impl SearchResult {
    /// Label shown in the list row.
    pub fn display_label(&self) -> &str {
        match self {
            SearchResult::App { app } => &app.name,
            SearchResult::File { display_name, .. } => display_name,
        }
    }

    /// Row icon name.
    pub fn icon(&self) -> &str {
        match self {
            SearchResult::App { app } => app.icon_name(),
            SearchResult::File { icon, .. } => icon,
        }
    }

    /// Unique key for file rows; apps have none.
    pub fn path(&self) -> Option<&Path> {
        match self {
            SearchResult::App { .. } => None,
            SearchResult::File { path, .. } => Some(path),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, SearchResult::File { .. })
    }
}

/// Launcher interaction mode, derived from the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No query: recent applications are shown.
    Empty,
    /// Combined search: ranked apps first, files streaming in after.
    AppSearch,
    /// Path-prefixed query: files only.
    FileSearch,
}

/// Queries anchored at `/` or `~` address the filesystem directly.
pub fn mode_for_query(query: &str) -> Mode {
    if query.is_empty() {
        Mode::Empty
    } else if query.starts_with('/') || query.starts_with('~') {
        Mode::FileSearch
    } else {
        Mode::AppSearch
    }
}

/// Complete launcher state snapshot.
#[derive(Debug, Clone)]
pub struct LauncherState {
    pub query: String,
    pub results: Vec<SearchResult>,
    /// Index of the keyboard-selected row, clamped to the list.
    pub selected_index: usize,
    /// First row currently scrolled into view.
    pub visible_start_index: usize,
    /// Offset of the next file page to request.
    pub file_search_offset: usize,
    pub has_more_files: bool,
    pub is_loading_more: bool,
    pub visible: bool,
    pub window_width: f32,
    pub window_height: f32,
}

impl LauncherState {
    pub fn new(config: &Config) -> Self {
        Self {
            query: String::new(),
            results: Vec::new(),
            selected_index: 0,
            visible_start_index: 0,
            file_search_offset: 0,
            has_more_files: false,
            is_loading_more: false,
            visible: false,
            window_width: config.window.min_width,
            window_height: config.window.min_height,
        }
    }

    pub fn mode(&self) -> Mode {
        mode_for_query(&self.query)
    }

    /// Number of file rows currently in the list.
    pub fn file_result_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_file()).count()
    }
}

/// Rectangle in window coordinates, used for the click-away check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Keys the controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Enter,
    Up,
    Down,
    /// Printable input forwarded for vi-style navigation and the
    /// modifier+digit shortcuts.
    Char(char),
}

/// Events fed to the controller by the embedding shell.
#[derive(Debug, Clone)]
pub enum LauncherEvent {
    /// The search entry text changed.
    QueryChanged(String),
    KeyPressed { key: Key, alt: bool },
    /// The result list scrolled.
    Scrolled { offset: f32, viewport_height: f32 },
    /// A pointer press at window coordinates; `content` is the content
    /// area currently on screen.
    PointerPressed { x: f32, y: f32, content: Bounds },
    Shown,
    Hidden,
    ConfigReloaded(Config),
}
