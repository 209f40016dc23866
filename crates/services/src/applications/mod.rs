//! Installed-application index.
//!
//! Scans XDG desktop entries and serves the launcher's two query shapes:
//! plain enumeration for empty input and ranked fuzzy matches for typed
//! input. Launching strips desktop-entry field codes and detaches.

pub mod icons;

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::thread;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use itertools::Itertools;
use tracing::{debug, error};

/// Desktop-entry field codes that must not reach the shell.
const FIELD_CODES: &[&str] = &[
    "%f", "%F", "%u", "%U", "%d", "%D", "%n", "%N", "%i", "%c", "%k",
];

/// One installed desktop application.
#[derive(Debug, Clone)]
pub struct Application {
    /// Application name.
    pub name: String,
    /// Exec command.
    pub exec: String,
    /// Icon name or path.
    pub icon: Option<String>,
    /// Description or comment.
    pub description: Option<String>,
    /// Search keywords from the desktop entry.
    pub keywords: Vec<String>,
    /// Path to the desktop file.
    pub desktop_file: PathBuf,
}

impl Application {
    /// Launch the application, detached from this process.
    pub fn launch(&self) {
        let exec = strip_field_codes(&self.exec);
        let name = self.name.clone();

        thread::spawn(move || {
            debug!("Launching application: {} ({})", name, exec.trim());
            match Command::new("sh").args(["-c", &exec]).spawn() {
                Ok(_) => debug!("Application launched: {}", name),
                Err(e) => error!("Failed to launch {}: {}", name, e),
            }
        });
    }

    /// Icon name usable for launcher rows, falling back to the generic
    /// executable icon.
    pub fn icon_name(&self) -> &str {
        self.icon.as_deref().unwrap_or("application-x-executable")
    }
}

fn strip_field_codes(exec: &str) -> String {
    let mut exec = exec.to_string();
    for code in FIELD_CODES {
        exec = exec.replace(code, "");
    }
    exec
}

/// Index over installed applications.
#[derive(Debug, Clone)]
pub struct ApplicationsService {
    apps: Vec<Application>,
}

impl ApplicationsService {
    /// Build the index by scanning for desktop entries.
    pub fn new() -> Self {
        let apps = scan_applications();
        debug!("Found {} applications", apps.len());
        Self { apps }
    }

    /// Build the index from a fixed set of applications.
    ///
    /// For embedding hosts that enumerate apps themselves, and for tests.
    pub fn with_apps(apps: Vec<Application>) -> Self {
        Self { apps }
    }

    /// All applications, in enumeration (name-sorted) order.
    pub fn all(&self) -> &[Application] {
        &self.apps
    }

    /// Rank applications against `query` by fuzzy match over name,
    /// exec and keywords. Name matches weigh double. Best first.
    pub fn fuzzy_query(&self, query: &str) -> Vec<&Application> {
        let matcher = SkimMatcherV2::default();

        self.apps
            .iter()
            .filter_map(|app| {
                let name = matcher.fuzzy_match(&app.name, query).map(|s| s * 2);
                let exec = matcher.fuzzy_match(&app.exec, query);
                let keyword = app
                    .keywords
                    .iter()
                    .filter_map(|k| matcher.fuzzy_match(k, query))
                    .max();

                [name, exec, keyword]
                    .into_iter()
                    .flatten()
                    .max()
                    .map(|score| (score, app))
            })
            .sorted_by(|a, b| b.0.cmp(&a.0))
            .map(|(_, app)| app)
            .collect()
    }

    /// Find an application by name (exact match, case-insensitive).
    pub fn find_by_name(&self, name: &str) -> Option<&Application> {
        let name_lower = name.to_lowercase();
        self.apps
            .iter()
            .find(|app| app.name.to_lowercase() == name_lower)
    }

    /// Rescan for applications.
    pub fn refresh(&mut self) {
        self.apps = scan_applications();
        debug!("Refreshed applications, found {}", self.apps.len());
    }
}

impl Default for ApplicationsService {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan for desktop applications in standard XDG directories.
fn scan_applications() -> Vec<Application> {
    let mut seen = HashMap::new();

    let dirs = get_application_dirs();

    for dir in dirs {
        if let Ok(entries) = fs::read_dir(&dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().map(|e| e == "desktop").unwrap_or(false) {
                    if let Ok(content) = fs::read_to_string(&path) {
                        if let Some(app) = parse_desktop_entry(&content, &path) {
                            // Name is the dedup key; user entries override system
                            seen.insert(app.name.clone(), app);
                        }
                    }
                }
            }
        }
    }

    let mut apps: Vec<_> = seen.into_values().collect();
    apps.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    apps
}

/// Get XDG application directories in priority order.
fn get_application_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    // User-specific directory (higher priority)
    if let Some(data_home) = std::env::var_os("XDG_DATA_HOME") {
        dirs.push(PathBuf::from(data_home).join("applications"));
    } else if let Some(home) = std::env::var_os("HOME") {
        dirs.push(PathBuf::from(home).join(".local/share/applications"));
    }

    // System directories
    if let Some(data_dirs) = std::env::var_os("XDG_DATA_DIRS") {
        for dir in std::env::split_paths(&data_dirs) {
            dirs.push(dir.join("applications"));
        }
    } else {
        dirs.push(PathBuf::from("/usr/local/share/applications"));
        dirs.push(PathBuf::from("/usr/share/applications"));
    }

    dirs
}

/// Parse the `[Desktop Entry]` section of a desktop file.
fn parse_desktop_entry(content: &str, path: &PathBuf) -> Option<Application> {
    let mut name = None;
    let mut exec = None;
    let mut icon = None;
    let mut description = None;
    let mut keywords = Vec::new();
    let mut no_display = false;
    let mut hidden = false;
    let mut in_desktop_entry = false;

    for line in content.lines() {
        let line = line.trim();

        if line.starts_with('[') {
            in_desktop_entry = line == "[Desktop Entry]";
            continue;
        }

        if !in_desktop_entry {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim();

            match key {
                "Name" if name.is_none() => name = Some(value.to_string()),
                "Exec" => exec = Some(value.to_string()),
                "Icon" => icon = Some(value.to_string()),
                "Comment" if description.is_none() => description = Some(value.to_string()),
                "GenericName" if description.is_none() => description = Some(value.to_string()),
                "Keywords" => {
                    keywords = value
                        .split(';')
                        .filter(|k| !k.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                "NoDisplay" => no_display = value == "true",
                "Hidden" => hidden = value == "true",
                _ => {}
            }
        }
    }

    if no_display || hidden {
        return None;
    }

    Some(Application {
        name: name?,
        exec: exec?,
        icon,
        description,
        keywords,
        desktop_file: path.clone(),
    })
}
