//! Launcher configuration.
//!
//! Persisted as TOML under the XDG config directory; a missing file is
//! created with defaults on first load. Unknown or absent fields fall
//! back field-by-field via `#[serde(default)]`.

mod persistence;

use serde::{Deserialize, Serialize};

pub use persistence::config_path;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub search: SearchConfig,
    /// Watch config.toml for changes and hot-reload.
    pub watch_config: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            search: SearchConfig::default(),
            watch_config: true,
        }
    }
}

impl Config {
    /// Load from disk, falling back to defaults on any failure.
    pub fn load_or_default() -> Self {
        match persistence::load() {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("Failed to load config, using defaults: {}", err);
                Config::default()
            }
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        persistence::save(self)
    }
}

/// Window sizing bounds and the row geometry the scroll contract
/// depends on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub min_width: f32,
    pub max_width: f32,
    /// Width contributed per character of the longest label.
    pub char_width: f32,
    /// Fixed width added for icons and padding.
    pub width_padding: f32,
    pub min_height: f32,
    pub max_height: f32,
    pub row_height: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            min_width: 450.0,
            max_width: 800.0,
            char_width: 12.0,
            width_padding: 100.0,
            min_height: 200.0,
            max_height: 400.0,
            row_height: 48.0,
        }
    }
}

/// Search pipeline tuning.
///
/// The two app caps are a single documented policy: `app_results_browse`
/// applies to the empty-query browse list, `app_results_query` to ranked
/// matches sharing the view with file results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub app_results_browse: usize,
    pub app_results_query: usize,
    /// File results fetched per page.
    pub page_size: usize,
    /// Backstop on a single backend invocation.
    pub max_locate_results: usize,
    /// Scrolled fraction past which the next page loads.
    pub load_more_threshold: f32,
    /// Minimum file rows before pagination engages.
    pub load_more_min_results: usize,
    /// Rows shown for an empty query when the recency cache is empty.
    pub recent_apps_shown: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            app_results_browse: 20,
            app_results_query: 6,
            page_size: 50,
            max_locate_results: services::locate::MAX_RESULTS,
            load_more_threshold: 0.8,
            load_more_min_results: 40,
            recent_apps_shown: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_roundtrip_through_toml() {
        let config = Config::default();
        let encoded = toml::to_string_pretty(&config).unwrap();
        let decoded: Config = toml::from_str(&encoded).unwrap();

        assert_eq!(decoded.search.page_size, config.search.page_size);
        assert_eq!(decoded.window.min_width, config.window.min_width);
        assert_eq!(decoded.watch_config, config.watch_config);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let decoded: Config = toml::from_str("[search]\napp_results_query = 10\n").unwrap();
        assert_eq!(decoded.search.app_results_query, 10);
        assert_eq!(decoded.search.page_size, 50);
        assert_eq!(decoded.window.max_width, 800.0);
    }
}
