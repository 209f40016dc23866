//! beacon - launcher core for a Linux desktop shell.
//!
//! The embedding shell owns windows, widgets and rendering; this crate
//! owns everything behind them: configuration, the query pipeline, and
//! the result-list state machine. Frontends feed [`state::LauncherEvent`]s
//! into a [`controller::Controller`] and re-render from the state
//! snapshots it publishes.

pub mod config;
pub mod controller;
pub mod search;
pub mod state;

pub use config::Config;
pub use controller::Controller;
pub use state::{Bounds, Key, LauncherEvent, LauncherState, Mode, SearchResult};
