//! Development frontend for the launcher core.
//!
//! Wires the services and the controller together and drives them from
//! a line-oriented prompt, standing in for the shell UI.

use beacon::config::{self, Config};
use beacon::{Controller, Key, LauncherEvent};
use futures_signals::signal::SignalExt;
use futures_util::StreamExt;
use services::Services;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with RUST_LOG env var support
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::load_or_default();
    let services = Services::new().await;
    info!(
        "Thumbnail service: {}",
        services.thumbnails.status().label()
    );

    let controller = Controller::new(services, config.clone());

    if config.watch_config {
        start_config_watch(controller.clone());
    }

    // Log visibility transitions so detached frontends can be debugged
    // against the same state stream they render from.
    let signal = controller.subscribe();
    tokio::spawn(async move {
        let mut visible = false;
        let mut stream = signal.to_stream();
        while let Some(state) = stream.next().await {
            if state.visible != visible {
                visible = state.visible;
                info!("Launcher {}", if visible { "shown" } else { "hidden" });
            }
        }
    });

    controller.send(LauncherEvent::Shown);
    run_prompt(controller, config).await
}

/// Reload the config on file changes and push it into the controller.
fn start_config_watch(controller: Controller) {
    let path = match config::config_path() {
        Ok(path) => path,
        Err(err) => {
            warn!("Config hot-reload disabled: {}", err);
            return;
        }
    };

    let mut ticks = services::watch_file(path);
    tokio::spawn(async move {
        while ticks.recv().await.is_some() {
            info!("Config file changed, reloading");
            controller.send(LauncherEvent::ConfigReloaded(Config::load_or_default()));
        }
    });
}

/// Prompt loop. A plain line is a query; `+`/`-` move the selection,
/// `!` launches the selected row, `:<n>` launches row n, `:more` pulls
/// the next file page, `:q` hides, an empty line returns to the recents
/// view, EOF exits.
async fn run_prompt(controller: Controller, config: Config) -> anyhow::Result<()> {
    println!("beacon - type to search; +/- select, ! launch, :<n> launch row n, ctrl-d quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "+" => {
                controller.send(LauncherEvent::KeyPressed {
                    key: Key::Down,
                    alt: false,
                });
            }
            "-" => {
                controller.send(LauncherEvent::KeyPressed {
                    key: Key::Up,
                    alt: false,
                });
            }
            "!" => {
                controller.send(LauncherEvent::KeyPressed {
                    key: Key::Enter,
                    alt: false,
                });
            }
            ":q" => {
                controller.send(LauncherEvent::KeyPressed {
                    key: Key::Escape,
                    alt: false,
                });
            }
            ":more" => {
                // Simulate a scroll to the bottom of the list
                let state = controller.state();
                let content = state.results.len() as f32 * config.window.row_height;
                controller.send(LauncherEvent::Scrolled {
                    offset: content,
                    viewport_height: config.window.max_height,
                });
                tokio::time::sleep(std::time::Duration::from_millis(700)).await;
            }
            row if row.starts_with(':') => {
                launch_row(&controller, &row[1..]);
                continue;
            }
            query => {
                controller.send(LauncherEvent::QueryChanged(query.to_string()));
                // Give the app ranking and the first file page time to
                // stream in.
                tokio::time::sleep(std::time::Duration::from_millis(700)).await;
            }
        }

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        print_snapshot(&controller);
    }

    Ok(())
}

fn launch_row(controller: &Controller, row: &str) {
    match row.trim().parse::<u32>() {
        Ok(n @ 1..=9) => {
            let digit = char::from_digit(n, 10).unwrap_or('1');
            controller.send(LauncherEvent::KeyPressed {
                key: Key::Char(digit),
                alt: true,
            });
        }
        _ => println!("rows 1-9 can be launched from the prompt"),
    }
}

fn print_snapshot(controller: &Controller) {
    let state = controller.state();
    println!(
        "-- {:?}: {} result(s), window {}x{}",
        state.mode(),
        state.results.len(),
        state.window_width,
        state.window_height
    );
    for (i, result) in state.results.iter().enumerate().take(15) {
        let marker = if i == state.selected_index { ">" } else { " " };
        // Show whether the icon resolves against the themes on this
        // machine; frontends render from the same lookup.
        let resolved = if controller.icon_path(result).is_some() {
            ""
        } else {
            " (unthemed)"
        };
        println!(
            "{} {:>2}. {} [{}{}]",
            marker,
            i + 1,
            result.display_label(),
            result.icon(),
            resolved
        );
    }
    if state.results.len() > 15 {
        println!("   ... {} more", state.results.len() - 15);
    }

    if let Some(selected) = state.results.get(state.selected_index) {
        if let Some(handle) = controller.preview(selected) {
            let preview = match handle.get_cloned() {
                services::Preview::Loading(icon) => format!("resolving ({icon})"),
                services::Preview::Image(img) => {
                    let (w, h) = img.dimensions();
                    format!("thumbnail {w}x{h}")
                }
                services::Preview::Icon(icon) => icon.to_string(),
            };
            println!("   preview: {preview}");
        }
    }

    if state.has_more_files {
        println!("   (more file results available, :more to load)");
    }
}
