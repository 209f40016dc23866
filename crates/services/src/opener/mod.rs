//! Opening files with their default handler.
//!
//! Resolves the handler through `file --mime-type` and `xdg-mime`, then
//! dispatches either into a terminal emulator (for terminal editors) or
//! through `xdg-open`. All children are spawned detached and never
//! reaped; every probe failure falls back one strategy.

use std::path::Path;
use std::process::Command;
use std::thread;

use tracing::{debug, error, warn};

/// Handlers that only make sense inside a terminal.
const TERMINAL_EDITORS: &[&str] = &[
    "nvim", "neovim", "vim", "emacs", "nano", "micro", "helix", "kakoune",
];

/// Terminal emulators to probe, preferred first.
const TERMINALS: &[&str] = &["kitty", "alacritty", "gnome-terminal", "konsole", "xterm"];

/// Extensions that hint at terminal-editor content when MIME is vague.
const TEXTUAL_EXTENSIONS: &[&str] = &[
    ".md", ".txt", ".log", ".conf", ".cfg", ".ini", ".sh", ".py", ".js", ".ts", ".css", ".html",
];

/// Open `path` with its default handler, detached from this process.
///
/// Best-effort: nothing is awaited or reported back. All failures are
/// logged and degrade toward a plain `xdg-open`.
pub fn open_detached(path: &Path) {
    let path = path.to_path_buf();
    thread::spawn(move || dispatch(&path));
}

fn dispatch(path: &Path) {
    match resolve_handler(path) {
        Ok((mime, handler)) => {
            debug!(
                "Opening {}: mime {}, handler {}",
                path.display(),
                mime,
                handler
            );
            if is_terminal_editor(&handler, &mime, path) {
                open_in_terminal(path);
                return;
            }
        }
        Err(err) => warn!("Handler resolution failed for {}: {:#}", path.display(), err),
    }

    open_with_xdg(path);
}

/// MIME type and default desktop handler for a path.
fn resolve_handler(path: &Path) -> anyhow::Result<(String, String)> {
    let mime = probe_output("file", &["-b", "--mime-type", &path.to_string_lossy()])?;
    let handler = probe_output("xdg-mime", &["query", "default", &mime])?;
    Ok((mime, handler))
}

/// Run a short probe command and return its trimmed stdout.
fn probe_output(program: &str, args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new(program).args(args).output()?;
    if !output.status.success() {
        anyhow::bail!("{} exited with {}", program, output.status);
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Whether the resolved handler should run inside a terminal.
///
/// Either the handler names a known terminal editor, or the content is
/// text-like and the handler carries an nvim hint.
pub fn is_terminal_editor(handler: &str, mime: &str, path: &Path) -> bool {
    let handler_lower = handler.to_lowercase();
    let is_editor = TERMINAL_EDITORS
        .iter()
        .any(|editor| handler_lower.contains(editor));

    let path_lower = path.to_string_lossy().to_lowercase();
    let is_textual = mime.starts_with("text/")
        || mime == "application/json"
        || mime == "application/xml"
        || TEXTUAL_EXTENSIONS.iter().any(|ext| path_lower.ends_with(ext));

    is_editor || (is_textual && handler.contains("nvim"))
}

/// First available terminal emulator from the preference list.
///
/// Falls back to `xterm` when nothing probes successfully.
fn detect_terminal() -> &'static str {
    for terminal in TERMINALS {
        let found = Command::new("which")
            .arg(terminal)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        if found {
            return terminal;
        }
    }
    "xterm"
}

/// Terminal invocation for handing a command line to an emulator.
fn terminal_command(terminal: &str, path: &Path) -> (String, Vec<String>) {
    let path = path.to_string_lossy().into_owned();
    match terminal {
        // kitty takes the command directly
        "kitty" => ("kitty".into(), vec!["xdg-open".into(), path]),
        "gnome-terminal" => (
            "gnome-terminal".into(),
            vec!["--".into(), "xdg-open".into(), path],
        ),
        other => (other.into(), vec!["-e".into(), "xdg-open".into(), path]),
    }
}

fn open_in_terminal(path: &Path) {
    let terminal = detect_terminal();
    let (program, args) = terminal_command(terminal, path);
    debug!("Opening {} in {}", path.display(), terminal);

    match Command::new(&program).args(&args).spawn() {
        Ok(_) => {}
        Err(err) => {
            warn!("Terminal launch via {} failed: {}", program, err);
            open_with_xdg(path);
        }
    }
}

fn open_with_xdg(path: &Path) {
    if let Err(err) = Command::new("xdg-open").arg(path).spawn() {
        error!("xdg-open failed for {}: {}", path.display(), err);
    }
}
