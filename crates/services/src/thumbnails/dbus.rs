//! D-Bus proxy for the freedesktop thumbnail management service.
//!
//! Based on the org.freedesktop.thumbnails.Thumbnailer1 specification as
//! implemented by Tumbler.

use zbus::proxy;

/// Thumbnailer D-Bus proxy.
///
/// Requests are fire-and-forget: completion is observed by watching the
/// thumbnail cache directory, not by listening for the `Ready` signal.
#[proxy(
    interface = "org.freedesktop.thumbnails.Thumbnailer1",
    default_service = "org.freedesktop.thumbnails.Thumbnailer1",
    default_path = "/org/freedesktop/thumbnails/Thumbnailer1",
    assume_defaults = false
)]
pub trait Thumbnailer {
    /// Queue thumbnail generation for the given URIs.
    ///
    /// Returns a handle usable with `Dequeue`.
    #[zbus(no_autostart)]
    fn queue(
        &self,
        uris: &[&str],
        mime_types: &[&str],
        flavor: &str,
        scheduler: &str,
        handle_to_unqueue: u32,
    ) -> zbus::Result<u32>;
}
