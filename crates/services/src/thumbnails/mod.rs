//! Thumbnail generation for file search results.
//!
//! Previews resolve in two hops: an immediate category placeholder, then
//! an asynchronous substitution once a thumbnail is available. Thumbnails
//! follow the freedesktop cache convention (`thumbnails/large/<md5 of the
//! file URI>.png`); misses are queued at the session-bus thumbnailer and
//! the cache path is polled on a bounded schedule. Every failure mode
//! degrades to a category icon without surfacing to the caller.

mod dbus;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_signals::signal::Mutable;
use image::RgbaImage;
use md5::{Digest, Md5};
use tracing::{debug, warn};
use zbus::Connection;

use crate::ServiceStatus;
use crate::filetype::FileClass;
use dbus::ThumbnailerProxy;

/// Bounding box thumbnails are scaled into, aspect-preserving.
pub const THUMBNAIL_SIZE: u32 = 400;

/// Poll schedule for a queued thumbnail: 50 * 100ms, about five seconds.
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const POLL_ATTEMPTS: u32 = 50;

/// Current visual for a file row.
#[derive(Debug, Clone)]
pub enum Preview {
    /// Interim placeholder while the thumbnail resolves.
    Loading(&'static str),
    /// Decoded thumbnail, scaled into [`THUMBNAIL_SIZE`].
    Image(Arc<RgbaImage>),
    /// Terminal fallback icon.
    Icon(&'static str),
}

impl Preview {
    /// Icon name to render when no bitmap is available.
    pub fn icon_name(&self) -> Option<&'static str> {
        match self {
            Preview::Loading(icon) | Preview::Icon(icon) => Some(icon),
            Preview::Image(_) => None,
        }
    }
}

/// Asynchronously updated preview slot handed to the row that asked.
pub type PreviewHandle = Mutable<Preview>;

/// Session-wide thumbnail service.
#[derive(Debug, Clone)]
pub struct ThumbnailService {
    conn: Option<Connection>,
    cache_dir: PathBuf,
    poll_interval: Duration,
    poll_attempts: u32,
}

impl ThumbnailService {
    /// Connect to the session bus and use the standard cache location.
    ///
    /// An unreachable bus is not an error: the service starts degraded
    /// and every request resolves to a category icon.
    pub async fn new() -> Self {
        let conn = match Connection::session().await {
            Ok(conn) => Some(conn),
            Err(err) => {
                warn!("Session bus unavailable, thumbnails degraded: {}", err);
                None
            }
        };

        Self {
            conn,
            cache_dir: crate::recent::user_cache_dir().join("thumbnails").join("large"),
            poll_interval: POLL_INTERVAL,
            poll_attempts: POLL_ATTEMPTS,
        }
    }

    /// Service with an explicit cache directory and poll schedule.
    pub fn with_cache_dir(cache_dir: PathBuf) -> Self {
        Self {
            conn: None,
            cache_dir,
            poll_interval: POLL_INTERVAL,
            poll_attempts: POLL_ATTEMPTS,
        }
    }

    /// Override the poll schedule.
    pub fn poll_schedule(mut self, interval: Duration, attempts: u32) -> Self {
        self.poll_interval = interval;
        self.poll_attempts = attempts;
        self
    }

    /// Health of the thumbnailing backend.
    pub fn status(&self) -> ServiceStatus {
        if self.conn.is_some() {
            ServiceStatus::Active
        } else {
            ServiceStatus::Unavailable
        }
    }

    /// Request a preview for `path`.
    ///
    /// Returns immediately with a placeholder handle; the handle is
    /// updated in the background. Files outside the thumbnail categories
    /// resolve to their row icon at once.
    pub fn request(&self, path: &Path, class: FileClass) -> PreviewHandle {
        if !class.needs_thumbnail() {
            return Mutable::new(Preview::Icon(class.icon));
        }

        let handle = Mutable::new(Preview::Loading(placeholder_icon(class)));
        self.spawn_resolve(path.to_path_buf(), class, handle.clone());
        handle
    }

    fn spawn_resolve(&self, path: PathBuf, class: FileClass, handle: PreviewHandle) {
        let conn = self.conn.clone();
        let cache_dir = self.cache_dir.clone();
        let interval = self.poll_interval;
        let attempts = self.poll_attempts;

        tokio::spawn(async move {
            // Defer slightly so a burst of rows doesn't hash in lockstep
            // with result insertion.
            tokio::time::sleep(Duration::from_millis(10)).await;

            let thumb = thumbnail_path(&cache_dir, &path);

            // Cache hit: no service round-trip at all.
            if thumb.exists() {
                if let Some(img) = decode_scaled(&thumb) {
                    handle.set(Preview::Image(img));
                    return;
                }
                warn!("Discarding undecodable cached thumbnail: {}", thumb.display());
            }

            if let Err(err) = std::fs::create_dir_all(&cache_dir) {
                warn!("Cannot create thumbnail cache dir: {}", err);
                handle.set(Preview::Icon(fallback_icon(class)));
                return;
            }

            if !queue_request(conn.as_ref(), &path, class).await {
                handle.set(Preview::Icon(fallback_icon(class)));
                return;
            }

            poll_and_publish(&thumb, class, &handle, interval, attempts).await;
        });
    }
}

/// Ask the thumbnailer to generate a `large` flavor thumbnail.
///
/// Returns false when the bus is unreachable or the call fails.
async fn queue_request(conn: Option<&Connection>, path: &Path, class: FileClass) -> bool {
    let Some(conn) = conn else {
        return false;
    };

    let uri = file_uri(path);
    let mime = coarse_mime(class);

    let result = async {
        let proxy = ThumbnailerProxy::new(conn).await?;
        proxy.queue(&[&uri], &[mime], "large", "default", 0).await
    }
    .await;

    match result {
        Ok(queue_handle) => {
            debug!("Queued thumbnail for {} (handle {})", uri, queue_handle);
            true
        }
        Err(err) => {
            warn!("Thumbnailer request failed for {}: {}", uri, err);
            false
        }
    }
}

/// Poll the cache path until the thumbnail appears or the attempt budget
/// runs out, then publish the outcome. Polling stops at the first
/// terminal state.
async fn poll_and_publish(
    thumb: &Path,
    class: FileClass,
    handle: &PreviewHandle,
    interval: Duration,
    attempts: u32,
) {
    for _ in 0..attempts {
        tokio::time::sleep(interval).await;

        if thumb.exists() {
            match decode_scaled(thumb) {
                Some(img) => handle.set(Preview::Image(img)),
                None => handle.set(Preview::Icon(fallback_icon(class))),
            }
            return;
        }
    }

    handle.set(Preview::Icon(fallback_icon(class)));
}

/// Cached-thumbnail location for a file, per the freedesktop convention:
/// the MD5 of the `file://` URI under the `large` flavor directory.
pub fn thumbnail_path(cache_dir: &Path, path: &Path) -> PathBuf {
    let mut hasher = Md5::new();
    hasher.update(file_uri(path).as_bytes());
    cache_dir.join(format!("{}.png", hex_encode(hasher.finalize())))
}

fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    bytes
        .as_ref()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

fn file_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Decode a thumbnail scaled into the bounding box, aspect preserved.
fn decode_scaled(path: &Path) -> Option<Arc<RgbaImage>> {
    match image::open(path) {
        Ok(img) => Some(Arc::new(
            img.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE).to_rgba8(),
        )),
        Err(err) => {
            warn!("Failed to decode thumbnail {}: {}", path.display(), err);
            None
        }
    }
}

/// Placeholder shown while a thumbnail resolves.
fn placeholder_icon(class: FileClass) -> &'static str {
    if class.is_image {
        "image-loading"
    } else {
        "video-x-generic"
    }
}

/// Terminal fallback per coarse category.
fn fallback_icon(class: FileClass) -> &'static str {
    if class.is_image {
        "image-x-generic"
    } else if class.is_video {
        "video-x-generic"
    } else {
        "application-pdf"
    }
}

/// Coarse MIME hint passed to the thumbnailer; the service only needs the
/// media class, not the exact subtype.
fn coarse_mime(class: FileClass) -> &'static str {
    if class.is_image { "image/jpeg" } else { "video/mp4" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filetype::classify_with;

    #[test]
    fn test_thumbnail_path_follows_freedesktop_convention() {
        // Worked example from the freedesktop thumbnail specification.
        let cache = Path::new("/cache/thumbnails/large");
        let thumb = thumbnail_path(cache, Path::new("/home/jens/photos/me.png"));
        assert_eq!(
            thumb,
            cache.join("c6ee772d9e49320e97ec29a7eb5b1697.png")
        );
    }

    #[test]
    fn test_thumbnail_path_distinct_per_file() {
        let cache = Path::new("/c");
        assert_ne!(
            thumbnail_path(cache, Path::new("/a.png")),
            thumbnail_path(cache, Path::new("/b.png"))
        );
    }

    #[tokio::test]
    async fn test_cached_thumbnail_resolves_without_service() {
        let dir = tempfile::tempdir().unwrap();
        let source = Path::new("/pictures/holiday.jpg");

        // Pre-populate the cache; the service has no bus connection, so
        // anything beyond a cache hit would fall back to an icon.
        let thumb = thumbnail_path(dir.path(), source);
        RgbaImage::new(800, 400).save(&thumb).unwrap();

        let service = ThumbnailService::with_cache_dir(dir.path().to_path_buf());
        let class = classify_with(source, false);
        let handle = service.request(source, class);

        assert!(matches!(handle.get_cloned(), Preview::Loading(_)));

        let image = wait_for_terminal(&handle).await;
        match image {
            // Scaled into the bounding box, 2:1 aspect preserved
            Preview::Image(img) => assert_eq!(img.dimensions(), (400, 200)),
            other => panic!("expected decoded image, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unavailable_service_falls_back_to_category_icon() {
        let dir = tempfile::tempdir().unwrap();
        let source = Path::new("/videos/talk.mkv");

        let service = ThumbnailService::with_cache_dir(dir.path().to_path_buf());
        let handle = service.request(source, classify_with(source, false));

        match wait_for_terminal(&handle).await {
            Preview::Icon(icon) => assert_eq!(icon, "video-x-generic"),
            other => panic!("expected fallback icon, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_poll_budget_exhaustion_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let thumb = dir.path().join("never-appears.png");
        let class = classify_with(Path::new("/pictures/missing.png"), false);
        let handle = Mutable::new(Preview::Loading("image-loading"));

        poll_and_publish(&thumb, class, &handle, Duration::from_millis(1), 3).await;

        match handle.get_cloned() {
            Preview::Icon(icon) => assert_eq!(icon, "image-x-generic"),
            other => panic!("expected fallback icon, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_poll_picks_up_late_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let thumb = dir.path().join("late.png");
        RgbaImage::new(2, 2).save(&thumb).unwrap();

        let class = classify_with(Path::new("/pictures/late.jpg"), false);
        let handle = Mutable::new(Preview::Loading("image-loading"));

        poll_and_publish(&thumb, class, &handle, Duration::from_millis(1), 3).await;
        assert!(matches!(handle.get_cloned(), Preview::Image(_)));
    }

    #[tokio::test]
    async fn test_non_thumbnail_file_resolves_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let service = ThumbnailService::with_cache_dir(dir.path().to_path_buf());
        let source = Path::new("/notes/todo.txt");

        let handle = service.request(source, classify_with(source, false));
        match handle.get_cloned() {
            Preview::Icon(icon) => assert_eq!(icon, "text-x-generic"),
            other => panic!("expected row icon, got {other:?}"),
        }
    }

    async fn wait_for_terminal(handle: &PreviewHandle) -> Preview {
        for _ in 0..200 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            match handle.get_cloned() {
                Preview::Loading(_) => continue,
                terminal => return terminal,
            }
        }
        panic!("preview never resolved");
    }
}
