//! System services backing the launcher.
//!
//! This crate covers everything the launcher needs from the host system:
//! the installed-application index, the `locate` file-search backend,
//! freedesktop thumbnail generation, default-handler file opening, the
//! recently-launched cache, and a config file watcher.

pub mod applications;
pub mod filetype;
pub mod locate;
pub mod opener;
pub mod recent;
pub mod thumbnails;
pub mod watcher;

mod status;

pub use applications::{Application, ApplicationsService};
pub use filetype::FileClass;
pub use recent::RecentApps;
pub use status::ServiceStatus;
pub use thumbnails::{Preview, PreviewHandle, ThumbnailService};
pub use watcher::watch_file;

/// Shared services container for the launcher.
///
/// Initialized once at startup, then shared with every component that
/// needs system access.
#[derive(Clone)]
pub struct Services {
    pub applications: ApplicationsService,
    pub recent: RecentApps,
    pub thumbnails: ThumbnailService,
}

impl Services {
    /// Create and initialize all services.
    ///
    /// The application scan runs synchronously; the thumbnail service
    /// degrades rather than fails when the session bus is unreachable.
    pub async fn new() -> Self {
        let applications = ApplicationsService::new();
        let recent = RecentApps::new();
        let thumbnails = ThumbnailService::new().await;

        Self {
            applications,
            recent,
            thumbnails,
        }
    }
}
