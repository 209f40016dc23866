//! File classification for search results.
//!
//! Maps paths to icon names and coarse media categories by extension.
//! Everything here is pure except the directory probe in [`classify`],
//! which [`classify_with`] makes injectable.

use std::path::Path;

/// Extensions recognised as images for preview purposes.
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "svg", "tiff", "tif", "ico", "xpm",
];

/// Extensions recognised as videos for preview purposes.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v", "3gp", "ogv", "mpg", "mpeg",
];

/// Classification of a single path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileClass {
    /// Icon name for list rows, freedesktop naming.
    pub icon: &'static str,
    pub is_image: bool,
    pub is_video: bool,
    pub is_pdf: bool,
    pub is_directory: bool,
}

impl FileClass {
    /// Whether a thumbnail should be generated for this file.
    pub fn needs_thumbnail(&self) -> bool {
        self.is_image || self.is_video || self.is_pdf
    }
}

/// Classify a path, probing the filesystem for the directory bit.
pub fn classify(path: &Path) -> FileClass {
    classify_with(path, path.is_dir())
}

/// Classify a path with the directory bit supplied by the caller.
///
/// Deterministic and side-effect-free.
pub fn classify_with(path: &Path, is_directory: bool) -> FileClass {
    if is_directory {
        return FileClass {
            icon: "folder",
            is_image: false,
            is_video: false,
            is_pdf: false,
            is_directory: true,
        };
    }

    let ext = extension(path);
    let ext = ext.as_deref().unwrap_or("");

    FileClass {
        icon: icon_for_extension(ext),
        is_image: IMAGE_EXTENSIONS.contains(&ext),
        is_video: VIDEO_EXTENSIONS.contains(&ext),
        is_pdf: ext == "pdf",
        is_directory: false,
    }
}

/// Display label for a file row: basename plus its directory with the
/// home prefix abbreviated to `~`.
pub fn display_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    let dir = path
        .parent()
        .map(|d| d.to_string_lossy().into_owned())
        .unwrap_or_default();

    let dir = match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => dir.replacen(&home, "~", 1),
        _ => dir,
    };

    format!("{name} ({dir})")
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

/// Icon lookup table.
///
/// Narrower than the category tables above on purpose: rows show a
/// generic image icon only for the common formats, while the preview
/// pipeline accepts the full set.
fn icon_for_extension(ext: &str) -> &'static str {
    match ext {
        "txt" | "md" | "readme" => "text-x-generic",
        "pdf" => "application-pdf",
        "jpg" | "jpeg" | "png" | "gif" | "svg" => "image-x-generic",
        "mp3" | "wav" | "flac" | "ogg" => "audio-x-generic",
        "mp4" | "avi" | "mkv" | "mov" => "video-x-generic",
        "zip" | "tar" | "gz" | "7z" => "package-x-generic",
        "js" | "ts" | "py" | "cpp" | "c" | "h" => "text-x-script",
        "html" | "css" | "xml" => "text-html",
        "json" | "yaml" | "toml" => "text-x-generic",
        _ => "text-x-generic",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_wins_over_extension() {
        let class = classify_with(Path::new("/tmp/photos.png"), true);
        assert_eq!(class.icon, "folder");
        assert!(class.is_directory);
        assert!(!class.is_image);
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let class = classify_with(Path::new("/tmp/a.JPG"), false);
        assert_eq!(class.icon, "image-x-generic");
        assert!(class.is_image);
    }

    #[test]
    fn test_unknown_extension_is_generic() {
        let class = classify_with(Path::new("/tmp/data.xyz"), false);
        assert_eq!(class.icon, "text-x-generic");
        assert!(!class.needs_thumbnail());
    }

    #[test]
    fn test_deterministic() {
        let path = Path::new("/home/u/video.mkv");
        assert_eq!(classify_with(path, false), classify_with(path, false));
    }

    #[test]
    fn test_preview_set_is_wider_than_icon_set() {
        // webp rows get the generic icon but still qualify for thumbnails
        let class = classify_with(Path::new("/tmp/a.webp"), false);
        assert_eq!(class.icon, "text-x-generic");
        assert!(class.is_image);
        assert!(class.needs_thumbnail());
    }

    #[test]
    fn test_pdf() {
        let class = classify_with(Path::new("/tmp/doc.pdf"), false);
        assert_eq!(class.icon, "application-pdf");
        assert!(class.is_pdf);
        assert!(class.needs_thumbnail());
    }

    #[test]
    fn test_display_name_abbreviates_home() {
        // display_name reads HOME; build the expectation from the same var
        if let Ok(home) = std::env::var("HOME") {
            if home.is_empty() {
                return;
            }
            let path = format!("{home}/docs/notes.txt");
            assert_eq!(display_name(Path::new(&path)), "notes.txt (~/docs)");
        }
    }
}
