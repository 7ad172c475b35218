use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::db::settings::DEFAULT_VIDEO_EXTENSIONS;

/// Normalize the comma-separated extension list from settings: trimmed,
/// lowercased, leading dot guaranteed. A blank list falls back to the
/// built-in defaults.
pub fn parse_extensions(raw: &str) -> Vec<String> {
    let source = if raw.trim().is_empty() {
        DEFAULT_VIDEO_EXTENSIONS
    } else {
        raw
    };

    source
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let lower = s.to_lowercase();
            if lower.starts_with('.') {
                lower
            } else {
                format!(".{lower}")
            }
        })
        .collect()
}

/// Walk `dir` and return every video file under it, in traversal order.
///
/// Hidden files are skipped and hidden directories are not descended into;
/// unreadable entries are skipped rather than failing the scan.
pub fn scan_directory(dir: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let walker = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| !is_hidden(e));
    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        if has_video_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }

    files
}

fn is_hidden(entry: &DirEntry) -> bool {
    // the scan root itself may be hidden; only skip below it
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

fn has_video_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let dotted = format!(".{}", ext.to_lowercase());
    extensions.iter().any(|e| *e == dotted)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn blank_extension_list_falls_back_to_defaults() {
        let exts = parse_extensions("  ");
        assert!(exts.contains(&".mp4".to_string()));
        assert!(exts.contains(&".mkv".to_string()));
    }

    #[test]
    fn extensions_are_normalized() {
        assert_eq!(
            parse_extensions("MP4, .mkv ,webm,,"),
            vec![".mp4", ".mkv", ".webm"]
        );
    }

    #[test]
    fn scan_skips_hidden_files_and_directories() {
        let root = tempfile::tempdir().unwrap();
        let visible = root.path().join("video.mp4");
        touch(&visible);
        touch(&root.path().join(".hidden.mp4"));
        touch(&root.path().join(".cache/inside.mp4"));
        touch(&root.path().join("notes.txt"));

        let files = scan_directory(root.path(), &parse_extensions(".mp4"));
        assert_eq!(files, vec![visible]);
    }

    #[test]
    fn scan_descends_into_visible_subdirectories() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("season1/ep1.Mp4");
        touch(&nested);

        let files = scan_directory(root.path(), &parse_extensions(".mp4"));
        assert_eq!(files, vec![nested]);
    }

    #[test]
    fn missing_directory_scans_empty() {
        let files = scan_directory(Path::new("/nonexistent/surely"), &parse_extensions(".mp4"));
        assert!(files.is_empty());
    }
}
