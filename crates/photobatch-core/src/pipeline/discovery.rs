//! File discovery for finding images in directories.

use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;

/// Discovers image files in a directory.
pub struct FileDiscovery {
    config: ProcessingConfig,
    excluded: Option<PathBuf>,
}

/// Information about a discovered file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl FileDiscovery {
    /// Create a new file discovery instance.
    pub fn new(config: ProcessingConfig) -> Self {
        Self {
            config,
            excluded: None,
        }
    }

    /// Skip `dir` and everything beneath it during the walk.
    pub fn excluding(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded = Some(dir.into());
        self
    }

    /// Discover all supported image files under `root`.
    ///
    /// With `recursive == false` only direct children are inspected.
    /// Results are sorted by path. Fails if `root` is not a readable
    /// directory; unreadable entries below it are skipped.
    pub fn discover(&self, root: &Path, recursive: bool) -> io::Result<Vec<DiscoveredFile>> {
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("not a directory: {}", root.display()),
            ));
        }

        let mut walker = WalkDir::new(root).min_depth(1).follow_links(false);
        if !recursive {
            walker = walker.max_depth(1);
        }

        let mut files = Vec::new();
        let entries = walker
            .into_iter()
            .filter_entry(|e| self.excluded.as_deref() != Some(e.path()));

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(io::Error::from(e)),
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.is_supported(entry.path()) {
                continue;
            }
            match entry.metadata() {
                Ok(meta) => files.push(DiscoveredFile {
                    path: entry.into_path(),
                    size: meta.len(),
                }),
                Err(e) => tracing::debug!("Skipping {:?}: {e}", entry.path()),
            }
        }

        // Sort by path for deterministic ordering
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext_lower = ext.to_lowercase();
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.to_lowercase() == ext_lower)
            })
            .unwrap_or(false)
    }

    /// Get total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"data").unwrap();
    }

    fn names(files: &[DiscoveredFile]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_is_supported() {
        let discovery = FileDiscovery::new(ProcessingConfig::default());

        assert!(discovery.is_supported(Path::new("test.jpg")));
        assert!(discovery.is_supported(Path::new("test.JPG")));
        assert!(discovery.is_supported(Path::new("test.jpeg")));
        assert!(discovery.is_supported(Path::new("test.png")));
        assert!(discovery.is_supported(Path::new("test.bmp")));
        assert!(discovery.is_supported(Path::new("test.TIF")));
        assert!(discovery.is_supported(Path::new("test.tiff")));
        assert!(discovery.is_supported(Path::new("test.webp")));
        assert!(!discovery.is_supported(Path::new("test.gif")));
        assert!(!discovery.is_supported(Path::new("test.txt")));
        assert!(!discovery.is_supported(Path::new("jpg")));
    }

    #[test]
    fn test_non_recursive_only_direct_children() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.png"));
        touch(&dir.path().join("a.jpg"));
        touch(&dir.path().join("notes.txt"));
        touch(&dir.path().join("sub/c.jpg"));

        let discovery = FileDiscovery::new(ProcessingConfig::default());
        let files = discovery.discover(dir.path(), false).unwrap();
        assert_eq!(names(&files), vec!["a.jpg", "b.png"]);
    }

    #[test]
    fn test_recursive_descends_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.jpg"));
        touch(&dir.path().join("sub/c.JPEG"));
        touch(&dir.path().join("sub/deeper/d.webp"));

        let discovery = FileDiscovery::new(ProcessingConfig::default());
        let files = discovery.discover(dir.path(), true).unwrap();
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_excluded_directory_is_pruned() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.jpg"));
        touch(&dir.path().join("output/Trip_20230101_001.jpg"));

        let discovery =
            FileDiscovery::new(ProcessingConfig::default()).excluding(dir.path().join("output"));
        let files = discovery.discover(dir.path(), true).unwrap();
        assert_eq!(names(&files), vec!["a.jpg"]);
    }

    #[test]
    fn test_missing_root_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let discovery = FileDiscovery::new(ProcessingConfig::default());
        assert!(discovery.discover(&dir.path().join("missing"), true).is_err());
    }

    #[test]
    fn test_empty_directory_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let discovery = FileDiscovery::new(ProcessingConfig::default());
        assert!(discovery.discover(dir.path(), true).unwrap().is_empty());
    }

    #[test]
    fn test_total_size() {
        let files = vec![
            DiscoveredFile {
                path: PathBuf::from("a.jpg"),
                size: 100,
            },
            DiscoveredFile {
                path: PathBuf::from("b.jpg"),
                size: 200,
            },
        ];

        assert_eq!(FileDiscovery::total_size(&files), 300);
    }
}
