use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use crate::config::ViewerSettings;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEntry {
    path: PathBuf,
    kind: MediaKind,
}

impl MediaEntry {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }
}

/// Ordered, immutable list of playable media. Never empty once built.
#[derive(Debug, Clone)]
pub struct MediaCatalog {
    entries: Vec<MediaEntry>,
}

impl MediaCatalog {
    /// Keep the paths the settings classify, preserving their order.
    pub fn build<I>(paths: I, settings: &ViewerSettings, source: &Path) -> Result<Self>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let entries: Vec<MediaEntry> = paths
            .into_iter()
            .filter_map(|path| match settings.classify(&path) {
                Some(kind) => Some(MediaEntry { path, kind }),
                None => {
                    debug!(path = %path.display(), "skipping unrecognized file");
                    None
                }
            })
            .collect();
        if entries.is_empty() {
            return Err(Error::EmptyCatalog(source.to_path_buf()));
        }
        Ok(Self { entries })
    }

    /// Enumerate the regular files directly inside `dir`, creating the folder when absent.
    #[instrument(skip(settings), fields(dir = %dir.display()))]
    pub fn scan_dir(dir: &Path, settings: &ViewerSettings) -> Result<Self> {
        if !dir.exists() {
            info!("media directory missing; creating it");
            fs::create_dir_all(dir)?;
        }
        let mut paths = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop while scanning"))
            })?;
            if entry.file_type().is_file() {
                paths.push(entry.into_path());
            }
        }
        let catalog = Self::build(paths, settings, dir)?;
        info!(
            entries = catalog.len(),
            videos = catalog.iter().filter(|e| e.kind == MediaKind::Video).count(),
            "media catalog ready"
        );
        Ok(catalog)
    }

    pub fn entry(&self, index: usize) -> Option<&MediaEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediaEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ViewerSettings {
        ViewerSettings::default().validated().unwrap()
    }

    #[test]
    fn build_filters_and_keeps_order() {
        let paths = ["b.png", "notes.txt", "a.MP4", "c.jpg", "d.webm"]
            .into_iter()
            .map(PathBuf::from);
        let catalog = MediaCatalog::build(paths, &settings(), Path::new("/m")).unwrap();
        let got: Vec<(&Path, MediaKind)> = catalog.iter().map(|e| (e.path(), e.kind())).collect();
        assert_eq!(
            got,
            vec![
                (Path::new("b.png"), MediaKind::Image),
                (Path::new("a.MP4"), MediaKind::Video),
                (Path::new("c.jpg"), MediaKind::Image),
                (Path::new("d.webm"), MediaKind::Video),
            ]
        );
    }

    #[test]
    fn entry_does_not_wrap() {
        let catalog =
            MediaCatalog::build([PathBuf::from("a.jpg")], &settings(), Path::new("/m")).unwrap();
        assert!(catalog.entry(0).is_some());
        assert!(catalog.entry(1).is_none());
    }

    #[test]
    fn only_unrecognized_files_is_empty_catalog() {
        let paths = ["readme.md", "thumbs.db"].into_iter().map(PathBuf::from);
        let err = MediaCatalog::build(paths, &settings(), Path::new("/m")).unwrap_err();
        assert!(matches!(err, Error::EmptyCatalog(ref dir) if dir == Path::new("/m")));
    }

    #[test]
    fn scan_creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("PanoramaMediaFiles");
        let err = MediaCatalog::scan_dir(&dir, &settings()).unwrap_err();
        assert!(matches!(err, Error::EmptyCatalog(_)));
        assert!(dir.is_dir());
    }

    #[test]
    fn scan_is_sorted_and_not_recursive() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("z.png"), b"x").unwrap();
        fs::write(dir.join("a.mp4"), b"x").unwrap();
        fs::write(dir.join("nested").join("b.jpg"), b"x").unwrap();

        let catalog = MediaCatalog::scan_dir(dir, &settings()).unwrap();
        let names: Vec<String> = catalog
            .iter()
            .map(|e| e.path().file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mp4".to_string(), "z.png".to_string()]);
    }
}
