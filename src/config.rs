use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::MediaKind;

/// Name of the settings file written next to the media folder by default.
pub const DEFAULT_SETTINGS_FILE: &str = "PanoramaViewerSettings.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ViewerSettings {
    /// Advance automatically; manual navigation is ignored while enabled.
    pub auto_play: bool,
    /// How long an image stays fully visible before its fade-out starts.
    #[serde(with = "humantime_serde")]
    pub image_delay: Duration,
    /// Length of every fade-in and fade-out.
    #[serde(with = "humantime_serde")]
    pub fade_duration: Duration,
    /// Number of exposure increments per fade.
    pub fade_steps: u32,
    /// Extensions (with leading dot) treated as still panoramas.
    pub image_formats: BTreeSet<String>,
    /// Extensions (with leading dot) handed to the video decode source.
    pub video_formats: BTreeSet<String>,
    /// Folder scanned for media; relative paths resolve against the settings file.
    pub media_dir: PathBuf,
    /// Fixed audio attenuation applied to video playback.
    pub video_volume: f32,
    /// Whether the video decode source loops each clip.
    pub video_looping: bool,
}

impl ViewerSettings {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants and normalize the extension sets.
    pub fn validated(mut self) -> Result<Self> {
        ensure!(
            self.image_delay > Duration::ZERO,
            "image-delay must be greater than zero"
        );
        ensure!(self.fade_steps > 0, "fade-steps must be greater than zero");
        ensure!(
            (0.0..=1.0).contains(&self.video_volume),
            "video-volume must be within 0.0..=1.0"
        );
        self.image_formats = normalize_formats(&self.image_formats);
        self.video_formats = normalize_formats(&self.video_formats);
        ensure!(
            !self.image_formats.is_empty() || !self.video_formats.is_empty(),
            "at least one of image-formats or video-formats must be configured"
        );
        Ok(self)
    }

    /// Case-insensitive extension lookup. Video wins when a format is listed twice.
    pub fn classify(&self, path: &Path) -> Option<MediaKind> {
        let ext = dotted_extension(path)?;
        if self.video_formats.contains(&ext) {
            Some(MediaKind::Video)
        } else if self.image_formats.contains(&ext) {
            Some(MediaKind::Image)
        } else {
            None
        }
    }
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            auto_play: true,
            image_delay: Duration::from_secs(15),
            fade_duration: Duration::from_secs(2),
            fade_steps: 100,
            image_formats: [".jpg", ".png"].into_iter().map(String::from).collect(),
            video_formats: [".mp4", ".webm"].into_iter().map(String::from).collect(),
            media_dir: PathBuf::from("PanoramaMediaFiles"),
            video_volume: 0.5,
            video_looping: true,
        }
    }
}

fn normalize_formats(formats: &BTreeSet<String>) -> BTreeSet<String> {
    formats
        .iter()
        .map(|f| f.trim().to_ascii_lowercase())
        .filter(|f| !f.is_empty() && f != ".")
        .map(|f| if f.starts_with('.') { f } else { format!(".{f}") })
        .collect()
}

fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|s| format!(".{}", s.to_ascii_lowercase()))
}

/// Read-only source of [`ViewerSettings`], consulted once before playback.
pub trait SettingsProvider {
    fn load(&self, defaults: ViewerSettings) -> Result<ViewerSettings>;
}

/// Settings persisted as a YAML document; missing files are seeded with the defaults.
#[derive(Debug, Clone)]
pub struct YamlSettingsFile {
    path: PathBuf,
}

impl YamlSettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, settings: &ViewerSettings) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let yaml = serde_yaml::to_string(settings)?;
        fs::write(&self.path, yaml)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// Resolve a possibly relative path against the directory holding the settings file.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.path.parent() {
            Some(parent) => parent.join(path),
            None => path.to_path_buf(),
        }
    }
}

impl SettingsProvider for YamlSettingsFile {
    fn load(&self, defaults: ViewerSettings) -> Result<ViewerSettings> {
        if self.path.exists() {
            let settings = ViewerSettings::from_yaml_file(&self.path)
                .with_context(|| format!("failed to parse {}", self.path.display()))?;
            return settings.validated();
        }
        info!(path = %self.path.display(), "settings file missing; writing defaults");
        self.save(&defaults)?;
        defaults.validated()
    }
}
