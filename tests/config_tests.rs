use panorama_slideshow::catalog::{MediaCatalog, MediaKind};
use panorama_slideshow::config::{SettingsProvider, ViewerSettings, YamlSettingsFile};
use panorama_slideshow::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[test]
fn parse_kebab_case_settings() {
    let yaml = r#"
auto-play: false
image-delay: 30s
fade-duration: 500ms
image-formats: [".jpg", "JPEG"]
media-dir: "/srv/panoramas"
"#;
    let settings: ViewerSettings = serde_yaml::from_str(yaml).unwrap();
    let settings = settings.validated().unwrap();
    assert!(!settings.auto_play);
    assert_eq!(settings.image_delay, Duration::from_secs(30));
    assert_eq!(settings.fade_duration, Duration::from_millis(500));
    assert_eq!(settings.fade_steps, 100);
    assert!(settings.image_formats.contains(".jpeg"));
    assert_eq!(settings.media_dir, PathBuf::from("/srv/panoramas"));
    assert!((settings.video_volume - 0.5).abs() < f32::EPSILON);
    assert!(settings.video_looping);
}

#[test]
fn empty_document_uses_defaults() {
    let settings: ViewerSettings = serde_yaml::from_str("{}").unwrap();
    assert_eq!(settings, ViewerSettings::default());
    assert!(settings.auto_play);
    assert_eq!(settings.image_delay, Duration::from_secs(15));
    assert_eq!(settings.fade_duration, Duration::from_secs(2));
    assert_eq!(settings.media_dir, PathBuf::from("PanoramaMediaFiles"));
}

#[test]
fn out_of_range_volume_is_rejected() {
    let settings: ViewerSettings = serde_yaml::from_str("video-volume: 1.5").unwrap();
    let err = settings.validated().unwrap_err();
    assert!(err.to_string().contains("video-volume"));
}

#[test]
fn missing_settings_file_is_seeded_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let store = YamlSettingsFile::new(dir.path().join("PanoramaViewerSettings.yaml"));

    let loaded = store.load(ViewerSettings::default()).unwrap();
    assert_eq!(loaded, ViewerSettings::default().validated().unwrap());
    assert!(store.path().exists());

    let reread = ViewerSettings::from_yaml_file(store.path()).unwrap();
    assert_eq!(reread.image_delay, Duration::from_secs(15));
}

#[test]
fn existing_settings_file_wins_over_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.yaml");
    std::fs::write(&path, "auto-play: false\nfade-steps: 10\n").unwrap();

    let loaded = YamlSettingsFile::new(&path)
        .load(ViewerSettings::default())
        .unwrap();
    assert!(!loaded.auto_play);
    assert_eq!(loaded.fade_steps, 10);
}

#[test]
fn relative_media_dir_resolves_next_to_settings() {
    let store = YamlSettingsFile::new("/etc/panorama/settings.yaml");
    assert_eq!(
        store.resolve(Path::new("PanoramaMediaFiles")),
        PathBuf::from("/etc/panorama/PanoramaMediaFiles")
    );
    assert_eq!(store.resolve(Path::new("/media")), PathBuf::from("/media"));
}

#[test]
fn scan_classifies_directory_contents() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["b.mp4", "a.JPG", "readme.txt", "c.png"] {
        std::fs::write(dir.path().join(name), b"x").unwrap();
    }
    let settings = ViewerSettings::default().validated().unwrap();
    let catalog = MediaCatalog::scan_dir(dir.path(), &settings).unwrap();

    let kinds: Vec<(String, MediaKind)> = catalog
        .iter()
        .map(|e| {
            (
                e.path().file_name().unwrap().to_string_lossy().into_owned(),
                e.kind(),
            )
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("a.JPG".to_string(), MediaKind::Image),
            ("b.mp4".to_string(), MediaKind::Video),
            ("c.png".to_string(), MediaKind::Image),
        ]
    );
}

#[test]
fn scan_of_folder_without_media_reports_it() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
    let settings = ViewerSettings::default().validated().unwrap();

    match MediaCatalog::scan_dir(dir.path(), &settings) {
        Err(Error::EmptyCatalog(path)) => assert_eq!(path, dir.path()),
        other => panic!("expected empty catalog, got {other:?}"),
    }
}
