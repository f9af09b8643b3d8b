use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use image::RgbaImage;
use image::imageops::{flip_horizontal, flip_vertical, rotate90, rotate180, rotate270};
use tracing::debug;

use crate::surface::{ImageLoader, PanoramaImage};

/// Decodes stills with the `image` crate, honoring EXIF orientation.
#[derive(Debug, Default)]
pub struct DecodingImageLoader;

impl ImageLoader for DecodingImageLoader {
    fn load(&mut self, path: &Path) -> Result<PanoramaImage> {
        let rgba = decode_oriented(path)?;
        let (width, height) = rgba.dimensions();
        debug!(path = %path.display(), width, height, "decoded panorama");
        Ok(PanoramaImage::new(
            path.to_path_buf(),
            width,
            height,
            rgba.into_raw(),
        ))
    }
}

fn decode_oriented(path: &Path) -> Result<RgbaImage> {
    let img = image::ImageReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .with_guessed_format()?
        .decode()
        .with_context(|| format!("failed to decode {}", path.display()))?
        .to_rgba8();

    // Orientations 5 and 7 mirror across a diagonal: rotate, then flip.
    let oriented = match read_orientation(path).unwrap_or(1) {
        2 => flip_horizontal(&img),
        3 => rotate180(&img),
        4 => flip_vertical(&img),
        5 => flip_horizontal(&rotate90(&img)),
        6 => rotate90(&img),
        7 => flip_horizontal(&rotate270(&img)),
        8 => rotate270(&img),
        _ => img,
    };
    Ok(oriented)
}

fn read_orientation(path: &Path) -> Option<u32> {
    let file = File::open(path).ok()?;
    let exif = exif::Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .ok()?;
    let orientation = exif
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)?
        .value
        .get_uint(0)?;
    debug!(orientation, path = %path.display(), "exif orientation");
    Some(orientation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::PanoramaLayout;
    use base64::Engine;

    // 2x1 JPEG tagged with EXIF orientation 6 (rotate 90 CW).
    const ORIENT6_JPEG: &str = concat!(
        "/9j/4AAQSkZJRgABAQAAAQABAAD/4QAiRXhpZgAATU0AKgAAAAgAAQESAAMAAAABAAYAAAAAAAD/2wBDAAgGBgcGBQgHBwcJCQgKDBQNDAsLDBkSEw8UHRofHh0aHBwgJC4nICIsIxwcKDcpLDAxNDQ0Hyc5PTgyPC4zNDL/",
        "2wBDAQkJCQwLDBgNDRgyIRwhMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjL/wAARCAABAAIDASIAAhEBAxEB/8QAHwAAAQUBAQEBAQEAAAAAAAAAAAECAwQFBgcICQoL/8QAtRAAAgEDAwIEAwUFBAQAAAF9AQIDAAQRBRIhMUEGE1FhByJxFDKBkaEII0KxwRVS0fAkM2JyggkKFhcYGRolJicoKSo0NTY3ODk6Q0RFRkdISUpTVFVWV1hZWmNkZWZnaGlqc3R1dnd4eXqDhIWGh4iJipKTlJWWl5iZmqKjpKWmp6ipqrKztLW2t7i5usLDxMXGx8jJytLT1NXW19jZ2uHi4+Tl5ufo6erx8vP09fb3+Pn6/8QAHwEAAwEBAQEBAQEBAQAAAAAAAAECAwQFBgcICQoL/8QAtREAAgECBAQDBAcFBAQAAQJ3AAECAxEEBSExBhJBUQdhcRMiMoEIFEKRobHBCSMzUvAVYnLRChYkNOEl8RcYGRomJygpKjU2Nzg5OkNERUZHSElKU1RVVldYWVpjZGVmZ2hpanN0dXZ3eHl6goOEhYaHiImKkpOUlZaXmJmaoqOkpaanqKmqsrO0tba3uLm6wsPExcbHyMnK0tPU1dbX2Nna4uPk5ebn6Onq8vP09fb3+Pn6/9oADAMBAAIRAxEAPwDi6KKK+ZP3E//Z"
    );

    #[test]
    fn applies_exif_rotation() {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(ORIENT6_JPEG)
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orient6.jpg");
        std::fs::write(&path, &bytes).unwrap();

        let image = DecodingImageLoader.load(&path).unwrap();
        assert_eq!((image.width, image.height), (1, 2));
        assert_eq!(image.pixels.len(), 8);
    }

    #[test]
    fn png_without_exif_keeps_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("equirect.png");
        RgbaImage::new(4, 2).save(&path).unwrap();

        let image = DecodingImageLoader.load(&path).unwrap();
        assert_eq!((image.width, image.height), (4, 2));
        assert_eq!(image.layout, PanoramaLayout::Equirectangular);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DecodingImageLoader.load(&dir.path().join("gone.jpg")).is_err());
    }
}
