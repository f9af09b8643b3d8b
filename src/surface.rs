//! Render surfaces and the collaborator traits the controller drives.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::events::Generation;

/// Projection hint derived from a surface's reduced aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanoramaLayout {
    /// 2:1 latitude/longitude panorama.
    Equirectangular,
    /// 1:1, two equirectangular halves stacked vertically.
    OverUnder,
    /// 6:1 horizontal strip of cube faces.
    CubeStrip,
    /// Any other ratio; rendered without layout hints.
    Unrecognized,
}

impl PanoramaLayout {
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            return Self::Unrecognized;
        }
        let divisor = gcd(width, height);
        match (width / divisor, height / divisor) {
            (2, 1) => Self::Equirectangular,
            (1, 1) => Self::OverUnder,
            (6, 1) => Self::CubeStrip,
            _ => Self::Unrecognized,
        }
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Decoded RGBA8 still ready for upload.
#[derive(Debug, Clone)]
pub struct PanoramaImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub layout: PanoramaLayout,
}

impl PanoramaImage {
    pub fn new(path: PathBuf, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            path,
            width,
            height,
            pixels,
            layout: PanoramaLayout::from_dimensions(width, height),
        }
    }
}

/// Target the video decode source renders frames into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoSurface {
    pub width: u32,
    pub height: u32,
    pub layout: PanoramaLayout,
}

impl VideoSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            layout: PanoramaLayout::from_dimensions(width, height),
        }
    }
}

/// The panorama background. Each `set_*` replaces the previous surface.
pub trait RenderSink: Send {
    fn set_image(&mut self, image: PanoramaImage) -> Result<()>;
    fn set_video_surface(&mut self, surface: VideoSurface) -> Result<()>;
    fn set_exposure(&mut self, value: f32);
    /// Drop GPU/CPU resources no longer referenced by the current surface.
    fn release_unused(&mut self) {}
}

/// Single reusable video decoder. `prepare` answers asynchronously with a
/// [`crate::events::VideoEvent`] carrying `ticket`.
///
/// Reaching the loop point always emits [`crate::events::VideoEvent::Ended`],
/// also when looping is enabled and the clip keeps playing.
pub trait VideoSource: Send {
    fn prepare(&mut self, path: &Path, ticket: Generation) -> Result<()>;
    fn play(&mut self);
    fn stop(&mut self);
    fn set_looping(&mut self, looping: bool);
    fn set_volume(&mut self, volume: f32);
}

/// Full-screen status text ("Loading ...", "Media files not found").
pub trait MessageSurface: Send {
    fn show(&mut self, text: &str);
    fn hide(&mut self);
}

/// Synchronous still-image decoding.
pub trait ImageLoader: Send {
    fn load(&mut self, path: &Path) -> Result<PanoramaImage>;
}

/// Everything the controller writes to, bundled for injection.
pub struct Collaborators {
    pub render: Box<dyn RenderSink>,
    pub video: Box<dyn VideoSource>,
    pub messages: Box<dyn MessageSurface>,
    pub images: Box<dyn ImageLoader>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_uses_reduced_ratio() {
        assert_eq!(
            PanoramaLayout::from_dimensions(8192, 4096),
            PanoramaLayout::Equirectangular
        );
        assert_eq!(
            PanoramaLayout::from_dimensions(4096, 4096),
            PanoramaLayout::OverUnder
        );
        assert_eq!(
            PanoramaLayout::from_dimensions(6144, 1024),
            PanoramaLayout::CubeStrip
        );
        assert_eq!(
            PanoramaLayout::from_dimensions(1920, 1080),
            PanoramaLayout::Unrecognized
        );
        assert_eq!(
            PanoramaLayout::from_dimensions(0, 1080),
            PanoramaLayout::Unrecognized
        );
    }
}
