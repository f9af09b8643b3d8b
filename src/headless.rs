//! Collaborators for running the controller without a display.
//!
//! Surfaces and messages are reported through `tracing`; videos cannot be
//! decoded here, so every prepare request fails and autoplay skips past it.

use std::path::Path;

use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::events::Generation;
use crate::loader::DecodingImageLoader;
use crate::surface::{
    Collaborators, MessageSurface, PanoramaImage, RenderSink, VideoSource, VideoSurface,
};

#[derive(Debug, Default)]
pub struct TracingRenderSink {
    exposure: f32,
}

impl RenderSink for TracingRenderSink {
    fn set_image(&mut self, image: PanoramaImage) -> Result<()> {
        info!(
            path = %image.path.display(),
            width = image.width,
            height = image.height,
            layout = ?image.layout,
            "panorama image attached"
        );
        Ok(())
    }

    fn set_video_surface(&mut self, surface: VideoSurface) -> Result<()> {
        info!(
            width = surface.width,
            height = surface.height,
            layout = ?surface.layout,
            "panorama video surface attached"
        );
        Ok(())
    }

    fn set_exposure(&mut self, value: f32) {
        // Only log the ends of a ramp.
        if value == 0.0 || value == 1.0 {
            debug!(from = self.exposure, to = value, "exposure");
        }
        self.exposure = value;
    }
}

#[derive(Debug, Default)]
pub struct TracingMessageSurface;

impl MessageSurface for TracingMessageSurface {
    fn show(&mut self, text: &str) {
        info!(message = %text, "message shown");
    }

    fn hide(&mut self) {
        debug!("message hidden");
    }
}

#[derive(Debug, Default)]
pub struct UnsupportedVideoSource;

impl VideoSource for UnsupportedVideoSource {
    fn prepare(&mut self, path: &Path, ticket: Generation) -> Result<()> {
        bail!(
            "video decoding is not available in headless mode ({}, {ticket})",
            path.display()
        )
    }

    fn play(&mut self) {}

    fn stop(&mut self) {}

    fn set_looping(&mut self, _looping: bool) {}

    fn set_volume(&mut self, _volume: f32) {}
}

pub fn collaborators() -> Collaborators {
    Collaborators {
        render: Box::new(TracingRenderSink::default()),
        video: Box::new(UnsupportedVideoSource),
        messages: Box::new(TracingMessageSurface),
        images: Box::new(DecodingImageLoader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_prepare_is_refused() {
        let mut video = UnsupportedVideoSource;
        let err = video
            .prepare(Path::new("clip.mp4"), Generation(3))
            .unwrap_err();
        assert!(err.to_string().contains("clip.mp4"));
    }
}
