//! Recording collaborators for exercising the controller without a renderer.
//!
//! Every call lands in a shared [`Recorder`] stamped with `tokio::time::Instant`,
//! so tests running on a paused clock can assert on timing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, anyhow, bail};
use tokio::time::Instant;

use crate::events::Generation;
use crate::surface::{
    Collaborators, ImageLoader, MessageSurface, PanoramaImage, RenderSink, VideoSource,
    VideoSurface,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetImage(PathBuf),
    SetVideoSurface { width: u32, height: u32 },
    Exposure(f32),
    ReleaseUnused,
    Prepare { path: PathBuf, ticket: Generation },
    Play,
    Stop,
    Looping(bool),
    Volume(f32),
    Show(String),
    Hide,
}

#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<(Instant, Call)>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(Instant, Call)>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, call: Call) {
        self.lock().push((Instant::now(), call));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn timed(&self) -> Vec<(Instant, Call)> {
        self.lock().clone()
    }

    pub fn exposures(&self) -> Vec<f32> {
        self.lock()
            .iter()
            .filter_map(|(_, c)| match c {
                Call::Exposure(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn last_exposure(&self) -> Option<f32> {
        self.exposures().last().copied()
    }

    pub fn images(&self) -> Vec<PathBuf> {
        self.lock()
            .iter()
            .filter_map(|(_, c)| match c {
                Call::SetImage(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn prepared(&self) -> Vec<(PathBuf, Generation)> {
        self.lock()
            .iter()
            .filter_map(|(_, c)| match c {
                Call::Prepare { path, ticket } => Some((path.clone(), *ticket)),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|(_, c)| match c {
                Call::Show(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.lock().iter().filter(|(_, c)| c == call).count()
    }
}

/// Knobs for making individual collaborators misbehave.
#[derive(Debug, Clone, Default)]
pub struct FakeBehavior {
    pub broken_images: HashSet<PathBuf>,
    pub reject_prepare: bool,
    /// Surfaces the render sink accepts before rejecting every later one.
    pub surface_budget: Option<usize>,
}

pub fn collaborators(recorder: &Recorder) -> Collaborators {
    collaborators_with(recorder, FakeBehavior::default())
}

pub fn collaborators_with(recorder: &Recorder, behavior: FakeBehavior) -> Collaborators {
    Collaborators {
        render: Box::new(RecordingRender {
            recorder: recorder.clone(),
            budget: behavior.surface_budget,
        }),
        video: Box::new(RecordingVideo {
            recorder: recorder.clone(),
            reject: behavior.reject_prepare,
        }),
        messages: Box::new(RecordingMessages {
            recorder: recorder.clone(),
        }),
        images: Box::new(FakeImages {
            broken: behavior.broken_images,
        }),
    }
}

struct RecordingRender {
    recorder: Recorder,
    budget: Option<usize>,
}

impl RecordingRender {
    fn accept(&mut self) -> Result<()> {
        match self.budget.as_mut() {
            Some(0) => bail!("surface rejected"),
            Some(left) => *left -= 1,
            None => {}
        }
        Ok(())
    }
}

impl RenderSink for RecordingRender {
    fn set_image(&mut self, image: PanoramaImage) -> Result<()> {
        self.accept()?;
        self.recorder.record(Call::SetImage(image.path));
        Ok(())
    }

    fn set_video_surface(&mut self, surface: VideoSurface) -> Result<()> {
        self.accept()?;
        self.recorder.record(Call::SetVideoSurface {
            width: surface.width,
            height: surface.height,
        });
        Ok(())
    }

    fn set_exposure(&mut self, value: f32) {
        self.recorder.record(Call::Exposure(value));
    }

    fn release_unused(&mut self) {
        self.recorder.record(Call::ReleaseUnused);
    }
}

struct RecordingVideo {
    recorder: Recorder,
    reject: bool,
}

impl VideoSource for RecordingVideo {
    fn prepare(&mut self, path: &Path, ticket: Generation) -> Result<()> {
        if self.reject {
            bail!("decoder unavailable");
        }
        self.recorder.record(Call::Prepare {
            path: path.to_path_buf(),
            ticket,
        });
        Ok(())
    }

    fn play(&mut self) {
        self.recorder.record(Call::Play);
    }

    fn stop(&mut self) {
        self.recorder.record(Call::Stop);
    }

    fn set_looping(&mut self, looping: bool) {
        self.recorder.record(Call::Looping(looping));
    }

    fn set_volume(&mut self, volume: f32) {
        self.recorder.record(Call::Volume(volume));
    }
}

struct RecordingMessages {
    recorder: Recorder,
}

impl MessageSurface for RecordingMessages {
    fn show(&mut self, text: &str) {
        self.recorder.record(Call::Show(text.to_owned()));
    }

    fn hide(&mut self) {
        self.recorder.record(Call::Hide);
    }
}

/// Produces a 2:1 single-pixel-high surface for any path not marked broken.
struct FakeImages {
    broken: HashSet<PathBuf>,
}

impl ImageLoader for FakeImages {
    fn load(&mut self, path: &Path) -> Result<PanoramaImage> {
        if self.broken.contains(path) {
            return Err(anyhow!("corrupt image data"));
        }
        Ok(PanoramaImage::new(path.to_path_buf(), 2, 1, vec![0; 8]))
    }
}
