use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::catalog::{MediaCatalog, MediaKind};
use crate::config::ViewerSettings;
use crate::error::Error;
use crate::events::{Direction, Generation, UserInput, VideoEvent, VideoInfo};
use crate::fade::{FadeAnimator, FadeDirection, FadeOutcome};
use crate::surface::{Collaborators, VideoSurface};

pub const LOADING_MESSAGE: &str = "Loading ...";

/// Extra headroom between a video's pre-fade and its end.
const VIDEO_TAIL_MARGIN: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    FadingOut,
    Preparing,
    FadingIn,
    /// Terminal: nothing playable was found.
    NoMedia,
}

impl Phase {
    pub fn is_transitioning(self) -> bool {
        matches!(self, Self::FadingOut | Self::Preparing | Self::FadingIn)
    }
}

/// Point-in-time view of the controller, published after every state change.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub phase: Phase,
    pub current_index: Option<usize>,
    pub current_path: Option<PathBuf>,
    pub direction: Direction,
    pub transition_lock: bool,
    pub generation: Generation,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterFade {
    LoadSelected,
    UnlockImage,
    UnlockVideo,
    Advance,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    ImageDwell,
    VideoPreFade,
    SkipFailed,
}

/// Deferred work posted back to the controller task by fade and timer tasks.
#[derive(Debug)]
enum Wake {
    FadeStep {
        generation: Generation,
        fade: u64,
        value: f32,
    },
    FadeDone {
        generation: Generation,
        fade: u64,
        then: AfterFade,
    },
    Timer {
        generation: Generation,
        kind: TimerKind,
    },
}

#[derive(Debug)]
struct PlaybackState {
    current_index: Option<usize>,
    direction: Direction,
    phase: Phase,
    first_run: bool,
    pending_message: Option<String>,
}

/// Owns the slideshow timeline: which entry is active, the fades between
/// entries and the autoplay timers.
///
/// All state lives on the task running [`PlaybackController::run`]. Fades and
/// timers are spawned tasks that only post [`Wake`]s back; each carries the
/// generation it was started under and is dropped once a newer transition
/// has begun.
pub struct PlaybackController {
    settings: ViewerSettings,
    catalog: Option<MediaCatalog>,
    no_media_notice: Option<String>,
    io: Collaborators,
    fader: FadeAnimator,
    state: PlaybackState,
    generation: Generation,
    generation_cancel: CancellationToken,
    fade_seq: u64,
    fade_cancel: Option<CancellationToken>,
    exposure: f32,
    displaying: Option<PathBuf>,
    shutdown: CancellationToken,
    wake_tx: mpsc::UnboundedSender<Wake>,
    wake_rx: mpsc::UnboundedReceiver<Wake>,
    status_tx: watch::Sender<PlaybackSnapshot>,
}

impl PlaybackController {
    /// A failed catalog puts the controller in [`Phase::NoMedia`] once started.
    pub fn new(
        settings: ViewerSettings,
        catalog: crate::error::Result<MediaCatalog>,
        io: Collaborators,
    ) -> Self {
        let (catalog, no_media_notice) = match catalog {
            Ok(catalog) => (Some(catalog), None),
            Err(Error::EmptyCatalog(dir)) => (
                None,
                Some(format!(
                    "Media files not found\n\nAdd files to\n\"{}\"\nand restart application",
                    dir.display()
                )),
            ),
            Err(err) => (None, Some(format!("{err}\n\nRestart application"))),
        };
        let fader = FadeAnimator::new(settings.fade_duration, settings.fade_steps);
        let shutdown = CancellationToken::new();
        let (wake_tx, wake_rx) = mpsc::unbounded_channel();
        let state = PlaybackState {
            current_index: None,
            direction: Direction::Next,
            phase: Phase::Idle,
            first_run: true,
            pending_message: None,
        };
        let (status_tx, _) = watch::channel(PlaybackSnapshot {
            phase: state.phase,
            current_index: None,
            current_path: None,
            direction: state.direction,
            transition_lock: false,
            generation: Generation::default(),
            message: None,
        });
        Self {
            settings,
            catalog,
            no_media_notice,
            io,
            fader,
            state,
            generation: Generation::default(),
            generation_cancel: shutdown.child_token(),
            fade_seq: 0,
            fade_cancel: None,
            exposure: 0.0,
            displaying: None,
            shutdown,
            wake_tx,
            wake_rx,
            status_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.status_tx.subscribe()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            phase: self.state.phase,
            current_index: self.state.current_index,
            current_path: self.current_path(),
            direction: self.state.direction,
            transition_lock: self.transition_lock(),
            generation: self.generation,
            message: self.state.pending_message.clone(),
        }
    }

    pub fn transition_lock(&self) -> bool {
        self.state.phase.is_transitioning()
    }

    /// Drive the controller until `cancel` fires or a `Quit` arrives.
    #[instrument(skip_all, name = "playback")]
    pub async fn run(
        mut self,
        mut input_rx: mpsc::Receiver<UserInput>,
        mut video_rx: mpsc::Receiver<VideoEvent>,
        cancel: CancellationToken,
    ) -> Result<()> {
        self.start();
        loop {
            select! {
                _ = cancel.cancelled() => break,

                Some(input) = input_rx.recv() => match input {
                    UserInput::Navigate(direction) => self.request_navigate(direction),
                    UserInput::Quit => {
                        info!("quit requested; stopping playback");
                        cancel.cancel();
                        break;
                    }
                },

                Some(event) = video_rx.recv() => self.on_video_event(event),

                Some(wake) = self.wake_rx.recv() => self.on_wake(wake),
            }
        }
        self.shutdown();
        Ok(())
    }

    /// Black out the panorama and show the first entry (or the no-media notice).
    pub fn start(&mut self) {
        self.set_exposure(0.0);
        self.io.video.set_looping(self.settings.video_looping);
        self.io.video.set_volume(self.settings.video_volume);

        match self.catalog.as_ref() {
            None => {
                let notice = self.no_media_notice.clone().unwrap_or_default();
                warn!(notice = %notice, "no playable media; playback will not start");
                self.state.phase = Phase::NoMedia;
                self.show_message(&notice);
            }
            Some(catalog) => {
                info!(
                    entries = catalog.len(),
                    auto_play = self.settings.auto_play,
                    "starting playback"
                );
                self.show_message(LOADING_MESSAGE);
                self.change_media(Direction::Next);
            }
        }
        self.publish();
    }

    /// Manual navigation. Ignored in autoplay mode and while a transition is in flight.
    pub fn request_navigate(&mut self, direction: Direction) {
        if self.settings.auto_play {
            debug!(?direction, "navigation ignored in autoplay mode");
            return;
        }
        if self.state.phase == Phase::NoMedia {
            debug!(?direction, "navigation ignored; no media");
            return;
        }
        if self.transition_lock() {
            debug!(?direction, phase = ?self.state.phase, "navigation ignored during transition");
            return;
        }
        self.change_media(direction);
    }

    /// Video decode source notifications; stale tickets are dropped.
    pub fn on_video_event(&mut self, event: VideoEvent) {
        let ticket = event.ticket();
        if ticket != self.generation {
            let stale = Error::StaleTransition {
                ticket,
                current: self.generation,
            };
            debug!(error = %stale, "video event dropped");
            return;
        }
        match event {
            VideoEvent::Prepared { info, .. } => self.on_video_prepared(info),
            VideoEvent::Failed { reason, .. } => {
                if self.state.phase == Phase::Preparing {
                    let path = self.current_path().unwrap_or_default();
                    self.abandon_transition(Error::VideoPrepare { path, reason });
                } else {
                    warn!(%reason, "video playback failed");
                }
            }
            VideoEvent::Ended { .. } => self.on_video_ended(),
        }
        self.publish();
    }

    fn change_media(&mut self, direction: Direction) {
        let Some(len) = self.catalog.as_ref().map(MediaCatalog::len) else {
            return;
        };
        self.begin_generation();
        self.state.phase = Phase::Preparing;
        self.state.direction = direction;
        let index = step_index(self.state.current_index, direction, len);
        self.state.current_index = Some(index);
        info!(generation = %self.generation, index, ?direction, "changing media");

        if !self.state.first_run && !self.settings.auto_play {
            self.state.phase = Phase::FadingOut;
            self.start_fade(FadeDirection::Out, AfterFade::LoadSelected);
        } else {
            self.load_selected();
        }
        self.state.first_run = false;
        self.publish();
    }

    fn load_selected(&mut self) {
        let Some(path) = self.current_path() else {
            self.state.phase = Phase::Idle;
            return;
        };
        match self.settings.classify(&path) {
            Some(MediaKind::Video) => {
                self.io.video.stop();
                self.state.phase = Phase::Preparing;
                debug!(generation = %self.generation, path = %path.display(), "preparing video");
                if let Err(err) = self.io.video.prepare(&path, self.generation) {
                    self.abandon_transition(Error::VideoPrepare {
                        path,
                        reason: format!("{err:#}"),
                    });
                }
            }
            Some(MediaKind::Image) => {
                let image = match self.io.images.load(&path) {
                    Ok(image) => image,
                    Err(source) => {
                        self.abandon_transition(Error::ImageLoad { path, source });
                        return;
                    }
                };
                debug!(
                    path = %path.display(),
                    width = image.width,
                    height = image.height,
                    layout = ?image.layout,
                    "image surface ready"
                );
                self.io.video.stop();
                if let Err(err) = self.io.render.set_image(image) {
                    self.abandon_transition(Error::Render(err));
                    return;
                }
                self.io.render.release_unused();
                self.displaying = Some(path);
                self.clear_message();
                self.state.phase = Phase::FadingIn;
                self.start_fade(FadeDirection::In, AfterFade::UnlockImage);
            }
            None => {
                warn!(error = %Error::UnclassifiedMedia(path), "skipping entry");
                self.restore_exposure();
                self.state.phase = Phase::Idle;
            }
        }
    }

    fn on_video_prepared(&mut self, info: VideoInfo) {
        if self.state.phase != Phase::Preparing {
            debug!(phase = ?self.state.phase, "duplicate prepared notification ignored");
            return;
        }
        let surface = VideoSurface::new(info.width, info.height);
        if let Err(err) = self.io.render.set_video_surface(surface) {
            self.abandon_transition(Error::Render(err));
            return;
        }
        if self.settings.auto_play {
            let lead = self.settings.fade_duration + VIDEO_TAIL_MARGIN;
            self.schedule(info.length.saturating_sub(lead), TimerKind::VideoPreFade);
        }
        self.displaying = self.current_path();
        self.clear_message();
        self.state.phase = Phase::FadingIn;
        self.start_fade(FadeDirection::In, AfterFade::UnlockVideo);
        self.io.video.play();
        info!(
            width = info.width,
            height = info.height,
            layout = ?surface.layout,
            length = %humantime::format_duration(info.length),
            "video playing"
        );
    }

    fn on_video_ended(&mut self) {
        if self.settings.auto_play {
            debug!("video ended; advancing");
            self.change_media(Direction::Next);
        } else {
            trace!("video reached its loop point; staying on current entry");
        }
    }

    fn on_wake(&mut self, wake: Wake) {
        match wake {
            Wake::FadeStep {
                generation,
                fade,
                value,
            } => {
                if self.is_current_fade(generation, fade) {
                    self.set_exposure(value);
                } else {
                    trace!(%generation, fade, "stale fade step dropped");
                }
                return;
            }
            Wake::FadeDone {
                generation,
                fade,
                then,
            } => {
                if !self.is_current_fade(generation, fade) {
                    debug!(%generation, fade, ?then, "stale fade completion dropped");
                    return;
                }
                self.fade_cancel = None;
                self.after_fade(then);
            }
            Wake::Timer { generation, kind } => {
                if generation != self.generation {
                    let stale = Error::StaleTransition {
                        ticket: generation,
                        current: self.generation,
                    };
                    debug!(error = %stale, ?kind, "timer dropped");
                    return;
                }
                self.on_timer(kind);
            }
        }
        self.publish();
    }

    fn after_fade(&mut self, then: AfterFade) {
        match then {
            AfterFade::LoadSelected => self.load_selected(),
            AfterFade::UnlockImage => {
                self.state.phase = Phase::Idle;
                if self.settings.auto_play {
                    self.schedule(self.settings.image_delay, TimerKind::ImageDwell);
                }
            }
            AfterFade::UnlockVideo => self.state.phase = Phase::Idle,
            AfterFade::Advance => self.change_media(Direction::Next),
            AfterFade::Hold => {}
        }
    }

    fn on_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::ImageDwell => self.start_fade(FadeDirection::Out, AfterFade::Advance),
            TimerKind::VideoPreFade => {
                // Clips shorter than the fade lead cut their own fade-in short.
                if self.state.phase == Phase::FadingIn {
                    debug!("video pre-fade supersedes fade-in");
                    self.state.phase = Phase::Idle;
                }
                self.start_fade(FadeDirection::Out, AfterFade::Hold);
            }
            TimerKind::SkipFailed => self.change_media(Direction::Next),
        }
    }

    /// Report an external failure and fall back to whatever is still on screen.
    fn abandon_transition(&mut self, err: Error) {
        error!(generation = %self.generation, error = %err, "transition failed");
        self.show_message(&err.to_string());
        self.restore_exposure();
        self.state.phase = Phase::Idle;
        if self.settings.auto_play {
            self.schedule(self.settings.image_delay, TimerKind::SkipFailed);
        }
    }

    fn restore_exposure(&mut self) {
        if let Some(fade) = self.fade_cancel.take() {
            fade.cancel();
        }
        if self.displaying.is_some() && self.exposure < 1.0 {
            self.set_exposure(1.0);
        }
    }

    fn begin_generation(&mut self) {
        self.generation_cancel.cancel();
        self.generation = self.generation.next();
        self.generation_cancel = self.shutdown.child_token();
        self.fade_cancel = None;
    }

    fn is_current_fade(&self, generation: Generation, fade: u64) -> bool {
        generation == self.generation && fade == self.fade_seq && self.fade_cancel.is_some()
    }

    fn start_fade(&mut self, direction: FadeDirection, then: AfterFade) {
        if let Some(previous) = self.fade_cancel.take() {
            previous.cancel();
        }
        self.fade_seq += 1;
        let fade = self.fade_seq;
        let generation = self.generation;
        let cancel = self.generation_cancel.child_token();
        self.fade_cancel = Some(cancel.clone());
        let fader = self.fader;
        let tx = self.wake_tx.clone();
        trace!(%generation, fade, ?direction, ?then, "fade started");

        tokio::spawn(async move {
            let outcome = fader
                .run(
                    direction,
                    |value| {
                        let _ = tx.send(Wake::FadeStep {
                            generation,
                            fade,
                            value,
                        });
                    },
                    &cancel,
                )
                .await;
            if outcome == FadeOutcome::Completed {
                let _ = tx.send(Wake::FadeDone {
                    generation,
                    fade,
                    then,
                });
            }
        });
    }

    fn schedule(&self, delay: Duration, kind: TimerKind) {
        let generation = self.generation;
        let cancel = self.generation_cancel.clone();
        let tx = self.wake_tx.clone();
        debug!(
            %generation,
            ?kind,
            delay = %humantime::format_duration(delay),
            "timer scheduled"
        );
        tokio::spawn(async move {
            select! {
                _ = cancel.cancelled() => {}
                _ = sleep(delay) => {
                    let _ = tx.send(Wake::Timer { generation, kind });
                }
            }
        });
    }

    fn shutdown(&mut self) {
        self.shutdown.cancel();
        self.io.video.stop();
        debug!(generation = %self.generation, "playback stopped");
    }

    fn set_exposure(&mut self, value: f32) {
        self.io.render.set_exposure(value);
        self.exposure = value;
    }

    fn show_message(&mut self, text: &str) {
        self.io.messages.show(text);
        self.state.pending_message = Some(text.to_owned());
    }

    fn clear_message(&mut self) {
        if self.state.pending_message.take().is_some() {
            self.io.messages.hide();
        }
    }

    fn current_path(&self) -> Option<PathBuf> {
        let index = self.state.current_index?;
        self.catalog
            .as_ref()?
            .entry(index)
            .map(|entry| entry.path().to_path_buf())
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.snapshot());
    }
}

/// Wrap-around stepping; from the initial "nothing shown" state Next lands on
/// the first entry and Prev on the last.
fn step_index(current: Option<usize>, direction: Direction, len: usize) -> usize {
    debug_assert!(len > 0);
    match (current, direction) {
        (None, Direction::Next) => 0,
        (None, Direction::Prev) => len - 1,
        (Some(i), Direction::Next) if i + 1 >= len => 0,
        (Some(i), Direction::Next) => i + 1,
        (Some(0), Direction::Prev) => len - 1,
        (Some(i), Direction::Prev) => (i - 1).min(len - 1),
    }
}
