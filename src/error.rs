use std::path::PathBuf;

use thiserror::Error;

use crate::events::Generation;

/// Library error type for slideshow operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The media directory holds nothing with a recognized image or video extension.
    #[error("no media files found in {}", .0.display())]
    EmptyCatalog(PathBuf),

    /// A catalog entry matched neither the image nor the video formats at transition time.
    #[error("unrecognized media format: {}", .0.display())]
    UnclassifiedMedia(PathBuf),

    /// Deferred work from a transition that has since been superseded.
    #[error("stale transition {ticket} (current {current})")]
    StaleTransition {
        ticket: Generation,
        current: Generation,
    },

    /// The image loader could not produce a surface for this file.
    #[error("failed to load image {}: {source}", path.display())]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// The video decode source refused or failed to prepare this file.
    #[error("failed to prepare video {}: {reason}", path.display())]
    VideoPrepare { path: PathBuf, reason: String },

    /// The render sink rejected a surface.
    #[error("render error: {0}")]
    Render(anyhow::Error),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
