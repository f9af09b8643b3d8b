use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

/// Logical input events; key bindings live with whoever produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInput {
    Navigate(Direction),
    Quit,
}

/// Identifies one transition sequence. Deferred work tagged with an older
/// generation is discarded by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Properties reported by the video decode source once a clip is prepared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub length: Duration,
}

/// Lifecycle notifications from the video decode source. Each echoes the
/// ticket handed to `prepare`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoEvent {
    Prepared { ticket: Generation, info: VideoInfo },
    Failed { ticket: Generation, reason: String },
    Ended { ticket: Generation },
}

impl VideoEvent {
    pub fn ticket(&self) -> Generation {
        match self {
            Self::Prepared { ticket, .. } | Self::Failed { ticket, .. } | Self::Ended { ticket } => {
                *ticket
            }
        }
    }
}
