//! Stepped exposure ramps used for every cross-fade.

use std::time::Duration;

use tokio::select;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeOutcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
pub struct FadeAnimator {
    duration: Duration,
    steps: u32,
}

impl FadeAnimator {
    pub const DEFAULT_STEPS: u32 = 100;

    pub fn new(duration: Duration, steps: u32) -> Self {
        Self { duration, steps }
    }

    /// Exposure emitted at step `i`: `i/steps` fading in, `(steps-i)/steps` fading out.
    pub fn value_at(direction: FadeDirection, i: u32, steps: u32) -> f32 {
        if steps == 0 {
            return match direction {
                FadeDirection::In => 1.0,
                FadeDirection::Out => 0.0,
            };
        }
        let i = i.min(steps);
        let numerator = match direction {
            FadeDirection::In => i,
            FadeDirection::Out => steps - i,
        };
        numerator as f32 / steps as f32
    }

    /// Emit `steps + 1` values, sleeping `duration / steps` between them.
    ///
    /// Stops without emitting anything further once `cancel` fires.
    pub async fn run<F>(
        &self,
        direction: FadeDirection,
        mut on_step: F,
        cancel: &CancellationToken,
    ) -> FadeOutcome
    where
        F: FnMut(f32),
    {
        if self.steps == 0 {
            if cancel.is_cancelled() {
                return FadeOutcome::Cancelled;
            }
            on_step(Self::value_at(direction, 0, 0));
            return FadeOutcome::Completed;
        }

        let interval = self.duration / self.steps;
        for i in 0..=self.steps {
            if cancel.is_cancelled() {
                return FadeOutcome::Cancelled;
            }
            on_step(Self::value_at(direction, i, self.steps));
            if i == self.steps || interval.is_zero() {
                continue;
            }
            select! {
                _ = cancel.cancelled() => return FadeOutcome::Cancelled,
                _ = sleep(interval) => {}
            }
        }
        FadeOutcome::Completed
    }
}
