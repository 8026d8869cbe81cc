// src/progress.rs - Shared shape of the linear quiz and level sequences
use nalgebra::Point2;

use crate::regions::{RegionId, RegionLayout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressState {
    AwaitingInput(usize),
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Dropped: feedback still showing, unknown region, or already finished.
    Ignored,
    /// Correct selection; moved on to the next step.
    Advanced { from: usize, to: usize },
    /// Wrong answer; same step, negative feedback.
    Retry { index: usize },
    /// Pointer left the level bound without reaching the target.
    Rejected { index: usize },
    /// Last step completed. Emitted exactly once.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Correct,
    Incorrect,
}

/// Blocks selections while feedback for the previous one is on screen.
/// Selections arriving inside the window are dropped, not queued.
#[derive(Debug, Clone)]
pub struct FeedbackGuard {
    window_ms: u64,
    shown: Option<(FeedbackKind, u64)>,
}

impl FeedbackGuard {
    pub fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
            shown: None,
        }
    }

    pub fn is_busy(&self, now_ms: u64) -> bool {
        self.active(now_ms).is_some()
    }

    pub fn show(&mut self, kind: FeedbackKind, now_ms: u64) {
        self.shown = Some((kind, now_ms));
    }

    pub fn active(&self, now_ms: u64) -> Option<FeedbackKind> {
        self.shown.and_then(|(kind, since)| {
            (now_ms.saturating_sub(since) < self.window_ms).then_some(kind)
        })
    }
}

/// A linear sequence of steps advanced by dwell selections.
pub trait Progression {
    fn state(&self) -> ProgressState;

    /// Regions selectable at the current step.
    fn regions(&self) -> &RegionLayout;

    fn on_selection(&mut self, region: &RegionId, now_ms: u64) -> ProgressEvent;

    /// Per-frame pointer position, for sequences that react to movement alone.
    fn observe_pointer(&mut self, _pointer: Option<&Point2<f64>>) -> Option<ProgressEvent> {
        None
    }

    fn len(&self) -> usize;

    fn finish_message(&self) -> &str;

    /// Page to navigate to once finished.
    fn finish_target(&self) -> &str;

    fn is_finished(&self) -> bool {
        self.state() == ProgressState::Finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_window_is_half_open() {
        let mut guard = FeedbackGuard::new(1500);
        assert!(!guard.is_busy(0));
        guard.show(FeedbackKind::Incorrect, 1000);
        assert!(guard.is_busy(1000));
        assert!(guard.is_busy(2499));
        assert!(!guard.is_busy(2500));
        assert_eq!(guard.active(2000), Some(FeedbackKind::Incorrect));
        assert_eq!(guard.active(2500), None);
    }
}
