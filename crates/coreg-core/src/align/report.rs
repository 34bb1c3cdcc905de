use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EstimateFailure;
use crate::frame::Stack;
use crate::registration::RegistrationEstimate;
use crate::transform::TransformModel;

/// Lifecycle of one frame during alignment.
///
/// `Pending -> Estimating -> Validated | Rejected -> Resampled`; the
/// reference frame skips estimation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameState {
    Pending,
    Estimating,
    Validated,
    Rejected,
    Resampled,
}

impl FrameState {
    pub fn can_advance_to(self, next: FrameState) -> bool {
        use FrameState::*;
        matches!(
            (self, next),
            (Pending, Estimating)
                | (Pending, Validated)
                | (Estimating, Validated)
                | (Estimating, Rejected)
                | (Validated, Resampled)
                | (Rejected, Resampled)
        )
    }
}

impl fmt::Display for FrameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Estimating => write!(f, "Estimating"),
            Self::Validated => write!(f, "Validated"),
            Self::Rejected => write!(f, "Rejected"),
            Self::Resampled => write!(f, "Resampled"),
        }
    }
}

/// How the applied transform was decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// The reference frame; passed through unchanged.
    Reference,
    /// The estimate was trusted and applied.
    Accepted,
    /// Estimation failed or was implausible; identity was applied.
    Degraded,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference => write!(f, "Reference"),
            Self::Accepted => write!(f, "Accepted"),
            Self::Degraded => write!(f, "Degraded"),
        }
    }
}

/// What happened to one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub index: usize,
    /// Every state the frame passed through, in order.
    pub history: Vec<FrameState>,
    pub verdict: Verdict,
    /// Transform actually applied (identity when degraded).
    pub transform: TransformModel,
    /// The raw estimate, if one was produced (even when later rejected).
    pub estimate: Option<RegistrationEstimate>,
    pub failure: Option<EstimateFailure>,
}

impl FrameReport {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index,
            history: vec![FrameState::Pending],
            verdict: Verdict::Degraded,
            transform: TransformModel::identity(),
            estimate: None,
            failure: None,
        }
    }

    pub(crate) fn advance(&mut self, next: FrameState) {
        debug_assert!(
            self.state().can_advance_to(next),
            "invalid frame transition {} -> {next}",
            self.state()
        );
        self.history.push(next);
    }

    /// Current (final, once alignment returns) state.
    pub fn state(&self) -> FrameState {
        self.history.last().copied().unwrap_or(FrameState::Pending)
    }

    pub fn confidence(&self) -> Option<f64> {
        self.estimate.as_ref().map(|e| e.confidence)
    }
}

/// Result of aligning a stack.
#[derive(Clone, Debug)]
pub struct AlignmentOutcome {
    /// New stack on the reference grid; same shape, order and layers.
    pub stack: Stack,
    /// One report per frame, in stack order.
    pub reports: Vec<FrameReport>,
}

impl AlignmentOutcome {
    pub fn degraded_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.verdict == Verdict::Degraded)
            .count()
    }

    pub fn transforms(&self) -> Vec<TransformModel> {
        self.reports.iter().map(|r| r.transform).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resampled_is_terminal() {
        for next in [
            FrameState::Pending,
            FrameState::Estimating,
            FrameState::Validated,
            FrameState::Rejected,
            FrameState::Resampled,
        ] {
            assert!(!FrameState::Resampled.can_advance_to(next));
        }
    }

    #[test]
    fn rejected_frames_still_reach_resampled() {
        let mut report = FrameReport::new(3);
        report.advance(FrameState::Estimating);
        report.advance(FrameState::Rejected);
        report.advance(FrameState::Resampled);
        assert_eq!(report.state(), FrameState::Resampled);
        assert_eq!(report.history.len(), 4);
    }
}
