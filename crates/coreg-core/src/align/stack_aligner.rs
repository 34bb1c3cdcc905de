use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::AlignmentConfig;
use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::error::{CoregError, Result};
use crate::frame::{Frame, LayerKind, Stack};
use crate::registration::plausibility::check_plausibility;
use crate::registration::Estimation;
use crate::resample::{warp_layer_inverse, LayerPolicy};
use crate::transform::TransformModel;

use super::cancel::CancellationToken;
use super::report::{AlignmentOutcome, FrameReport, FrameState, Verdict};

/// Aligns every frame of a stack onto a reference frame.
#[derive(Clone, Debug)]
pub struct StackAligner {
    config: AlignmentConfig,
}

impl StackAligner {
    /// Create an aligner, rejecting invalid parameter ranges up front.
    pub fn new(config: AlignmentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AlignmentConfig {
        &self.config
    }

    /// Align `stack` without progress reporting or cancellation.
    pub fn align(&self, stack: &Stack) -> Result<AlignmentOutcome> {
        self.align_with_progress(stack, &CancellationToken::new(), |_| {})
    }

    /// Align `stack`, calling `on_frame_done(frames_completed)` after each
    /// frame. The token is checked before each frame; a cancelled run
    /// returns [`CoregError::Cancelled`] and discards finished frames.
    pub fn align_with_progress<F>(
        &self,
        stack: &Stack,
        cancel: &CancellationToken,
        on_frame_done: F,
    ) -> Result<AlignmentOutcome>
    where
        F: Fn(usize) + Send + Sync,
    {
        let results = self.run(stack, cancel, on_frame_done, true)?;
        let mut aligned = Vec::with_capacity(results.len());
        let mut reports = Vec::with_capacity(results.len());
        for (frame, report) in results {
            if let Some(frame) = frame {
                aligned.push(frame);
            }
            reports.push(report);
        }
        let stack = Stack::with_metadata(aligned, stack.metadata.clone())?;

        let outcome = AlignmentOutcome { stack, reports };
        info!(
            frames = outcome.reports.len(),
            degraded = outcome.degraded_count(),
            "Alignment complete"
        );
        Ok(outcome)
    }

    /// Estimate and validate every frame without resampling. Reports end
    /// in `Validated` or `Rejected`.
    pub fn estimate_with_progress<F>(
        &self,
        stack: &Stack,
        cancel: &CancellationToken,
        on_frame_done: F,
    ) -> Result<Vec<FrameReport>>
    where
        F: Fn(usize) + Send + Sync,
    {
        let results = self.run(stack, cancel, on_frame_done, false)?;
        Ok(results.into_iter().map(|(_, report)| report).collect())
    }

    fn run<F>(
        &self,
        stack: &Stack,
        cancel: &CancellationToken,
        on_frame_done: F,
        resample: bool,
    ) -> Result<Vec<(Option<Frame>, FrameReport)>>
    where
        F: Fn(usize) + Send + Sync,
    {
        self.check_stack(stack)?;

        let frames = stack.frames();
        info!(
            frames = frames.len(),
            reference = self.config.reference_index,
            method = %self.config.algorithm,
            layer = %self.config.layer,
            channel = self.config.channel,
            "Aligning stack"
        );

        let counter = AtomicUsize::new(0);
        let process = |(i, frame): (usize, &Frame)| -> Result<(Option<Frame>, FrameReport)> {
            if cancel.is_cancelled() {
                return Err(CoregError::Cancelled);
            }
            let result = self.process_frame(stack, i, frame, resample)?;
            let done = counter.fetch_add(1, Ordering::Relaxed) + 1;
            on_frame_done(done);
            Ok(result)
        };

        let results: Vec<Result<(Option<Frame>, FrameReport)>> =
            if frames.len() >= PARALLEL_FRAME_THRESHOLD {
                frames.par_iter().enumerate().map(process).collect()
            } else {
                frames.iter().enumerate().map(process).collect()
            };

        if results
            .iter()
            .any(|r| matches!(r, Err(CoregError::Cancelled)))
        {
            info!("Alignment cancelled");
            return Err(CoregError::Cancelled);
        }
        results.into_iter().collect()
    }

    /// Structural checks that make the whole run fail.
    fn check_stack(&self, stack: &Stack) -> Result<()> {
        let total = stack.len();
        if self.config.reference_index >= total {
            return Err(CoregError::ReferenceOutOfRange {
                index: self.config.reference_index,
                total,
            });
        }
        for name in stack.layer_names() {
            if !self.config.layers.contains_key(name) {
                return Err(CoregError::UnknownLayer(format!(
                    "{name} (no layer kind configured)"
                )));
            }
        }
        let reference = &stack.frames()[self.config.reference_index];
        let layer = reference.layer(&self.config.layer)?;
        if self.config.layers.get(&self.config.layer) == Some(&LayerKind::Categorical) {
            return Err(CoregError::InvalidConfig(format!(
                "estimation layer '{}' holds categorical labels",
                self.config.layer
            )));
        }
        if self.config.channel >= layer.channels() {
            return Err(CoregError::ChannelOutOfRange {
                layer: self.config.layer.clone(),
                channel: self.config.channel,
                channels: layer.channels(),
            });
        }
        Ok(())
    }

    fn estimate(&self, reference: &Frame, target: &Frame) -> Result<Estimation> {
        let name = &self.config.layer;
        let channel = self.config.channel;
        let ref_view = reference.layer(name)?.channel(channel);
        let tgt_view = target.layer(name)?.channel(channel);
        self.config.algorithm.estimate(&ref_view, &tgt_view)
    }

    fn process_frame(
        &self,
        stack: &Stack,
        index: usize,
        frame: &Frame,
        resample: bool,
    ) -> Result<(Option<Frame>, FrameReport)> {
        let mut report = FrameReport::new(index);

        if index == self.config.reference_index {
            report.advance(FrameState::Validated);
            report.verdict = Verdict::Reference;
            if !resample {
                return Ok((None, report));
            }
            report.advance(FrameState::Resampled);
            return Ok((Some(frame.clone()), report));
        }

        report.advance(FrameState::Estimating);
        let reference = &stack.frames()[self.config.reference_index];
        let estimation = self.estimate(reference, frame)?;

        let validated = estimation.and_then(|estimate| {
            let checked = check_plausibility(&estimate.transform, &self.config.plausibility);
            report.estimate = Some(estimate);
            checked
        });

        match validated {
            Ok(()) => {
                report.advance(FrameState::Validated);
                report.verdict = Verdict::Accepted;
                if let Some(estimate) = &report.estimate {
                    report.transform = estimate.transform;
                    debug!(
                        frame = index,
                        transform = %estimate.transform,
                        confidence = estimate.confidence,
                        "Estimate accepted"
                    );
                }
            }
            Err(failure) => {
                warn!(frame = index, reason = %failure, "Estimate rejected, using identity");
                report.advance(FrameState::Rejected);
                report.verdict = Verdict::Degraded;
                report.failure = Some(failure);
            }
        }

        if !resample {
            return Ok((None, report));
        }
        let aligned = self.resample_frame(frame, &report.transform)?;
        report.advance(FrameState::Resampled);
        Ok((Some(aligned), report))
    }

    /// Resample every layer of `frame` onto the reference grid.
    fn resample_frame(&self, frame: &Frame, transform: &TransformModel) -> Result<Frame> {
        if transform.is_identity(0.0) {
            return Ok(frame.clone());
        }
        let inverse = transform.invert()?;
        let mut aligned = Frame {
            layers: Default::default(),
            timestamp_us: frame.timestamp_us,
        };
        for (name, layer) in &frame.layers {
            let kind = self
                .config
                .layers
                .get(name)
                .copied()
                .unwrap_or(LayerKind::Continuous);
            let policy = LayerPolicy {
                kind,
                interpolation: self.config.interpolation,
                border: self.config.border,
                no_data: self.config.categorical_fill,
            };
            aligned
                .layers
                .insert(name.clone(), warp_layer_inverse(layer, &inverse, &policy));
        }
        Ok(aligned)
    }
}
