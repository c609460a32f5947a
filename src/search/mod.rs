/// Focus search strategies
///
/// Two ways of turning target (x, y) points into focused stage positions:
/// 1. [`focus_from_image_stack`]: every point gets an independent full-range
///    z-scan. Costs `points x samples` frames, assumes nothing about the chip.
/// 2. [`focus_from_last_point`]: the first point gets a full-range scan, every
///    later point a short ladder around the previous result that stops as soon
///    as sharpness gets worse.
///
/// Both pick the z with the lowest score, earliest sample first on ties, and
/// hold the camera open for the whole call.
pub mod adaptive;
pub mod full;

pub use adaptive::{focus_from_last_point, focus_next_point, AdaptiveAnchor, LocalFocus};
pub use full::{focus_from_image_stack, focus_point};

use crate::errors::{FocusError, Result};
use crate::hardware::{SharpnessScorer, StagePort};
use crate::planner::LocalLadder;
use crate::types::{Frame, ScoreSample, ScoreTrace};
use serde::{Deserialize, Serialize};

/// Parameters of a full-range z-scan around the stage's current z
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FullScanParams {
    /// Distance between frames
    pub delta_z: f64,
    /// Total window, centered on the current z
    pub total_z: f64,
}

impl Default for FullScanParams {
    fn default() -> Self {
        Self {
            delta_z: 5.0,
            total_z: 150.0,
        }
    }
}

impl FullScanParams {
    pub fn validate(&self) -> Result<()> {
        crate::planner::full_range(0.0, self.total_z, self.delta_z).map(|_| ())
    }
}

/// Parameters of the adaptive search: the seed scan plus the local ladder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveParams {
    pub seed: FullScanParams,
    pub ladder_step: f64,
    pub ladder_span: f64,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            seed: FullScanParams {
                delta_z: 10.0,
                total_z: 150.0,
            },
            ladder_step: crate::planner::DEFAULT_LADDER_STEP,
            ladder_span: crate::planner::DEFAULT_LADDER_SPAN,
        }
    }
}

impl AdaptiveParams {
    pub fn ladder(&self) -> Result<LocalLadder> {
        LocalLadder::new(self.ladder_step, self.ladder_span)
    }

    pub fn validate(&self) -> Result<()> {
        self.seed.validate()?;
        self.ladder().map(|_| ())
    }
}

fn sample_at<S, C>(stage: &mut S, scorer: &C, z: f64) -> Result<f64>
where
    S: StagePort + ?Sized,
    C: SharpnessScorer + ?Sized,
{
    stage.move_and_settle(None, None, Some(z))?;
    let frame = stage.capture_frame()?;
    Ok(scorer.score(&frame)?)
}

/// Capture and score a frame at every z, in order
pub fn scan_exhaustive<S, C>(stage: &mut S, scorer: &C, z_values: &[f64]) -> Result<ScoreTrace>
where
    S: StagePort + ?Sized,
    C: SharpnessScorer + ?Sized,
{
    let mut trace = ScoreTrace::with_capacity(z_values.len());
    for &z in z_values {
        let score = sample_at(stage, scorer, z)?;
        trace.push(z, score);
    }
    Ok(trace)
}

/// Capture and score in order, stopping after the first sample that scores
/// strictly worse than its predecessor. That sample stays in the trace.
pub fn scan_until_regression<S, C>(
    stage: &mut S,
    scorer: &C,
    z_values: &[f64],
) -> Result<ScoreTrace>
where
    S: StagePort + ?Sized,
    C: SharpnessScorer + ?Sized,
{
    let mut trace = ScoreTrace::with_capacity(z_values.len());
    for &z in z_values {
        let score = sample_at(stage, scorer, z)?;
        trace.push(z, score);
        if trace.regressed() {
            log::debug!(
                "Focus degraded at z={:.2} after {} of {} samples",
                z,
                trace.len(),
                z_values.len()
            );
            break;
        }
    }
    Ok(trace)
}

/// Score frames that were captured elsewhere, each tagged with its z
pub fn score_stack<C>(frames: &[(f64, Frame)], scorer: &C) -> Result<ScoreTrace>
where
    C: SharpnessScorer + ?Sized,
{
    let mut trace = ScoreTrace::with_capacity(frames.len());
    for (z, frame) in frames {
        trace.push(*z, scorer.score(frame)?);
    }
    Ok(trace)
}

pub(crate) fn best_sample(trace: &ScoreTrace) -> Result<(usize, ScoreSample)> {
    trace
        .best()
        .ok_or_else(|| FocusError::InvalidScanConfig("scan produced no samples".to_string()))
}
