//! Testing utilities for stagefocus
//!
//! Hardware-free stand-ins for the stage, camera and scorer so searches can be
//! exercised offline and deterministically.

pub mod simulated_stage;

pub use simulated_stage::{SimulatedStage, StageCall};

use crate::errors::HardwareError;
use crate::hardware::SharpnessScorer;
use crate::types::{Frame, StagePosition};

/// Scores a frame from the stage position stamped on it.
///
/// Lets tests state the score landscape directly, e.g. a single minimum at
/// z = 42, without going through pixels.
pub struct SyntheticScorer {
    score_at: Box<dyn Fn(StagePosition) -> f64>,
}

impl SyntheticScorer {
    pub fn from_position(score_at: impl Fn(StagePosition) -> f64 + 'static) -> Self {
        Self {
            score_at: Box::new(score_at),
        }
    }

    pub fn from_z(score_at: impl Fn(f64) -> f64 + 'static) -> Self {
        Self::from_position(move |p| score_at(p.z))
    }
}

impl SharpnessScorer for SyntheticScorer {
    fn score(&self, frame: &Frame) -> Result<f64, HardwareError> {
        let position = frame
            .position
            .ok_or_else(|| HardwareError::scorer("frame carries no stage position"))?;
        Ok((self.score_at)(position))
    }
}
