/// Z-scan planning
///
/// Turns scan parameters into the ordered, deterministic list of z positions a
/// search visits:
/// - full range scans sweep a window around a center from top to bottom
/// - local ladders sample signed offsets around a previous best z
///
/// Every constructor validates its parameters before anything moves.
pub mod grid;

pub use grid::grid_points;

use crate::errors::{FocusError, Result};
use serde::{Deserialize, Serialize};

/// Upper bound on samples in a single scan
pub const MAX_SCAN_SAMPLES: usize = 100_000;

/// Relative slack when dividing span by step, so 0.3 / 0.1 gives 3 samples
const COUNT_TOLERANCE: f64 = 1e-9;

/// Default ladder spacing
pub const DEFAULT_LADDER_STEP: f64 = 10.0;
/// Default ladder half-width
pub const DEFAULT_LADDER_SPAN: f64 = 35.0;

/// Closed description of a one-dimensional focus search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ZScanRange {
    /// Sweep `total_span` around `center` in `step` increments, top down
    Full {
        center: f64,
        total_span: f64,
        step: f64,
    },
    /// Visit `anchor + offset` for each offset, in the given order
    Local { anchor: f64, offsets: Vec<f64> },
}

impl ZScanRange {
    pub fn full(center: f64, total_span: f64, step: f64) -> Self {
        ZScanRange::Full {
            center,
            total_span,
            step,
        }
    }

    /// Absolute z values in visiting order
    pub fn z_values(&self) -> Result<Vec<f64>> {
        match self {
            ZScanRange::Full {
                center,
                total_span,
                step,
            } => full_range(*center, *total_span, *step),
            ZScanRange::Local { anchor, offsets } => {
                if !anchor.is_finite() {
                    return Err(FocusError::InvalidScanConfig(format!(
                        "ladder anchor must be finite, got {}",
                        anchor
                    )));
                }
                if offsets.is_empty() {
                    return Err(FocusError::InvalidScanConfig(
                        "ladder must contain at least one offset".to_string(),
                    ));
                }
                if let Some(bad) = offsets.iter().find(|o| !o.is_finite()) {
                    return Err(FocusError::InvalidScanConfig(format!(
                        "ladder offsets must be finite, got {}",
                        bad
                    )));
                }
                Ok(offsets.iter().map(|offset| anchor + offset).collect())
            }
        }
    }
}

fn sample_count(extent: f64, step: f64, what: &str) -> Result<usize> {
    if !step.is_finite() || step <= 0.0 {
        return Err(FocusError::InvalidScanConfig(format!(
            "{} step must be positive, got {}",
            what, step
        )));
    }
    if !extent.is_finite() || extent <= 0.0 {
        return Err(FocusError::InvalidScanConfig(format!(
            "{} span must be positive, got {}",
            what, extent
        )));
    }

    let ratio = extent / step;
    let count = (ratio - ratio * COUNT_TOLERANCE).ceil();
    if !count.is_finite() || count < 1.0 {
        return Err(FocusError::InvalidScanConfig(format!(
            "{} span {} with step {} yields no samples",
            what, extent, step
        )));
    }
    if count > MAX_SCAN_SAMPLES as f64 {
        return Err(FocusError::InvalidScanConfig(format!(
            "{} span {} with step {} yields {} samples (max {})",
            what, extent, step, count, MAX_SCAN_SAMPLES
        )));
    }
    Ok(count as usize)
}

/// Z values for a full-range scan, highest first.
///
/// Produces `ceil(total_z / delta_z)` values `center + total_z/2 - k * delta_z`,
/// all within `[center - total_z/2, center + total_z/2]`.
pub fn full_range(center: f64, total_z: f64, delta_z: f64) -> Result<Vec<f64>> {
    if !center.is_finite() {
        return Err(FocusError::InvalidScanConfig(format!(
            "scan center must be finite, got {}",
            center
        )));
    }
    let count = sample_count(total_z, delta_z, "full scan")?;
    let top = center + total_z / 2.0;

    let values: Vec<f64> = (0..count).map(|k| top - k as f64 * delta_z).collect();
    if values.windows(2).any(|pair| pair[1] >= pair[0]) {
        return Err(FocusError::InvalidScanConfig(format!(
            "full scan step {} is below the float resolution at z={}",
            delta_z, top
        )));
    }
    Ok(values)
}

/// Traversal order of a local ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LadderDirection {
    /// Ascending offsets
    #[default]
    Forward,
    /// Descending offsets
    Reversed,
}

impl LadderDirection {
    pub fn flipped(self) -> Self {
        match self {
            LadderDirection::Forward => LadderDirection::Reversed,
            LadderDirection::Reversed => LadderDirection::Forward,
        }
    }

    /// Direction for the next ladder given where the last best sample fell.
    ///
    /// A best index past the midpoint of the traversed ladder means sharpness
    /// was still improving late in the sweep, so the next sweep starts from
    /// that end.
    pub fn after(self, best_index: usize, ladder_len: usize) -> Self {
        if best_index as f64 > ladder_len as f64 / 2.0 {
            self.flipped()
        } else {
            self
        }
    }
}

/// Symmetric ladder of offsets around an anchor z.
///
/// Half-open: offsets run `-span, -span + step, ...` and stop before `+span`.
/// The defaults give `-35, -25, -15, -5, 5, 15, 25`.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalLadder {
    step: f64,
    span: f64,
    offsets: Vec<f64>,
}

impl LocalLadder {
    pub fn new(step: f64, span: f64) -> Result<Self> {
        let count = sample_count(2.0 * span, step, "local ladder")?;
        let offsets = (0..count).map(|k| -span + k as f64 * step).collect();
        Ok(Self {
            step,
            span,
            offsets,
        })
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn span(&self) -> f64 {
        self.span
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn offsets(&self, direction: LadderDirection) -> Vec<f64> {
        match direction {
            LadderDirection::Forward => self.offsets.clone(),
            LadderDirection::Reversed => self.offsets.iter().rev().copied().collect(),
        }
    }

    pub fn scan_range(&self, anchor: f64, direction: LadderDirection) -> ZScanRange {
        ZScanRange::Local {
            anchor,
            offsets: self.offsets(direction),
        }
    }
}

impl Default for LocalLadder {
    fn default() -> Self {
        let offsets = (0..7)
            .map(|k| -DEFAULT_LADDER_SPAN + k as f64 * DEFAULT_LADDER_STEP)
            .collect();
        Self {
            step: DEFAULT_LADDER_STEP,
            span: DEFAULT_LADDER_SPAN,
            offsets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_range_descends_from_top() {
        let z = full_range(100.0, 60.0, 10.0).unwrap();
        assert_eq!(z, vec![130.0, 120.0, 110.0, 100.0, 90.0, 80.0]);
    }

    #[test]
    fn test_full_range_partial_step() {
        // 25 / 10 rounds up to 3 samples
        let z = full_range(0.0, 25.0, 10.0).unwrap();
        assert_eq!(z.len(), 3);
        assert_eq!(z[0], 12.5);
        assert!(z[2] >= -12.5);
    }

    #[test]
    fn test_full_range_representation_error() {
        assert_eq!(full_range(0.0, 0.3, 0.1).unwrap().len(), 3);
        assert_eq!(full_range(0.0, 0.7, 0.1).unwrap().len(), 7);
    }

    #[test]
    fn test_full_range_step_larger_than_span() {
        assert_eq!(full_range(5.0, 2.0, 10.0).unwrap(), vec![6.0]);
    }

    #[test]
    fn test_full_range_rejects_bad_config() {
        for (total, delta) in [(60.0, 0.0), (60.0, -5.0), (0.0, 5.0), (-1.0, 5.0)] {
            assert!(matches!(
                full_range(0.0, total, delta),
                Err(FocusError::InvalidScanConfig(_))
            ));
        }
        assert!(full_range(f64::NAN, 10.0, 1.0).is_err());
        assert!(full_range(0.0, 10.0, f64::NAN).is_err());
        assert!(full_range(0.0, 1e9, 1e-3).is_err());
    }

    #[test]
    fn test_full_range_rejects_step_below_resolution() {
        // Adjacent f64 values near 1e17 are 16 apart
        assert!(matches!(
            full_range(1e17, 10.0, 1.0),
            Err(FocusError::InvalidScanConfig(_))
        ));
        let z = full_range(1e17, 640.0, 64.0).unwrap();
        assert_eq!(z.len(), 10);
        assert!(z.windows(2).all(|pair| pair[1] < pair[0]));
    }

    #[test]
    fn test_default_ladder() {
        let ladder = LocalLadder::default();
        assert_eq!(
            ladder.offsets(LadderDirection::Forward),
            vec![-35.0, -25.0, -15.0, -5.0, 5.0, 15.0, 25.0]
        );
        assert_eq!(ladder, LocalLadder::new(10.0, 35.0).unwrap());
    }

    #[test]
    fn test_ladder_reversed() {
        let ladder = LocalLadder::new(10.0, 20.0).unwrap();
        assert_eq!(
            ladder.offsets(LadderDirection::Reversed),
            vec![10.0, 0.0, -10.0, -20.0]
        );
    }

    #[test]
    fn test_ladder_rejects_bad_config() {
        assert!(LocalLadder::new(0.0, 35.0).is_err());
        assert!(LocalLadder::new(10.0, 0.0).is_err());
        assert!(LocalLadder::new(-10.0, 35.0).is_err());
    }

    #[test]
    fn test_direction_policy_midpoint() {
        let d = LadderDirection::Forward;
        assert_eq!(d.after(3, 7), LadderDirection::Forward);
        assert_eq!(d.after(4, 7), LadderDirection::Reversed);
        assert_eq!(LadderDirection::Reversed.after(6, 7), LadderDirection::Forward);
        // Even length: midpoint 2.0, index 2 stays
        assert_eq!(d.after(2, 4), LadderDirection::Forward);
        assert_eq!(d.after(3, 4), LadderDirection::Reversed);
    }

    #[test]
    fn test_local_scan_range() {
        let ladder = LocalLadder::new(5.0, 5.0).unwrap();
        let z = ladder
            .scan_range(50.0, LadderDirection::Forward)
            .z_values()
            .unwrap();
        assert_eq!(z, vec![45.0, 50.0]);

        let empty = ZScanRange::Local {
            anchor: 0.0,
            offsets: vec![],
        };
        assert!(empty.z_values().is_err());
    }
}
