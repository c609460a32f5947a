//! Core data types shared by the planner, the searches and the interpolator.

use crate::errors::{FocusError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Target imaging coordinate in stage units (micrometres)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Fully resolved stage position, the output of focusing one [`Point2D`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StagePosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl StagePosition {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn at(point: Point2D, z: f64) -> Self {
        Self {
            x: point.x,
            y: point.y,
            z,
        }
    }

    pub fn xy(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// Ordered list of focused positions, in visitation order.
///
/// Entries are only ever appended; there is no way to modify one in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionList {
    positions: Vec<StagePosition>,
}

impl PositionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, position: StagePosition) {
        self.positions.push(position);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StagePosition> {
        self.positions.get(index)
    }

    pub fn last(&self) -> Option<&StagePosition> {
        self.positions.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StagePosition> {
        self.positions.iter()
    }

    pub fn as_slice(&self) -> &[StagePosition] {
        &self.positions
    }

    pub fn into_vec(self) -> Vec<StagePosition> {
        self.positions
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FocusError::Io(format!("Failed to serialize positions: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| FocusError::Io(format!("Failed to parse positions: {}", e)))
    }

    /// Save the list as a JSON array of `{x, y, z}` objects
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        fs::write(path, json).map_err(|e| {
            FocusError::Io(format!("Failed to write positions to {:?}: {}", path, e))
        })?;
        log::info!("Saved {} positions to {:?}", self.len(), path);
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            FocusError::Io(format!("Failed to read positions from {:?}: {}", path, e))
        })?;
        Self::from_json(&contents)
    }
}

impl From<Vec<StagePosition>> for PositionList {
    fn from(positions: Vec<StagePosition>) -> Self {
        Self { positions }
    }
}

impl FromIterator<StagePosition> for PositionList {
    fn from_iter<I: IntoIterator<Item = StagePosition>>(iter: I) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PositionList {
    type Item = StagePosition;
    type IntoIter = std::vec::IntoIter<StagePosition>;

    fn into_iter(self) -> Self::IntoIter {
        self.positions.into_iter()
    }
}

impl<'a> IntoIterator for &'a PositionList {
    type Item = &'a StagePosition;
    type IntoIter = std::slice::Iter<'a, StagePosition>;

    fn into_iter(self) -> Self::IntoIter {
        self.positions.iter()
    }
}

/// One scored sample of a z-scan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSample {
    pub z: f64,
    pub score: f64,
}

/// Ordered (z, score) samples captured while focusing a single point
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreTrace {
    samples: Vec<ScoreSample>,
}

impl ScoreTrace {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, z: f64, score: f64) {
        self.samples.push(ScoreSample { z, score });
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[ScoreSample] {
        &self.samples
    }

    /// True when the last sample scored strictly worse than the one before it
    pub fn regressed(&self) -> bool {
        match self.samples.as_slice() {
            [.., previous, last] => last.score > previous.score,
            _ => false,
        }
    }

    /// Index and sample with the lowest score.
    ///
    /// The earliest sample wins ties. NaN scores lose against any number.
    pub fn best(&self) -> Option<(usize, ScoreSample)> {
        let mut best: Option<(usize, ScoreSample)> = None;
        for (index, sample) in self.samples.iter().enumerate() {
            best = match best {
                None => Some((index, *sample)),
                Some((_, current))
                    if sample.score < current.score
                        || (current.score.is_nan() && !sample.score.is_nan()) =>
                {
                    Some((index, *sample))
                }
                keep => keep,
            };
        }
        best
    }
}

/// Single-channel intensity frame captured by the camera
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Row-major intensities, `width * height` entries
    pub data: Vec<u16>,
    /// Where the stage was when the frame was exposed, if the port knows
    pub position: Option<StagePosition>,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u16>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            width,
            height,
            data,
            position: None,
        }
    }

    pub fn with_position(mut self, position: StagePosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn from_luma16(image: &image::ImageBuffer<image::Luma<u16>, Vec<u16>>) -> Self {
        Self::new(image.width(), image.height(), image.as_raw().clone())
    }

    /// Convert any decoded image to 16-bit luminance
    pub fn from_image(image: &image::DynamicImage) -> Self {
        Self::from_luma16(&image.to_luma16())
    }

    pub fn pixel_count(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn intensity(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width as usize + x] as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_prefers_earliest_on_tie() {
        let mut trace = ScoreTrace::default();
        trace.push(30.0, 2.0);
        trace.push(20.0, 1.0);
        trace.push(10.0, 1.0);
        let (index, sample) = trace.best().unwrap();
        assert_eq!(index, 1);
        assert_eq!(sample.z, 20.0);
    }

    #[test]
    fn test_best_single_sample() {
        let mut trace = ScoreTrace::default();
        trace.push(5.0, 9.0);
        assert_eq!(trace.best().unwrap().0, 0);
        assert!(ScoreTrace::default().best().is_none());
    }

    #[test]
    fn test_best_skips_nan() {
        let mut trace = ScoreTrace::default();
        trace.push(1.0, f64::NAN);
        trace.push(2.0, 3.0);
        assert_eq!(trace.best().unwrap().1.z, 2.0);
    }

    #[test]
    fn test_regressed() {
        let mut trace = ScoreTrace::default();
        trace.push(0.0, 5.0);
        assert!(!trace.regressed());
        trace.push(1.0, 5.0);
        assert!(!trace.regressed());
        trace.push(2.0, 6.0);
        assert!(trace.regressed());
    }

    #[test]
    fn test_position_list_json() {
        let list: PositionList = vec![
            StagePosition::new(0.0, 0.0, 100.0),
            StagePosition::new(10.0, 0.0, 101.5),
        ]
        .into();
        let json = list.to_json().unwrap();
        assert!(json.trim_start().starts_with('['));
        assert_eq!(PositionList::from_json(&json).unwrap(), list);
    }

    #[test]
    fn test_frame_from_image() {
        let img = image::DynamicImage::new_luma8(4, 3);
        let frame = Frame::from_image(&img);
        assert_eq!((frame.width, frame.height), (4, 3));
        assert_eq!(frame.pixel_count(), 12);
        assert!(frame.position.is_none());
    }
}
