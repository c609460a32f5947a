use crate::errors::HardwareError;
use crate::hardware::SharpnessScorer;
use crate::types::Frame;

/// Negated variance of the 4-neighbour Laplacian.
///
/// In-focus frames have strong second derivatives at edges, which shows up as
/// a wide Laplacian distribution.
#[derive(Debug, Clone, Copy, Default)]
pub struct LaplacianVarianceScorer;

/// Negated mean squared central-difference gradient (Tenengrad without the
/// Sobel weights)
#[derive(Debug, Clone, Copy, Default)]
pub struct GradientEnergyScorer;

fn interior(frame: &Frame) -> Option<(usize, usize)> {
    let (w, h) = (frame.width as usize, frame.height as usize);
    if w < 3 || h < 3 || frame.data.len() < w * h {
        None
    } else {
        Some((w, h))
    }
}

pub fn laplacian_variance(frame: &Frame) -> f64 {
    let Some((w, h)) = interior(frame) else {
        return 0.0;
    };

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let center = frame.intensity(x, y);
            let neighbours = frame.intensity(x - 1, y)
                + frame.intensity(x + 1, y)
                + frame.intensity(x, y - 1)
                + frame.intensity(x, y + 1);
            let laplacian = neighbours - 4.0 * center;
            sum += laplacian;
            sum_sq += laplacian * laplacian;
        }
    }

    let n = ((w - 2) * (h - 2)) as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

pub fn gradient_energy(frame: &Frame) -> f64 {
    let Some((w, h)) = interior(frame) else {
        return 0.0;
    };

    let mut energy = 0.0;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let gx = (frame.intensity(x + 1, y) - frame.intensity(x - 1, y)) / 2.0;
            let gy = (frame.intensity(x, y + 1) - frame.intensity(x, y - 1)) / 2.0;
            energy += gx * gx + gy * gy;
        }
    }
    energy / ((w - 2) * (h - 2)) as f64
}

impl SharpnessScorer for LaplacianVarianceScorer {
    fn score(&self, frame: &Frame) -> Result<f64, HardwareError> {
        Ok(-laplacian_variance(frame))
    }
}

impl SharpnessScorer for GradientEnergyScorer {
    fn score(&self, frame: &Frame) -> Result<f64, HardwareError> {
        Ok(-gradient_energy(frame))
    }
}
