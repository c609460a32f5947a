/// Focal-surface interpolation
///
/// Fits a smooth z(x, y) surface through focused stage positions so z can be
/// predicted at points that were never focused.
///
/// The surface passes through every sample. It is a polyharmonic cubic
/// spline (`r^3` kernel) over coordinates normalized to [-1, 1] by the sample
/// extents, on top of a tensor-product polynomial trend. The trend degree
/// grows with the sample count (4 samples: bilinear, 9: biquadratic, 16 or
/// more: bicubic) and drops back, down to a plane, when the sample sites
/// cannot pin down the higher terms. Anything the trend can represent, planes
/// included, is reproduced exactly; on a full (k+1) x (k+1) grid the surface
/// is the tensor polynomial itself.
///
/// Outside the convex hull of the samples the surface simply extrapolates.
/// Nothing is clamped or rejected; far from the hull cubic terms grow quickly,
/// so callers that care should check [`FitSurface::contains`] or use
/// [`FitSurface::evaluate_checked`].
pub mod basis;
pub mod hull;

pub use basis::SurfaceBasis;

use crate::errors::{FocusError, Result};
use crate::types::{Point2D, PositionList, StagePosition};
use serde::{Deserialize, Serialize};

/// Fewest samples a surface can be fitted to
pub const MIN_SAMPLES: usize = 4;

/// Axis-aligned bounds of the fitted samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extents {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Extents {
    fn of(samples: &[StagePosition]) -> Self {
        samples.iter().fold(
            Extents {
                min_x: f64::INFINITY,
                max_x: f64::NEG_INFINITY,
                min_y: f64::INFINITY,
                max_y: f64::NEG_INFINITY,
            },
            |e, p| Extents {
                min_x: e.min_x.min(p.x),
                max_x: e.max_x.max(p.x),
                min_y: e.min_y.min(p.y),
                max_y: e.max_y.max(p.y),
            },
        )
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }
}

/// A surface value plus whether it came from outside the sample hull
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub z: f64,
    pub extrapolated: bool,
}

/// Immutable surface fitted to a fixed set of samples
#[derive(Debug, Clone)]
pub struct FitSurface {
    basis: SurfaceBasis,
    terms: Vec<(i32, i32)>,
    coefficients: Vec<f64>,
    /// Normalized sample sites and their kernel weights
    sites: Vec<(f64, f64)>,
    weights: Vec<f64>,
    center: (f64, f64),
    half_width: (f64, f64),
    extents: Extents,
    hull: Vec<Point2D>,
    sample_count: usize,
    rms_residual: f64,
}

impl FitSurface {
    #[inline]
    fn normalize(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.center.0) / self.half_width.0,
            (y - self.center.1) / self.half_width.1,
        )
    }

    /// Surface height at (x, y). Extrapolates outside the hull.
    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        let (u, v) = self.normalize(x, y);
        let kernel_part: f64 = self
            .sites
            .iter()
            .zip(&self.weights)
            .map(|(&(su, sv), w)| w * basis::kernel(u - su, v - sv))
            .sum();
        basis::eval_terms(&self.terms, &self.coefficients, u, v) + kernel_part
    }

    /// Like [`FitSurface::evaluate`], flagging and logging extrapolation
    pub fn evaluate_checked(&self, x: f64, y: f64) -> Evaluation {
        let z = self.evaluate(x, y);
        let extrapolated = !self.contains(x, y);
        if extrapolated {
            log::warn!(
                "Extrapolating focal surface at ({:.2}, {:.2}), outside the hull of {} samples",
                x,
                y,
                self.sample_count
            );
        }
        Evaluation { z, extrapolated }
    }

    /// Whether (x, y) lies in the convex hull of the samples (boundary included)
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let scale = (self.half_width.0 * self.half_width.1).abs().max(f64::MIN_POSITIVE);
        hull::hull_contains(&self.hull, Point2D::new(x, y), scale * 1e-9)
    }

    pub fn basis(&self) -> SurfaceBasis {
        self.basis
    }

    pub fn extents(&self) -> Extents {
        self.extents
    }

    pub fn hull(&self) -> &[Point2D] {
        &self.hull
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Root-mean-square difference between the surface and the samples.
    ///
    /// Zero up to rounding, except where coincident samples were averaged.
    pub fn rms_residual(&self) -> f64 {
        self.rms_residual
    }
}

/// Builds [`FitSurface`]s from focused positions
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceInterpolator;

impl SurfaceInterpolator {
    /// Fit a surface to at least [`MIN_SAMPLES`] positions.
    pub fn fit(samples: &[StagePosition]) -> Result<FitSurface> {
        if samples.len() < MIN_SAMPLES {
            return Err(FocusError::InsufficientSamples {
                required: MIN_SAMPLES,
                provided: samples.len(),
            });
        }
        if let Some(bad) = samples
            .iter()
            .find(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
        {
            return Err(FocusError::InvalidSamples(format!(
                "non-finite sample ({}, {}, {})",
                bad.x, bad.y, bad.z
            )));
        }

        let sites = merge_coincident(samples);
        if sites.len() < samples.len() {
            log::debug!(
                "Averaged {} coincident samples into {} sites",
                samples.len(),
                sites.len()
            );
        }

        let extents = Extents::of(samples);
        let center = (
            (extents.min_x + extents.max_x) / 2.0,
            (extents.min_y + extents.max_y) / 2.0,
        );
        let half = |lo: f64, hi: f64| {
            let h = (hi - lo) / 2.0;
            if h > 0.0 {
                h
            } else {
                1.0
            }
        };
        let half_width = (
            half(extents.min_x, extents.max_x),
            half(extents.min_y, extents.max_y),
        );

        let normalized: Vec<(f64, f64, f64)> = sites
            .iter()
            .map(|p| {
                (
                    (p.x - center.0) / half_width.0,
                    (p.y - center.1) / half_width.1,
                    p.z,
                )
            })
            .collect();

        let preferred = SurfaceBasis::for_sample_count(sites.len());
        let (basis, terms, interpolant) = preferred
            .fallbacks()
            .into_iter()
            .find_map(|basis| {
                let terms = basis.terms();
                basis::solve_interpolant(&terms, &normalized)
                    .map(|interpolant| (basis, terms, interpolant))
            })
            .ok_or_else(|| {
                FocusError::DegenerateSamples(format!(
                    "{} samples are collinear or coincident in (x, y)",
                    samples.len()
                ))
            })?;

        if basis != preferred {
            log::debug!(
                "Samples cannot support a {:?} trend, fell back to {:?}",
                preferred,
                basis
            );
        }

        let xy: Vec<Point2D> = samples.iter().map(StagePosition::xy).collect();
        let mut surface = FitSurface {
            basis,
            terms,
            coefficients: interpolant.coefficients,
            sites: normalized.iter().map(|&(u, v, _)| (u, v)).collect(),
            weights: interpolant.weights,
            center,
            half_width,
            extents,
            hull: hull::convex_hull(&xy),
            sample_count: samples.len(),
            rms_residual: 0.0,
        };

        let sum_sq: f64 = samples
            .iter()
            .map(|p| {
                let r = surface.evaluate(p.x, p.y) - p.z;
                r * r
            })
            .sum();
        surface.rms_residual = (sum_sq / samples.len() as f64).sqrt();

        log::debug!(
            "Fitted focal surface with {:?} trend to {} samples (rms residual {:.2e})",
            surface.basis,
            surface.sample_count,
            surface.rms_residual
        );
        Ok(surface)
    }

    pub fn evaluate(surface: &FitSurface, x: f64, y: f64) -> f64 {
        surface.evaluate(x, y)
    }
}

/// Distinct (x, y) sites; repeated sites keep the mean of their z values
fn merge_coincident(samples: &[StagePosition]) -> Vec<StagePosition> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));

    let mut merged: Vec<(StagePosition, usize)> = Vec::with_capacity(sorted.len());
    for p in sorted {
        match merged.last_mut() {
            Some((site, count)) if site.x == p.x && site.y == p.y => {
                site.z += p.z;
                *count += 1;
            }
            _ => merged.push((p, 1)),
        }
    }
    merged
        .into_iter()
        .map(|(site, count)| StagePosition::new(site.x, site.y, site.z / count as f64))
        .collect()
}

/// Fit `positions` and evaluate at `point`, returning the surface for reuse
pub fn predict_z_height(positions: &PositionList, point: Point2D) -> Result<(f64, FitSurface)> {
    let surface = SurfaceInterpolator::fit(positions.as_slice())?;
    let z = surface.evaluate_checked(point.x, point.y).z;
    Ok((z, surface))
}
