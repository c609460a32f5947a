use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Relative singular-value cutoff below which a column counts as dependent
const RANK_EPS: f64 = 1e-10;

/// Polynomial family used by a fitted surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceBasis {
    /// Tensor product `x^i y^j`, `i, j <= degree` (1: bilinear, 3: bicubic)
    Tensor { degree: u32 },
    /// `a + b x + c y`
    Plane,
}

impl SurfaceBasis {
    /// Largest tensor degree (at most cubic) that `n` samples can determine
    pub fn for_sample_count(n: usize) -> Self {
        let degree = (1..=3u32)
            .rev()
            .find(|d| ((d + 1) * (d + 1)) as usize <= n)
            .unwrap_or(1);
        SurfaceBasis::Tensor { degree }
    }

    /// This basis, then every smaller one down to the plane
    pub fn fallbacks(self) -> Vec<SurfaceBasis> {
        match self {
            SurfaceBasis::Tensor { degree } => (1..=degree)
                .rev()
                .map(|degree| SurfaceBasis::Tensor { degree })
                .chain(std::iter::once(SurfaceBasis::Plane))
                .collect(),
            SurfaceBasis::Plane => vec![SurfaceBasis::Plane],
        }
    }

    /// Exponent pairs `(i, j)` of the basis terms
    pub fn terms(self) -> Vec<(i32, i32)> {
        match self {
            SurfaceBasis::Tensor { degree } => {
                let d = degree as i32;
                (0..=d).flat_map(|i| (0..=d).map(move |j| (i, j))).collect()
            }
            SurfaceBasis::Plane => vec![(0, 0), (1, 0), (0, 1)],
        }
    }
}

#[inline]
pub(crate) fn eval_terms(terms: &[(i32, i32)], coefficients: &[f64], u: f64, v: f64) -> f64 {
    terms
        .iter()
        .zip(coefficients)
        .map(|(&(i, j), c)| c * u.powi(i) * v.powi(j))
        .sum()
}

/// Polyharmonic spline kernel `r^3` between two normalized sites
#[inline]
pub(crate) fn kernel(du: f64, dv: f64) -> f64 {
    let r = (du * du + dv * dv).sqrt();
    r * r * r
}

fn design(terms: &[(i32, i32)], samples: &[(f64, f64, f64)]) -> DMatrix<f64> {
    DMatrix::from_fn(samples.len(), terms.len(), |row, col| {
        let (u, v, _) = samples[row];
        let (i, j) = terms[col];
        u.powi(i) * v.powi(j)
    })
}

/// Whether the sample sites pin down every coefficient of `terms`
pub(crate) fn is_unisolvent(terms: &[(i32, i32)], samples: &[(f64, f64, f64)]) -> bool {
    if samples.len() < terms.len() {
        return false;
    }
    let svd = design(terms, samples).svd(false, false);
    let largest = svd.singular_values.max();
    if !largest.is_finite() || largest <= 0.0 {
        return false;
    }
    svd.rank(largest * RANK_EPS) == terms.len()
}

/// Polynomial trend plus one `r^3` weight per sample
#[derive(Debug, Clone)]
pub(crate) struct Interpolant {
    pub coefficients: Vec<f64>,
    pub weights: Vec<f64>,
}

/// Interpolant passing through every normalized sample `(u, v, z)`.
///
/// Solves the saddle-point system `[K P; P^T 0] [w; c] = [z; 0]`, where `K`
/// holds the kernel between sample sites and `P` the trend terms. The side
/// condition `P^T w = 0` keeps the kernel part from reproducing the trend, so
/// data the trend can represent exactly gets zero weights. Returns `None`
/// when the sites do not determine the trend.
pub(crate) fn solve_interpolant(
    terms: &[(i32, i32)],
    samples: &[(f64, f64, f64)],
) -> Option<Interpolant> {
    if !is_unisolvent(terms, samples) {
        return None;
    }

    let (n, m) = (samples.len(), terms.len());
    let trend = design(terms, samples);
    let mut system = DMatrix::<f64>::zeros(n + m, n + m);
    for row in 0..n {
        let (ur, vr, _) = samples[row];
        for col in 0..n {
            let (uc, vc, _) = samples[col];
            system[(row, col)] = kernel(ur - uc, vr - vc);
        }
        for col in 0..m {
            system[(row, n + col)] = trend[(row, col)];
            system[(n + col, row)] = trend[(row, col)];
        }
    }
    let rhs = DVector::from_iterator(
        n + m,
        samples.iter().map(|s| s.2).chain(std::iter::repeat(0.0).take(m)),
    );

    let solution = match system.clone().lu().solve(&rhs) {
        Some(x) if x.iter().all(|v| v.is_finite()) => x,
        _ => {
            let svd = system.svd(true, true);
            let eps = svd.singular_values.max() * RANK_EPS;
            svd.solve(&rhs, eps).ok()?
        }
    };
    if !solution.iter().all(|v| v.is_finite()) {
        return None;
    }

    Some(Interpolant {
        weights: solution.rows(0, n).iter().copied().collect(),
        coefficients: solution.rows(n, m).iter().copied().collect(),
    })
}
