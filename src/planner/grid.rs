use crate::errors::{FocusError, Result};
use crate::types::Point2D;

/// Evenly spaced focus points over a rectangular chip region.
///
/// Rows run along y. Within a row x alternates direction (serpentine order),
/// so each point neighbours the one before it. An axis with a single point
/// uses the start of its range.
pub fn grid_points(
    x_range: (f64, f64),
    y_range: (f64, f64),
    nx: usize,
    ny: usize,
) -> Result<Vec<Point2D>> {
    if nx == 0 || ny == 0 {
        return Err(FocusError::InvalidScanConfig(format!(
            "focus grid needs at least one point per axis, got {}x{}",
            nx, ny
        )));
    }
    let bounds = [x_range.0, x_range.1, y_range.0, y_range.1];
    if bounds.iter().any(|v| !v.is_finite()) {
        return Err(FocusError::InvalidScanConfig(
            "focus grid bounds must be finite".to_string(),
        ));
    }

    let xs = axis(x_range, nx);
    let ys = axis(y_range, ny);

    let mut points = Vec::with_capacity(nx * ny);
    for (row, &y) in ys.iter().enumerate() {
        if row % 2 == 0 {
            points.extend(xs.iter().map(|&x| Point2D::new(x, y)));
        } else {
            points.extend(xs.iter().rev().map(|&x| Point2D::new(x, y)));
        }
    }

    log::debug!("Built {}x{} serpentine focus grid", nx, ny);
    Ok(points)
}

fn axis((start, end): (f64, f64), n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    let step = (end - start) / (n - 1) as f64;
    (0..n).map(|i| start + i as f64 * step).collect()
}
