use crate::types::Point2D;

fn cross(o: Point2D, a: Point2D, b: Point2D) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Convex hull in counter-clockwise order (monotone chain).
///
/// Collinear boundary points are dropped. Fewer than three distinct,
/// non-collinear inputs give a hull with fewer than three vertices.
pub fn convex_hull(points: &[Point2D]) -> Vec<Point2D> {
    let mut sorted: Vec<Point2D> = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup();

    if sorted.len() < 3 {
        return sorted;
    }

    let mut lower: Vec<Point2D> = Vec::with_capacity(sorted.len());
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point2D> = Vec::with_capacity(sorted.len());
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Point-in-hull test, boundary inclusive. `tolerance` is in squared stage
/// units since it bounds a cross product.
pub fn hull_contains(hull: &[Point2D], p: Point2D, tolerance: f64) -> bool {
    if hull.len() < 3 {
        return false;
    }
    hull.iter()
        .zip(hull.iter().cycle().skip(1))
        .all(|(&a, &b)| cross(a, b, p) >= -tolerance)
}
