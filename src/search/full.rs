use super::{best_sample, scan_exhaustive, FullScanParams};
use crate::errors::Result;
use crate::hardware::{CameraSession, SharpnessScorer, StagePort};
use crate::planner::ZScanRange;
use crate::types::{Point2D, PositionList, StagePosition};
use std::time::Instant;

/// Brute-force focus: an independent full-range z-scan at every point.
///
/// The scan window is centered on the stage's z at call time and is the same
/// for every point. No early termination, so this is the strategy to use when
/// neighbouring points share nothing.
pub fn focus_from_image_stack<S, C>(
    points: &[Point2D],
    stage: &mut S,
    scorer: &C,
    params: &FullScanParams,
) -> Result<PositionList>
where
    S: StagePort + ?Sized,
    C: SharpnessScorer + ?Sized,
{
    params.validate()?;
    if points.is_empty() {
        log::info!("No focus points given, skipping full-range focus");
        return Ok(PositionList::new());
    }

    let started = Instant::now();
    let center = stage.get_position()?;
    let z_values = ZScanRange::full(center, params.total_z, params.delta_z).z_values()?;

    log::info!(
        "Starting full-range focus: {} points, {} samples from z={:.2} down to z={:.2}",
        points.len(),
        z_values.len(),
        z_values[0],
        z_values[z_values.len() - 1]
    );

    let mut session = CameraSession::open(stage)?;
    let mut positions = PositionList::with_capacity(points.len());
    let mut frames = 0usize;

    for (i, point) in points.iter().enumerate() {
        session.move_and_settle(Some(point.x), Some(point.y), None)?;

        let trace = scan_exhaustive(&mut *session, scorer, &z_values)?;
        frames += trace.len();

        let (index, best) = best_sample(&trace)?;
        log::debug!(
            "Point {}/{} ({:.2}, {:.2}): best z={:.2} (sample {}, score {:.4})",
            i + 1,
            points.len(),
            point.x,
            point.y,
            best.z,
            index,
            best.score
        );
        positions.push(StagePosition::at(*point, best.z));
    }

    session.finish()?;

    log::info!(
        "Completed full-range focus of {} points in {:.2?} ({} frames)",
        positions.len(),
        started.elapsed(),
        frames
    );
    Ok(positions)
}

/// Full-range focus at wherever the stage currently is; returns the best z.
///
/// The stage is left at the last sampled z, not at the returned one.
pub fn focus_point<S, C>(stage: &mut S, scorer: &C, params: &FullScanParams) -> Result<f64>
where
    S: StagePort + ?Sized,
    C: SharpnessScorer + ?Sized,
{
    params.validate()?;
    let center = stage.get_position()?;
    let z_values = ZScanRange::full(center, params.total_z, params.delta_z).z_values()?;

    let mut session = CameraSession::open(stage)?;
    let trace = scan_exhaustive(&mut *session, scorer, &z_values)?;
    session.finish()?;

    let (_, best) = best_sample(&trace)?;
    log::info!(
        "Focused single point at z={:.2} ({} frames around z={:.2})",
        best.z,
        trace.len(),
        center
    );
    Ok(best.z)
}
