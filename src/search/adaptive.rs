use super::{best_sample, scan_exhaustive, scan_until_regression, AdaptiveParams};
use crate::errors::Result;
use crate::hardware::{CameraSession, SharpnessScorer, StagePort};
use crate::planner::{LadderDirection, LocalLadder, ZScanRange};
use crate::types::{Point2D, PositionList, ScoreTrace, StagePosition};
use std::time::Instant;

/// State carried from one focused point to the next
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveAnchor {
    /// Best z of the previous point
    pub z: f64,
    /// Index of that z within the order its ladder was traversed in
    pub best_index: usize,
    /// Direction the previous ladder was traversed in
    pub direction: LadderDirection,
}

impl AdaptiveAnchor {
    /// Anchor after a full-range seed scan. The seed's index is not a ladder
    /// index, so it counts as the start of a forward ladder.
    pub fn seed(z: f64) -> Self {
        Self {
            z,
            best_index: 0,
            direction: LadderDirection::Forward,
        }
    }
}

/// Outcome of focusing one point from an anchor
#[derive(Debug, Clone)]
pub struct LocalFocus {
    pub position: StagePosition,
    pub trace: ScoreTrace,
    pub next: AdaptiveAnchor,
}

/// Focus one point with a local ladder around `anchor`.
///
/// Moves straight to `(x, y, anchor.z)`, then walks the ladder until the score
/// first gets worse. Returns the focused position and the anchor for the next
/// point.
pub fn focus_next_point<S, C>(
    stage: &mut S,
    scorer: &C,
    ladder: &LocalLadder,
    point: Point2D,
    anchor: AdaptiveAnchor,
) -> Result<LocalFocus>
where
    S: StagePort + ?Sized,
    C: SharpnessScorer + ?Sized,
{
    let direction = anchor.direction.after(anchor.best_index, ladder.len());
    let z_values = ladder.scan_range(anchor.z, direction).z_values()?;

    stage.move_and_settle(Some(point.x), Some(point.y), Some(anchor.z))?;
    let trace = scan_until_regression(stage, scorer, &z_values)?;
    let (best_index, best) = best_sample(&trace)?;

    Ok(LocalFocus {
        position: StagePosition::at(point, best.z),
        next: AdaptiveAnchor {
            z: best.z,
            best_index,
            direction,
        },
        trace,
    })
}

/// Adaptive focus: full-range seed at the first point, local ladders after.
///
/// Neighbouring points on a chip have strongly correlated focal planes, so
/// each point starts from the previous answer. The ladder stops at the first
/// regression, which assumes a unimodal response near the anchor; if that
/// does not hold the result can be a local optimum.
pub fn focus_from_last_point<S, C>(
    points: &[Point2D],
    stage: &mut S,
    scorer: &C,
    params: &AdaptiveParams,
) -> Result<PositionList>
where
    S: StagePort + ?Sized,
    C: SharpnessScorer + ?Sized,
{
    let ladder = params.ladder()?;
    params.seed.validate()?;
    let Some((first, rest)) = points.split_first() else {
        log::info!("No focus points given, skipping adaptive focus");
        return Ok(PositionList::new());
    };

    let started = Instant::now();
    let center = stage.get_position()?;
    let seed_z = ZScanRange::full(center, params.seed.total_z, params.seed.delta_z).z_values()?;

    log::info!(
        "Starting adaptive focus: {} points, {}-sample seed, {}-step ladder",
        points.len(),
        seed_z.len(),
        ladder.len()
    );

    let mut session = CameraSession::open(stage)?;
    let mut positions = PositionList::with_capacity(points.len());

    session.move_and_settle(Some(first.x), Some(first.y), None)?;
    let seed_trace = scan_exhaustive(&mut *session, scorer, &seed_z)?;
    let (_, seed_best) = best_sample(&seed_trace)?;
    let mut frames = seed_trace.len();
    log::debug!(
        "Seed point ({:.2}, {:.2}): best z={:.2}",
        first.x,
        first.y,
        seed_best.z
    );
    positions.push(StagePosition::at(*first, seed_best.z));

    let mut anchor = AdaptiveAnchor::seed(seed_best.z);
    for (i, point) in rest.iter().enumerate() {
        let step = focus_next_point(&mut *session, scorer, &ladder, *point, anchor)?;
        frames += step.trace.len();
        log::debug!(
            "Point {}/{} ({:.2}, {:.2}): best z={:.2} after {} of {} samples ({:?})",
            i + 2,
            points.len(),
            point.x,
            point.y,
            step.position.z,
            step.trace.len(),
            ladder.len(),
            step.next.direction
        );
        positions.push(step.position);
        anchor = step.next;
    }

    session.finish()?;

    log::info!(
        "Completed adaptive focus of {} points in {:.2?} ({} frames)",
        positions.len(),
        started.elapsed(),
        frames
    );
    Ok(positions)
}
