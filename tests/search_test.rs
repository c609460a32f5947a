//! Focus Search Testing
//!
//! Integration tests for both focus strategies against the simulated stage:
//! - argmin selection and tie-breaking
//! - early termination of the local ladder
//! - ladder direction carried between points
//! - camera lifecycle on success and on hardware failure
//! - end-to-end runs with a pixel-based sharpness metric

use stagefocus::quality::LaplacianVarianceScorer;
use stagefocus::testing::{SimulatedStage, StageCall, SyntheticScorer};
use stagefocus::{
    focus_from_image_stack, focus_from_last_point, focus_next_point, grid_points,
    AdaptiveAnchor, AdaptiveParams, Component, FocusError, Frame, FullScanParams, HardwareError,
    LadderDirection, LocalLadder, Point2D, SharpnessScorer, StagePosition, SurfaceInterpolator,
};

fn points(coords: &[(f64, f64)]) -> Vec<Point2D> {
    coords.iter().map(|&p| p.into()).collect()
}

/// Scorer whose minimum sits on a per-x focal height
fn focal_by_x(focal: fn(f64) -> f64) -> SyntheticScorer {
    SyntheticScorer::from_position(move |p: StagePosition| (p.z - focal(p.x)).abs())
}

#[test]
fn test_full_search_finds_single_minimum() {
    let mut stage = SimulatedStage::flat(0.0).with_start_z(40.0);
    let scorer = SyntheticScorer::from_z(|z| (z - 42.0).powi(2));
    let params = FullScanParams {
        delta_z: 2.0,
        total_z: 20.0,
    };
    let targets = points(&[(0.0, 0.0), (5.0, 5.0), (-3.0, 8.0)]);

    let list = focus_from_image_stack(&targets, &mut stage, &scorer, &params).unwrap();

    assert_eq!(list.len(), 3);
    for (position, target) in list.iter().zip(&targets) {
        assert_eq!(position.z, 42.0);
        assert_eq!(position.xy(), *target);
    }
    // Every point sees the whole range
    assert_eq!(stage.frames_captured(), 30);
}

#[test]
fn test_full_search_tie_picks_earliest_visited() {
    let mut stage = SimulatedStage::flat(0.0).with_start_z(40.0);
    // 46 and 38 tie; the range descends so 46 is visited first
    let scorer = SyntheticScorer::from_z(|z| if z == 46.0 || z == 38.0 { 0.0 } else { 10.0 });
    let params = FullScanParams {
        delta_z: 2.0,
        total_z: 20.0,
    };

    let list = focus_from_image_stack(&points(&[(0.0, 0.0)]), &mut stage, &scorer, &params).unwrap();
    assert_eq!(list.get(0).unwrap().z, 46.0);
}

#[test]
fn test_full_search_end_to_end_scenario() {
    let mut stage = SimulatedStage::flat(0.0).with_start_z(100.0);
    let scorer = SyntheticScorer::from_z(|z| (z - 100.0).abs());
    let params = FullScanParams {
        delta_z: 10.0,
        total_z: 60.0,
    };
    let targets = points(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]);

    let list = focus_from_image_stack(&targets, &mut stage, &scorer, &params).unwrap();

    let expected: Vec<StagePosition> = targets.iter().map(|&p| StagePosition::at(p, 100.0)).collect();
    assert_eq!(list.into_vec(), expected);
}

#[test]
fn test_full_search_moves_xy_without_touching_z() {
    let mut stage = SimulatedStage::flat(0.0).with_start_z(10.0);
    let scorer = SyntheticScorer::from_z(|z| z.abs());
    let params = FullScanParams {
        delta_z: 5.0,
        total_z: 10.0,
    };

    focus_from_image_stack(&points(&[(7.0, 9.0)]), &mut stage, &scorer, &params).unwrap();

    let calls = stage.calls();
    assert_eq!(calls[0], StageCall::GetPosition);
    assert_eq!(calls[1], StageCall::OpenCamera);
    assert_eq!(
        calls[2],
        StageCall::SetPosition {
            x: Some(7.0),
            y: Some(9.0),
            z: None
        }
    );
    assert_eq!(calls[3], StageCall::WaitForMotion);
    // Each sample: move z, wait, capture
    assert_eq!(
        &calls[4..7],
        &[
            StageCall::SetPosition {
                x: None,
                y: None,
                z: Some(15.0)
            },
            StageCall::WaitForMotion,
            StageCall::CaptureFrame,
        ]
    );
    assert_eq!(calls.last(), Some(&StageCall::CloseCamera));
}

#[test]
fn test_camera_opened_once_per_search() {
    let mut stage = SimulatedStage::flat(0.0);
    let scorer = SyntheticScorer::from_z(|z| z.abs());
    let targets = points(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);

    focus_from_image_stack(&targets, &mut stage, &scorer, &FullScanParams::default()).unwrap();
    assert_eq!(stage.camera_opens(), 1);
    assert_eq!(stage.camera_closes(), 1);

    focus_from_last_point(&targets, &mut stage, &scorer, &AdaptiveParams::default()).unwrap();
    assert_eq!(stage.camera_opens(), 2);
    assert_eq!(stage.camera_closes(), 2);
    assert_eq!(stage.captures_while_closed(), 0);
}

#[test]
fn test_camera_released_on_capture_failure() {
    let mut stage = SimulatedStage::flat(0.0).fail_capture_at(5);
    let scorer = SyntheticScorer::from_z(|z| z.abs());

    let result = focus_from_image_stack(
        &points(&[(0.0, 0.0), (1.0, 1.0)]),
        &mut stage,
        &scorer,
        &FullScanParams::default(),
    );

    assert!(matches!(result, Err(FocusError::HardwareFailure(_))));
    assert_eq!(stage.camera_opens(), 1);
    assert_eq!(stage.camera_closes(), 1);
    assert!(!stage.camera_is_open());
}

#[test]
fn test_camera_released_on_adaptive_failure() {
    // Seed uses 15 frames; fail inside the second point's ladder
    let mut stage = SimulatedStage::flat(0.0).fail_capture_at(17);
    let scorer = SyntheticScorer::from_z(|z| -z);

    let result = focus_from_last_point(
        &points(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]),
        &mut stage,
        &scorer,
        &AdaptiveParams::default(),
    );

    assert!(matches!(result, Err(FocusError::HardwareFailure(_))));
    assert_eq!(stage.camera_closes(), 1);
    assert!(!stage.camera_is_open());
}

#[test]
fn test_scorer_failure_propagates_and_releases_camera() {
    struct Unreadable;
    impl SharpnessScorer for Unreadable {
        fn score(&self, _frame: &Frame) -> Result<f64, HardwareError> {
            Err(HardwareError::scorer("saturated frame"))
        }
    }

    let mut stage = SimulatedStage::flat(0.0);
    let result = focus_from_image_stack(
        &points(&[(0.0, 0.0)]),
        &mut stage,
        &Unreadable,
        &FullScanParams::default(),
    );

    match result {
        Err(FocusError::HardwareFailure(e)) => assert_eq!(e.component, Component::Scorer),
        other => panic!("expected scorer failure, got {:?}", other),
    }
    assert_eq!(stage.frames_captured(), 1);
    assert!(!stage.camera_is_open());
}

#[test]
fn test_invalid_adaptive_config_fails_before_motion() {
    let mut stage = SimulatedStage::flat(0.0);
    let scorer = SyntheticScorer::from_z(|z| z);
    let params = AdaptiveParams {
        ladder_step: 0.0,
        ..Default::default()
    };

    let result = focus_from_last_point(&points(&[(0.0, 0.0)]), &mut stage, &scorer, &params);
    assert!(matches!(result, Err(FocusError::InvalidScanConfig(_))));
    assert!(stage.calls().is_empty());
}

#[test]
fn test_adaptive_single_point_is_seed_only() {
    let mut stage = SimulatedStage::flat(0.0).with_start_z(100.0);
    let scorer = SyntheticScorer::from_z(|z| (z - 110.0).abs());

    let list =
        focus_from_last_point(&points(&[(3.0, 4.0)]), &mut stage, &scorer, &AdaptiveParams::default())
            .unwrap();

    assert_eq!(list.len(), 1);
    assert_eq!(list.get(0).unwrap().z, 110.0);
    assert_eq!(stage.frames_captured(), 15);
}

#[test]
fn test_adaptive_early_termination() {
    let mut stage = SimulatedStage::flat(0.0).with_start_z(100.0);
    // Point 2 focuses at 85: the forward ladder from 100 sees
    // 65, 75, 85 improving then 95 worse
    let scorer = focal_by_x(|x| if x < 5.0 { 100.0 } else { 85.0 });
    let params = AdaptiveParams {
        seed: FullScanParams {
            delta_z: 10.0,
            total_z: 60.0,
        },
        ..Default::default()
    };

    let list =
        focus_from_last_point(&points(&[(0.0, 0.0), (10.0, 0.0)]), &mut stage, &scorer, &params)
            .unwrap();

    assert_eq!(list.get(0).unwrap().z, 100.0);
    assert_eq!(list.get(1).unwrap().z, 85.0);
    // 6 seed frames + 3 improving + the first worse one
    assert_eq!(stage.frames_captured(), 10);
}

#[test]
fn test_ladder_trace_truncated_after_regression() {
    let mut stage = SimulatedStage::flat(0.0);
    let ladder = LocalLadder::default();
    // Strictly decreasing for 3 samples, strictly increasing afterwards
    let scorer = SyntheticScorer::from_z(|z| (z + 15.0).abs());

    let step = focus_next_point(
        &mut stage,
        &scorer,
        &ladder,
        Point2D::new(0.0, 0.0),
        AdaptiveAnchor::seed(0.0),
    )
    .unwrap();

    assert_eq!(ladder.len(), 7);
    assert_eq!(step.trace.len(), 4);
    assert_eq!(step.position.z, -15.0);
    assert_eq!(step.next.best_index, 2);
    assert_eq!(step.next.direction, LadderDirection::Forward);
}

#[test]
fn test_adaptive_moves_to_anchor_first() {
    let mut stage = SimulatedStage::flat(0.0).with_start_z(100.0);
    let scorer = SyntheticScorer::from_z(|z| (z - 100.0).abs());
    let params = AdaptiveParams {
        seed: FullScanParams {
            delta_z: 10.0,
            total_z: 60.0,
        },
        ..Default::default()
    };

    focus_from_last_point(&points(&[(0.0, 0.0), (50.0, 60.0)]), &mut stage, &scorer, &params)
        .unwrap();

    assert!(stage.calls().contains(&StageCall::SetPosition {
        x: Some(50.0),
        y: Some(60.0),
        z: Some(100.0)
    }));
}

#[test]
fn test_direction_reverses_after_late_best() {
    let mut stage = SimulatedStage::flat(0.0).with_start_z(100.0);
    // Point 1 focuses at 100 (seed), point 2 beyond the ladder's top end so
    // every forward sample improves, point 3 far above that again
    let scorer = focal_by_x(|x| match x as i32 {
        0 => 100.0,
        10 => 130.0,
        _ => 150.0,
    });
    let params = AdaptiveParams {
        seed: FullScanParams {
            delta_z: 10.0,
            total_z: 60.0,
        },
        ..Default::default()
    };

    let list = focus_from_last_point(
        &points(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]),
        &mut stage,
        &scorer,
        &params,
    )
    .unwrap();

    let z = stage.z_moves();
    // Seed: 130, 120, ..., 80
    assert_eq!(&z[..6], &[130.0, 120.0, 110.0, 100.0, 90.0, 80.0]);
    // Point 2: anchor move, then the full forward ladder
    assert_eq!(z[6], 100.0);
    assert_eq!(&z[7..14], &[65.0, 75.0, 85.0, 95.0, 105.0, 115.0, 125.0]);
    assert_eq!(list.get(1).unwrap().z, 125.0);
    // Point 3: best index 6 of 7 was past the midpoint, ladder reversed
    assert_eq!(z[14], 125.0);
    assert_eq!(z[15], 150.0);
    assert_eq!(list.get(2).unwrap().z, 150.0);
}

#[test]
fn test_direction_kept_after_early_best() {
    let mut stage = SimulatedStage::flat(0.0).with_start_z(100.0);
    let scorer = focal_by_x(|x| if x < 5.0 { 100.0 } else { 85.0 });
    let params = AdaptiveParams {
        seed: FullScanParams {
            delta_z: 10.0,
            total_z: 60.0,
        },
        ..Default::default()
    };

    focus_from_last_point(
        &points(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)]),
        &mut stage,
        &scorer,
        &params,
    )
    .unwrap();

    let z = stage.z_moves();
    // Point 2 ended on index 2; point 3 ladder starts at the low end again
    let anchor_move = z.iter().rposition(|&v| v == 85.0).unwrap();
    assert_eq!(z[anchor_move + 1], 50.0);
}

#[test]
fn test_pixel_scorer_end_to_end_surface() {
    let (a, b, c) = (0.01, -0.015, 100.0);
    let plane = |x: f64, y: f64| a * x + b * y + c;
    let targets = grid_points((0.0, 1000.0), (0.0, 1000.0), 3, 3).unwrap();

    let mut full_stage = SimulatedStage::tilted(a, b, c).with_start_z(c);
    let full = focus_from_image_stack(
        &targets,
        &mut full_stage,
        &LaplacianVarianceScorer,
        &FullScanParams::default(),
    )
    .unwrap();

    let mut adaptive_stage = SimulatedStage::tilted(a, b, c).with_start_z(c);
    let adaptive = focus_from_last_point(
        &targets,
        &mut adaptive_stage,
        &LaplacianVarianceScorer,
        &AdaptiveParams::default(),
    )
    .unwrap();

    for p in full.iter() {
        assert!((p.z - plane(p.x, p.y)).abs() <= 2.5 + 1e-9, "full: {:?}", p);
    }
    for p in adaptive.iter() {
        assert!((p.z - plane(p.x, p.y)).abs() <= 5.0 + 1e-9, "adaptive: {:?}", p);
    }
    assert!(adaptive_stage.frames_captured() < full_stage.frames_captured());

    let surface = SurfaceInterpolator::fit(full.as_slice()).unwrap();
    let z = surface.evaluate(250.0, 750.0);
    assert!((z - plane(250.0, 750.0)).abs() < 5.0);
}
