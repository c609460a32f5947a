//! stagefocus: sharpness-driven autofocus for motorized microscope stages
//!
//! Given target (x, y) imaging locations, this crate finds the z-height of
//! best focus at each one by scoring a z-stack of frames, and interpolates a
//! focal surface so z can be predicted anywhere on the chip.
//!
//! # Features
//! - Full-range z-stack search, independent per point
//! - Adaptive local search seeded from the previous point, with early stop
//! - Bicubic-family focal surface fitting and prediction
//! - Serpentine focus grids
//! - Hardware-agnostic: stage, camera and scorer are traits
//! - Simulated stage and synthetic scorers for offline testing
//!
//! # Usage
//! ```rust,no_run
//! use stagefocus::{focus_from_last_point, grid_points, AdaptiveParams, SurfaceInterpolator};
//! use stagefocus::quality::LaplacianVarianceScorer;
//! use stagefocus::testing::SimulatedStage;
//!
//! # fn main() -> stagefocus::Result<()> {
//! let mut stage = SimulatedStage::tilted(0.01, -0.02, 100.0).with_start_z(100.0);
//! let points = grid_points((0.0, 1000.0), (0.0, 1000.0), 4, 4)?;
//! let focused = focus_from_last_point(
//!     &points,
//!     &mut stage,
//!     &LaplacianVarianceScorer,
//!     &AdaptiveParams::default(),
//! )?;
//! let surface = SurfaceInterpolator::fit(focused.as_slice())?;
//! let z = surface.evaluate(500.0, 250.0);
//! # let _ = z;
//! # Ok(())
//! # }
//! ```
pub mod config;
pub mod errors;
pub mod hardware;
pub mod planner;
pub mod quality;
pub mod search;
pub mod surface;
pub mod types;

// Testing utilities - simulated hardware for offline testing
pub mod testing;

// Re-exports for convenience
pub use config::AutofocusConfig;
pub use errors::{Component, FocusError, HardwareError, Result};
pub use hardware::{CameraSession, ScoreFn, SharpnessScorer, StagePort};
pub use planner::{full_range, grid_points, LadderDirection, LocalLadder, ZScanRange};
pub use search::{
    focus_from_image_stack, focus_from_last_point, focus_next_point, focus_point,
    AdaptiveAnchor, AdaptiveParams, FullScanParams,
};
pub use surface::{predict_z_height, FitSurface, SurfaceInterpolator};
pub use types::{Frame, Point2D, PositionList, ScoreTrace, StagePosition};

/// Initialize logging for the autofocus system
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "stagefocus=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}
