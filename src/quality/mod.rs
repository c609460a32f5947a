/// Reference sharpness scorers
///
/// The searches treat scoring as a black box; production setups usually plug
/// in a trained model. These classic edge-energy metrics are here for
/// simulation, offline z-stacks and as a fallback when no model is available.
/// All of them follow the crate convention: lower is sharper.
pub mod sharpness;

pub use sharpness::{GradientEnergyScorer, LaplacianVarianceScorer};
