/// Hardware seams consumed by the focus searches
///
/// The crate never talks to a driver directly. Stage motion, frame capture and
/// sharpness scoring are all reached through the traits below, so a real
/// microscope, a simulator or a scripted test double can be plugged in.
pub mod session;

pub use session::CameraSession;

use crate::errors::HardwareError;
use crate::types::Frame;

/// Motorized stage plus the camera mounted on it.
///
/// All calls block until the hardware has acted.
pub trait StagePort {
    /// Current focus-axis (z) position
    fn get_position(&mut self) -> Result<f64, HardwareError>;

    /// Command a move. Axes passed as `None` must stay where they are.
    fn set_position(
        &mut self,
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
    ) -> Result<(), HardwareError>;

    fn wait_for_motion_complete(&mut self) -> Result<(), HardwareError>;

    fn capture_frame(&mut self) -> Result<Frame, HardwareError>;

    fn open_camera(&mut self) -> Result<(), HardwareError> {
        Ok(())
    }

    fn close_camera(&mut self) -> Result<(), HardwareError> {
        Ok(())
    }

    /// Move and block until the stage has settled
    fn move_and_settle(
        &mut self,
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
    ) -> Result<(), HardwareError> {
        self.set_position(x, y, z)?;
        self.wait_for_motion_complete()
    }
}

/// Scalar focus metric, lower means sharper.
///
/// Scores only need to be comparable within one device and session.
pub trait SharpnessScorer {
    fn score(&self, frame: &Frame) -> Result<f64, HardwareError>;
}

impl<T: SharpnessScorer + ?Sized> SharpnessScorer for &T {
    fn score(&self, frame: &Frame) -> Result<f64, HardwareError> {
        (**self).score(frame)
    }
}

impl<T: SharpnessScorer + ?Sized> SharpnessScorer for Box<T> {
    fn score(&self, frame: &Frame) -> Result<f64, HardwareError> {
        (**self).score(frame)
    }
}

/// Adapts a plain closure into a [`SharpnessScorer`]
pub struct ScoreFn<F>(pub F);

impl<F> SharpnessScorer for ScoreFn<F>
where
    F: Fn(&Frame) -> f64,
{
    fn score(&self, frame: &Frame) -> Result<f64, HardwareError> {
        Ok((self.0)(frame))
    }
}
