use super::StagePort;
use crate::errors::HardwareError;
use std::ops::{Deref, DerefMut};

/// Scoped camera acquisition around a multi-point scan.
///
/// The camera is opened on creation and closed exactly once: either by
/// [`CameraSession::finish`], which reports a failing close, or on drop, which
/// covers every early return and only logs a failing close.
pub struct CameraSession<'a, S: StagePort + ?Sized> {
    stage: &'a mut S,
    open: bool,
}

impl<'a, S: StagePort + ?Sized> CameraSession<'a, S> {
    pub fn open(stage: &'a mut S) -> Result<Self, HardwareError> {
        stage.open_camera()?;
        log::debug!("Camera opened");
        Ok(Self { stage, open: true })
    }

    pub fn finish(mut self) -> Result<(), HardwareError> {
        self.open = false;
        let result = self.stage.close_camera();
        log::debug!("Camera closed");
        result
    }
}

impl<S: StagePort + ?Sized> Deref for CameraSession<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.stage
    }
}

impl<S: StagePort + ?Sized> DerefMut for CameraSession<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.stage
    }
}

impl<S: StagePort + ?Sized> Drop for CameraSession<'_, S> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        match self.stage.close_camera() {
            Ok(()) => log::debug!("Camera closed after aborted scan"),
            Err(e) => log::warn!("Failed to close camera after aborted scan: {}", e),
        }
    }
}
