//! Simulated microscope stage
//!
//! A [`StagePort`] that needs no hardware. The specimen's focal plane is a
//! function of (x, y); captured frames are a checkerboard whose contrast falls
//! off with distance from that plane, so real sharpness metrics rank them
//! correctly. Every call is recorded for ordering assertions.

use crate::errors::HardwareError;
use crate::hardware::StagePort;
use crate::types::{Frame, StagePosition};

const DEFAULT_FRAME_SIZE: u32 = 16;
const CHECKER_CELL: u32 = 2;
const BASE_INTENSITY: f64 = 2000.0;
/// z distance at which contrast has halved
const DEFOCUS_SCALE: f64 = 10.0;

/// One recorded interaction with the stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageCall {
    GetPosition,
    SetPosition {
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
    },
    WaitForMotion,
    CaptureFrame,
    OpenCamera,
    CloseCamera,
}

pub struct SimulatedStage {
    position: StagePosition,
    focal_plane: Box<dyn Fn(f64, f64) -> f64>,
    frame_size: u32,
    calls: Vec<StageCall>,
    camera_open: bool,
    camera_opens: usize,
    camera_closes: usize,
    frames_captured: usize,
    captures_while_closed: usize,
    fail_capture_at: Option<usize>,
}

impl SimulatedStage {
    pub fn new(focal_plane: impl Fn(f64, f64) -> f64 + 'static) -> Self {
        Self {
            position: StagePosition::new(0.0, 0.0, 0.0),
            focal_plane: Box::new(focal_plane),
            frame_size: DEFAULT_FRAME_SIZE,
            calls: Vec::new(),
            camera_open: false,
            camera_opens: 0,
            camera_closes: 0,
            frames_captured: 0,
            captures_while_closed: 0,
            fail_capture_at: None,
        }
    }

    /// Specimen in focus at the same z everywhere
    pub fn flat(z_focus: f64) -> Self {
        Self::new(move |_, _| z_focus)
    }

    /// Specimen in focus on `z = a*x + b*y + c`
    pub fn tilted(a: f64, b: f64, c: f64) -> Self {
        Self::new(move |x, y| a * x + b * y + c)
    }

    pub fn with_start_z(mut self, z: f64) -> Self {
        self.position.z = z;
        self
    }

    pub fn with_frame_size(mut self, size: u32) -> Self {
        self.frame_size = size.max(1);
        self
    }

    /// Make the `n`-th capture (1-based) fail with a camera error
    pub fn fail_capture_at(mut self, n: usize) -> Self {
        self.fail_capture_at = Some(n);
        self
    }

    pub fn focus_at(&self, x: f64, y: f64) -> f64 {
        (self.focal_plane)(x, y)
    }

    pub fn position(&self) -> StagePosition {
        self.position
    }

    pub fn calls(&self) -> &[StageCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// z targets of every move that set z, in order
    pub fn z_moves(&self) -> Vec<f64> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                StageCall::SetPosition { z: Some(z), .. } => Some(*z),
                _ => None,
            })
            .collect()
    }

    pub fn camera_is_open(&self) -> bool {
        self.camera_open
    }

    pub fn camera_opens(&self) -> usize {
        self.camera_opens
    }

    pub fn camera_closes(&self) -> usize {
        self.camera_closes
    }

    pub fn frames_captured(&self) -> usize {
        self.frames_captured
    }

    pub fn captures_while_closed(&self) -> usize {
        self.captures_while_closed
    }

    fn render(&self) -> Frame {
        let defocus = (self.position.z - self.focus_at(self.position.x, self.position.y)) / DEFOCUS_SCALE;
        let amplitude = BASE_INTENSITY / (1.0 + defocus * defocus);
        let size = self.frame_size;

        let data = (0..size * size)
            .map(|i| {
                let (x, y) = (i % size, i / size);
                let sign = if ((x / CHECKER_CELL) + (y / CHECKER_CELL)) % 2 == 0 {
                    1.0
                } else {
                    -1.0
                };
                (BASE_INTENSITY + sign * amplitude).round().clamp(0.0, u16::MAX as f64) as u16
            })
            .collect();

        Frame::new(size, size, data).with_position(self.position)
    }
}

impl StagePort for SimulatedStage {
    fn get_position(&mut self) -> Result<f64, HardwareError> {
        self.calls.push(StageCall::GetPosition);
        Ok(self.position.z)
    }

    fn set_position(
        &mut self,
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
    ) -> Result<(), HardwareError> {
        self.calls.push(StageCall::SetPosition { x, y, z });
        if let Some(x) = x {
            self.position.x = x;
        }
        if let Some(y) = y {
            self.position.y = y;
        }
        if let Some(z) = z {
            self.position.z = z;
        }
        Ok(())
    }

    fn wait_for_motion_complete(&mut self) -> Result<(), HardwareError> {
        self.calls.push(StageCall::WaitForMotion);
        Ok(())
    }

    fn capture_frame(&mut self) -> Result<Frame, HardwareError> {
        self.calls.push(StageCall::CaptureFrame);
        if self.fail_capture_at == Some(self.frames_captured + 1) {
            return Err(HardwareError::camera(format!(
                "simulated capture failure at frame {}",
                self.frames_captured + 1
            )));
        }
        if !self.camera_open {
            self.captures_while_closed += 1;
        }
        self.frames_captured += 1;
        Ok(self.render())
    }

    fn open_camera(&mut self) -> Result<(), HardwareError> {
        self.calls.push(StageCall::OpenCamera);
        if self.camera_open {
            return Err(HardwareError::camera("camera already open"));
        }
        self.camera_open = true;
        self.camera_opens += 1;
        Ok(())
    }

    fn close_camera(&mut self) -> Result<(), HardwareError> {
        self.calls.push(StageCall::CloseCamera);
        if !self.camera_open {
            return Err(HardwareError::camera("camera already closed"));
        }
        self.camera_open = false;
        self.camera_closes += 1;
        Ok(())
    }
}
