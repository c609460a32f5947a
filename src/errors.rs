use std::fmt;

/// Collaborator that produced a [`HardwareError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Component {
    Stage,
    Camera,
    Scorer,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Component::Stage => write!(f, "stage"),
            Component::Camera => write!(f, "camera"),
            Component::Scorer => write!(f, "scorer"),
        }
    }
}

/// Opaque failure reported by a stage, camera or scorer implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{component} failure: {message}")]
pub struct HardwareError {
    pub component: Component,
    pub message: String,
}

impl HardwareError {
    pub fn stage(message: impl Into<String>) -> Self {
        Self {
            component: Component::Stage,
            message: message.into(),
        }
    }

    pub fn camera(message: impl Into<String>) -> Self {
        Self {
            component: Component::Camera,
            message: message.into(),
        }
    }

    pub fn scorer(message: impl Into<String>) -> Self {
        Self {
            component: Component::Scorer,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FocusError {
    #[error("Invalid scan configuration: {0}")]
    InvalidScanConfig(String),

    #[error("Insufficient samples: need at least {required}, got {provided}")]
    InsufficientSamples { required: usize, provided: usize },

    #[error("Invalid samples: {0}")]
    InvalidSamples(String),

    #[error("Degenerate samples: {0}")]
    DegenerateSamples(String),

    #[error("Hardware failure: {0}")]
    HardwareFailure(#[from] HardwareError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, FocusError>;
