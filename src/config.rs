//! Configuration management for stagefocus
//!
//! Loads and saves scan parameters for the two focus strategies and the
//! default focus grid. Everything is passed to the searches explicitly; this
//! file only decides where the numbers come from.

use crate::errors::FocusError;
use crate::search::{AdaptiveParams, FullScanParams};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutofocusConfig {
    pub full_scan: FullScanConfig,
    pub adaptive: AdaptiveConfig,
    pub grid: GridConfig,
}

/// Brute-force z-stack search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullScanConfig {
    /// Distance between frames (um)
    pub delta_z: f64,
    /// Total z window around the current position (um)
    pub total_z: f64,
}

/// Adaptive search: seed scan plus local ladder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    /// Seed scan frame spacing (um)
    pub delta_z: f64,
    /// Seed scan window (um)
    pub total_z: f64,
    /// Spacing of the local ladder around the previous best z (um)
    pub ladder_step: f64,
    /// Half-width of the local ladder (um)
    pub ladder_span: f64,
}

/// Number of focus points across a chip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub points_x: usize,
    pub points_y: usize,
}

impl Default for AutofocusConfig {
    fn default() -> Self {
        Self {
            full_scan: FullScanConfig {
                delta_z: 5.0,
                total_z: 150.0,
            },
            adaptive: AdaptiveConfig {
                delta_z: 10.0,
                total_z: 150.0,
                ladder_step: 10.0,
                ladder_span: 35.0,
            },
            grid: GridConfig {
                points_x: 3,
                points_y: 3,
            },
        }
    }
}

impl AutofocusConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, FocusError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| FocusError::Config(format!("Failed to read config file: {}", e)))?;

        let config: AutofocusConfig = toml::from_str(&contents)
            .map_err(|e| FocusError::Config(format!("Failed to parse config file: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), FocusError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                FocusError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = self.to_toml()?;

        fs::write(path, toml_string)
            .map_err(|e| FocusError::Config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, FocusError> {
        toml::to_string_pretty(self)
            .map_err(|e| FocusError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("stagefocus.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    pub fn full_scan_params(&self) -> FullScanParams {
        FullScanParams {
            delta_z: self.full_scan.delta_z,
            total_z: self.full_scan.total_z,
        }
    }

    pub fn adaptive_params(&self) -> AdaptiveParams {
        AdaptiveParams {
            seed: FullScanParams {
                delta_z: self.adaptive.delta_z,
                total_z: self.adaptive.total_z,
            },
            ladder_step: self.adaptive.ladder_step,
            ladder_span: self.adaptive.ladder_span,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), FocusError> {
        self.full_scan_params().validate()?;
        self.adaptive_params().validate()?;

        if self.grid.points_x == 0 || self.grid.points_y == 0 {
            return Err(FocusError::Config(
                "Focus grid needs at least one point per axis".to_string(),
            ));
        }
        let total = self.grid.points_x.checked_mul(self.grid.points_y);
        if total.map_or(true, |n| n > 10_000) {
            return Err(FocusError::Config(
                "Focus grid must have at most 10000 points".to_string(),
            ));
        }

        Ok(())
    }
}
