//! High-level stage API.
//!
//! [`MatchGridStage`] wraps a [`MatchGridConfig`] and, optionally, a custom
//! calibration solver. Create once, apply to many images.

use image::GrayImage;
use serde_json::Value;
use std::path::Path;

use crate::calibrate::{CalibrationSolver, PlanarCalibrator};
use crate::pipeline::{self, MatchGridConfig, MatchGridReport};

/// The `matchGrid` pipeline stage.
///
/// # Examples
///
/// ```
/// use gridmatch::{MatchGridConfig, MatchGridStage};
/// use image::GrayImage;
///
/// let stage = MatchGridStage::new(MatchGridConfig::for_model("blobs"));
/// let model = serde_json::json!({ "blobs": { "rects": [] } });
/// let mut image = GrayImage::new(64, 48);
/// let report = stage.apply(&model, &mut image);
/// assert_eq!(
///     report.error.as_deref(),
///     Some("Expected array of at least 2 rects to match")
/// );
/// ```
pub struct MatchGridStage {
    config: MatchGridConfig,
    /// `None` runs the built-in [`PlanarCalibrator`] with `config.calibration`.
    solver: Option<Box<dyn CalibrationSolver>>,
}

impl MatchGridStage {
    /// Stage with the built-in [`PlanarCalibrator`].
    pub fn new(config: MatchGridConfig) -> Self {
        Self {
            config,
            solver: None,
        }
    }

    /// Load config JSON and create a stage in one step.
    pub fn from_config_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self::new(MatchGridConfig::from_json_file(path)?))
    }

    /// Replace the calibration solver. `config.calibration` no longer
    /// applies once a custom solver is installed.
    pub fn with_solver(mut self, solver: Box<dyn CalibrationSolver>) -> Self {
        self.solver = Some(solver);
        self
    }

    /// Access the current configuration.
    pub fn config(&self) -> &MatchGridConfig {
        &self.config
    }

    /// Mutable access to configuration for post-construction tuning.
    /// Every field, `calibration` included, applies from the next
    /// [`MatchGridStage::apply`].
    pub fn config_mut(&mut self) -> &mut MatchGridConfig {
        &mut self.config
    }

    /// Match the candidate rects named by the config and calibrate.
    ///
    /// On success `image` is replaced by its rectified version. On failure
    /// the report carries the error and whatever diagnostics were computed,
    /// and `image` is left untouched.
    pub fn apply(&self, model: &Value, image: &mut GrayImage) -> MatchGridReport {
        match &self.solver {
            Some(solver) => pipeline::run(&self.config, solver.as_ref(), model, image),
            None => {
                let builtin = PlanarCalibrator::new(self.config.calibration);
                pipeline::run(&self.config, &builtin, model, image)
            }
        }
    }
}

/// One-shot [`MatchGridStage::apply`] with the built-in solver.
pub fn apply_match_grid(
    config: &MatchGridConfig,
    model: &Value,
    image: &mut GrayImage,
) -> MatchGridReport {
    MatchGridStage::new(config.clone()).apply(model, image)
}
