use serde::Serialize;

use crate::calibrate::CameraCalibration;
use crate::matcher::AxisEstimate;

/// One matched point with its centred object coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedRect {
    pub x: f64,
    pub y: f64,
    pub obj_x: f64,
    pub obj_y: f64,
    pub obj_z: f64,
}

/// Calibration block of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationReport {
    /// Row-major 3x3 camera matrix.
    pub camera: [f64; 9],
    /// `[k1, k2, p1, p2, k3]`.
    pub dist_coeffs: [f64; 5],
    #[serde(rename = "rmserror")]
    pub rms_error: f64,
    /// Number of sub-views passed to the solver.
    pub images: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rvecs: Option<Vec<[f64; 3]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tvecs: Option<Vec<[f64; 3]>>,
}

impl CalibrationReport {
    pub fn new(calib: &CameraCalibration, emit_poses: bool) -> Self {
        Self {
            camera: calib.camera_matrix(),
            dist_coeffs: calib.dist_coeffs(),
            rms_error: calib.rms_error,
            images: calib.views,
            rvecs: emit_poses.then(|| calib.rvecs.clone()),
            tvecs: emit_poses.then(|| calib.tvecs.clone()),
        }
    }
}

/// Wall time of one stage state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub label: String,
    pub elapsed_ms: f64,
}

impl StageTiming {
    pub fn new(label: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            label: label.into(),
            elapsed_ms,
        }
    }
}

/// Per-state timing trace of one stage run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    pub fn push(&mut self, label: impl Into<String>, elapsed_ms: f64) {
        self.stages.push(StageTiming::new(label, elapsed_ms));
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.label.as_str())
    }
}

/// Stage output record.
///
/// Axis diagnostics are flattened under their `dx*` / `dy*` keys and kept
/// whenever estimation ran, even if it failed.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchGridReport {
    #[serde(flatten)]
    pub columns: Option<AxisEstimate>,
    #[serde(flatten)]
    pub rows: Option<AxisEstimate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rects: Vec<MatchedRect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_views: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibrate: Option<CalibrationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timing: TimingBreakdown,
}

impl MatchGridReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
