//! gridmatch: grid matching and camera calibration from point detections.
//!
//! Takes unordered point detections of a regular planar grid (e.g. blob or
//! rect centres from an upstream detector), recovers which grid cell each
//! point belongs to, and calibrates the camera from overlapping windows of
//! the recovered grid. The stages are:
//!
//! 1. **Ordering** – row-major and column-major sorts of the candidates.
//! 2. **Spacing** – median-gap estimation with a tolerance band per axis.
//! 3. **Walk** – sequential neighbour walks assigning integer grid cells.
//! 4. **Store** – deduplicated correspondences and a dense cell index.
//! 5. **Sub-views** – overlapping windows used as calibration views.
//! 6. **Calibrate** – homography initialisation and LM refinement.
//! 7. **Undistort** – rectification of the stage image.
//!
//! # Public API
//! - [`MatchGridStage`] and [`MatchGridConfig`] as primary entry points
//! - [`MatchGridReport`] with per-axis diagnostics and the calibration block
//! - [`CalibrationSolver`] to plug in another calibration backend
//! - the grid matching primitives for callers assembling their own flow

mod api;
mod calibrate;
mod homography;
mod matcher;
mod ordering;
mod pipeline;
mod pixelmap;

#[cfg(test)]
pub(crate) mod test_utils;

pub use api::{apply_match_grid, MatchGridStage};
pub use calibrate::{
    CalibrationConfig, CalibrationError, CalibrationSolver, CameraCalibration, PlanarCalibrator,
    PlanarView, ViewPose,
};
pub use homography::{estimate_homography_dlt, rms_transfer_error, HomographyError};
pub use matcher::{
    estimate_axis, extract_sub_views, walk_axis, AxisEstimate, AxisEstimationError, AxisSpacing,
    AxisWalk, Correspondence, GridAxis, GridIndex, GridMatcher, SubView, SubViewConfig,
    ToleranceBand,
};
pub use ordering::{PointOrder, LINE_TOLERANCE_PX};
pub use pipeline::{
    load_candidates, CalibrationReport, MatchGridConfig, MatchGridError, MatchGridReport,
    MatchedRect, StageTiming, TimingBreakdown,
};
pub use pixelmap::{
    undistort_image, CameraIntrinsics, CameraModel, PixelMapper, RadialTangentialDistortion,
    UndistortConfig, CAMERA_PARAM_COUNT,
};
