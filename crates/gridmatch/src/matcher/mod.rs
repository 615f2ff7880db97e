//! Grid structure recovery from unordered point detections.
//!
//! The pieces run in this order:
//!
//! 1. [`spacing`]: robust per-axis spacing from a sorted point sequence.
//! 2. [`walk`]: sequential neighbor walks proposing integer grid cells.
//! 3. [`store`]: deduplicated correspondences and the dense cell index.
//! 4. [`subview`]: overlapping windows over the cell index, used as
//!    calibration views.

pub mod spacing;
pub mod store;
pub mod subview;
pub mod walk;

pub use spacing::{
    estimate_axis, AxisEstimate, AxisEstimationError, AxisSpacing, GridAxis, ToleranceBand,
};
pub use store::{GridIndex, GridMatcher};
pub use subview::{extract_sub_views, SubView, SubViewConfig};
pub use walk::{walk_axis, AxisWalk};

/// A matched pair of image location and integer grid cell.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Correspondence {
    /// Detected image position (pixels).
    pub image: [f64; 2],
    /// Grid cell `[column, row]` in grid units.
    pub grid: [i32; 2],
}
