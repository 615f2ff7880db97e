//! Overlapping windows over the grid index, each one a calibration view.

use serde::{Deserialize, Serialize};

use super::store::{GridIndex, GridMatcher};
use crate::calibrate::PlanarView;

/// Window geometry for sub-view extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SubViewConfig {
    /// Window height in grid cells.
    pub rows: usize,
    /// Window width in grid cells.
    pub cols: usize,
    /// Minimum populated cells for a window to become a view.
    /// `None` means two thirds of the window, at least 4.
    pub min_points: Option<usize>,
}

impl Default for SubViewConfig {
    fn default() -> Self {
        Self {
            rows: 7,
            cols: 8,
            min_points: None,
        }
    }
}

impl SubViewConfig {
    pub fn effective_min_points(&self) -> usize {
        self.min_points
            .unwrap_or_else(|| (self.rows * self.cols * 2 / 3).max(4))
    }
}

/// Correspondences gathered from one window.
#[derive(Debug, Clone, PartialEq)]
pub struct SubView {
    /// Top-left window cell `[row, col]`.
    pub origin: [usize; 2],
    pub view: PlanarView,
}

/// Start offsets of a `window`-wide window sliding over `extent` cells.
///
/// Positions step by a third of the slack (at least one cell), starting at
/// zero. Empty when the window does not fit.
pub fn window_starts(extent: usize, window: usize) -> Vec<usize> {
    if window == 0 || extent < window {
        return Vec::new();
    }
    let slack = extent - window;
    let stride = (slack / 3).max(1);
    (0..=slack).step_by(stride).collect()
}

/// Extract every window holding at least the configured number of points.
///
/// Object coordinates are centred on the window's centre cell and scaled by
/// `object_sep`; the target plane is `z = 0`.
pub fn extract_sub_views(
    index: &GridIndex,
    matcher: &GridMatcher,
    config: &SubViewConfig,
    object_sep: [f64; 2],
) -> Vec<SubView> {
    let min_points = config.effective_min_points();
    let cy = (config.rows as f64 - 1.0) / 2.0;
    let cx = (config.cols as f64 - 1.0) / 2.0;

    let mut views = Vec::new();
    for row0 in window_starts(index.rows(), config.rows) {
        for col0 in window_starts(index.cols(), config.cols) {
            let mut view = PlanarView::default();
            for r in 0..config.rows {
                for c in 0..config.cols {
                    let Some(corr) = index.get(row0 + r, col0 + c).and_then(|i| matcher.get(i))
                    else {
                        continue;
                    };
                    view.image_points.push(corr.image);
                    view.object_points.push([
                        object_sep[0] * (c as f64 - cx),
                        object_sep[1] * (r as f64 - cy),
                        0.0,
                    ]);
                }
            }
            if view.len() >= min_points {
                views.push(SubView {
                    origin: [row0, col0],
                    view,
                });
            }
        }
    }

    tracing::debug!(
        views = views.len(),
        min_points,
        index_rows = index.rows(),
        index_cols = index.cols(),
        "sub-views extracted"
    );
    views
}
