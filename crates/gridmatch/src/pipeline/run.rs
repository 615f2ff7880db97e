//! Stage orchestrator: candidates -> grid -> views -> camera -> rectified image.

use std::time::Instant;

use image::GrayImage;
use serde_json::Value;

use super::{
    load_candidates, CalibrationReport, MatchGridConfig, MatchGridError, MatchGridReport,
    MatchedRect, TimingBreakdown,
};
use crate::calibrate::CalibrationSolver;
use crate::matcher::{estimate_axis, extract_sub_views, walk_axis, GridAxis, GridMatcher};
use crate::ordering::PointOrder;
use crate::pixelmap::undistort_image;

fn timed<T>(timing: &mut TimingBreakdown, label: &str, f: impl FnOnce() -> T) -> T {
    let t0 = Instant::now();
    let out = f();
    timing.push(label, t0.elapsed().as_secs_f64() * 1e3);
    out
}

/// Run the stage. Never fails: errors land in [`MatchGridReport::error`].
pub(crate) fn run(
    config: &MatchGridConfig,
    solver: &dyn CalibrationSolver,
    model: &Value,
    image: &mut GrayImage,
) -> MatchGridReport {
    let t0 = Instant::now();
    let mut report = MatchGridReport::default();
    if let Err(e) = run_stages(config, solver, model, image, &mut report) {
        tracing::warn!(error = %e, "matchGrid failed");
        report.error = Some(e.to_string());
    }
    report.timing.total_ms = t0.elapsed().as_secs_f64() * 1e3;
    report
}

fn run_stages(
    config: &MatchGridConfig,
    solver: &dyn CalibrationSolver,
    model: &Value,
    image: &mut GrayImage,
    report: &mut MatchGridReport,
) -> Result<(), MatchGridError> {
    let timing = &mut report.timing;

    // ── load ─────────────────────────────────────────────────────────────
    let points = timed(timing, "load", || {
        config.validate().map_err(MatchGridError::InvalidConfig)?;
        load_candidates(model, &config.model)
    })?;

    // ── sort ─────────────────────────────────────────────────────────────
    let (row_major, col_major) = timed(timing, "sort", || {
        (
            PointOrder::RowMajor.sorted(&points),
            PointOrder::ColumnMajor.sorted(&points),
        )
    });

    // ── estimate ─────────────────────────────────────────────────────────
    let (columns, rows) = timed(timing, "estimate", || {
        (
            estimate_axis(&row_major, GridAxis::Columns, config.tolerance, config.sep_x),
            estimate_axis(&col_major, GridAxis::Rows, config.tolerance, config.sep_y),
        )
    });
    let spacing = (columns.spacing(), rows.spacing());
    report.columns = Some(columns);
    report.rows = Some(rows);
    let (col_spacing, row_spacing) = match spacing {
        (Ok(c), Ok(r)) => (c, r),
        (c, r) => {
            let errors = [c.err(), r.err()].into_iter().flatten().collect();
            return Err(MatchGridError::Estimation(errors));
        }
    };
    let timing = &mut report.timing;

    // ── walk ─────────────────────────────────────────────────────────────
    let pitch = [col_spacing.pixel_pitch, row_spacing.pixel_pitch];
    let matcher = timed(timing, "walk", || {
        let col_walk = walk_axis(&row_major, GridAxis::Columns, &col_spacing.band, pitch, None);
        let row_walk = walk_axis(&col_major, GridAxis::Rows, &row_spacing.band, pitch, col_walk.last);
        let mut matcher = GridMatcher::new();
        let proposed = col_walk.proposals.len() + row_walk.proposals.len();
        for c in col_walk.proposals.iter().chain(&row_walk.proposals) {
            matcher.add(c.image, c.grid);
        }
        tracing::debug!(proposed, accepted = matcher.len(), "correspondences merged");
        matcher
    });

    let rects: Vec<MatchedRect> = match matcher.grid_centroid() {
        Some(centre) => matcher
            .correspondences()
            .map(|c| MatchedRect {
                x: c.image[0],
                y: c.image[1],
                obj_x: config.sep_x * (c.grid[0] as f64 - centre[0]),
                obj_y: config.sep_y * (c.grid[1] as f64 - centre[1]),
                obj_z: config.obj_z,
            })
            .collect(),
        None => Vec::new(),
    };
    report.rects = rects;
    let timing = &mut report.timing;

    // ── index ────────────────────────────────────────────────────────────
    let (width, height) = image.dimensions();
    let index = timed(timing, "index", || matcher.build_index([width, height], pitch));

    // ── partition ────────────────────────────────────────────────────────
    let views = timed(timing, "partition", || {
        extract_sub_views(&index, &matcher, &config.sub_view, [config.sep_x, config.sep_y])
    });
    report.sub_views = Some(views.len());
    let timing = &mut report.timing;

    // ── calibrate ────────────────────────────────────────────────────────
    let planar: Vec<_> = views.into_iter().map(|v| v.view).collect();
    let calib = timed(timing, "calibrate", || solver.calibrate(&planar, [width, height]))?;
    report.calibrate = Some(CalibrationReport::new(&calib, config.calibration.emit_poses));
    let timing = &mut report.timing;

    // ── undistort ────────────────────────────────────────────────────────
    let rectified = timed(timing, "undistort", || undistort_image(image, &calib.camera));
    *image = rectified;

    tracing::info!(
        rects = matcher.len(),
        views = planar.len(),
        rms_error = calib.rms_error,
        "matchGrid complete"
    );
    Ok(())
}
