//! Shared synthetic data for unit tests.

use nalgebra::{Rotation3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::calibrate::PlanarView;
use crate::pixelmap::CameraModel;

/// `cols x rows` lattice in row-major order: index `i` is column `i % cols`,
/// row `i / cols`.
pub(crate) fn regular_grid(
    cols: usize,
    rows: usize,
    origin: [f64; 2],
    spacing: [f64; 2],
) -> Vec<[f64; 2]> {
    let xs: Vec<f64> = (0..cols).map(|c| origin[0] + spacing[0] * c as f64).collect();
    let ys: Vec<f64> = (0..rows).map(|r| origin[1] + spacing[1] * r as f64).collect();
    lattice(&xs, &ys)
}

/// Cartesian product of explicit line positions, row-major.
pub(crate) fn lattice(xs: &[f64], ys: &[f64]) -> Vec<[f64; 2]> {
    ys.iter()
        .flat_map(|&y| xs.iter().map(move |&x| [x, y]))
        .collect()
}

/// Add uniform noise in `[-amplitude, amplitude]` to every coordinate.
pub(crate) fn jitter(points: &[[f64; 2]], amplitude: f64, seed: u64) -> Vec<[f64; 2]> {
    let mut rng = StdRng::seed_from_u64(seed);
    points
        .iter()
        .map(|p| {
            [
                p[0] + rng.gen_range(-amplitude..=amplitude),
                p[1] + rng.gen_range(-amplitude..=amplitude),
            ]
        })
        .collect()
}

/// Model JSON with one stage holding `{x, y}` rects.
pub(crate) fn rects_model(stage: &str, points: &[[f64; 2]]) -> serde_json::Value {
    let rects: Vec<serde_json::Value> = points
        .iter()
        .map(|p| serde_json::json!({ "x": p[0], "y": p[1], "width": 4, "height": 4 }))
        .collect();
    let mut model = serde_json::Map::new();
    model.insert(stage.to_string(), serde_json::json!({ "rects": rects }));
    serde_json::Value::Object(model)
}

/// Planar `cols x rows` target at `pitch`, centred on the origin, `z = 0`.
pub(crate) fn planar_target(cols: usize, rows: usize, pitch: f64) -> Vec<[f64; 3]> {
    let cx = (cols as f64 - 1.0) / 2.0;
    let cy = (rows as f64 - 1.0) / 2.0;
    (0..rows)
        .flat_map(|r| {
            (0..cols).map(move |c| [pitch * (c as f64 - cx), pitch * (r as f64 - cy), 0.0])
        })
        .collect()
}

/// Render a view of `object_points` seen by `camera` at pose `(rvec, tvec)`.
pub(crate) fn project_view(
    camera: &CameraModel,
    rvec: [f64; 3],
    tvec: [f64; 3],
    object_points: &[[f64; 3]],
) -> PlanarView {
    let rot = Rotation3::new(Vector3::from(rvec));
    let t = Vector3::from(tvec);
    let image_points = object_points
        .iter()
        .map(|p| {
            let pc = rot * Vector3::from(*p) + t;
            camera
                .project_camera_point([pc.x, pc.y, pc.z])
                .expect("synthetic point must be in front of the camera")
        })
        .collect();
    PlanarView {
        image_points,
        object_points: object_points.to_vec(),
    }
}
