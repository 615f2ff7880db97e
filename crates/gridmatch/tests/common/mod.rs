#![allow(dead_code)]

use serde_json::{json, Map, Value};

/// `cols x rows` lattice, row-major.
pub fn regular_grid(cols: usize, rows: usize, origin: [f64; 2], spacing: [f64; 2]) -> Vec<[f64; 2]> {
    (0..rows)
        .flat_map(|r| {
            (0..cols).map(move |c| {
                [
                    origin[0] + spacing[0] * c as f64,
                    origin[1] + spacing[1] * r as f64,
                ]
            })
        })
        .collect()
}

/// Pipeline model with one stage of `{x, y, width, height}` rects.
pub fn rects_model(stage: &str, points: &[[f64; 2]]) -> Value {
    let rects: Vec<Value> = points
        .iter()
        .map(|p| json!({ "x": p[0], "y": p[1], "width": 3, "height": 3 }))
        .collect();
    let mut model = Map::new();
    model.insert(stage.to_string(), json!({ "rects": rects }));
    Value::Object(model)
}

/// Shift every point by a seeded uniform offset in `[-amplitude, amplitude]`.
pub fn jitter(points: &[[f64; 2]], amplitude: f64, seed: u64) -> Vec<[f64; 2]> {
    use rand::{rngs::StdRng, Rng, SeedableRng};
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
