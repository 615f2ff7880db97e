use gridmatch::{MatchGridConfig, MatchGridStage};
use image::{GrayImage, Luma};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();

    let (cols, rows, pitch) = (16usize, 12usize, 24.0f64);
    let rects: Vec<serde_json::Value> = (0..rows)
        .flat_map(|r| {
            (0..cols).map(move |c| {
                serde_json::json!({
                    "x": 32.0 + pitch * c as f64,
                    "y": 28.0 + pitch * r as f64,
                    "width": 6,
                    "height": 6,
                })
            })
        })
        .collect();
    let model = serde_json::json!({ "blobs": { "rects": rects } });

    let mut image = GrayImage::from_fn(440, 340, |x, y| {
        Luma([if (x / 12 + y / 12) % 2 == 0 { 40 } else { 210 }])
    });

    let stage = MatchGridStage::new(MatchGridConfig::for_model("blobs"));
    let report = stage.apply(&model, &mut image);

    if let Some(error) = &report.error {
        return Err(error.clone().into());
    }
    println!(
        "Matched {} rects into {} views.",
        report.rects.len(),
        report.sub_views.unwrap_or(0)
    );
    if let Some(calib) = &report.calibrate {
        println!("camera: {:?}", calib.camera);
        println!("rms: {:.4}px", calib.rms_error);
    }

    if let Some(out_path) = args.get(1) {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(out_path, json)?;
        println!("Wrote {out_path}");
    }
    Ok(())
}
