use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gridmatch::{
    estimate_axis, extract_sub_views, walk_axis, CalibrationConfig, CalibrationSolver,
    CameraIntrinsics, CameraModel, GridAxis, GridMatcher, MatchGridConfig, MatchGridStage,
    PlanarCalibrator, PlanarView, PointOrder, RadialTangentialDistortion, SubViewConfig,
    ViewPose,
};
use image::{GrayImage, Luma};

fn make_grid(cols: usize, rows: usize, origin: [f64; 2], spacing: [f64; 2]) -> Vec<[f64; 2]> {
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

fn make_model(stage: &str, points: &[[f64; 2]]) -> serde_json::Value {
    let rects: Vec<serde_json::Value> = points
        .iter()
        .map(|p| serde_json::json!({ "x": p[0], "y": p[1] }))
        .collect();
    let mut model = serde_json::Map::new();
    model.insert(stage.to_string(), serde_json::json!({ "rects": rects }));
    serde_json::Value::Object(model)
}

fn bench_camera() -> CameraModel {
    CameraModel {
        intrinsics: CameraIntrinsics {
            fx: 900.0,
            fy: 880.0,
            cx: 640.0,
            cy: 480.0,
        },
        distortion: RadialTangentialDistortion {
            k1: -0.1,
            k2: 0.02,
            ..Default::default()
        },
    }
}

fn make_views() -> Vec<PlanarView> {
    let camera = bench_camera();
    let object_points: Vec<[f64; 3]> = (0..7)
        .flat_map(|r| (0..8).map(move |c| [25.0 * (c as f64 - 3.5), 25.0 * (r as f64 - 3.0), 0.0]))
        .collect();
    let poses = [
        ([0.25, -0.1, 0.02], [-20.0, 10.0, 450.0]),
        ([-0.2, 0.3, -0.05], [15.0, -5.0, 500.0]),
        ([0.1, 0.25, 0.1], [5.0, 20.0, 420.0]),
        ([-0.3, -0.2, 0.0], [-10.0, -15.0, 480.0]),
    ];
    poses
        .iter()
        .map(|&(rvec, tvec)| {
            let pose = ViewPose { rvec, tvec };
            let image_points = object_points
                .iter()
                .filter_map(|&p| camera.project_camera_point(pose.transform(p)))
                .collect();
            PlanarView {
                image_points,
                object_points: object_points.clone(),
            }
        })
        .collect()
}

fn bench_grid_match(c: &mut Criterion) {
    let points = make_grid(30, 20, [30.0, 30.0], [40.0, 40.0]);
    let row_major = PointOrder::RowMajor.sorted(&points);
    let col_major = PointOrder::ColumnMajor.sorted(&points);

    c.bench_function("sort_600pts", |b| {
        b.iter(|| {
            let sorted = PointOrder::RowMajor.sorted(black_box(&points));
            black_box(sorted.len())
        })
    });

    c.bench_function("estimate_axis_600pts", |b| {
        b.iter(|| {
            let est = estimate_axis(black_box(&row_major), GridAxis::Columns, 0.35, 5.0);
            black_box(est.count1)
        })
    });

    let columns = estimate_axis(&row_major, GridAxis::Columns, 0.35, 5.0)
        .spacing()
        .expect("synthetic grid has regular columns");
    let rows = estimate_axis(&col_major, GridAxis::Rows, 0.35, 5.0)
        .spacing()
        .expect("synthetic grid has regular rows");
    let pitch = [columns.pixel_pitch, rows.pixel_pitch];

    c.bench_function("walk_and_merge_600pts", |b| {
        b.iter(|| {
            let col_walk = walk_axis(&row_major, GridAxis::Columns, &columns.band, pitch, None);
            let row_walk = walk_axis(&col_major, GridAxis::Rows, &rows.band, pitch, col_walk.last);
            let mut matcher = GridMatcher::new();
            for p in col_walk.proposals.iter().chain(&row_walk.proposals) {
                matcher.add(p.image, p.grid);
            }
            black_box(matcher.len())
        })
    });

    let mut matcher = GridMatcher::new();
    let col_walk = walk_axis(&row_major, GridAxis::Columns, &columns.band, pitch, None);
    let row_walk = walk_axis(&col_major, GridAxis::Rows, &rows.band, pitch, col_walk.last);
    for p in col_walk.proposals.iter().chain(&row_walk.proposals) {
        matcher.add(p.image, p.grid);
    }
    let index = matcher.build_index([1280, 860], pitch);
    let window = SubViewConfig::default();

    c.bench_function("sub_views_30x20", |b| {
        b.iter(|| {
            let views = extract_sub_views(black_box(&index), &matcher, &window, [5.0, 5.0]);
            black_box(views.len())
        })
    });
}

fn bench_calibrate(c: &mut Criterion) {
    let views = make_views();

    let linear = PlanarCalibrator::new(CalibrationConfig {
        max_iterations: 0,
        ..Default::default()
    });
    c.bench_function("calibrate_linear_4views", |b| {
        b.iter(|| {
            let calib = linear.calibrate(black_box(&views), [1280, 960]);
            black_box(calib.map(|c| c.rms_error).unwrap_or(f64::NAN))
        })
    });

    let refined = PlanarCalibrator::new(CalibrationConfig::default());
    c.bench_function("calibrate_lm_4views", |b| {
        b.iter(|| {
            let calib = refined.calibrate(black_box(&views), [1280, 960]);
            black_box(calib.map(|c| c.rms_error).unwrap_or(f64::NAN))
        })
    });
}

fn bench_stage(c: &mut Criterion) {
    let model = make_model("blobs", &make_grid(30, 20, [30.0, 30.0], [40.0, 40.0]));
    let image = GrayImage::from_fn(1280, 860, |x, y| Luma([((x ^ y) & 0xff) as u8]));
    let stage = MatchGridStage::new(MatchGridConfig::for_model("blobs"));

    c.bench_function("match_grid_stage_1280x860", |b| {
        b.iter(|| {
            let mut img = image.clone();
            let report = stage.apply(black_box(&model), &mut img);
            black_box(report.rects.len())
        })
    });
}

criterion_group!(hotpaths, bench_grid_match, bench_calibrate, bench_stage);
criterion_main!(hotpaths);
