//! Joint Levenberg-Marquardt refinement of camera and view poses.

use std::collections::HashMap;

use nalgebra::{Rotation3, Vector3};
use tiny_solver::factors::na as ts_na;
use tiny_solver::Optimizer;

use super::{CalibrationConfig, PlanarView};
use crate::pixelmap::CameraModel;

/// Object-to-camera pose of one view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewPose {
    /// Rodrigues rotation vector.
    pub rvec: [f64; 3],
    pub tvec: [f64; 3],
}

impl ViewPose {
    pub fn is_finite(&self) -> bool {
        self.rvec.iter().chain(&self.tvec).all(|v| v.is_finite())
    }

    /// Transform an object point into the camera frame.
    pub fn transform(&self, p: [f64; 3]) -> [f64; 3] {
        let rot = Rotation3::new(Vector3::from(self.rvec));
        let pc = rot * Vector3::from(p) + Vector3::from(self.tvec);
        [pc.x, pc.y, pc.z]
    }
}

/// Root-mean-square reprojection error over every observation of every
/// view. Points that cannot be projected count as infinite error.
pub fn reprojection_rms(camera: &CameraModel, poses: &[ViewPose], views: &[PlanarView]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for (pose, view) in poses.iter().zip(views) {
        for (obj, img) in view.object_points.iter().zip(&view.image_points) {
            sum += match camera.project_camera_point(pose.transform(*obj)) {
                Some(p) => (p[0] - img[0]).powi(2) + (p[1] - img[1]).powi(2),
                None => f64::INFINITY,
            };
            count += 1;
        }
    }
    if count == 0 {
        return 0.0;
    }
    (sum / count as f64).sqrt()
}

// ── Residual ─────────────────────────────────────────────────────────────

const CAM: &str = "cam";
const K3: usize = 8;
const P1: usize = 6;
const P2: usize = 7;

#[inline]
fn lit<T: ts_na::RealField>(v: f64) -> T {
    ts_na::convert(v)
}

/// Rotate `p` by the Rodrigues vector `r`.
fn rodrigues_rotate<T: ts_na::RealField>(r: [T; 3], p: [T; 3]) -> [T; 3] {
    let theta2 = r[0].clone() * r[0].clone() + r[1].clone() * r[1].clone() + r[2].clone() * r[2].clone();
    let cross = |a: &[T; 3], b: &[T; 3]| {
        [
            a[1].clone() * b[2].clone() - a[2].clone() * b[1].clone(),
            a[2].clone() * b[0].clone() - a[0].clone() * b[2].clone(),
            a[0].clone() * b[1].clone() - a[1].clone() * b[0].clone(),
        ]
    };

    if theta2 > lit::<T>(1e-16) {
        let theta = theta2.sqrt();
        let k = [
            r[0].clone() / theta.clone(),
            r[1].clone() / theta.clone(),
            r[2].clone() / theta.clone(),
        ];
        let (s, c) = (theta.clone().sin(), theta.cos());
        let kxp = cross(&k, &p);
        let kdp = k[0].clone() * p[0].clone() + k[1].clone() * p[1].clone() + k[2].clone() * p[2].clone();
        let w = kdp * (lit::<T>(1.0) - c.clone());
        std::array::from_fn(|i| {
            p[i].clone() * c.clone() + kxp[i].clone() * s.clone() + k[i].clone() * w.clone()
        })
    } else {
        // First order near the identity.
        let rxp = cross(&r, &p);
        std::array::from_fn(|i| p[i].clone() + rxp[i].clone())
    }
}

/// Pixel residual of one observation against `cam` and one view pose.
#[derive(Debug, Clone)]
struct ReprojectionFactor {
    object: [f64; 3],
    image: [f64; 2],
}

impl<T: ts_na::RealField> tiny_solver::factors::Factor<T> for ReprojectionFactor {
    fn residual_func(&self, params: &[ts_na::DVector<T>]) -> ts_na::DVector<T> {
        let cam = &params[0];
        let pose = &params[1];

        let r = [pose[0].clone(), pose[1].clone(), pose[2].clone()];
        let p = self.object.map(lit::<T>);
        let rotated = rodrigues_rotate(r, p);
        let x_c = rotated[0].clone() + pose[3].clone();
        let y_c = rotated[1].clone() + pose[4].clone();
        let z_c = rotated[2].clone() + pose[5].clone();

        let x = x_c / z_c.clone();
        let y = y_c / z_c;
        let (fx, fy, cx, cy) = (cam[0].clone(), cam[1].clone(), cam[2].clone(), cam[3].clone());
        let (k1, k2, p1, p2, k3) = (
            cam[4].clone(),
            cam[5].clone(),
            cam[6].clone(),
            cam[7].clone(),
            cam[8].clone(),
        );

        let r2 = x.clone() * x.clone() + y.clone() * y.clone();
        let r4 = r2.clone() * r2.clone();
        let r6 = r4.clone() * r2.clone();
        let radial = lit::<T>(1.0) + k1 * r2.clone() + k2 * r4 + k3 * r6;
        let two = lit::<T>(2.0);
        let xy = x.clone() * y.clone();
        let xd = x.clone() * radial.clone()
            + two.clone() * p1.clone() * xy.clone()
            + p2.clone() * (r2.clone() + two.clone() * x.clone() * x);
        let yd = y.clone() * radial
            + p1 * (r2 + two.clone() * y.clone() * y)
            + two * p2 * xy;

        let u = fx * xd + cx;
        let v = fy * yd + cy;
        ts_na::DVector::<T>::from_vec(vec![u - lit::<T>(self.image[0]), v - lit::<T>(self.image[1])])
    }
}

fn pose_key(i: usize) -> String {
    format!("pose/{}", i)
}

// ── Solve ────────────────────────────────────────────────────────────────

/// Refine intrinsics, distortion and poses from a linear estimate.
///
/// Returns `None` when the optimizer fails or produces non-finite values.
pub(super) fn refine(
    camera: &CameraModel,
    poses: &[ViewPose],
    views: &[PlanarView],
    config: &CalibrationConfig,
) -> Option<(CameraModel, Vec<ViewPose>)> {
    let mut problem = tiny_solver::Problem::new();
    let keys: Vec<String> = (0..views.len()).map(pose_key).collect();

    let mut observations = 0usize;
    for (view, key) in views.iter().zip(&keys) {
        for (obj, img) in view.object_points.iter().zip(&view.image_points) {
            problem.add_residual_block(
                2,
                &[CAM, key.as_str()],
                Box::new(ReprojectionFactor {
                    object: *obj,
                    image: *img,
                }),
                None,
            );
            observations += 1;
        }
    }
    if config.fix_k3 {
        problem.fix_variable(CAM, K3);
    }
    if config.fix_tangential {
        problem.fix_variable(CAM, P1);
        problem.fix_variable(CAM, P2);
    }

    let mut initial = HashMap::<String, ts_na::DVector<f64>>::new();
    initial.insert(
        CAM.to_string(),
        ts_na::DVector::from_column_slice(&camera.to_params()),
    );
    for (pose, key) in poses.iter().zip(&keys) {
        let [rx, ry, rz] = pose.rvec;
        let [tx, ty, tz] = pose.tvec;
        initial.insert(key.clone(), ts_na::DVector::from_vec(vec![rx, ry, rz, tx, ty, tz]));
    }

    let optimizer = tiny_solver::LevenbergMarquardtOptimizer::default();
    let options = tiny_solver::OptimizerOptions {
        max_iteration: config.max_iterations.max(1),
        verbosity_level: 0,
        ..Default::default()
    };
    let result = optimizer.optimize(&problem, &initial, Some(options))?;

    let refined_camera = CameraModel::from_params(result.get(CAM)?.as_slice())?;

    let mut refined_poses = Vec::with_capacity(keys.len());
    for key in &keys {
        let v = result.get(key)?;
        if v.len() != 6 {
            return None;
        }
        let pose = ViewPose {
            rvec: [v[0], v[1], v[2]],
            tvec: [v[3], v[4], v[5]],
        };
        if !pose.is_finite() {
            return None;
        }
        refined_poses.push(pose);
    }

    tracing::debug!(
        observations,
        views = views.len(),
        fx = refined_camera.intrinsics.fx,
        k1 = refined_camera.distortion.k1,
        "calibration refined"
    );
    Some((refined_camera, refined_poses))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibrate::tests::{tilted_views, true_camera};
    use crate::pixelmap::{CameraIntrinsics, RadialTangentialDistortion};
    use approx::assert_abs_diff_eq;

    #[test]
    fn generic_rotation_matches_nalgebra() {
        let r = [0.3, -0.5, 0.2];
        let p = [1.5, -2.0, 4.0];
        let expected = Rotation3::new(Vector3::from(r)) * Vector3::from(p);
        let got = rodrigues_rotate(r, p);
        for i in 0..3 {
            assert_abs_diff_eq!(got[i], expected[i], epsilon = 1e-12);
        }
        assert_eq!(rodrigues_rotate([0.0; 3], p), p);
    }

    #[test]
    fn factor_residual_is_zero_at_truth() {
        use tiny_solver::factors::Factor;

        let cam = true_camera();
        let pose = ViewPose {
            rvec: [0.1, 0.2, -0.05],
            tvec: [3.0, -4.0, 500.0],
        };
        let obj = [12.0, -7.0, 0.0];
        let img = cam.project_camera_point(pose.transform(obj)).unwrap();

        let factor = ReprojectionFactor { object: obj, image: img };
        let k = cam.intrinsics;
        let d = cam.distortion.coeffs();
        let params = [
            ts_na::DVector::from_vec(vec![k.fx, k.fy, k.cx, k.cy, d[0], d[1], d[2], d[3], d[4]]),
            ts_na::DVector::from_vec(vec![0.1, 0.2, -0.05, 3.0, -4.0, 500.0]),
        ];
        let res: ts_na::DVector<f64> = factor.residual_func(&params);
        assert_abs_diff_eq!(res[0], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(res[1], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn rms_is_zero_for_exact_views() {
        let cam = true_camera();
        let views = tilted_views(&cam);
        let poses = [
            ([0.25, -0.15, 0.05], [-10.0, 5.0, 350.0]),
            ([-0.3, 0.2, -0.1], [15.0, -8.0, 380.0]),
            ([0.1, 0.35, 0.2], [5.0, 12.0, 330.0]),
            ([-0.2, -0.3, 0.0], [-12.0, -6.0, 400.0]),
        ]
        .map(|(rvec, tvec)| ViewPose { rvec, tvec });
        assert!(reprojection_rms(&cam, &poses, &views) < 1e-9);

        let mut shifted = poses;
        shifted[0].tvec[0] += 1.0;
        assert!(reprojection_rms(&cam, &shifted, &views) > 0.1);
    }

    #[test]
    fn refinement_reduces_error_from_perturbed_start() {
        let cam = true_camera();
        let views = tilted_views(&cam);
        let start = CameraModel {
            intrinsics: CameraIntrinsics {
                fx: 780.0,
                fy: 770.0,
                cx: 320.0,
                cy: 240.0,
            },
            distortion: RadialTangentialDistortion::default(),
        };
        let (_, poses) = crate::calibrate::PlanarCalibrator::default()
            .initial_estimate(&views, [640, 480])
            .unwrap();
        let before = reprojection_rms(&start, &poses, &views);
        let (refined, refined_poses) =
            refine(&start, &poses, &views, &CalibrationConfig::default()).unwrap();
        let after = reprojection_rms(&refined, &refined_poses, &views);
        assert!(after < before * 0.1, "before {} after {}", before, after);
        assert_eq!(refined.distortion.k3, 0.0);
    }
}
