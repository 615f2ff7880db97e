//! Planar multi-view camera calibration.
//!
//! Each [`PlanarView`] pairs image points with object points on one target
//! plane. [`PlanarCalibrator`] estimates a pinhole camera with
//! radial-tangential distortion from a set of such views:
//!
//! 1. one DLT homography per view,
//! 2. closed-form focal lengths with the principal point at the image centre,
//! 3. per-view poses from homography decomposition,
//! 4. joint Levenberg-Marquardt refinement of intrinsics, distortion and poses.
//!
//! Any other estimator can be plugged into the stage through
//! [`CalibrationSolver`].

mod init;
mod refine;

use serde::{Deserialize, Serialize};

use crate::homography::{self, HomographyError};
use crate::pixelmap::{CameraIntrinsics, CameraModel};

pub use init::{initial_focal, pose_from_homography};
pub use refine::{reprojection_rms, ViewPose};

/// Correspondences observed in one view of a planar target.
///
/// Object points are expected on a common plane `z = const`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanarView {
    pub image_points: Vec<[f64; 2]>,
    pub object_points: Vec<[f64; 3]>,
}

impl PlanarView {
    pub fn len(&self) -> usize {
        self.image_points.len().min(self.object_points.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Error type ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    NoViews,
    TooFewPoints {
        view: usize,
        needed: usize,
        got: usize,
    },
    Homography {
        view: usize,
        source: HomographyError,
    },
    DegenerateIntrinsics,
    NumericalFailure(String),
}

impl std::fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoViews => write!(f, "no calibration views"),
            Self::TooFewPoints { view, needed, got } => {
                write!(f, "view {}: need {} points, got {}", view, needed, got)
            }
            Self::Homography { view, source } => {
                write!(f, "view {}: homography failed: {}", view, source)
            }
            Self::DegenerateIntrinsics => write!(f, "degenerate camera intrinsics"),
            Self::NumericalFailure(msg) => write!(f, "numerical failure: {}", msg),
        }
    }
}

impl std::error::Error for CalibrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Homography { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ── Configuration ────────────────────────────────────────────────────────

/// Refinement settings for [`PlanarCalibrator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct CalibrationConfig {
    /// Levenberg-Marquardt iteration cap. Zero skips refinement.
    pub max_iterations: usize,
    /// Hold the sixth-order radial term at zero.
    pub fix_k3: bool,
    /// Hold both tangential terms at zero.
    pub fix_tangential: bool,
    /// Report per-view rotation and translation vectors.
    pub emit_poses: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            fix_k3: true,
            fix_tangential: false,
            emit_poses: true,
        }
    }
}

// ── Result ───────────────────────────────────────────────────────────────

/// Camera estimate with its fit quality and per-view poses.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraCalibration {
    pub camera: CameraModel,
    /// Root-mean-square reprojection error in pixels.
    pub rms_error: f64,
    /// Number of views used.
    pub views: usize,
    /// Rodrigues rotation vector per view (object to camera).
    pub rvecs: Vec<[f64; 3]>,
    /// Translation per view (object to camera).
    pub tvecs: Vec<[f64; 3]>,
}

impl CameraCalibration {
    /// Row-major 3x3 camera matrix.
    pub fn camera_matrix(&self) -> [f64; 9] {
        self.camera.intrinsics.matrix()
    }

    /// `[k1, k2, p1, p2, k3]`.
    pub fn dist_coeffs(&self) -> [f64; 5] {
        self.camera.distortion.coeffs()
    }
}

/// Estimates a camera from planar views.
pub trait CalibrationSolver {
    fn calibrate(
        &self,
        views: &[PlanarView],
        image_size: [u32; 2],
    ) -> Result<CameraCalibration, CalibrationError>;
}

// ── Built-in solver ──────────────────────────────────────────────────────

/// Homography-initialised planar calibration with joint LM refinement.
#[derive(Debug, Clone, Default)]
pub struct PlanarCalibrator {
    pub config: CalibrationConfig,
}

impl PlanarCalibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        Self { config }
    }

    /// Linear estimate: centred principal point, closed-form focal lengths,
    /// zero distortion and homography poses.
    pub fn initial_estimate(
        &self,
        views: &[PlanarView],
        image_size: [u32; 2],
    ) -> Result<(CameraModel, Vec<ViewPose>), CalibrationError> {
        if views.is_empty() {
            return Err(CalibrationError::NoViews);
        }
        if image_size[0] == 0 || image_size[1] == 0 {
            return Err(CalibrationError::DegenerateIntrinsics);
        }

        let mut homographies = Vec::with_capacity(views.len());
        for (i, view) in views.iter().enumerate() {
            if view.len() < 4 {
                return Err(CalibrationError::TooFewPoints {
                    view: i,
                    needed: 4,
                    got: view.len(),
                });
            }
            let n = view.len();
            let src: Vec<[f64; 2]> = view.object_points[..n].iter().map(|p| [p[0], p[1]]).collect();
            let h = homography::estimate_homography_dlt(&src, &view.image_points[..n])
                .map_err(|source| CalibrationError::Homography { view: i, source })?;
            tracing::trace!(
                view = i,
                points = n,
                transfer_rms = homography::rms_transfer_error(&h, &src, &view.image_points[..n]),
                "view homography"
            );
            homographies.push(h);
        }

        let [w, h] = image_size;
        let centre = [w as f64 / 2.0, h as f64 / 2.0];
        let focal = initial_focal(&homographies, centre, image_size);
        let intrinsics = CameraIntrinsics {
            fx: focal[0],
            fy: focal[1],
            cx: centre[0],
            cy: centre[1],
        };
        if !intrinsics.is_valid() {
            return Err(CalibrationError::DegenerateIntrinsics);
        }

        let k = intrinsics.to_matrix3();
        let mut poses = Vec::with_capacity(views.len());
        for (i, (view, hm)) in views.iter().zip(&homographies).enumerate() {
            let z0 = view.object_points.first().map_or(0.0, |p| p[2]);
            let pose = pose_from_homography(&k, hm, z0).ok_or_else(|| {
                CalibrationError::NumericalFailure(format!("view {}: pose decomposition failed", i))
            })?;
            poses.push(pose);
        }

        let camera = CameraModel::pinhole(intrinsics);
        tracing::debug!(
            fx = focal[0],
            fy = focal[1],
            views = views.len(),
            "linear calibration estimate"
        );
        Ok((camera, poses))
    }
}

impl CalibrationSolver for PlanarCalibrator {
    fn calibrate(
        &self,
        views: &[PlanarView],
        image_size: [u32; 2],
    ) -> Result<CameraCalibration, CalibrationError> {
        let (camera0, poses0) = self.initial_estimate(views, image_size)?;
        let rms0 = reprojection_rms(&camera0, &poses0, views);

        let (camera, poses, rms_error) = if self.config.max_iterations == 0 {
            (camera0, poses0, rms0)
        } else {
            match refine::refine(&camera0, &poses0, views, &self.config) {
                Some((camera, poses)) => {
                    let rms = reprojection_rms(&camera, &poses, views);
                    if rms.is_finite() && (rms <= rms0 || !rms0.is_finite()) {
                        (camera, poses, rms)
                    } else {
                        tracing::warn!(rms, rms0, "refinement did not improve; keeping linear estimate");
                        (camera0, poses0, rms0)
                    }
                }
                None => {
                    tracing::warn!(rms0, "refinement failed; keeping linear estimate");
                    (camera0, poses0, rms0)
                }
            }
        };

        if !rms_error.is_finite() || !camera.intrinsics.is_valid() {
            return Err(CalibrationError::NumericalFailure(
                "non-finite calibration result".into(),
            ));
        }

        tracing::info!(
            rms_error,
            views = views.len(),
            fx = camera.intrinsics.fx,
            fy = camera.intrinsics.fy,
            "camera calibrated"
        );
        Ok(CameraCalibration {
            camera,
            rms_error,
            views: views.len(),
            rvecs: poses.iter().map(|p| p.rvec).collect(),
            tvecs: poses.iter().map(|p| p.tvec).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixelmap::RadialTangentialDistortion;
    use crate::test_utils::{jitter, planar_target, project_view};
    use approx::assert_relative_eq;

    pub(super) fn true_camera() -> CameraModel {
        CameraModel {
            intrinsics: CameraIntrinsics {
                fx: 820.0,
                fy: 800.0,
                cx: 322.0,
                cy: 236.0,
            },
            distortion: RadialTangentialDistortion {
                k1: -0.08,
                k2: 0.02,
                ..Default::default()
            },
        }
    }

    pub(super) fn tilted_views(camera: &CameraModel) -> Vec<PlanarView> {
        let target = planar_target(8, 7, 20.0);
        let poses = [
            ([0.25, -0.15, 0.05], [-10.0, 5.0, 350.0]),
            ([-0.3, 0.2, -0.1], [15.0, -8.0, 380.0]),
            ([0.1, 0.35, 0.2], [5.0, 12.0, 330.0]),
            ([-0.2, -0.3, 0.0], [-12.0, -6.0, 400.0]),
        ];
        poses
            .iter()
            .map(|(r, t)| project_view(camera, *r, *t, &target))
            .collect()
    }

    #[test]
    fn recovers_camera_from_tilted_views() {
        let cam = true_camera();
        let views = tilted_views(&cam);
        let calib = PlanarCalibrator::default().calibrate(&views, [640, 480]).unwrap();

        assert_eq!(calib.views, 4);
        assert_eq!(calib.rvecs.len(), 4);
        assert!(calib.rms_error < 1e-2, "rms {}", calib.rms_error);
        let k = calib.camera.intrinsics;
        assert_relative_eq!(k.fx, 820.0, max_relative = 5e-3);
        assert_relative_eq!(k.fy, 800.0, max_relative = 5e-3);
        assert_relative_eq!(k.cx, 322.0, epsilon = 2.0);
        assert_relative_eq!(k.cy, 236.0, epsilon = 2.0);
        assert_relative_eq!(calib.camera.distortion.k1, -0.08, epsilon = 1e-2);
        assert_eq!(calib.camera.distortion.k3, 0.0);
    }

    #[test]
    fn noisy_views_give_subpixel_rms() {
        let cam = true_camera();
        let views: Vec<PlanarView> = tilted_views(&cam)
            .into_iter()
            .enumerate()
            .map(|(i, v)| PlanarView {
                image_points: jitter(&v.image_points, 0.2, i as u64),
                ..v
            })
            .collect();
        let calib = PlanarCalibrator::default().calibrate(&views, [640, 480]).unwrap();
        assert!(calib.rms_error < 0.3, "rms {}", calib.rms_error);
        assert_relative_eq!(calib.camera.intrinsics.fx, 820.0, max_relative = 0.03);
    }

    #[test]
    fn flat_view_uses_fallback_focal() {
        // Fronto-parallel view: no focal information, projection is exact
        // for any focal once the pose absorbs the scale.
        let target = planar_target(5, 5, 10.0);
        let view = PlanarView {
            image_points: target.iter().map(|p| [100.0 + 2.0 * p[0], 80.0 + 2.0 * p[1]]).collect(),
            object_points: target,
        };
        let solver = PlanarCalibrator::new(CalibrationConfig {
            max_iterations: 0,
            ..Default::default()
        });
        let calib = solver.calibrate(&[view], [200, 160]).unwrap();
        assert_eq!(calib.camera.intrinsics.fx, 200.0);
        assert_eq!(calib.camera.intrinsics.fy, 200.0);
        assert!(calib.rms_error < 1e-6);
        assert!(calib.tvecs[0][2] > 0.0);
    }

    #[test]
    fn translated_flat_views_calibrate() {
        // Windows of an axis-aligned 20 px grid: every view is fronto-parallel.
        let target = planar_target(5, 5, 5.0);
        let views: Vec<PlanarView> = [[2, 2], [5, 2], [2, 5], [6, 6], [9, 3]]
            .iter()
            .map(|&[c0, r0]| PlanarView {
                image_points: target
                    .iter()
                    .map(|p| {
                        [
                            20.0 * (c0 as f64 + 2.0) + 4.0 * p[0],
                            20.0 * (r0 as f64 + 2.0) + 4.0 * p[1],
                        ]
                    })
                    .collect(),
                object_points: target.clone(),
            })
            .collect();

        let calib = PlanarCalibrator::default().calibrate(&views, [300, 260]).unwrap();
        assert_eq!(calib.views, 5);
        assert!(calib.rms_error.is_finite() && calib.rms_error < 1e-3, "rms {}", calib.rms_error);
        assert!(calib.rvecs.iter().flatten().all(|v| v.is_finite()));
        assert!(calib.tvecs.iter().all(|t| t[2] > 0.0));
    }

    #[test]
    fn rejects_empty_and_small_views() {
        let solver = PlanarCalibrator::default();
        assert_eq!(solver.calibrate(&[], [640, 480]), Err(CalibrationError::NoViews));

        let small = PlanarView {
            image_points: vec![[0.0, 0.0]; 3],
            object_points: vec![[0.0, 0.0, 0.0]; 3],
        };
        assert_eq!(
            solver.calibrate(&[small], [640, 480]),
            Err(CalibrationError::TooFewPoints {
                view: 0,
                needed: 4,
                got: 3
            })
        );
    }

    #[test]
    fn collapsed_view_reports_homography_failure() {
        let view = PlanarView {
            image_points: vec![[5.0, 5.0]; 6],
            object_points: planar_target(3, 2, 10.0),
        };
        let err = PlanarCalibrator::default()
            .calibrate(&[view], [64, 64])
            .unwrap_err();
        assert!(matches!(err, CalibrationError::Homography { view: 0, .. }));
        assert!(err.to_string().starts_with("view 0: homography failed"));
    }

    #[test]
    fn matrix_and_coeff_layout() {
        let calib = CameraCalibration {
            camera: true_camera(),
            rms_error: 0.1,
            views: 1,
            rvecs: vec![],
            tvecs: vec![],
        };
        assert_eq!(
            calib.camera_matrix(),
            [820.0, 0.0, 322.0, 0.0, 800.0, 236.0, 0.0, 0.0, 1.0]
        );
        assert_eq!(calib.dist_coeffs(), [-0.08, 0.02, 0.0, 0.0, 0.0]);
    }
}
