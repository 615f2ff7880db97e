use serde::{Deserialize, Serialize};

use super::distortion::{RadialTangentialDistortion, UndistortConfig};
use super::PixelMapper;

/// Pinhole intrinsics in pixels: focal lengths `fx`, `fy` and principal
/// point `(cx, cy)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Finite parameters with usable (non-zero) focal lengths.
    pub fn is_valid(self) -> bool {
        let finite = [self.fx, self.fy, self.cx, self.cy].iter().all(|v| v.is_finite());
        finite && self.fx.abs() > 1e-12 && self.fy.abs() > 1e-12
    }

    /// Row-major 3x3 camera matrix.
    pub fn matrix(self) -> [f64; 9] {
        [self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0]
    }

    pub fn to_matrix3(self) -> nalgebra::Matrix3<f64> {
        nalgebra::Matrix3::from_row_slice(&self.matrix())
    }

    /// Pixel to normalized image-plane coordinates. `None` for invalid
    /// intrinsics.
    pub fn pixel_to_normalized(self, pixel_xy: [f64; 2]) -> Option<[f64; 2]> {
        if !self.is_valid() {
            return None;
        }
        finite([
            (pixel_xy[0] - self.cx) / self.fx,
            (pixel_xy[1] - self.cy) / self.fy,
        ])
    }

    pub fn normalized_to_pixel(self, normalized_xy: [f64; 2]) -> [f64; 2] {
        let [x, y] = normalized_xy;
        [self.cx + self.fx * x, self.cy + self.fy * y]
    }
}

fn finite(p: [f64; 2]) -> Option<[f64; 2]> {
    (p[0].is_finite() && p[1].is_finite()).then_some(p)
}

/// Length of the flat calibration parameter vector
/// `[fx, fy, cx, cy, k1, k2, p1, p2, k3]`.
pub const CAMERA_PARAM_COUNT: usize = 9;

/// Intrinsics plus radial-tangential distortion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CameraModel {
    pub intrinsics: CameraIntrinsics,
    pub distortion: RadialTangentialDistortion,
}

impl CameraModel {
    /// Distortion-free camera.
    pub fn pinhole(intrinsics: CameraIntrinsics) -> Self {
        Self {
            intrinsics,
            distortion: RadialTangentialDistortion::default(),
        }
    }

    /// Flat parameter vector in solver order.
    pub fn to_params(self) -> [f64; CAMERA_PARAM_COUNT] {
        let k = self.intrinsics;
        let [k1, k2, p1, p2, k3] = self.distortion.coeffs();
        [k.fx, k.fy, k.cx, k.cy, k1, k2, p1, p2, k3]
    }

    /// Inverse of [`CameraModel::to_params`]. `None` unless `params` holds
    /// exactly nine finite values.
    pub fn from_params(params: &[f64]) -> Option<Self> {
        if params.len() != CAMERA_PARAM_COUNT || params.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some(Self {
            intrinsics: CameraIntrinsics {
                fx: params[0],
                fy: params[1],
                cx: params[2],
                cy: params[3],
            },
            distortion: RadialTangentialDistortion::from_coeffs([
                params[4], params[5], params[6], params[7], params[8],
            ]),
        })
    }

    /// Map a rectified pixel to where the lens images it.
    pub fn distort_pixel(self, undistorted_pixel_xy: [f64; 2]) -> Option<[f64; 2]> {
        let k = self.intrinsics;
        let xn = k.pixel_to_normalized(undistorted_pixel_xy)?;
        finite(k.normalized_to_pixel(self.distortion.distort_normalized(xn)))
    }

    /// Inverse of [`CameraModel::distort_pixel`] with default iteration
    /// settings.
    pub fn undistort_pixel(self, distorted_pixel_xy: [f64; 2]) -> Option<[f64; 2]> {
        self.undistort_pixel_with(distorted_pixel_xy, UndistortConfig::default())
    }

    pub fn undistort_pixel_with(
        self,
        distorted_pixel_xy: [f64; 2],
        cfg: UndistortConfig,
    ) -> Option<[f64; 2]> {
        let k = self.intrinsics;
        let xd = k.pixel_to_normalized(distorted_pixel_xy)?;
        let xu = self.distortion.undistort_normalized(xd, cfg)?;
        finite(k.normalized_to_pixel(xu))
    }

    /// Project a camera-frame point to distorted pixels. `None` on the
    /// camera plane `z = 0`.
    pub fn project_camera_point(self, p: [f64; 3]) -> Option<[f64; 2]> {
        let [x, y, z] = p;
        if !(z.is_finite() && z.abs() > 1e-12) {
            return None;
        }
        let xd = self.distortion.distort_normalized([x / z, y / z]);
        finite(self.intrinsics.normalized_to_pixel(xd))
    }
}

impl PixelMapper for CameraModel {
    fn image_to_working_pixel(&self, image_xy: [f64; 2]) -> Option<[f64; 2]> {
        self.undistort_pixel(image_xy)
    }

    fn working_to_image_pixel(&self, working_xy: [f64; 2]) -> Option<[f64; 2]> {
        self.distort_pixel(working_xy)
    }
}
