//! Camera model and pixel remapping for undistortion.

mod cameramodel;
mod distortion;
mod undistort;

pub use cameramodel::{CameraIntrinsics, CameraModel, CAMERA_PARAM_COUNT};
pub use distortion::{RadialTangentialDistortion, UndistortConfig};
pub use undistort::undistort_image;

/// Mapping between raw image pixels and rectified working-frame pixels.
///
/// Both methods must be approximate inverses of each other. Return `None`
/// when a point cannot be mapped (e.g. outside the valid distortion domain).
///
/// # Example
///
/// ```
/// use gridmatch::PixelMapper;
///
/// struct Identity;
///
/// impl PixelMapper for Identity {
///     fn image_to_working_pixel(&self, p: [f64; 2]) -> Option<[f64; 2]> {
///         Some(p)
///     }
///     fn working_to_image_pixel(&self, p: [f64; 2]) -> Option<[f64; 2]> {
///         Some(p)
///     }
/// }
/// ```
pub trait PixelMapper {
    /// Map from image (distorted) pixel coordinates to working coordinates.
    fn image_to_working_pixel(&self, image_xy: [f64; 2]) -> Option<[f64; 2]>;
    /// Map from working coordinates back to image (distorted) pixel coordinates.
    fn working_to_image_pixel(&self, working_xy: [f64; 2]) -> Option<[f64; 2]>;
}
