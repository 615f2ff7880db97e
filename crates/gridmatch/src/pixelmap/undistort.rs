//! Whole-image rectification.

use image::{GrayImage, Luma};

use super::PixelMapper;

/// Sample a grayscale image at a sub-pixel position using bilinear
/// interpolation. Positions up to half a pixel past the border take the
/// edge value.
///
/// Returns intensity in `[0, 255]`, or `None` outside the image.
#[inline]
pub fn bilinear_sample_u8(img: &GrayImage, x: f32, y: f32) -> Option<f32> {
    const EDGE: f32 = 0.5;
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    let (x_max, y_max) = ((w - 1) as f32, (h - 1) as f32);
    if !(x >= -EDGE && y >= -EDGE && x <= x_max + EDGE && y <= y_max + EDGE) {
        return None;
    }
    let x = x.clamp(0.0, x_max);
    let y = y.clamp(0.0, y_max);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1) as usize;
    let y1 = (y0 + 1).min(h - 1) as usize;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let stride = w as usize;
    let raw = img.as_raw();
    let p00 = raw[y0 as usize * stride + x0 as usize] as f32;
    let p10 = raw[y0 as usize * stride + x1] as f32;
    let p01 = raw[y1 * stride + x0 as usize] as f32;
    let p11 = raw[y1 * stride + x1] as f32;

    Some(
        (1.0 - fx) * (1.0 - fy) * p00
            + fx * (1.0 - fy) * p10
            + (1.0 - fx) * fy * p01
            + fx * fy * p11,
    )
}

/// Rectify `image` through `mapper`.
///
/// Each output pixel is a working-frame (undistorted) pixel; its source is
/// `mapper.working_to_image_pixel`. Unmappable or out-of-image sources are
/// filled with 0. With a [`CameraModel`](super::CameraModel) this keeps the
/// camera matrix, so the output has the same intrinsics and no distortion.
pub fn undistort_image(image: &GrayImage, mapper: &dyn PixelMapper) -> GrayImage {
    let (w, h) = image.dimensions();
    let mut out = GrayImage::new(w, h);
    let mut unmapped = 0usize;

    for (x, y, px) in out.enumerate_pixels_mut() {
        let value = mapper
            .working_to_image_pixel([x as f64, y as f64])
            .and_then(|src| bilinear_sample_u8(image, src[0] as f32, src[1] as f32));
        match value {
            Some(v) => *px = Luma([v.round().clamp(0.0, 255.0) as u8]),
            None => unmapped += 1,
        }
    }

    tracing::debug!(width = w, height = h, unmapped, "image rectified");
    out
}
