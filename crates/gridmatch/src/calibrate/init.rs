//! Closed-form initialisation from plane homographies.

use nalgebra::{DMatrix, DVector, Matrix3, Rotation3, UnitQuaternion};

use super::refine::ViewPose;

/// Focal estimates beyond this many image widths carry no information.
const MAX_FOCAL_RATIO: f64 = 100.0;

/// Focal lengths `[fx, fy]` from the orthogonality of the rotation columns
/// encoded in each homography, with the principal point fixed at `centre`.
///
/// Every homography contributes two equations in `1/fx²` and `1/fy²`. Falls
/// back to `max(width, height)` for both axes when the system yields no
/// finite positive solution in a plausible range (e.g. only fronto-parallel
/// views).
pub fn initial_focal(homographies: &[Matrix3<f64>], centre: [f64; 2], image_size: [u32; 2]) -> [f64; 2] {
    let fallback = image_size[0].max(image_size[1]) as f64;
    if homographies.is_empty() {
        return [fallback, fallback];
    }

    let shift = Matrix3::new(1.0, 0.0, -centre[0], 0.0, 1.0, -centre[1], 0.0, 0.0, 1.0);
    let mut a = DMatrix::<f64>::zeros(2 * homographies.len(), 2);
    let mut b = DVector::<f64>::zeros(2 * homographies.len());

    for (i, h) in homographies.iter().enumerate() {
        let hs = shift * h;
        let norm = hs.norm();
        if !(norm.is_finite() && norm > 0.0) {
            continue;
        }
        let hs = hs / norm;
        let (h1, h2) = (hs.column(0), hs.column(1));

        let rows = [
            ([h1[0] * h2[0], h1[1] * h2[1]], -h1[2] * h2[2]),
            (
                [h1[0] * h1[0] - h2[0] * h2[0], h1[1] * h1[1] - h2[1] * h2[1]],
                -(h1[2] * h1[2] - h2[2] * h2[2]),
            ),
        ];
        for (k, (coef, rhs)) in rows.into_iter().enumerate() {
            let scale = coef[0].abs().max(coef[1].abs());
            if scale < 1e-12 {
                continue;
            }
            a[(2 * i + k, 0)] = coef[0] / scale;
            a[(2 * i + k, 1)] = coef[1] / scale;
            b[2 * i + k] = rhs / scale;
        }
    }

    let inv_sq = match a.svd(true, true).solve(&b, 1e-12) {
        Ok(x) => x,
        Err(_) => return [fallback, fallback],
    };
    let fx = 1.0 / inv_sq[0].sqrt();
    let fy = 1.0 / inv_sq[1].sqrt();
    let plausible = |f: f64| f.is_finite() && f > 0.0 && f < MAX_FOCAL_RATIO * fallback;
    if plausible(fx) && plausible(fy) {
        [fx, fy]
    } else {
        tracing::debug!(fallback, "focal initialisation degenerate; using image size");
        [fallback, fallback]
    }
}

/// Decompose the plane homography `h` (object `[x, y]` to image) into a
/// pose given camera matrix `k`.
///
/// `z0` is the height of the object plane; the returned translation maps
/// object points `[x, y, z0]` into the camera frame. The pose is chosen
/// with the plane in front of the camera.
pub fn pose_from_homography(k: &Matrix3<f64>, h: &Matrix3<f64>, z0: f64) -> Option<ViewPose> {
    let k_inv = k.try_inverse()?;
    let m = k_inv * h;
    let (m1, m2, m3) = (m.column(0), m.column(1), m.column(2));

    let avg = 0.5 * (m1.norm() + m2.norm());
    if !(avg.is_finite() && avg > 1e-15) {
        return None;
    }
    let mut lambda = 1.0 / avg;
    if lambda * m3[2] < 0.0 {
        lambda = -lambda;
    }

    let r1 = m1 * lambda;
    let r2 = m2 * lambda;
    let r3 = r1.cross(&r2);
    let mut r = Matrix3::<f64>::zeros();
    r.set_column(0, &r1);
    r.set_column(1, &r2);
    r.set_column(2, &r3);

    let svd = r.svd(true, true);
    let mut u = svd.u?;
    let v_t = svd.v_t?;
    if (u * v_t).determinant() < 0.0 {
        u.column_mut(2).neg_mut();
    }
    let rot = Rotation3::from_matrix_unchecked(u * v_t);

    // Plane homography absorbs z0 into the translation column.
    let t = m3 * lambda - rot.matrix().column(2) * z0;
    // Rotation3::scaled_axis goes through acos of the trace, which turns NaN
    // when rounding pushes a near-identity trace past 3.
    let rvec = UnitQuaternion::from_rotation_matrix(&rot).scaled_axis();
    let pose = ViewPose {
        rvec: [rvec.x, rvec.y, rvec.z],
        tvec: [t[0], t[1], t[2]],
    };
    pose.is_finite().then_some(pose)
}
