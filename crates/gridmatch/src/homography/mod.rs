//! Plane-to-image homography via normalized DLT.
//!
//! Used to seed per-view calibration: each sub-view's object plane
//! (`z = 0`) maps to its image points through one homography.

use nalgebra::{DMatrix, Matrix3, Vector3};

// ── Error type ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HomographyError {
    TooFewPoints { needed: usize, got: usize },
    LengthMismatch { src: usize, dst: usize },
    Degenerate(String),
}

impl std::fmt::Display for HomographyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewPoints { needed, got } => {
                write!(f, "too few points: need {}, got {}", needed, got)
            }
            Self::LengthMismatch { src, dst } => {
                write!(f, "point count mismatch: {} source vs {} destination", src, dst)
            }
            Self::Degenerate(msg) => write!(f, "degenerate configuration: {}", msg),
        }
    }
}

impl std::error::Error for HomographyError {}

// ── Projection ───────────────────────────────────────────────────────────

/// Project `[x, y]` through `h`. `None` at the line at infinity.
pub fn project(h: &Matrix3<f64>, xy: [f64; 2]) -> Option<[f64; 2]> {
    let p = h * Vector3::new(xy[0], xy[1], 1.0);
    if p[2].abs() < 1e-15 {
        return None;
    }
    Some([p[0] / p[2], p[1] / p[2]])
}

/// Root-mean-square transfer error of `h` over the correspondences.
pub fn rms_transfer_error(h: &Matrix3<f64>, src: &[[f64; 2]], dst: &[[f64; 2]]) -> f64 {
    let n = src.len().min(dst.len());
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = src
        .iter()
        .zip(dst)
        .map(|(s, d)| match project(h, *s) {
            Some(p) => (p[0] - d[0]).powi(2) + (p[1] - d[1]).powi(2),
            None => f64::INFINITY,
        })
        .sum();
    (sum / n as f64).sqrt()
}

// ── Hartley normalization ────────────────────────────────────────────────

/// Translate the centroid to the origin and scale the mean distance to
/// sqrt(2). Returns the transform and the normalized points.
fn normalize_points(pts: &[[f64; 2]]) -> Result<(Matrix3<f64>, Vec<[f64; 2]>), HomographyError> {
    let n = pts.len() as f64;
    let cx = pts.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy = pts.iter().map(|p| p[1]).sum::<f64>() / n;
    let mean_dist = pts
        .iter()
        .map(|p| (p[0] - cx).hypot(p[1] - cy))
        .sum::<f64>()
        / n;

    if !(mean_dist.is_finite() && mean_dist > 1e-12) {
        return Err(HomographyError::Degenerate(
            "points collapse to a single location".into(),
        ));
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = pts.iter().map(|p| [s * (p[0] - cx), s * (p[1] - cy)]).collect();
    Ok((t, normalized))
}

// ── DLT ──────────────────────────────────────────────────────────────────

/// Estimate `H` with `dst ≈ project(H, src)` from at least 4 correspondences.
///
/// The result is scaled so `H[2][2] = 1` when that entry is not near zero.
pub fn estimate_homography_dlt(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
) -> Result<Matrix3<f64>, HomographyError> {
    if src.len() != dst.len() {
        return Err(HomographyError::LengthMismatch {
            src: src.len(),
            dst: dst.len(),
        });
    }
    let n = src.len();
    if n < 4 {
        return Err(HomographyError::TooFewPoints { needed: 4, got: n });
    }

    let (t_src, src_n) = normalize_points(src)?;
    let (t_dst, dst_n) = normalize_points(dst)?;

    // Two rows of the cross-product constraint d x (H s) = 0 per point.
    let rows: Vec<f64> = src_n
        .iter()
        .zip(&dst_n)
        .flat_map(|(&[sx, sy], &[dx, dy])| {
            [
                0.0, 0.0, 0.0, -sx, -sy, -1.0, dy * sx, dy * sy, dy,
                sx, sy, 1.0, 0.0, 0.0, 0.0, -dx * sx, -dx * sy, -dx,
            ]
        })
        .collect();
    let a = DMatrix::from_row_slice(2 * n, 9, &rows);

    // Null vector of A = eigenvector of the smallest eigenvalue of A^T A.
    let eig = nalgebra::SymmetricEigen::new(a.transpose() * &a);
    let (min_idx, _) = eig
        .eigenvalues
        .iter()
        .enumerate()
        .map(|(i, v)| (i, v.abs()))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best });
    let h_norm = Matrix3::from_fn(|r, c| eig.eigenvectors[(3 * r + c, min_idx)]);

    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or_else(|| HomographyError::Degenerate("destination transform not invertible".into()))?;
    let h = t_dst_inv * h_norm * t_src;

    if h.iter().any(|v| !v.is_finite()) {
        return Err(HomographyError::Degenerate("non-finite homography".into()));
    }
    let h22 = h[(2, 2)];
    Ok(if h22.abs() < 1e-15 { h } else { h / h22 })
}
