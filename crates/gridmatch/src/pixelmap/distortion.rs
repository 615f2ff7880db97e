use serde::{Deserialize, Serialize};

/// Brown-Conrady radial-tangential distortion coefficients.
///
/// Serialized and reported in the usual `[k1, k2, p1, p2, k3]` order.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RadialTangentialDistortion {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl RadialTangentialDistortion {
    pub fn from_coeffs(c: [f64; 5]) -> Self {
        Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
            k3: c[4],
        }
    }

    /// Coefficients as `[k1, k2, p1, p2, k3]`.
    pub fn coeffs(self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    pub fn is_identity(self) -> bool {
        self.coeffs().iter().all(|&c| c == 0.0)
    }

    /// Radial gain and tangential offset at a normalized point.
    fn terms(self, x: f64, y: f64) -> (f64, [f64; 2]) {
        let r2 = x * x + y * y;
        let gain = 1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3));
        let xy2 = 2.0 * x * y;
        let offset = [
            self.p1 * xy2 + self.p2 * (r2 + 2.0 * x * x),
            self.p1 * (r2 + 2.0 * y * y) + self.p2 * xy2,
        ];
        (gain, offset)
    }

    /// Apply distortion to normalized coordinates.
    pub fn distort_normalized(self, normalized_xy: [f64; 2]) -> [f64; 2] {
        let [x, y] = normalized_xy;
        let (gain, [ox, oy]) = self.terms(x, y);
        [x * gain + ox, y * gain + oy]
    }

    /// Invert [`distort_normalized`](Self::distort_normalized) by fixed-point
    /// iteration starting from the distorted point.
    pub fn undistort_normalized(
        self,
        distorted_xy: [f64; 2],
        cfg: UndistortConfig,
    ) -> Option<[f64; 2]> {
        let [xd, yd] = distorted_xy;
        let mut cur = distorted_xy;

        for _ in 0..cfg.max_iters.max(1) {
            let (gain, [ox, oy]) = self.terms(cur[0], cur[1]);
            if !gain.is_finite() || gain.abs() < 1e-12 {
                return None;
            }
            let next = [(xd - ox) / gain, (yd - oy) / gain];
            if !(next[0].is_finite() && next[1].is_finite()) {
                return None;
            }
            let step = (next[0] - cur[0]).hypot(next[1] - cur[1]);
            cur = next;
            if step <= cfg.eps.max(0.0) {
                break;
            }
        }
        Some(cur)
    }
}

/// Distortion inversion settings used by iterative undistortion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct UndistortConfig {
    /// Maximum fixed-point iterations.
    pub max_iters: usize,
    /// Stop when coordinate update norm is below this threshold.
    pub eps: f64,
}

impl Default for UndistortConfig {
    fn default() -> Self {
        Self {
            max_iters: 15,
            eps: 1e-12,
        }
    }
}
