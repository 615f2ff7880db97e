//! Point ordering used to sort candidates and to key the duplicate set.

use std::cmp::Ordering;

/// Major-axis spread, in pixels, under which sorted neighbours share a line.
pub const LINE_TOLERANCE_PX: f64 = 1.0;

/// Axis priority for comparing image points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointOrder {
    /// Compare `y` first, then `x` on ties.
    RowMajor,
    /// Compare `x` first, then `y` on ties.
    ColumnMajor,
}

impl PointOrder {
    /// Total order over non-NaN points.
    ///
    /// # Panics
    ///
    /// Panics if any coordinate of `a` or `b` is NaN.
    pub fn compare(self, a: &[f64; 2], b: &[f64; 2]) -> Ordering {
        assert!(
            !a[0].is_nan() && !a[1].is_nan() && !b[0].is_nan() && !b[1].is_nan(),
            "NaN coordinate reached the point comparator: {a:?} vs {b:?}"
        );
        let (major, minor) = match self {
            Self::RowMajor => (1, 0),
            Self::ColumnMajor => (0, 1),
        };
        cmp_f64(a[major], b[major]).then_with(|| cmp_f64(a[minor], b[minor]))
    }

    /// Index of the coordinate that varies fastest along a sequence sorted in
    /// this order.
    pub fn minor_axis(self) -> usize {
        match self {
            Self::RowMajor => 0,
            Self::ColumnMajor => 1,
        }
    }

    /// The order with the axis priorities swapped.
    pub fn transposed(self) -> Self {
        match self {
            Self::RowMajor => Self::ColumnMajor,
            Self::ColumnMajor => Self::RowMajor,
        }
    }

    /// Sorted copy of `points`, grouped into lines with
    /// [`LINE_TOLERANCE_PX`].
    pub fn sorted(self, points: &[[f64; 2]]) -> Vec<[f64; 2]> {
        self.sorted_with_tolerance(points, LINE_TOLERANCE_PX)
    }

    /// Sort line by line: points are ordered exactly, then split into lines
    /// wherever the major coordinate jumps by `line_tolerance` or more, and
    /// each line is ordered along the minor axis.
    ///
    /// Detections of one grid row rarely share an exact `y`; grouping keeps a
    /// noisy row in `x` order. A zero tolerance gives the exact order of
    /// [`PointOrder::compare`].
    pub fn sorted_with_tolerance(self, points: &[[f64; 2]], line_tolerance: f64) -> Vec<[f64; 2]> {
        let mut out = points.to_vec();
        out.sort_by(|a, b| self.compare(a, b));

        let major = 1 - self.minor_axis();
        let within = self.transposed();
        let mut start = 0;
        for i in 1..=out.len() {
            if i == out.len() || out[i][major] - out[i - 1][major] >= line_tolerance {
                out[start..i].sort_by(|a, b| within.compare(a, b));
                start = i;
            }
        }
        out
    }
}

#[inline]
fn cmp_f64(a: f64, b: f64) -> Ordering {
    // NaN is rejected by the caller, so only +0.0/-0.0 compare equal here.
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Image point ordered row-major, for use as an ordered-set key.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RowMajorKey(pub [f64; 2]);

impl PartialEq for RowMajorKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RowMajorKey {}

impl PartialOrd for RowMajorKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RowMajorKey {
    fn cmp(&self, other: &Self) -> Ordering {
        PointOrder::RowMajor.compare(&self.0, &other.0)
    }
}
