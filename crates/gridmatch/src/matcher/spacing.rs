//! Robust per-axis spacing estimation.
//!
//! A sorted point sequence alternates between true single steps along a grid
//! line and jumps between lines (or merged/skipped detections). The median
//! gap picks the single step; a tolerance band around it then selects the
//! one-step and two-step neighbor pairs whose offsets are averaged.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::ordering::PointOrder;

/// Grid direction whose spacing is being estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridAxis {
    /// Horizontal spacing between neighbouring columns (`dx`).
    Columns,
    /// Vertical spacing between neighbouring rows (`dy`).
    Rows,
}

impl GridAxis {
    /// Ordering whose fastest-varying coordinate is this axis.
    pub fn order(self) -> PointOrder {
        match self {
            Self::Columns => PointOrder::RowMajor,
            Self::Rows => PointOrder::ColumnMajor,
        }
    }

    /// Coordinate index measured along this axis.
    pub fn component(self) -> usize {
        self.order().minor_axis()
    }

    /// Diagnostic key prefix.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Columns => "dx",
            Self::Rows => "dy",
        }
    }

    fn grid_key(self) -> &'static str {
        match self {
            Self::Columns => "gridX",
            Self::Rows => "gridY",
        }
    }
}

/// Closed interval of accepted gaps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceBand {
    pub lo: f64,
    pub hi: f64,
}

impl ToleranceBand {
    /// `[nominal * (1 - tol), nominal * (1 + tol)]`, oriented for either sign
    /// of `nominal`.
    pub fn around(nominal: f64, tolerance: f64) -> Self {
        let a = nominal * (1.0 - tolerance);
        let b = nominal * (1.0 + tolerance);
        Self {
            lo: a.min(b),
            hi: a.max(b),
        }
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self::from_bounds(self.lo * factor, self.hi * factor)
    }

    fn from_bounds(a: f64, b: f64) -> Self {
        Self {
            lo: a.min(b),
            hi: a.max(b),
        }
    }

    /// A zero-width band (zero nominal gap) accepts nothing.
    pub fn contains(&self, gap: f64) -> bool {
        self.hi > self.lo && self.lo <= gap && gap <= self.hi
    }
}

/// Outcome of [`estimate_axis`], kept for diagnostics even on failure.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisEstimate {
    pub axis: GridAxis,
    /// Median signed gap (`next - previous`) along the axis.
    pub median: f64,
    /// One-step band derived from the median.
    pub band: ToleranceBand,
    /// Adjacent pairs inside the one-step band.
    pub count1: usize,
    /// Pairs two apart inside the two-step band.
    pub count2: usize,
    /// Mean one-step offset vector.
    pub avg1: Option<[f64; 2]>,
    /// Mean two-step offset vector, halved to one step.
    pub avg2: Option<[f64; 2]>,
    /// Pixels per object unit along the axis.
    pub grid: Option<f64>,
    object_sep: f64,
}

/// Spacing usable by the grid walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSpacing {
    pub band: ToleranceBand,
    /// Pixels between neighbouring grid lines.
    pub pixel_pitch: f64,
}

impl AxisEstimate {
    /// Spacing for the grid walk, or the failure level.
    pub fn spacing(&self) -> Result<AxisSpacing, AxisEstimationError> {
        if self.count1 == 0 {
            return Err(AxisEstimationError {
                axis: self.axis,
                level: 1,
            });
        }
        match self.grid {
            Some(grid) if self.count2 > 0 => Ok(AxisSpacing {
                band: self.band,
                pixel_pitch: grid * self.object_sep,
            }),
            _ => Err(AxisEstimationError {
                axis: self.axis,
                level: 2,
            }),
        }
    }
}

impl Serialize for AxisEstimate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let p = self.axis.prefix();
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(&format!("{p}Median"), &self.median)?;
        map.serialize_entry(&format!("{p}Count1"), &self.count1)?;
        map.serialize_entry(&format!("{p}Count2"), &self.count2)?;
        if let Some([ax, ay]) = self.avg1 {
            map.serialize_entry(&format!("{p}dxAvg1"), &ax)?;
            map.serialize_entry(&format!("{p}dyAvg1"), &ay)?;
        }
        if let Some([ax, ay]) = self.avg2 {
            map.serialize_entry(&format!("{p}dxAvg2"), &ax)?;
            map.serialize_entry(&format!("{p}dyAvg2"), &ay)?;
        }
        if let Some(grid) = self.grid {
            map.serialize_entry(self.axis.grid_key(), &grid)?;
        }
        map.end()
    }
}

/// No neighbor pairs matched the tolerance band at the given level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisEstimationError {
    pub axis: GridAxis,
    /// 1 for single steps, 2 for double steps.
    pub level: u8,
}

impl std::fmt::Display for AxisEstimationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "No grid points matched within tolerance (level {}) {}Count{}:0",
            self.level,
            self.axis.prefix(),
            self.level
        )
    }
}

impl std::error::Error for AxisEstimationError {}

/// Estimate spacing along `axis` from points sorted in `axis.order()`.
///
/// `tolerance` is the accepted relative deviation from the median gap and
/// `object_sep` the object-space distance between grid lines.
pub fn estimate_axis(
    sorted: &[[f64; 2]],
    axis: GridAxis,
    tolerance: f64,
    object_sep: f64,
) -> AxisEstimate {
    let c = axis.component();
    let mut gaps: Vec<f64> = sorted.windows(2).map(|w| w[1][c] - w[0][c]).collect();
    gaps.sort_by(f64::total_cmp);
    let median = gaps.get(gaps.len() / 2).copied().unwrap_or(0.0);

    let band = ToleranceBand::around(median, tolerance);
    let band2 = band.scaled(2.0);

    let mut tot1 = [0.0f64; 2];
    let mut count1 = 0usize;
    for w in sorted.windows(2) {
        if band.contains(w[1][c] - w[0][c]) {
            tot1[0] += w[1][0] - w[0][0];
            tot1[1] += w[1][1] - w[0][1];
            count1 += 1;
        }
    }

    let mut tot2 = [0.0f64; 2];
    let mut count2 = 0usize;
    for w in sorted.windows(3) {
        if band2.contains(w[2][c] - w[0][c]) {
            tot2[0] += w[2][0] - w[0][0];
            tot2[1] += w[2][1] - w[0][1];
            count2 += 1;
        }
    }

    let avg1 = (count1 > 0).then(|| [tot1[0] / count1 as f64, tot1[1] / count1 as f64]);
    let avg2 = (count1 > 0 && count2 > 0).then(|| {
        let n = 2.0 * count2 as f64;
        [tot2[0] / n, tot2[1] / n]
    });
    let grid = avg2.map(|[x, y]| x.hypot(y) / object_sep);

    tracing::debug!(
        axis = axis.prefix(),
        median,
        count1,
        count2,
        grid = grid.unwrap_or(f64::NAN),
        "axis spacing estimated"
    );

    AxisEstimate {
        axis,
        median,
        band,
        count1,
        count2,
        avg1,
        avg2,
        grid,
        object_sep,
    }
}
