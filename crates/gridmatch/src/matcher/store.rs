//! Deduplicated correspondence storage and the dense grid-cell index.

use std::collections::BTreeSet;

use super::Correspondence;
use crate::ordering::RowMajorKey;

/// Correspondences between image points and grid cells.
///
/// Image points are unique: a second [`GridMatcher::add`] with an already
/// stored image point is ignored. Insertion order is kept in two parallel
/// vectors sharing one index, which is also what [`GridIndex`] cells hold.
#[derive(Debug, Clone, Default)]
pub struct GridMatcher {
    image_points: Vec<[f64; 2]>,
    grid_points: Vec<[i32; 2]>,
    image_total: [f64; 2],
    grid_total: [f64; 2],
    seen: BTreeSet<RowMajorKey>,
}

impl GridMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a correspondence. Returns `false` and leaves the store untouched
    /// when `image` is already present.
    pub fn add(&mut self, image: [f64; 2], grid: [i32; 2]) -> bool {
        if !self.seen.insert(RowMajorKey(image)) {
            return false;
        }
        self.image_points.push(image);
        self.grid_points.push(grid);
        self.image_total[0] += image[0];
        self.image_total[1] += image[1];
        self.grid_total[0] += grid[0] as f64;
        self.grid_total[1] += grid[1] as f64;
        true
    }

    pub fn len(&self) -> usize {
        self.image_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image_points.is_empty()
    }

    pub fn image_points(&self) -> &[[f64; 2]] {
        &self.image_points
    }

    pub fn grid_points(&self) -> &[[i32; 2]] {
        &self.grid_points
    }

    pub fn get(&self, index: usize) -> Option<Correspondence> {
        Some(Correspondence {
            image: *self.image_points.get(index)?,
            grid: *self.grid_points.get(index)?,
        })
    }

    pub fn correspondences(&self) -> impl Iterator<Item = Correspondence> + '_ {
        self.image_points
            .iter()
            .zip(&self.grid_points)
            .map(|(&image, &grid)| Correspondence { image, grid })
    }

    /// Mean image point, `None` for an empty store.
    pub fn image_centroid(&self) -> Option<[f64; 2]> {
        let n = self.len() as f64;
        (!self.is_empty()).then(|| [self.image_total[0] / n, self.image_total[1] / n])
    }

    /// Mean grid cell, `None` for an empty store.
    pub fn grid_centroid(&self) -> Option<[f64; 2]> {
        let n = self.len() as f64;
        (!self.is_empty()).then(|| [self.grid_total[0] / n, self.grid_total[1] / n])
    }

    /// Scatter every correspondence into a dense cell index sized for an
    /// image of `image_size` pixels at `pixel_pitch` pixels per grid step.
    ///
    /// # Panics
    ///
    /// Panics if a stored grid cell falls outside the matrix. That only
    /// happens when the spacing estimate disagrees with the walk, and the
    /// index would be corrupt if it went on.
    pub fn build_index(&self, image_size: [u32; 2], pixel_pitch: [f64; 2]) -> GridIndex {
        let cols = (image_size[0] as f64 / pixel_pitch[0] + 1.5) as usize;
        let rows = (image_size[1] as f64 / pixel_pitch[1] + 1.5) as usize;
        let mut index = GridIndex::new(rows, cols);
        tracing::debug!(rows, cols, points = self.len(), "building grid index");

        for (i, &[c, r]) in self.grid_points.iter().enumerate() {
            assert!(
                r >= 0 && (r as usize) < rows && c >= 0 && (c as usize) < cols,
                "grid cell [{c}, {r}] outside {cols}x{rows} index; spacing estimate is inconsistent"
            );
            index.cells[r as usize * cols + c as usize] = i as i32;
        }
        index
    }
}

/// Dense `rows x cols` matrix of correspondence indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridIndex {
    rows: usize,
    cols: usize,
    cells: Vec<i32>,
}

impl GridIndex {
    /// Marker for a cell without a correspondence.
    pub const EMPTY: i32 = -1;

    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![Self::EMPTY; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Correspondence index stored at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Option<usize> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let v = self.cells[row * self.cols + col];
        (v != Self::EMPTY).then_some(v as usize)
    }

    pub fn populated(&self) -> usize {
        self.cells.iter().filter(|&&v| v != Self::EMPTY).count()
    }
}
