//! Block-distance label grids for supervising response maps.

use crate::trace::trace_event;

/// Row-major label grid matching a response-map shape.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelGrid {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl LabelGrid {
    /// Builds labels for a `height x width` grid.
    ///
    /// With `d = |row - (h - 1) / 2| + |col - (w - 1) / 2|`, a cell is `1.0`
    /// when `d <= r_pos`, `0.5` when `r_pos < d < r_neg`, and `0.0` otherwise.
    pub fn logistic(shape: (usize, usize), r_pos: f64, r_neg: f64) -> Self {
        let (height, width) = shape;
        let cy = (height as f64 - 1.0) / 2.0;
        let cx = (width as f64 - 1.0) / 2.0;
        let mut data = Vec::with_capacity(height * width);
        for row in 0..height {
            for col in 0..width {
                let dist = (row as f64 - cy).abs() + (col as f64 - cx).abs();
                let label = if dist <= r_pos {
                    1.0
                } else if dist < r_neg {
                    0.5
                } else {
                    0.0
                };
                data.push(label);
            }
        }
        Self {
            data,
            width,
            height,
        }
    }

    /// Returns `(height, width)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Returns the labels in row-major order.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Returns the label at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }
}

/// Session-owned cache holding the most recently requested label grid.
///
/// The grid is rebuilt if and only if the requested shape differs from the
/// cached one; radii are fixed for the lifetime of a session.
#[derive(Debug, Default)]
pub struct LabelCache {
    grid: Option<LabelGrid>,
}

impl LabelCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the grid for `shape`, building it on a shape change.
    pub fn labels(&mut self, shape: (usize, usize), r_pos: f64, r_neg: f64) -> &LabelGrid {
        if self.grid.as_ref().is_some_and(|grid| grid.shape() != shape) {
            self.grid = None;
        }
        self.grid.get_or_insert_with(|| {
            trace_event!("labels_rebuilt", height = shape.0, width = shape.1);
            LabelGrid::logistic(shape, r_pos, r_neg)
        })
    }

    /// Returns the cached grid, if any.
    pub fn cached(&self) -> Option<&LabelGrid> {
        self.grid.as_ref()
    }
}
