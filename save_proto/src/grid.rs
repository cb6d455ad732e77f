use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-tile quantity in map orientation.
///
/// Saves store `width * height` values row-major over `(height, width)`.
/// A `Grid` holds the transpose of that matrix, so `get(x, y)` is tile
/// `(x, y)` and [`Grid::rows`] yields `width` rows of `height` values each.
/// Serialized as those nested rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct Grid {
    width: u32,
    height: u32,
    // x-major: cells[x * height + y]
    cells: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("expected {expected} values for a {width}x{height} map, found {found}")]
    Length {
        width: u32,
        height: u32,
        expected: usize,
        found: usize,
    },
    #[error("grid row {row} has {found} values, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("grid dimensions {width}x{height} do not match {other_width}x{other_height}")]
    Mismatch {
        width: u32,
        height: u32,
        other_width: u32,
        other_height: u32,
    },
}

impl Grid {
    /// Build a grid from values in save order: reshape to `(height, width)`
    /// and transpose.
    pub fn from_stored(width: u32, height: u32, values: Vec<f64>) -> Result<Self, ShapeError> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(ShapeError::Length {
                width,
                height,
                expected,
                found: values.len(),
            });
        }

        let (w, h) = (width as usize, height as usize);
        let mut cells = vec![0.0; expected];
        for y in 0..h {
            for x in 0..w {
                cells[x * h + y] = values[y * w + x];
            }
        }

        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Build a grid from `width` rows of `height` values.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ShapeError> {
        let width = rows.len();
        let height = rows.first().map(Vec::len).unwrap_or(0);
        let mut cells = Vec::with_capacity(width * height);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != height {
                return Err(ShapeError::Ragged {
                    row,
                    expected: height,
                    found: values.len(),
                });
            }
            cells.extend(values);
        }
        Ok(Self {
            width: width as u32,
            height: height as u32,
            cells,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Option<f64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = x as usize * self.height as usize + y as usize;
        self.cells.get(idx).copied()
    }

    /// Cell values in `(x, y)` order, x outermost.
    pub fn values(&self) -> &[f64] {
        &self.cells
    }

    pub fn rows(&self) -> Vec<Vec<f64>> {
        if self.height == 0 {
            return vec![Vec::new(); self.width as usize];
        }
        self.cells
            .chunks(self.height as usize)
            .map(|row| row.to_vec())
            .collect()
    }

    /// Inverse of [`Grid::from_stored`]: values back in save order.
    pub fn to_stored(&self) -> Vec<f64> {
        let (w, h) = (self.width as usize, self.height as usize);
        let mut values = Vec::with_capacity(self.cells.len());
        for y in 0..h {
            for x in 0..w {
                values.push(self.cells[x * h + y]);
            }
        }
        values
    }

    pub fn ensure_same_shape(&self, other: &Grid) -> Result<(), ShapeError> {
        if self.width == other.width && self.height == other.height {
            Ok(())
        } else {
            Err(ShapeError::Mismatch {
                width: self.width,
                height: self.height,
                other_width: other.width,
                other_height: other.height,
            })
        }
    }
}

impl TryFrom<Vec<Vec<f64>>> for Grid {
    type Error = ShapeError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Grid::from_rows(rows)
    }
}

impl From<Grid> for Vec<Vec<f64>> {
    fn from(grid: Grid) -> Self {
        grid.rows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_order_is_transposed_into_map_orientation() {
        // 3 wide, 2 high: stored row-major over (height, width)
        let grid = Grid::from_stored(3, 2, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(grid.get(0, 0), Some(0.0));
        assert_eq!(grid.get(2, 0), Some(2.0));
        assert_eq!(grid.get(0, 1), Some(3.0));
        assert_eq!(grid.get(2, 1), Some(5.0));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(
            grid.rows(),
            vec![vec![0.0, 3.0], vec![1.0, 4.0], vec![2.0, 5.0]]
        );
    }

    #[test]
    fn to_stored_inverts_from_stored() {
        let values: Vec<f64> = (0..12).map(|v| v as f64 * 0.5).collect();
        let grid = Grid::from_stored(4, 3, values.clone()).unwrap();
        assert_eq!(grid.to_stored(), values);
    }

    #[test]
    fn length_mismatch_is_reported() {
        let err = Grid::from_stored(2, 2, vec![1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            ShapeError::Length {
                width: 2,
                height: 2,
                expected: 4,
                found: 3
            }
        );
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Grid::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, ShapeError::Ragged { row: 1, .. }));
    }

    #[test]
    fn serializes_as_width_rows() {
        let grid = Grid::from_stored(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let json = serde_json::to_string(&grid).unwrap();
        assert_eq!(json, "[[1.0,3.0,5.0],[2.0,4.0,6.0]]");
        let back: Grid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, grid);
        assert_eq!(back.width(), 2);
        assert_eq!(back.height(), 3);
    }
}
