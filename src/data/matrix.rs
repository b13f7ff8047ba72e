use std::fmt;
use std::ops::{Index, IndexMut};

use crate::error::MatrixError;

// ---------------------------------------------------------------------------
// Matrix – dense row-major grid of f64
// ---------------------------------------------------------------------------

/// A dense 2D grid of `f64` values stored row-major.
///
/// The shape is fixed at construction; cell values are mutable. Checked
/// accessors ([`Matrix::get`], [`Matrix::set`]) never panic, while indexing
/// with `matrix[(row, col)]` panics when out of range, like slice indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    elements: Vec<f64>,
}

impl Matrix {
    /// A `rows × cols` matrix of zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0.0)
    }

    /// A `rows × cols` matrix with every cell set to `value`.
    ///
    /// Panics if `rows * cols` overflows, like `vec![value; n]` would.
    /// Dimensions read from files go through [`Matrix::from_row_major`].
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Matrix {
            rows,
            cols,
            elements: vec![value; rows * cols],
        }
    }

    /// Build from row-major elements; the element count must be `rows * cols`.
    pub fn from_row_major(rows: usize, cols: usize, elements: Vec<f64>) -> Result<Self, MatrixError> {
        let expected = rows
            .checked_mul(cols)
            .ok_or(MatrixError::TooLarge { rows, cols })?;
        if elements.len() != expected {
            return Err(MatrixError::ElementCount {
                rows,
                cols,
                expected,
                actual: elements.len(),
            });
        }
        Ok(Matrix { rows, cols, elements })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Row-major view of all cells.
    pub fn elements(&self) -> &[f64] {
        &self.elements
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.elements[row * self.cols + col])
        } else {
            None
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<(), MatrixError> {
        if row >= self.rows || col >= self.cols {
            return Err(MatrixError::OutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        self.elements[row * self.cols + col] = value;
        Ok(())
    }

    fn check_shape(&self, other: &Matrix) -> Result<(), MatrixError> {
        if self.shape() != other.shape() {
            return Err(MatrixError::ShapeMismatch {
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(())
    }

    /// Element-wise `self += other`.
    pub fn add(&mut self, other: &Matrix) -> Result<(), MatrixError> {
        self.zip_apply(other, |a, b| a + b)
    }

    /// Element-wise `self -= other`.
    pub fn subtract(&mut self, other: &Matrix) -> Result<(), MatrixError> {
        self.zip_apply(other, |a, b| a - b)
    }

    /// Element-wise division by an equal-shaped uncertainty matrix.
    pub fn scale_by_uncertainty(&mut self, uncertainty: &Matrix) -> Result<(), MatrixError> {
        self.zip_apply(uncertainty, |a, u| a / u)
    }

    /// Combine with an equal-shaped matrix cell by cell into a new matrix.
    pub fn zip_map(&self, other: &Matrix, f: impl Fn(f64, f64) -> f64) -> Result<Matrix, MatrixError> {
        let mut out = self.clone();
        out.zip_apply(other, f)?;
        Ok(out)
    }

    fn zip_apply(&mut self, other: &Matrix, f: impl Fn(f64, f64) -> f64) -> Result<(), MatrixError> {
        self.check_shape(other)?;
        for (a, &b) in self.elements.iter_mut().zip(&other.elements) {
            *a = f(*a, b);
        }
        Ok(())
    }

    /// Divide every element by the sum of its row.
    pub fn row_normalize(&mut self) {
        if self.cols == 0 {
            return;
        }
        for row in self.elements.chunks_mut(self.cols) {
            let sum: f64 = row.iter().sum();
            for v in row.iter_mut() {
                *v /= sum;
            }
        }
    }

    pub fn transpose(&self) -> Matrix {
        let mut out = Matrix::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out.elements[j * self.rows + i] = self.elements[i * self.cols + j];
            }
        }
        out
    }

    /// The `index`-th row as a `1 × cols` matrix.
    pub fn row(&self, index: usize) -> Option<Matrix> {
        if index >= self.rows {
            return None;
        }
        let start = index * self.cols;
        Some(Matrix {
            rows: 1,
            cols: self.cols,
            elements: self.elements[start..start + self.cols].to_vec(),
        })
    }

    /// The `index`-th column as a `rows × 1` matrix.
    pub fn column(&self, index: usize) -> Option<Matrix> {
        if index >= self.cols {
            return None;
        }
        Some(Matrix {
            rows: self.rows,
            cols: 1,
            elements: (0..self.rows)
                .map(|i| self.elements[i * self.cols + index])
                .collect(),
        })
    }

    pub fn zero(&mut self) {
        self.elements.iter_mut().for_each(|v| *v = 0.0);
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        assert!(row < self.rows && col < self.cols, "matrix index ({row}, {col}) out of range");
        &self.elements[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        assert!(row < self.rows && col < self.cols, "matrix index ({row}, {col}) out of range");
        &mut self.elements[row * self.cols + col]
    }
}

/// Rows on separate lines, cells rounded to 4 decimals.
impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.rows {
            let line: Vec<String> = (0..self.cols)
                .map(|j| format!("{:.4}", self.elements[i * self.cols + j]))
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}
