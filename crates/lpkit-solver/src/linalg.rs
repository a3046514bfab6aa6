use std::ops::{Index, IndexMut};
use thiserror::Error;

/// Pivot entries at or below this magnitude are treated as zero during
/// Gauss-Jordan elimination.
const PIVOT_EPS: f64 = 1e-12;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinalgError {
    #[error("matrix is singular (no usable pivot in column {column})")]
    Singular { column: usize },
    #[error("cannot invert a {rows}x{cols} matrix (must be square)")]
    NotSquare { rows: usize, cols: usize },
}

/// Dense row-major matrix of `f64`.
///
/// All solver-side linear algebra goes through this type: basis inversion,
/// matrix-vector products, and basis-column extraction. No sparse storage.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Builds a matrix from equal-length rows. Panics if the rows are ragged.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for row in &rows {
            assert_eq!(row.len(), n_cols, "ragged rows");
            data.extend_from_slice(row);
        }
        Self {
            rows: n_rows,
            cols: n_cols,
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn column(&self, j: usize) -> Vec<f64> {
        (0..self.rows).map(|i| self[(i, j)]).collect()
    }

    /// Extracts the given columns, in order, into a new matrix.
    pub fn columns(&self, indices: &[usize]) -> Matrix {
        let mut out = Matrix::zeros(self.rows, indices.len());
        for (k, &j) in indices.iter().enumerate() {
            for i in 0..self.rows {
                out[(i, k)] = self[(i, j)];
            }
        }
        out
    }

    /// Matrix-vector product `M * v`.
    pub fn mul_vector(&self, v: &[f64]) -> Vec<f64> {
        debug_assert_eq!(v.len(), self.cols);
        let mut out = vec![0.0; self.rows];
        for i in 0..self.rows {
            let row = self.row(i);
            let mut s = 0.0;
            for j in 0..self.cols {
                s += row[j] * v[j];
            }
            out[i] = s;
        }
        out
    }

    /// Row-vector product `v^T * M`.
    pub fn mul_transposed(&self, v: &[f64]) -> Vec<f64> {
        debug_assert_eq!(v.len(), self.rows);
        let mut out = vec![0.0; self.cols];
        for j in 0..self.cols {
            let mut s = 0.0;
            for i in 0..self.rows {
                s += v[i] * self[(i, j)];
            }
            out[j] = s;
        }
        out
    }

    /// Inverts the matrix by Gauss-Jordan elimination on `[M | I]`.
    ///
    /// Partial pivoting (swap in the row with the largest absolute entry in
    /// the pivot column) is required for numerical stability; a column whose
    /// best pivot is below `PIVOT_EPS` makes the matrix singular.
    pub fn invert(&self) -> Result<Matrix, LinalgError> {
        if self.rows != self.cols {
            return Err(LinalgError::NotSquare {
                rows: self.rows,
                cols: self.cols,
            });
        }
        let n = self.rows;
        // Augmented [M | I], eliminated in place.
        let mut aug = Matrix::zeros(n, 2 * n);
        for i in 0..n {
            for j in 0..n {
                aug[(i, j)] = self[(i, j)];
            }
            aug[(i, n + i)] = 1.0;
        }

        for col in 0..n {
            let mut pivot = col;
            let mut best = aug[(pivot, col)].abs();
            for r in col + 1..n {
                let v = aug[(r, col)].abs();
                if v > best {
                    best = v;
                    pivot = r;
                }
            }
            if best <= PIVOT_EPS {
                return Err(LinalgError::Singular { column: col });
            }
            if pivot != col {
                for j in 0..2 * n {
                    let t = aug[(col, j)];
                    aug[(col, j)] = aug[(pivot, j)];
                    aug[(pivot, j)] = t;
                }
            }
            let p = aug[(col, col)];
            for j in 0..2 * n {
                aug[(col, j)] /= p;
            }
            for r in 0..n {
                if r == col {
                    continue;
                }
                let f = aug[(r, col)];
                if f.abs() < PIVOT_EPS {
                    continue;
                }
                for j in 0..2 * n {
                    aug[(r, j)] -= f * aug[(col, j)];
                }
            }
        }

        let mut inv = Matrix::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                inv[(i, j)] = aug[(i, n + j)];
            }
        }
        Ok(inv)
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[i * self.cols + j]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.data[i * self.cols + j]
    }
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invert_2x2() {
        let m = Matrix::from_rows(vec![vec![4.0, 7.0], vec![2.0, 6.0]]);
        let inv = m.invert().unwrap();
        // 1/10 * [6 -7; -2 4]
        assert!((inv[(0, 0)] - 0.6).abs() < 1e-12);
        assert!((inv[(0, 1)] + 0.7).abs() < 1e-12);
        assert!((inv[(1, 0)] + 0.2).abs() < 1e-12);
        assert!((inv[(1, 1)] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_invert_requires_row_swap() {
        // Zero in the (0,0) position forces partial pivoting to swap rows.
        let m = Matrix::from_rows(vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
        let inv = m.invert().unwrap();
        let prod = inv.mul_vector(&[3.0, 5.0]);
        assert!((prod[0] - 5.0).abs() < 1e-12);
        assert!((prod[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_invert_singular() {
        let m = Matrix::from_rows(vec![vec![1.0, 2.0], vec![2.0, 4.0]]);
        assert!(matches!(m.invert(), Err(LinalgError::Singular { .. })));
    }

    #[test]
    fn test_invert_not_square() {
        let m = Matrix::zeros(2, 3);
        assert!(matches!(m.invert(), Err(LinalgError::NotSquare { .. })));
    }

    #[test]
    fn test_products() {
        let m = Matrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!(m.mul_vector(&[1.0, 1.0, 1.0]), vec![6.0, 15.0]);
        assert_eq!(m.mul_transposed(&[1.0, 1.0]), vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_columns() {
        let m = Matrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        let sub = m.columns(&[2, 0]);
        assert_eq!(sub.column(0), vec![3.0, 6.0]);
        assert_eq!(sub.column(1), vec![1.0, 4.0]);
    }
}
