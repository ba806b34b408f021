/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Dense square matrix value type shared by the affinity and adjacency stages.
//!
//! Row-major `Vec<f64>` of length `dim²`. Built once, read many times; the
//! only mutation happens inside this crate while a matrix is being filled.

use alloc::format;
use alloc::vec;
use alloc::vec::Vec;

use crate::error::{GraphError, Result};

/// Dense `dim × dim` matrix of `f64`, row-major.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")
)]
pub struct SquareMatrix {
    dim: usize,
    data: Vec<f64>,
}

impl SquareMatrix {
    /// All-zero matrix of the given dimension.
    pub fn zeros(dim: usize) -> Self {
        Self { dim, data: vec![0.0; dim * dim] }
    }

    /// Build from row slices. Fails with [`GraphError::ShapeMismatch`] if any
    /// row length differs from the number of rows.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let dim = rows.len();
        let mut data = Vec::with_capacity(dim * dim);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != dim {
                return Err(GraphError::ShapeMismatch(format!(
                    "row {i} has {} columns, expected {dim}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self { dim, data })
    }

    /// Build by evaluating `f(i, j)` for every entry.
    pub(crate) fn from_fn(dim: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(dim * dim);
        for i in 0..dim {
            for j in 0..dim {
                data.push(f(i, j));
            }
        }
        Self { dim, data }
    }

    /// Number of rows (= number of columns).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// `true` for the 0×0 matrix.
    pub fn is_empty(&self) -> bool {
        self.dim == 0
    }

    /// Entry `[i][j]`. Panics if out of bounds.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(i < self.dim && j < self.dim, "index ({i}, {j}) out of bounds for {0}×{0}", self.dim);
        self.data[i * self.dim + j]
    }

    /// Entry `[i][j]`, or `None` if out of bounds.
    pub fn try_get(&self, i: usize, j: usize) -> Option<f64> {
        (i < self.dim && j < self.dim).then(|| self.data[i * self.dim + j])
    }

    pub(crate) fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.dim + j] = value;
    }

    /// Row `i` as a slice.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    /// Row-major backing storage.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Nested-vector copy, one `Vec` per row.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.dim).map(|i| self.row(i).to_vec()).collect()
    }

    /// `true` if `|a_ij − a_ji| ≤ tol · max(1, |a_ij|, |a_ji|)` for all pairs.
    ///
    /// `tol = 0.0` demands exact equality.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        self.first_asymmetry(tol).is_none()
    }

    /// First `(i, j)` with `i < j` violating symmetry at tolerance `tol`.
    pub(crate) fn first_asymmetry(&self, tol: f64) -> Option<(usize, usize)> {
        for i in 0..self.dim {
            for j in (i + 1)..self.dim {
                let a = self.get(i, j);
                let b = self.get(j, i);
                if a == b {
                    continue;
                }
                let scale = 1.0_f64.max(libm::fabs(a)).max(libm::fabs(b));
                if !(libm::fabs(a - b) <= tol * scale) {
                    return Some((i, j));
                }
            }
        }
        None
    }

    /// Copy with every diagonal entry set to zero.
    pub fn with_zero_diagonal(&self) -> Self {
        let mut out = self.clone();
        for i in 0..self.dim {
            out.set(i, i, 0.0);
        }
        out
    }

    /// Relabel rows and columns: `out[i][j] = self[perm[i]][perm[j]]`.
    pub fn permuted(&self, perm: &[usize]) -> Result<Self> {
        check_permutation(perm, self.dim)?;
        Ok(Self::from_fn(self.dim, |i, j| self.get(perm[i], perm[j])))
    }
}

impl core::ops::Index<(usize, usize)> for SquareMatrix {
    type Output = f64;

    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        assert!(i < self.dim && j < self.dim, "index ({i}, {j}) out of bounds for {0}×{0}", self.dim);
        &self.data[i * self.dim + j]
    }
}

impl TryFrom<Vec<Vec<f64>>> for SquareMatrix {
    type Error = GraphError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        Self::from_rows(&rows)
    }
}

impl From<SquareMatrix> for Vec<Vec<f64>> {
    fn from(m: SquareMatrix) -> Self {
        m.to_rows()
    }
}

/// Check that `perm` is a permutation of `0..n`.
pub(crate) fn check_permutation(perm: &[usize], n: usize) -> Result<()> {
    if perm.len() != n {
        return Err(GraphError::InvalidParameter {
            name: "permutation",
            reason: format!("length {} does not match {n} particles", perm.len()),
        });
    }
    let mut seen = vec![false; n];
    for &p in perm {
        if p >= n || seen[p] {
            return Err(GraphError::InvalidParameter {
                name: "permutation",
                reason: format!("index {p} is out of range or repeated"),
            });
        }
        seen[p] = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_rejects_ragged_input() {
        let rows = vec![vec![0.0, 1.0], vec![1.0]];
        assert!(matches!(
            SquareMatrix::from_rows(&rows),
            Err(GraphError::ShapeMismatch(_))
        ));
        let wide = vec![vec![0.0, 1.0, 2.0], vec![1.0, 0.0, 2.0]];
        assert!(SquareMatrix::from_rows(&wide).is_err());
    }

    #[test]
    fn test_empty_matrix() {
        let rows: Vec<Vec<f64>> = Vec::new();
        let m = SquareMatrix::from_rows(&rows).unwrap();
        assert!(m.is_empty());
        assert!(m.is_symmetric(0.0));
        assert!(m.to_rows().is_empty());
    }

    #[test]
    fn test_symmetry_tolerance() {
        let m = SquareMatrix::from_rows(&[[0.0, 1.0], [1.0 + 1e-14, 0.0]]).unwrap();
        assert!(!m.is_symmetric(0.0));
        assert!(m.is_symmetric(1e-12));
        let nan = SquareMatrix::from_rows(&[[0.0, f64::NAN], [f64::NAN, 0.0]]).unwrap();
        assert!(!nan.is_symmetric(1.0));
    }

    #[test]
    fn test_permuted_matches_definition() {
        let m = SquareMatrix::from_rows(&[[0.0, 1.0, 2.0], [1.0, 0.0, 3.0], [2.0, 3.0, 0.0]]).unwrap();
        let p = m.permuted(&[2, 0, 1]).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(p[(i, j)], m[([2, 0, 1][i], [2, 0, 1][j])]);
            }
        }
        assert!(m.permuted(&[0, 1, 1]).is_err());
    }

    #[test]
    fn test_with_zero_diagonal() {
        let m = SquareMatrix::from_rows(&[[5.0, 1.0], [1.0, 5.0]]).unwrap();
        let z = m.with_zero_diagonal();
        assert_eq!(z.to_rows(), vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
        assert_eq!(m.get(0, 0), 5.0);
    }

    #[test]
    fn test_try_get_out_of_bounds() {
        let m = SquareMatrix::zeros(2);
        assert_eq!(m.try_get(1, 1), Some(0.0));
        assert_eq!(m.try_get(2, 0), None);
    }
}
