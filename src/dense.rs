//! Small dense linear algebra on top of `nalgebra`.
use crate::error::FemError;
use nalgebra::{DMatrix, DVector};

/// Determinant of a square matrix of size at most 3, in closed form.
pub fn determinant(m: &DMatrix<f64>) -> Result<f64, FemError> {
    if !m.is_square() {
        return Err(FemError::InternalError);
    }
    match m.nrows() {
        1 => Ok(m[(0, 0)]),
        2 => Ok(m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)]),
        3 => Ok(m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
            - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
            + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])),
        _ => Err(FemError::InternalError),
    }
}

/// Inverse of a square matrix of size at most 3, computed from the adjugate.
///
/// A singular matrix is reported as [`FemError::InvalidFE`], since the only matrices inverted
/// here are element Jacobians.
pub fn inverse(m: &DMatrix<f64>) -> Result<DMatrix<f64>, FemError> {
    let det = determinant(m)?;
    if det == 0.0 {
        return Err(FemError::InvalidFE);
    }

    #[rustfmt::skip]
    let adjugate = match m.nrows() {
        1 => DMatrix::from_element(1, 1, 1.0),
        2 => DMatrix::from_row_slice(2, 2, &[
             m[(1, 1)], -m[(0, 1)],
            -m[(1, 0)],  m[(0, 0)],
        ]),
        _ => DMatrix::from_row_slice(3, 3, &[
            m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)],
            m[(0, 2)] * m[(2, 1)] - m[(0, 1)] * m[(2, 2)],
            m[(0, 1)] * m[(1, 2)] - m[(0, 2)] * m[(1, 1)],
            m[(1, 2)] * m[(2, 0)] - m[(1, 0)] * m[(2, 2)],
            m[(0, 0)] * m[(2, 2)] - m[(0, 2)] * m[(2, 0)],
            m[(0, 2)] * m[(1, 0)] - m[(0, 0)] * m[(1, 2)],
            m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)],
            m[(0, 1)] * m[(2, 0)] - m[(0, 0)] * m[(2, 1)],
            m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)],
        ]),
    };
    Ok(adjugate / det)
}

/// Solves `matrix * x = rhs` by Gauss elimination on the augmented matrix.
///
/// Each column is pivoted on its largest-magnitude entry. Returns `None` if a pivot is smaller
/// than `pivot_tolerance` times the largest absolute entry of `matrix`, or if the dimensions
/// do not match.
pub fn gauss_solve(matrix: &DMatrix<f64>, rhs: &DVector<f64>, pivot_tolerance: f64) -> Option<DVector<f64>> {
    let n = matrix.nrows();
    if !matrix.is_square() || rhs.len() != n || n == 0 {
        return None;
    }

    let mut augmented = DMatrix::zeros(n, n + 1);
    augmented.view_mut((0, 0), (n, n)).copy_from(matrix);
    augmented.set_column(n, rhs);

    let threshold = pivot_tolerance * matrix.amax();
    for i in 0..n {
        let (offset, pivot) = augmented
            .view((i, i), (n - i, 1))
            .iter()
            .map(|v| v.abs())
            .enumerate()
            .fold((0, 0.0), |(k_max, v_max), (k, v)| if v > v_max { (k, v) } else { (k_max, v_max) });
        if pivot <= threshold || pivot == 0.0 {
            return None;
        }
        augmented.swap_rows(i, i + offset);

        for j in (i + 1)..n {
            let factor = augmented[(j, i)] / augmented[(i, i)];
            if factor != 0.0 {
                for k in i..=n {
                    augmented[(j, k)] -= factor * augmented[(i, k)];
                }
            }
        }
    }

    let mut x = DVector::zeros(n);
    for i in (0..n).rev() {
        let mut value = augmented[(i, n)];
        for j in (i + 1)..n {
            value -= augmented[(i, j)] * x[j];
        }
        x[i] = value / augmented[(i, i)];
    }
    Some(x)
}

