//! Linear solvers for the assembled system.
use crate::error::FemError;
use fems_sparse::cg::{ConjugateGradient, DiagonalPreconditioner, RelativeResidualCriterion};
use fems_sparse::CsrMatrix;
use log::{debug, warn};
use nalgebra::{Const, DVector, Dyn};
use nalgebra_sparse::factorization::CscCholesky;

/// Solves a symmetric sparse system `K u = f`.
pub trait LinearSolver {
    /// Fails with [`FemError::NotSolution`] if the system could not be solved.
    fn solve(&self, matrix: &CsrMatrix<f64>, rhs: &DVector<f64>) -> Result<DVector<f64>, FemError>;
}

impl<S: LinearSolver + ?Sized> LinearSolver for &S {
    fn solve(&self, matrix: &CsrMatrix<f64>, rhs: &DVector<f64>) -> Result<DVector<f64>, FemError> {
        S::solve(self, matrix, rhs)
    }
}

fn check_finite(u: DVector<f64>) -> Result<DVector<f64>, FemError> {
    if u.iter().all(|x| x.is_finite()) {
        Ok(u)
    } else {
        Err(FemError::NotSolution)
    }
}

/// Sparse Cholesky factorization. Requires a positive definite matrix.
#[derive(Debug, Copy, Clone, Default)]
pub struct CholeskySolver;

impl LinearSolver for CholeskySolver {
    fn solve(&self, matrix: &CsrMatrix<f64>, rhs: &DVector<f64>) -> Result<DVector<f64>, FemError> {
        if matrix.nrows() != rhs.len() {
            return Err(FemError::InternalError);
        }
        let cholesky = CscCholesky::factor(&matrix.into()).map_err(|err| {
            warn!("Cholesky factorization failed: {}", err);
            FemError::NotSolution
        })?;
        let u = cholesky.solve(rhs);
        check_finite(u.reshape_generic(Dyn(rhs.len()), Const::<1>))
    }
}

/// Conjugate gradient with a diagonal preconditioner.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ConjugateGradientSolver {
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for ConjugateGradientSolver {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 10_000,
        }
    }
}

impl LinearSolver for ConjugateGradientSolver {
    fn solve(&self, matrix: &CsrMatrix<f64>, rhs: &DVector<f64>) -> Result<DVector<f64>, FemError> {
        if matrix.nrows() != rhs.len() {
            return Err(FemError::InternalError);
        }
        let (u, iterations) = ConjugateGradient::new(matrix)
            .with_preconditioner(DiagonalPreconditioner::from_csr(matrix))
            .with_stopping_criterion(RelativeResidualCriterion::new(self.tolerance))
            .with_max_iter(self.max_iterations)
            .solve(rhs)
            .map_err(|err| {
                warn!("Conjugate gradient failed: {}", err);
                FemError::NotSolution
            })?;
        debug!("Conjugate gradient converged in {} iterations", iterations);
        check_finite(u)
    }
}
