//! Preconditioned conjugate gradient for symmetric positive definite systems.
use log::debug;
use nalgebra::{DVector, DVectorView, DVectorViewMut, RealField, Scalar};
use nalgebra_sparse::ops::serial::spmm_csr_dense;
use nalgebra_sparse::ops::Op;
use nalgebra_sparse::CsrMatrix;
use num::Zero;
use std::error::Error;
use std::fmt;

pub trait LinearOperator<T: Scalar> {
    /// Computes `y = A x`.
    fn apply(&self, y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>>;
}

impl<'a, T, A> LinearOperator<T> for &'a A
where
    T: Scalar,
    A: ?Sized + LinearOperator<T>,
{
    fn apply(&self, y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>> {
        <A as LinearOperator<T>>::apply(self, y, x)
    }
}

impl<T> LinearOperator<T> for CsrMatrix<T>
where
    T: RealField,
{
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>> {
        spmm_csr_dense(T::zero(), &mut y, T::one(), Op::NoOp(self), Op::NoOp(&x));
        Ok(())
    }
}

pub struct IdentityOperator;

impl<T: Scalar> LinearOperator<T> for IdentityOperator {
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>> {
        y.copy_from(&x);
        Ok(())
    }
}

/// Jacobi preconditioner, i.e. multiplication with the inverse of the diagonal of a matrix.
///
/// Zero diagonal entries are treated as one.
#[derive(Debug, Clone)]
pub struct DiagonalPreconditioner<T: Scalar> {
    inverse_diagonal: DVector<T>,
}

impl<T: RealField> DiagonalPreconditioner<T> {
    pub fn from_csr(matrix: &CsrMatrix<T>) -> Self {
        let mut inverse_diagonal = DVector::from_element(matrix.nrows(), T::one());
        for (i, row) in matrix.row_iter().enumerate() {
            let diagonal = row
                .col_indices()
                .iter()
                .zip(row.values())
                .find(|(j, _)| **j == i)
                .map(|(_, v)| v.clone());
            if let Some(d) = diagonal {
                if d != T::zero() {
                    inverse_diagonal[i] = T::one() / d;
                }
            }
        }
        Self { inverse_diagonal }
    }
}

impl<T: RealField> LinearOperator<T> for DiagonalPreconditioner<T> {
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>> {
        assert_eq!(y.len(), self.inverse_diagonal.len());
        y.copy_from(&x);
        y.component_mul_assign(&self.inverse_diagonal);
        Ok(())
    }
}

pub trait CgStoppingCriterion<T: Scalar> {
    fn has_converged(&self, b_norm: T, iteration: usize, approx_residual: DVectorView<T>) -> bool;
}

/// Relative residual tolerance ||r|| <= tol * ||b||.
///
/// The residual is the recursively updated residual of CG, not the true residual.
#[derive(Debug, Clone, Copy)]
pub struct RelativeResidualCriterion<T: Scalar> {
    tol: T,
}

impl<T: Scalar> RelativeResidualCriterion<T> {
    pub fn new(tol: T) -> Self {
        Self { tol }
    }
}

impl Default for RelativeResidualCriterion<f64> {
    fn default() -> Self {
        Self::new(1e-10)
    }
}

impl<T: RealField> CgStoppingCriterion<T> for RelativeResidualCriterion<T> {
    fn has_converged(&self, b_norm: T, _iteration: usize, approx_residual: DVectorView<T>) -> bool {
        approx_residual.norm() <= self.tol.clone() * b_norm
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum SolveErrorKind {
    OperatorError(Box<dyn Error>),
    PreconditionerError(Box<dyn Error>),
    IndefiniteOperator,
    IndefinitePreconditioner,
    MaxIterationsReached { max_iter: usize },
}

impl fmt::Display for SolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OperatorError(err) => write!(f, "Error applying operator: {}", err),
            Self::PreconditionerError(err) => write!(f, "Error applying preconditioner: {}", err),
            Self::IndefiniteOperator => write!(f, "Operator appears to be indefinite"),
            Self::IndefinitePreconditioner => write!(f, "Indefinite preconditioner"),
            Self::MaxIterationsReached { max_iter } => {
                write!(f, "Max iterations ({}) reached", max_iter)
            }
        }
    }
}

#[derive(Debug)]
pub struct SolveError {
    pub num_iterations: usize,
    pub kind: SolveErrorKind,
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CG solve failed after {} iterations: {}", self.num_iterations, self.kind)
    }
}

impl Error for SolveError {}

#[derive(Debug, Clone)]
#[allow(non_snake_case)]
struct CgBuffers<T: Scalar> {
    r: DVector<T>,
    z: DVector<T>,
    p: DVector<T>,
    Ap: DVector<T>,
}

impl<T: Scalar + Zero> CgBuffers<T> {
    fn zeros(dim: usize) -> Self {
        Self {
            r: DVector::zeros(dim),
            z: DVector::zeros(dim),
            p: DVector::zeros(dim),
            Ap: DVector::zeros(dim),
        }
    }
}

/// Conjugate gradient solver for `A x = b`.
#[derive(Debug)]
pub struct ConjugateGradient<A, P, Criterion> {
    operator: A,
    preconditioner: P,
    stopping_criterion: Criterion,
    max_iter: Option<usize>,
}

impl<A> ConjugateGradient<A, IdentityOperator, RelativeResidualCriterion<f64>> {
    pub fn new(operator: A) -> Self {
        Self {
            operator,
            preconditioner: IdentityOperator,
            stopping_criterion: RelativeResidualCriterion::default(),
            max_iter: None,
        }
    }
}

impl<A, P, Criterion> ConjugateGradient<A, P, Criterion> {
    pub fn with_preconditioner<P2>(self, preconditioner: P2) -> ConjugateGradient<A, P2, Criterion> {
        ConjugateGradient {
            operator: self.operator,
            preconditioner,
            stopping_criterion: self.stopping_criterion,
            max_iter: self.max_iter,
        }
    }

    pub fn with_stopping_criterion<C2>(self, stopping_criterion: C2) -> ConjugateGradient<A, P, C2> {
        ConjugateGradient {
            operator: self.operator,
            preconditioner: self.preconditioner,
            stopping_criterion,
            max_iter: self.max_iter,
        }
    }

    pub fn with_max_iter(self, max_iter: usize) -> Self {
        Self {
            max_iter: Some(max_iter),
            ..self
        }
    }
}

impl<A, P, Criterion> ConjugateGradient<A, P, Criterion> {
    /// Solves the system starting from the initial guess stored in `x`.
    ///
    /// Returns the number of iterations, i.e. the number of updates made to `x`.
    #[allow(non_snake_case)]
    pub fn solve_with_guess<T>(&self, b: &DVector<T>, x: &mut DVector<T>) -> Result<usize, SolveError>
    where
        T: RealField,
        A: LinearOperator<T>,
        P: LinearOperator<T>,
        Criterion: CgStoppingCriterion<T>,
    {
        use SolveErrorKind::*;
        assert_eq!(b.len(), x.len());

        let fail = |num_iterations, kind| SolveError { num_iterations, kind };
        let CgBuffers { mut r, mut z, mut p, mut Ap } = CgBuffers::zeros(x.len());

        // r = b - Ax
        self.operator
            .apply(DVectorViewMut::from(&mut r), DVectorView::from(&*x))
            .map_err(|err| fail(0, OperatorError(err)))?;
        r.zip_apply(b, |ax_i, b_i| *ax_i = b_i - ax_i.clone());

        let b_norm = b.norm();
        if b_norm == T::zero() {
            x.fill(T::zero());
            return Ok(0);
        }

        // z = Pr
        self.preconditioner
            .apply(DVectorViewMut::from(&mut z), DVectorView::from(&r))
            .map_err(|err| fail(0, PreconditionerError(err)))?;
        p.copy_from(&z);
        let mut zTr = z.dot(&r);

        let mut iteration = 0;
        while !self
            .stopping_criterion
            .has_converged(b_norm.clone(), iteration, DVectorView::from(&r))
        {
            if let Some(max_iter) = self.max_iter {
                if iteration >= max_iter {
                    return Err(fail(iteration, MaxIterationsReached { max_iter }));
                }
            }

            self.operator
                .apply(DVectorViewMut::from(&mut Ap), DVectorView::from(&p))
                .map_err(|err| fail(iteration, OperatorError(err)))?;
            let pAp = p.dot(&Ap);
            if pAp <= T::zero() {
                return Err(fail(iteration, IndefiniteOperator));
            }
            if zTr <= T::zero() {
                return Err(fail(iteration, IndefinitePreconditioner));
            }

            let alpha = zTr.clone() / pAp;
            x.axpy(alpha.clone(), &p, T::one());
            r.axpy(-alpha, &Ap, T::one());
            iteration += 1;

            self.preconditioner
                .apply(DVectorViewMut::from(&mut z), DVectorView::from(&r))
                .map_err(|err| fail(iteration, PreconditionerError(err)))?;
            let zTr_next = z.dot(&r);
            let beta = zTr_next.clone() / zTr;
            // p <- z + beta * p
            p.axpy(T::one(), &z, beta);
            zTr = zTr_next;
        }

        debug!("CG converged after {} iterations", iteration);
        Ok(iteration)
    }

    /// Solves the system starting from a zero initial guess.
    pub fn solve<T>(&self, b: &DVector<T>) -> Result<(DVector<T>, usize), SolveError>
    where
        T: RealField,
        A: LinearOperator<T>,
        P: LinearOperator<T>,
        Criterion: CgStoppingCriterion<T>,
    {
        let mut x = DVector::zeros(b.len());
        let iterations = self.solve_with_guess(b, &mut x)?;
        Ok((x, iterations))
    }
}
