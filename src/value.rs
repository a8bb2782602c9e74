//! Typed values produced by evaluating compiled expressions.
//!
//! A [`Value`] is either a scalar, a vector or a dense matrix. Vectors come in two flavours:
//! symbolic vectors hold shape functions and are only turned into numbers ("materialized")
//! when an operation needs their values, numeric vectors hold plain numbers. Materialization
//! always happens at the point of the [`EvalContext`] the operation is evaluated in.
use crate::dense::determinant;
use crate::element::ElementType;
use crate::error::FemError;
use crate::shape::Shape;
use nalgebra::{DMatrix, DVector};

/// Static type of a value, as tracked by the compiler.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Scalar,
    Vector,
    Matrix,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Symbolic(Vec<Shape>),
    Numeric(DVector<f64>),
    Matrix(DMatrix<f64>),
}

/// The element an evaluation is bound to, required by integration.
#[derive(Debug, Copy, Clone)]
pub struct ElementBinding<'a> {
    pub element_type: ElementType,
    /// Physical node coordinates, one row per node.
    pub coords: &'a DMatrix<f64>,
}

/// State an expression is evaluated against.
///
/// The context is passed explicitly through every evaluation, so independent evaluations
/// (for example of different elements on different threads) never share state.
#[derive(Debug, Copy, Clone)]
pub struct EvalContext<'a> {
    point: [f64; 3],
    arguments: &'a [f64],
    results: &'a [Value],
    element: Option<ElementBinding<'a>>,
}

impl<'a> Default for EvalContext<'a> {
    fn default() -> Self {
        Self {
            point: [0.0; 3],
            arguments: &[],
            results: &[],
            element: None,
        }
    }
}

impl<'a> EvalContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the values of the ARGUMENT symbols, in declaration order.
    pub fn with_arguments(self, arguments: &'a [f64]) -> Self {
        Self { arguments, ..self }
    }

    /// Binds the values of the RESULT symbols, in declaration order.
    pub fn with_results(self, results: &'a [Value]) -> Self {
        Self { results, ..self }
    }

    pub fn with_element(self, element_type: ElementType, coords: &'a DMatrix<f64>) -> Self {
        Self {
            element: Some(ElementBinding { element_type, coords }),
            ..self
        }
    }

    pub fn with_point(self, point: [f64; 3]) -> Self {
        Self { point, ..self }
    }

    pub fn point(&self) -> &[f64; 3] {
        &self.point
    }

    pub fn element(&self) -> Option<&ElementBinding<'a>> {
        self.element.as_ref()
    }

    /// Value of ARGUMENT number `index`. Unbound arguments are zero.
    pub fn argument(&self, index: usize) -> f64 {
        self.arguments.get(index).copied().unwrap_or(0.0)
    }

    /// Value of RESULT number `index`.
    pub fn result(&self, index: usize) -> Result<&'a Value, FemError> {
        self.results.get(index).ok_or(FemError::InternalError)
    }

    /// Integrates over the bound element with its quadrature rule.
    ///
    /// At each quadrature point, `integrand` is evaluated with the context point set to the
    /// physical coordinates of the quadrature point, and the result is accumulated with the
    /// quadrature weight times the absolute Jacobian determinant. Symbolic vectors are
    /// materialized.
    pub fn integrate<F>(&self, mut integrand: F) -> Result<Value, FemError>
    where
        F: FnMut(&EvalContext<'a>) -> Result<Value, FemError>,
    {
        let binding = self.element.ok_or(FemError::InternalError)?;
        let (weights, _) = binding.element_type.quadrature();

        let mut sum: Option<Value> = None;
        for (i, w) in weights.iter().enumerate() {
            let jacobian = binding.element_type.jacobi(i, binding.coords);
            let factor = w * determinant(&jacobian)?.abs();
            let point = binding.element_type.map_reference(i, binding.coords);
            let ctx = self.with_point(point);

            let contribution = integrand(&ctx)?.materialize(ctx.point()).scaled(factor)?;
            sum = Some(match sum {
                None => contribution,
                Some(acc) => acc.add(contribution, ctx.point())?,
            });
        }
        sum.ok_or(FemError::InternalError)
    }
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Scalar(_) => ValueType::Scalar,
            Value::Symbolic(_) | Value::Numeric(_) => ValueType::Vector,
            Value::Matrix(_) => ValueType::Matrix,
        }
    }

    pub fn as_scalar(&self) -> Result<f64, FemError> {
        match self {
            Value::Scalar(s) => Ok(*s),
            _ => Err(FemError::AsScalar),
        }
    }

    /// Numeric entries of a vector, materializing symbolic vectors at `point`.
    pub fn as_vector(&self, point: &[f64; 3]) -> Result<DVector<f64>, FemError> {
        match self {
            Value::Symbolic(shapes) => Ok(evaluate_shapes(shapes, point)),
            Value::Numeric(v) => Ok(v.clone()),
            _ => Err(FemError::AsVector),
        }
    }

    pub fn as_matrix(&self) -> Result<&DMatrix<f64>, FemError> {
        match self {
            Value::Matrix(m) => Ok(m),
            _ => Err(FemError::AsMatrix),
        }
    }

    /// Turns a symbolic vector into a numeric one; other values are returned unchanged.
    pub fn materialize(self, point: &[f64; 3]) -> Value {
        match self {
            Value::Symbolic(shapes) => Value::Numeric(evaluate_shapes(&shapes, point)),
            other => other,
        }
    }

    pub fn negate(self) -> Value {
        match self {
            Value::Scalar(s) => Value::Scalar(-s),
            Value::Symbolic(shapes) => Value::Symbolic(shapes.iter().map(Shape::neg).collect()),
            Value::Numeric(v) => Value::Numeric(-v),
            Value::Matrix(m) => Value::Matrix(-m),
        }
    }

    fn scaled(self, factor: f64) -> Result<Value, FemError> {
        self.multiply(Value::Scalar(factor))
    }

    pub fn add(self, rhs: Value, point: &[f64; 3]) -> Result<Value, FemError> {
        use Value::*;
        match (self, rhs) {
            (Scalar(a), Scalar(b)) => Ok(Scalar(a + b)),
            (Symbolic(a), Symbolic(b)) if a.len() == b.len() => {
                Ok(Symbolic(a.iter().zip(&b).map(|(a, b)| a.add(b)).collect()))
            }
            (Matrix(a), Matrix(b)) if a.shape() == b.shape() => Ok(Matrix(a + b)),
            (a @ (Symbolic(_) | Numeric(_)), b @ (Symbolic(_) | Numeric(_))) => {
                let (a, b) = (a.as_vector(point)?, b.as_vector(point)?);
                if a.len() != b.len() {
                    return Err(FemError::InvalidOperation);
                }
                Ok(Numeric(a + b))
            }
            _ => Err(FemError::InvalidOperation),
        }
    }

    pub fn sub(self, rhs: Value, point: &[f64; 3]) -> Result<Value, FemError> {
        match (self, rhs) {
            (Value::Symbolic(a), Value::Symbolic(b)) if a.len() == b.len() => {
                Ok(Value::Symbolic(a.iter().zip(&b).map(|(a, b)| a.sub(b)).collect()))
            }
            (lhs, rhs) => lhs.add(rhs.negate(), point),
        }
    }

    /// Product where at least one operand is a scalar.
    pub fn multiply(self, rhs: Value) -> Result<Value, FemError> {
        use Value::*;
        match (self, rhs) {
            (Scalar(a), Scalar(b)) => Ok(Scalar(a * b)),
            (Scalar(s), Symbolic(shapes)) | (Symbolic(shapes), Scalar(s)) => {
                Ok(Symbolic(shapes.iter().map(|shape| shape.scale(s)).collect()))
            }
            (Scalar(s), Numeric(v)) | (Numeric(v), Scalar(s)) => Ok(Numeric(v * s)),
            (Scalar(s), Matrix(m)) | (Matrix(m), Scalar(s)) => Ok(Matrix(m * s)),
            _ => Err(FemError::InvalidOperation),
        }
    }

    /// Division by a scalar.
    pub fn divide(self, rhs: Value) -> Result<Value, FemError> {
        match rhs {
            Value::Scalar(s) => self.multiply(Value::Scalar(1.0 / s)),
            _ => Err(FemError::InvalidOperation),
        }
    }

    /// Differentiates every entry of a symbolic vector along `axis` (0 = x, 1 = y, 2 = z).
    pub fn diff(self, axis: usize) -> Result<Value, FemError> {
        match self {
            Value::Symbolic(shapes) if axis < 3 => Ok(Value::Symbolic(shapes.iter().map(|s| s.diff(axis)).collect())),
            _ => Err(FemError::InvalidOperation),
        }
    }

    /// The variation operator.
    ///
    /// For two vectors `l` and `r` of length `n`, the result is the `n x (n + 1)` matrix with
    /// entries `l_i r_j + l_j r_i` and a zero last column. For a scalar `s` and a vector `r`,
    /// only the last column is filled, with entries `s r_i`.
    pub fn var(self, rhs: Value, point: &[f64; 3]) -> Result<Value, FemError> {
        match (self.value_type(), rhs.value_type()) {
            (ValueType::Vector, ValueType::Vector) => {
                let l = self.as_vector(point)?;
                let r = rhs.as_vector(point)?;
                let n = l.len();
                if r.len() != n {
                    return Err(FemError::InvalidOperation);
                }
                Ok(Value::Matrix(DMatrix::from_fn(n, n + 1, |i, j| {
                    if j < n {
                        l[i] * r[j] + l[j] * r[i]
                    } else {
                        0.0
                    }
                })))
            }
            (ValueType::Scalar, ValueType::Vector) => {
                let s = self.as_scalar()?;
                let r = rhs.as_vector(point)?;
                let n = r.len();
                let mut result = DMatrix::zeros(n, n + 1);
                result.set_column(n, &(r * s));
                Ok(Value::Matrix(result))
            }
            _ => Err(FemError::InvalidOperation),
        }
    }
}

fn evaluate_shapes(shapes: &[Shape], point: &[f64; 3]) -> DVector<f64> {
    DVector::from_iterator(shapes.len(), shapes.iter().map(|shape| shape.value(point)))
}
