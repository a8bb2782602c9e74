use fems::error::FemError;
use fems::shape::Shape;
use fems::value::{EvalContext, Value, ValueType};
use matrixcompare::assert_matrix_eq;
use nalgebra::{DMatrix, DVector};
use proptest::prelude::*;

const ORIGIN: [f64; 3] = [0.0; 3];

/// Linear shape functions `1 - x/2` and `x/2` of a segment from 0 to 2.
fn segment_shapes() -> Vec<Shape> {
    vec![
        Shape::from_terms(vec![(1.0, [0, 0, 0]), (-0.5, [1, 0, 0])]),
        Shape::from_terms(vec![(0.5, [1, 0, 0])]),
    ]
}

#[test]
fn types_and_accessors() {
    let symbolic = Value::Symbolic(segment_shapes());
    assert_eq!(Value::Scalar(1.0).value_type(), ValueType::Scalar);
    assert_eq!(symbolic.value_type(), ValueType::Vector);
    assert_eq!(Value::Matrix(DMatrix::zeros(1, 2)).value_type(), ValueType::Matrix);

    assert_eq!(symbolic.as_scalar(), Err(FemError::AsScalar));
    assert_eq!(Value::Scalar(1.0).as_vector(&ORIGIN), Err(FemError::AsVector));
    assert_eq!(Value::Scalar(1.0).as_matrix(), Err(FemError::AsMatrix));
    assert_eq!(
        symbolic.as_vector(&[1.0, 0.0, 0.0]),
        Ok(DVector::from_column_slice(&[0.5, 0.5]))
    );
}

#[test]
fn symbolic_vectors_stay_symbolic_under_linear_operations() {
    let u = Value::Symbolic(segment_shapes());
    let scaled = u.clone().multiply(Value::Scalar(2.0)).unwrap();
    assert!(matches!(scaled, Value::Symbolic(_)));
    let divided = scaled.divide(Value::Scalar(4.0)).unwrap();
    assert!(matches!(divided, Value::Symbolic(_)));
    let sum = u.clone().add(divided, &ORIGIN).unwrap();
    assert!(matches!(sum, Value::Symbolic(_)));
    assert!(matches!(u.clone().negate(), Value::Symbolic(_)));

    // 1.5 * u at x = 2
    assert_eq!(
        sum.as_vector(&[2.0, 0.0, 0.0]),
        Ok(DVector::from_column_slice(&[0.0, 1.5]))
    );
}

#[test]
fn symbolic_difference_stays_symbolic() {
    let u = Value::Symbolic(segment_shapes());
    let twice = u.clone().multiply(Value::Scalar(2.0)).unwrap();
    let difference = twice.sub(u, &ORIGIN).unwrap();
    assert!(matches!(difference, Value::Symbolic(_)));
    assert_eq!(
        difference.as_vector(&[2.0, 0.0, 0.0]),
        Ok(DVector::from_column_slice(&[0.0, 1.0]))
    );
}

#[test]
fn mixed_vectors_materialize() {
    let u = Value::Symbolic(segment_shapes());
    let v = Value::Numeric(DVector::from_column_slice(&[1.0, 1.0]));
    let sum = u.add(v, &[1.0, 0.0, 0.0]).unwrap();
    assert_eq!(sum, Value::Numeric(DVector::from_column_slice(&[1.5, 1.5])));
}

#[test]
fn invalid_operations() {
    let u = Value::Symbolic(segment_shapes());
    let w = Value::Numeric(DVector::zeros(3));
    assert_eq!(u.clone().add(w.clone(), &ORIGIN), Err(FemError::InvalidOperation));
    assert_eq!(u.clone().add(Value::Scalar(1.0), &ORIGIN), Err(FemError::InvalidOperation));
    assert_eq!(u.clone().multiply(u.clone()), Err(FemError::InvalidOperation));
    assert_eq!(Value::Scalar(1.0).divide(u.clone()), Err(FemError::InvalidOperation));
    assert_eq!(w.clone().diff(0), Err(FemError::InvalidOperation));
    assert_eq!(u.clone().var(w, &ORIGIN), Err(FemError::InvalidOperation));
    assert_eq!(u.clone().var(Value::Scalar(1.0), &ORIGIN), Err(FemError::InvalidOperation));
}

#[test]
fn diff_differentiates_each_entry() {
    let u = Value::Symbolic(segment_shapes());
    let du = u.diff(0).unwrap();
    assert_eq!(du.as_vector(&ORIGIN), Ok(DVector::from_column_slice(&[-0.5, 0.5])));
}

#[test]
fn var_of_two_vectors_is_symmetric_with_zero_load_column() {
    let l = Value::Numeric(DVector::from_column_slice(&[1.0, 2.0]));
    let r = Value::Numeric(DVector::from_column_slice(&[3.0, -1.0]));
    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(2, 3, &[
        6.0, 5.0, 0.0,
        5.0, -4.0, 0.0,
    ]);
    assert_eq!(l.var(r, &ORIGIN), Ok(Value::Matrix(expected)));
}

#[test]
fn integrate_without_element_is_internal_error() {
    let ctx = EvalContext::new();
    assert_eq!(ctx.integrate(|_| Ok(Value::Scalar(1.0))), Err(FemError::InternalError));
}

#[test]
fn context_bindings() {
    let arguments = [1.0, 2.0];
    let results = [Value::Scalar(3.0)];
    let ctx = EvalContext::new()
        .with_arguments(&arguments)
        .with_results(&results)
        .with_point([1.0, 2.0, 3.0]);
    assert_eq!(ctx.argument(1), 2.0);
    assert_eq!(ctx.argument(2), 0.0);
    assert_eq!(ctx.result(0), Ok(&Value::Scalar(3.0)));
    assert_eq!(ctx.result(1), Err(FemError::InternalError));
    assert_eq!(ctx.point(), &[1.0, 2.0, 3.0]);
    assert!(ctx.element().is_none());
}

proptest! {
    #[test]
    fn var_of_load_and_vector_fills_only_the_load_column(
        load in -100.0..100.0f64,
        entries in proptest::collection::vec(-10.0..10.0f64, 1..8),
    ) {
        let n = entries.len();
        let r = DVector::from_column_slice(&entries);
        let result = Value::Scalar(load).var(Value::Numeric(r.clone()), &ORIGIN).unwrap();
        let m = result.as_matrix().unwrap();

        prop_assert_eq!(m.shape(), (n, n + 1));
        assert_matrix_eq!(m.columns(0, n), DMatrix::<f64>::zeros(n, n));
        assert_matrix_eq!(m.column(n), r * load, comp = abs, tol = 1e-12);
    }
}
