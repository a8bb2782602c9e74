use fems::shape::{Frame, Shape};
use matrixcompare::assert_scalar_eq;

#[test]
fn from_terms_merges_and_drops_zeros() {
    let shape = Shape::from_terms(vec![(1.0, [1, 0, 0]), (2.0, [0, 0, 0]), (-1.0, [1, 0, 0]), (0.0, [0, 1, 0])]);
    assert_eq!(shape.terms(), &[(2.0, [0, 0, 0])]);
    assert!(Shape::from_terms(vec![(0.0, [2, 0, 0])]).is_zero());
    assert!(Shape::zero().is_zero());
}

#[test]
fn value_and_derivatives() {
    // 3x^2 y + 2y - z
    let shape = Shape::from_terms(vec![(3.0, [2, 1, 0]), (2.0, [0, 1, 0]), (-1.0, [0, 0, 1])]);
    let point = [2.0, -1.0, 0.5];
    assert_scalar_eq!(shape.value(&point), -12.0 - 2.0 - 0.5, comp = abs, tol = 1e-14);

    assert_eq!(shape.diff(0), Shape::from_terms(vec![(6.0, [1, 1, 0])]));
    assert_eq!(shape.diff(1), Shape::from_terms(vec![(3.0, [2, 0, 0]), (2.0, [0, 0, 0])]));
    assert_eq!(shape.diff(2), Shape::constant(-1.0));
    assert!(Shape::constant(4.0).diff(0).is_zero());
}

#[test]
fn arithmetic() {
    let a = Shape::from_terms(vec![(1.0, [0, 0, 0]), (2.0, [1, 0, 0])]);
    let b = Shape::from_terms(vec![(1.0, [0, 0, 0]), (-2.0, [0, 1, 0])]);

    assert_eq!(a.add(&b), Shape::from_terms(vec![(2.0, [0, 0, 0]), (2.0, [1, 0, 0]), (-2.0, [0, 1, 0])]));
    assert!(a.sub(&a).is_zero());
    assert_eq!(a.neg(), a.scale(-1.0));
    assert_scalar_eq!(a.scale(3.0).value(&[1.0, 0.0, 0.0]), 9.0, comp = abs, tol = 1e-14);
}

#[test]
fn local_frame_values_and_derivatives() {
    // (x - 10) / 2 + ((y - 4) / 2)^2
    let frame = Frame::new([10.0, 4.0, 0.0], 2.0);
    let shape = Shape::from_local_terms(vec![(1.0, [1, 0, 0]), (1.0, [0, 2, 0])], frame);
    let point = [14.0, 8.0, 0.0];
    assert_scalar_eq!(shape.value(&point), 6.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(shape.diff(0).value(&point), 0.5, comp = abs, tol = 1e-14);
    assert_scalar_eq!(shape.diff(1).value(&point), 1.0, comp = abs, tol = 1e-14);
    assert_eq!(shape.frame(), &frame);

    // Constants forget their frame
    assert_eq!(Shape::from_local_terms(vec![(3.0, [0, 0, 0])], frame), Shape::constant(3.0));
    assert!(shape.diff(2).is_zero());
}

#[test]
fn arithmetic_across_frames() {
    let a = Shape::from_local_terms(vec![(1.0, [1, 1, 0]), (2.0, [0, 0, 0])], Frame::new([1.0, -1.0, 0.0], 0.5));
    let b = Shape::from_local_terms(vec![(3.0, [0, 2, 0]), (-1.0, [1, 0, 1])], Frame::new([-2.0, 0.0, 3.0], 4.0));
    let sum = a.add(&b);
    let difference = a.sub(&b);
    assert_eq!(sum.frame(), a.frame());
    for point in [[0.0, 0.0, 0.0], [1.5, -2.0, 0.5], [-3.0, 4.0, 2.0]] {
        let (va, vb) = (a.value(&point), b.value(&point));
        assert_scalar_eq!(sum.value(&point), va + vb, comp = abs, tol = 1e-10);
        assert_scalar_eq!(difference.value(&point), va - vb, comp = abs, tol = 1e-10);
    }
    assert!(a.sub(&a).is_zero());
    assert_eq!(Shape::constant(1.0).add(&a).frame(), a.frame());
}

#[test]
fn display() {
    assert_eq!(Shape::zero().to_string(), "0");
    assert_eq!(Shape::from_terms(vec![(0.5, [0, 0, 0]), (2.0, [2, 1, 0])]).to_string(), "0.5 + 2*x^2*y");
}

#[test]
#[should_panic]
fn diff_along_invalid_axis_panics() {
    Shape::constant(1.0).diff(3);
}
