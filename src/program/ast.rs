//! Compiled expression trees and their evaluation.
use crate::error::FemError;
use crate::value::{EvalContext, Value};

/// Operators appearing between or in front of operands.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Plus,
    Minus,
    Mul,
    Div,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Not,
    And,
    Or,
    /// The variation operator `var`.
    Var,
}

impl Operator {
    pub fn is_relational(&self) -> bool {
        use Operator::*;
        matches!(self, Eq | Ne | Lt | Le | Gt | Ge)
    }
}

/// Built-in functions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Function {
    Sqrt,
    Sin,
    Cos,
    Tan,
    Exp,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sinh,
    Cosh,
    Tanh,
    Diff,
    Integral,
    Abs,
}

impl Function {
    /// Applies a function of one scalar argument.
    ///
    /// Returns `None` for `ATAN2`, `DIFF` and `INTEGRAL`, which are not scalar functions of
    /// one argument.
    pub fn apply(&self, x: f64) -> Option<f64> {
        use Function::*;
        let y = match self {
            Sqrt => x.sqrt(),
            Sin => x.sin(),
            Cos => x.cos(),
            Tan => x.tan(),
            Exp => x.exp(),
            Asin => x.asin(),
            Acos => x.acos(),
            Atan => x.atan(),
            Sinh => x.sinh(),
            Cosh => x.cosh(),
            Tanh => x.tanh(),
            Abs => x.abs(),
            Atan2 | Diff | Integral => return None,
        };
        Some(y)
    }
}

/// An owned expression tree.
///
/// References to CONSTANT, LOAD, FUNCTION and FUNCTIONAL symbols are replaced by the
/// expression of the symbol at compile time. ARGUMENT and RESULT symbols are bound at
/// evaluation time through the [`EvalContext`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// ARGUMENT number `i`, in declaration order.
    Argument(usize),
    /// RESULT number `i`, in declaration order.
    Result(usize),
    /// Prefix operator: `+`, `-` or `NOT`.
    Unary(Operator, Box<Expr>),
    Binary(Operator, Box<Expr>, Box<Expr>),
    Call(Function, Box<Expr>),
    Atan2(Box<Expr>, Box<Expr>),
    /// Derivative along spatial axis 0, 1 or 2.
    Diff(Box<Expr>, usize),
    Integral(Box<Expr>),
}

fn truth(condition: bool) -> Value {
    Value::Scalar(if condition { 1.0 } else { 0.0 })
}

impl Expr {
    pub fn unary(op: Operator, operand: Expr) -> Self {
        Expr::Unary(op, Box::new(operand))
    }

    pub fn binary(op: Operator, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    /// Evaluates the expression in the given context.
    pub fn evaluate(&self, ctx: &EvalContext) -> Result<Value, FemError> {
        match self {
            Expr::Number(x) => Ok(Value::Scalar(*x)),
            Expr::Argument(i) => Ok(Value::Scalar(ctx.argument(*i))),
            Expr::Result(i) => Ok(ctx.result(*i)?.clone()),
            Expr::Unary(op, operand) => {
                let value = operand.evaluate(ctx)?;
                match op {
                    Operator::Plus => Ok(value),
                    Operator::Minus => Ok(value.negate()),
                    Operator::Not => Ok(truth(value.as_scalar()? == 0.0)),
                    _ => Err(FemError::InternalError),
                }
            }
            Expr::Binary(op, lhs, rhs) => evaluate_binary(*op, lhs, rhs, ctx),
            Expr::Call(function, argument) => {
                let x = argument.evaluate(ctx)?.as_scalar()?;
                function
                    .apply(x)
                    .map(Value::Scalar)
                    .ok_or(FemError::InternalError)
            }
            Expr::Atan2(y, x) => {
                let y = y.evaluate(ctx)?.as_scalar()?;
                let x = x.evaluate(ctx)?.as_scalar()?;
                Ok(Value::Scalar(y.atan2(x)))
            }
            Expr::Diff(operand, axis) => operand.evaluate(ctx)?.diff(*axis),
            Expr::Integral(integrand) => ctx.integrate(|point_ctx| integrand.evaluate(point_ctx)),
        }
    }
}

fn evaluate_binary(op: Operator, lhs: &Expr, rhs: &Expr, ctx: &EvalContext) -> Result<Value, FemError> {
    use Operator::*;
    let point = ctx.point();

    // Boolean operators short-circuit
    match op {
        And => {
            let value = lhs.evaluate(ctx)?.as_scalar()? != 0.0 && rhs.evaluate(ctx)?.as_scalar()? != 0.0;
            return Ok(truth(value));
        }
        Or => {
            let value = lhs.evaluate(ctx)?.as_scalar()? != 0.0 || rhs.evaluate(ctx)?.as_scalar()? != 0.0;
            return Ok(truth(value));
        }
        _ => {}
    }

    let l = lhs.evaluate(ctx)?;
    let r = rhs.evaluate(ctx)?;
    match op {
        Plus => l.add(r, point),
        Minus => l.sub(r, point),
        Mul => l.multiply(r),
        Div => l.divide(r),
        Var => l.var(r, point),
        Pow => Ok(Value::Scalar(l.as_scalar()?.powf(r.as_scalar()?))),
        Eq => Ok(truth(l.as_scalar()? == r.as_scalar()?)),
        Ne => Ok(truth(l.as_scalar()? != r.as_scalar()?)),
        Lt => Ok(truth(l.as_scalar()? < r.as_scalar()?)),
        Le => Ok(truth(l.as_scalar()? <= r.as_scalar()?)),
        Gt => Ok(truth(l.as_scalar()? > r.as_scalar()?)),
        Ge => Ok(truth(l.as_scalar()? >= r.as_scalar()?)),
        Not | And | Or => Err(FemError::InternalError),
    }
}
