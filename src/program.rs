//! The expression language describing an analysis.
//!
//! A program is a sequence of statements, one per line:
//!
//! ```text
//! #mesh bar.mesh
//! // Axially loaded bar
//! ARGUMENT x
//! RESULT U
//! CONSTANT EA = 2.0E+5
//! LOAD F
//! FUNCTIONAL W
//! W = INTEGRAL(EA / 2 * (DIFF(U, x) var DIFF(U, x)))
//! U(x == 0) = 0
//! F(x == 2) = 1
//! ```
//!
//! Declarations open with one of the section keywords `ARGUMENT`, `CONSTANT`, `RESULT`,
//! `LOAD`, `FUNCTION` and `FUNCTIONAL`. Assignments rebind the expression of a declared
//! symbol, and statements of the form `name(predicate) = value` declare boundary conditions
//! evaluated at every mesh node.
use crate::error::{CompileError, FemError};
use crate::value::EvalContext;
use log::{debug, warn};

pub mod ast;
pub mod lexer;
pub mod symbols;

mod parser;

use ast::Expr;
use parser::StatementParser;
use symbols::{Namespace, SymbolTable};

/// What a boundary condition acts on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BcKind {
    /// Prescribes the value of a RESULT component.
    Dirichlet,
    /// Adds a concentrated value to the load vector at a LOAD component.
    Load,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryCondition {
    /// Name of the RESULT or LOAD symbol the condition applies to.
    pub target: String,
    pub kind: BcKind,
    /// Index of the target among the symbols of its namespace.
    pub index: usize,
    pub predicate: Expr,
    pub value: Expr,
}

impl BoundaryCondition {
    /// Evaluates the condition with the ARGUMENT symbols bound to `arguments`.
    ///
    /// Returns the value if the predicate is non-zero.
    pub fn evaluate(&self, arguments: &[f64]) -> Result<Option<f64>, FemError> {
        let ctx = EvalContext::new().with_arguments(arguments);
        if self.predicate.evaluate(&ctx)?.as_scalar()? == 0.0 {
            return Ok(None);
        }
        self.value.evaluate(&ctx)?.as_scalar().map(Some)
    }
}

/// A program line with its 1-based position in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub number: usize,
    pub text: String,
}

/// Program text with directives and comments removed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Source {
    /// File name given by the `#mesh` directive.
    pub mesh_file: Option<String>,
    pub lines: Vec<SourceLine>,
}

/// Extracts the mesh directive and drops comments and blank lines.
///
/// A line whose first non-blank character is `#` is a directive. The only directive is
/// `#mesh <file>`; anything else is [`FemError::Preprocessor`]. Lines starting with `//` are
/// comments.
pub fn preprocess(text: &str) -> Result<Source, CompileError> {
    let mut source = Source::default();
    for (i, line) in text.lines().enumerate() {
        let number = i + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        if let Some(directive) = trimmed.strip_prefix('#') {
            let file = parse_mesh_directive(directive).ok_or(CompileError::new(number, FemError::Preprocessor))?;
            if let Some(previous) = source.mesh_file.replace(file.to_string()) {
                warn!("Mesh directive on line {} replaces mesh file {}", number, previous);
            }
            continue;
        }
        source.lines.push(SourceLine {
            number,
            text: line.to_string(),
        });
    }
    Ok(source)
}

fn parse_mesh_directive(directive: &str) -> Option<&str> {
    let rest = directive.trim_start().strip_prefix("mesh")?;
    if !rest.starts_with(|c: char| c == ' ' || c == '\t') {
        return None;
    }
    let file = rest.trim();
    (!file.is_empty()).then_some(file)
}

/// A compiled program.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    symbols: SymbolTable,
    boundary_conditions: Vec<BoundaryCondition>,
}

impl Program {
    /// Compiles preprocessed lines.
    ///
    /// Fails with [`FemError::EmptyProgram`] (reported at line 0) if there are no lines.
    pub fn compile(lines: &[SourceLine]) -> Result<Self, CompileError> {
        if lines.is_empty() {
            return Err(CompileError::new(0, FemError::EmptyProgram));
        }

        let mut symbols = SymbolTable::new();
        let mut boundary_conditions = Vec::new();
        for line in lines {
            let statement = StatementParser::new(&line.text, &mut symbols)
                .and_then(StatementParser::parse_statement)
                .map_err(|kind| CompileError::new(line.number, kind))?;
            boundary_conditions.extend(statement);
        }

        debug!(
            "Compiled {} symbols and {} boundary conditions",
            symbols.symbols().len(),
            boundary_conditions.len()
        );
        Ok(Self {
            symbols,
            boundary_conditions,
        })
    }

    /// Preprocesses and compiles program text, ignoring any mesh directive.
    pub fn compile_text(text: &str) -> Result<Self, CompileError> {
        Self::compile(&preprocess(text)?.lines)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn boundary_conditions(&self) -> &[BoundaryCondition] {
        &self.boundary_conditions
    }

    /// Expression of the first declared FUNCTIONAL.
    ///
    /// Fails with [`FemError::InternalError`] if no FUNCTIONAL is declared or it has no
    /// expression.
    pub fn functional(&self) -> Result<&Expr, FemError> {
        self.symbols
            .iter_namespace(Namespace::Functional)
            .next()
            .and_then(|symbol| symbol.expr.as_ref())
            .ok_or(FemError::InternalError)
    }

    pub fn result_names(&self) -> Vec<&str> {
        self.names(Namespace::Result)
    }

    pub fn argument_names(&self) -> Vec<&str> {
        self.names(Namespace::Argument)
    }

    fn names(&self, namespace: Namespace) -> Vec<&str> {
        self.symbols
            .iter_namespace(namespace)
            .map(|symbol| symbol.name.as_str())
            .collect()
    }

    /// FUNCTION symbols that have an expression, in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = (&str, &Expr)> {
        self.symbols
            .iter_namespace(Namespace::Function)
            .filter_map(|symbol| symbol.expr.as_ref().map(|expr| (symbol.name.as_str(), expr)))
    }
}
