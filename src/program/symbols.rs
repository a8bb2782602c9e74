//! The symbol table of a program.
use crate::error::FemError;
use crate::program::ast::Expr;
use crate::value::ValueType;
use rustc_hash::FxHashMap;
use std::fmt;
use std::fmt::{Display, Formatter};

/// The six kinds of declarable symbols.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Scalar placeholders bound to the nodal coordinates in boundary conditions.
    Argument,
    Constant,
    /// Primary unknowns.
    Result,
    Load,
    /// Derived vector quantities.
    Function,
    /// The variational form assembled per element.
    Functional,
}

impl Namespace {
    /// Type of a reference to a symbol of this namespace.
    pub fn reference_type(&self) -> ValueType {
        use Namespace::*;
        match self {
            Argument | Constant | Load => ValueType::Scalar,
            Result | Function => ValueType::Vector,
            Functional => ValueType::Matrix,
        }
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use Namespace::*;
        let keyword = match self {
            Argument => "ARGUMENT",
            Constant => "CONSTANT",
            Result => "RESULT",
            Load => "LOAD",
            Function => "FUNCTION",
            Functional => "FUNCTIONAL",
        };
        write!(f, "{}", keyword)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub namespace: Namespace,
    /// Position among the symbols of the same namespace, in declaration order.
    pub index: usize,
    /// Expression most recently assigned to the symbol, if any.
    pub expr: Option<Expr>,
}

/// Declared symbols of all namespaces. Names are unique across namespaces.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: FxHashMap<String, usize>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a new symbol without expression.
    ///
    /// Fails with [`FemError::VariableOverride`] if the name is already declared in any
    /// namespace.
    pub fn declare(&mut self, name: &str, namespace: Namespace) -> Result<&Symbol, FemError> {
        if self.by_name.contains_key(name) {
            return Err(FemError::VariableOverride);
        }
        let index = self.count(namespace);
        self.by_name.insert(name.to_string(), self.symbols.len());
        self.symbols.push(Symbol {
            name: name.to_string(),
            namespace,
            index,
            expr: None,
        });
        Ok(&self.symbols[self.symbols.len() - 1])
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.by_name.get(name).map(|&i| &self.symbols[i])
    }

    /// Replaces the expression of a declared symbol.
    pub fn set_expr(&mut self, name: &str, expr: Expr) -> Result<(), FemError> {
        let i = *self.by_name.get(name).ok_or(FemError::InternalError)?;
        self.symbols[i].expr = Some(expr);
        Ok(())
    }

    /// Symbols of a namespace, in declaration order.
    pub fn iter_namespace(&self, namespace: Namespace) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(move |s| s.namespace == namespace)
    }

    pub fn count(&self, namespace: Namespace) -> usize {
        self.iter_namespace(namespace).count()
    }

    /// All symbols, in declaration order.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }
}
