//! Error kinds shared by every stage of an analysis.
use std::fmt;
use std::fmt::{Display, Formatter};

/// The reason an analysis was aborted.
///
/// Every error terminates the run. Variants carry no payload so that they can be compared
/// directly; compiler errors additionally record the offending line, see [`CompileError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FemError {
    UndefinedVariable,
    NotSpecifiedProgram,
    EmptyProgram,
    Syntax,
    Bracket,
    InvalidIdentifier,
    VariableOverride,
    AssignmentArgument,
    AssignmentResult,
    UsingArgument,
    InvalidInitialisation,
    InvalidOperation,
    MeshFormat,
    InvalidFE,
    ReadFile,
    InternalError,
    AsScalar,
    AsVector,
    AsMatrix,
    IncorrectFE,
    NotSolution,
    InvalidBoundaryCondition,
    Preprocessor,
    NotMesh,
}

impl FemError {
    /// Human-readable message of the error kind.
    pub fn message(&self) -> &'static str {
        use FemError::*;
        match self {
            UndefinedVariable => "Use of undeclared identifier",
            NotSpecifiedProgram => "Program not specified",
            EmptyProgram => "Empty program specified",
            Syntax => "Syntax error",
            Bracket => "Unbalanced brackets",
            InvalidIdentifier => "Incorrect identifier name",
            VariableOverride => "Variable override",
            AssignmentArgument => "Assigning a value to an argument",
            AssignmentResult => "Assigning a value to a result function",
            UsingArgument => "Incorrect use of argument",
            InvalidInitialisation => "Invalid initialization",
            InvalidOperation => "Invalid operation",
            MeshFormat => "Mesh format error",
            InvalidFE => "Invalid finite element",
            ReadFile => "Open/Read file error",
            InternalError => "Internal error",
            AsScalar => "Invalid scalar access",
            AsVector => "Invalid vector access",
            AsMatrix => "Invalid matrix access",
            IncorrectFE => "Incorrect FE",
            NotSolution => "System of linear equations has no solution",
            InvalidBoundaryCondition => "Invalid boundary condition",
            Preprocessor => "Incorrect format of the specified mesh-file name",
            NotMesh => "No mesh set",
        }
    }
}

impl Display for FemError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for FemError {}

/// An error raised while compiling a program, together with the 1-based source line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub line: usize,
    kind: FemError,
}

impl CompileError {
    pub fn new(line: usize, kind: FemError) -> Self {
        Self { line, kind }
    }

    pub fn kind(&self) -> FemError {
        self.kind
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {})", self.kind, self.line)
    }
}

impl std::error::Error for CompileError {}

impl From<CompileError> for FemError {
    fn from(err: CompileError) -> Self {
        err.kind
    }
}
