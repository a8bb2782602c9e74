//! Recursive-descent parser for a single statement line.
//!
//! Precedence, from loosest to tightest binding: `OR`, `AND`, `NOT`, additive and relational
//! operators, `*` and `/`, `var`, `**`, unary `+`/`-`, parentheses and primaries. Every level
//! returns the static type of the expression it parsed, which is checked against the operand
//! rules of the operator.
use crate::error::FemError;
use crate::program::ast::{Expr, Function, Operator};
use crate::program::lexer::{tokenize, Token};
use crate::program::symbols::{Namespace, SymbolTable};
use crate::program::{BcKind, BoundaryCondition};
use crate::value::ValueType;

type Typed = (Expr, ValueType);

pub(crate) struct StatementParser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    symbols: &'a mut SymbolTable,
    allow_arguments: bool,
}

impl<'a> StatementParser<'a> {
    pub fn new(line: &str, symbols: &'a mut SymbolTable) -> Result<Self, FemError> {
        Ok(Self {
            tokens: tokenize(line)?,
            pos: 0,
            symbols,
            allow_arguments: false,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_operator(&self) -> Option<Operator> {
        match self.peek() {
            Some(Token::Operator(op)) => Some(*op),
            _ => None,
        }
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token, error: FemError) -> Result<(), FemError> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            _ => Err(error),
        }
    }

    fn expect_end(&self) -> Result<(), FemError> {
        match self.peek() {
            None => Ok(()),
            Some(Token::RightParen) => Err(FemError::Bracket),
            Some(_) => Err(FemError::Syntax),
        }
    }

    /// Parses the whole line, updating the symbol table.
    ///
    /// Returns the boundary condition declared by the line, if any.
    pub fn parse_statement(mut self) -> Result<Option<BoundaryCondition>, FemError> {
        match self.peek() {
            None => Ok(None),
            Some(Token::Section(namespace)) => {
                let namespace = *namespace;
                self.pos += 1;
                self.declarations(namespace)?;
                self.expect_end()?;
                Ok(None)
            }
            Some(Token::Name(_)) => self.assignment(),
            Some(Token::RightParen) => Err(FemError::Bracket),
            Some(_) => Err(FemError::Syntax),
        }
    }

    fn declarations(&mut self, namespace: Namespace) -> Result<(), FemError> {
        loop {
            let name = match self.advance() {
                Some(Token::Name(name)) => name,
                Some(token) if token.is_reserved_word() => return Err(FemError::InvalidIdentifier),
                _ => return Err(FemError::Syntax),
            };
            self.symbols.declare(&name, namespace)?;

            if self.peek() == Some(&Token::Assign) {
                self.pos += 1;
                if matches!(namespace, Namespace::Argument | Namespace::Result) {
                    return Err(FemError::InvalidInitialisation);
                }
                let (expr, ty) = self.expression()?;
                let required = match namespace {
                    Namespace::Constant | Namespace::Load => ValueType::Scalar,
                    _ => ValueType::Vector,
                };
                if ty != required {
                    return Err(FemError::InvalidOperation);
                }
                self.symbols.set_expr(&name, expr)?;
            }

            if self.peek() == Some(&Token::Comma) {
                self.pos += 1;
            } else {
                return Ok(());
            }
        }
    }

    fn assignment(&mut self) -> Result<Option<BoundaryCondition>, FemError> {
        let name = match self.advance() {
            Some(Token::Name(name)) => name,
            _ => return Err(FemError::InvalidIdentifier),
        };
        match self.advance() {
            Some(Token::LeftParen) => self.boundary_condition(name).map(Some),
            Some(Token::Assign) => {
                let (expr, ty) = self.expression()?;
                let required = match self.symbols.get(&name).map(|s| s.namespace) {
                    Some(Namespace::Constant | Namespace::Load) => ValueType::Scalar,
                    Some(Namespace::Function) => ValueType::Vector,
                    Some(Namespace::Functional) => ValueType::Matrix,
                    Some(Namespace::Argument) => return Err(FemError::AssignmentArgument),
                    Some(Namespace::Result) => return Err(FemError::AssignmentResult),
                    None => return Err(FemError::UndefinedVariable),
                };
                if ty != required {
                    return Err(FemError::InvalidOperation);
                }
                self.expect_end()?;
                self.symbols.set_expr(&name, expr)?;
                Ok(None)
            }
            _ => Err(FemError::Syntax),
        }
    }

    /// Parses `(predicate) = value` after the target name of a boundary condition.
    fn boundary_condition(&mut self, target: String) -> Result<BoundaryCondition, FemError> {
        let (kind, index) = match self.symbols.get(&target) {
            Some(symbol) if symbol.namespace == Namespace::Result => (BcKind::Dirichlet, symbol.index),
            Some(symbol) if symbol.namespace == Namespace::Load => (BcKind::Load, symbol.index),
            _ => return Err(FemError::InvalidBoundaryCondition),
        };

        self.allow_arguments = true;
        let (predicate, ty) = self.expression()?;
        if ty != ValueType::Scalar {
            return Err(FemError::Syntax);
        }
        self.expect(Token::RightParen, FemError::Syntax)?;
        self.expect(Token::Assign, FemError::Syntax)?;
        let (value, ty) = self.expression()?;
        if ty != ValueType::Scalar {
            return Err(FemError::Syntax);
        }
        self.allow_arguments = false;
        self.expect_end()?;

        Ok(BoundaryCondition {
            target,
            kind,
            index,
            predicate,
            value,
        })
    }

    fn expression(&mut self) -> Result<Typed, FemError> {
        if self.peek().is_none() {
            return Err(FemError::Syntax);
        }
        self.logical_or()
    }

    fn logical_or(&mut self) -> Result<Typed, FemError> {
        let (mut expr, ty) = self.logical_and()?;
        while self.peek_operator() == Some(Operator::Or) {
            self.pos += 1;
            let (rhs, rhs_ty) = self.logical_and()?;
            if ty != ValueType::Scalar || rhs_ty != ValueType::Scalar {
                return Err(FemError::InvalidOperation);
            }
            expr = Expr::binary(Operator::Or, expr, rhs);
        }
        Ok((expr, ty))
    }

    fn logical_and(&mut self) -> Result<Typed, FemError> {
        let (mut expr, ty) = self.logical_not()?;
        while self.peek_operator() == Some(Operator::And) {
            self.pos += 1;
            let (rhs, rhs_ty) = self.logical_not()?;
            if ty != ValueType::Scalar || rhs_ty != ValueType::Scalar {
                return Err(FemError::InvalidOperation);
            }
            expr = Expr::binary(Operator::And, expr, rhs);
        }
        Ok((expr, ty))
    }

    fn logical_not(&mut self) -> Result<Typed, FemError> {
        if self.peek_operator() != Some(Operator::Not) {
            return self.additive();
        }
        self.pos += 1;
        let (operand, ty) = self.additive()?;
        if ty != ValueType::Scalar {
            return Err(FemError::InvalidOperation);
        }
        Ok((Expr::unary(Operator::Not, operand), ty))
    }

    fn additive(&mut self) -> Result<Typed, FemError> {
        let (mut expr, ty) = self.multiplicative()?;
        while let Some(op) = self
            .peek_operator()
            .filter(|op| matches!(op, Operator::Plus | Operator::Minus) || op.is_relational())
        {
            self.pos += 1;
            let (rhs, rhs_ty) = self.multiplicative()?;
            if rhs_ty != ty || (op.is_relational() && ty != ValueType::Scalar) {
                return Err(FemError::InvalidOperation);
            }
            expr = Expr::binary(op, expr, rhs);
        }
        Ok((expr, ty))
    }

    fn multiplicative(&mut self) -> Result<Typed, FemError> {
        let (mut expr, mut ty) = self.variation()?;
        while let Some(op) = self
            .peek_operator()
            .filter(|op| matches!(op, Operator::Mul | Operator::Div))
        {
            self.pos += 1;
            let (rhs, rhs_ty) = self.variation()?;
            match op {
                Operator::Div if rhs_ty != ValueType::Scalar => return Err(FemError::InvalidOperation),
                Operator::Mul if ty == ValueType::Scalar => ty = rhs_ty,
                Operator::Mul if rhs_ty != ValueType::Scalar => return Err(FemError::InvalidOperation),
                _ => {}
            }
            expr = Expr::binary(op, expr, rhs);
        }
        Ok((expr, ty))
    }

    /// Whether `token` is a name declared in `namespace`.
    fn names(&self, token: &Option<Token>, namespace: Namespace) -> bool {
        match token {
            Some(Token::Name(name)) => self
                .symbols
                .get(name)
                .map_or(false, |symbol| symbol.namespace == namespace),
            _ => false,
        }
    }

    fn variation(&mut self) -> Result<Typed, FemError> {
        let lhs_start = self.peek().cloned();
        let (mut expr, mut ty) = self.power()?;
        while self.peek_operator() == Some(Operator::Var) {
            self.pos += 1;
            let rhs_start = self.peek().cloned();
            let (rhs, rhs_ty) = self.power()?;
            if !matches!(ty, ValueType::Scalar | ValueType::Vector) || rhs_ty != ValueType::Vector {
                return Err(FemError::InvalidOperation);
            }
            // A load contribution pairs a load with a primary unknown
            if ty == ValueType::Scalar
                && !(self.names(&lhs_start, Namespace::Load) && self.names(&rhs_start, Namespace::Result))
            {
                return Err(FemError::Syntax);
            }
            expr = Expr::binary(Operator::Var, expr, rhs);
            ty = ValueType::Matrix;
        }
        Ok((expr, ty))
    }

    fn power(&mut self) -> Result<Typed, FemError> {
        let (mut expr, ty) = self.unary()?;
        while self.peek_operator() == Some(Operator::Pow) {
            self.pos += 1;
            let (rhs, rhs_ty) = self.unary()?;
            if ty != ValueType::Scalar || rhs_ty != ValueType::Scalar {
                return Err(FemError::InvalidOperation);
            }
            expr = Expr::binary(Operator::Pow, expr, rhs);
        }
        Ok((expr, ty))
    }

    fn unary(&mut self) -> Result<Typed, FemError> {
        match self.peek_operator() {
            Some(op @ (Operator::Plus | Operator::Minus)) => {
                self.pos += 1;
                let (operand, ty) = self.bracket()?;
                Ok((Expr::unary(op, operand), ty))
            }
            _ => self.bracket(),
        }
    }

    fn bracket(&mut self) -> Result<Typed, FemError> {
        if self.peek() != Some(&Token::LeftParen) {
            return self.primary();
        }
        self.pos += 1;
        let typed = self.logical_or()?;
        self.expect(Token::RightParen, FemError::Bracket)?;
        Ok(typed)
    }

    fn primary(&mut self) -> Result<Typed, FemError> {
        match self.advance() {
            Some(Token::Number(x)) => Ok((Expr::Number(x), ValueType::Scalar)),
            Some(Token::Name(name)) => self.reference(&name),
            Some(Token::Function(function)) => self.call(function),
            _ => Err(FemError::Syntax),
        }
    }

    fn reference(&self, name: &str) -> Result<Typed, FemError> {
        let symbol = self.symbols.get(name).ok_or(FemError::UndefinedVariable)?;
        let ty = symbol.namespace.reference_type();
        let expr = match symbol.namespace {
            Namespace::Argument if !self.allow_arguments => return Err(FemError::UsingArgument),
            Namespace::Argument => Expr::Argument(symbol.index),
            Namespace::Result => Expr::Result(symbol.index),
            Namespace::Constant | Namespace::Load => symbol.expr.clone().unwrap_or(Expr::Number(0.0)),
            Namespace::Function | Namespace::Functional => symbol.expr.clone().ok_or(FemError::UndefinedVariable)?,
        };
        Ok((expr, ty))
    }

    /// Axis selected by the name of one of the first three ARGUMENT symbols.
    fn argument_axis(&self, name: &str) -> Option<usize> {
        self.symbols
            .iter_namespace(Namespace::Argument)
            .take(3)
            .position(|symbol| symbol.name == name)
    }

    fn call(&mut self, function: Function) -> Result<Typed, FemError> {
        self.expect(Token::LeftParen, FemError::Syntax)?;
        let (argument, ty) = self.additive()?;

        let typed = match function {
            Function::Atan2 => {
                if ty != ValueType::Scalar {
                    return Err(FemError::InvalidOperation);
                }
                self.expect(Token::Comma, FemError::Syntax)?;
                let (x, x_ty) = self.additive()?;
                if x_ty != ValueType::Scalar {
                    return Err(FemError::InvalidOperation);
                }
                (Expr::Atan2(Box::new(argument), Box::new(x)), ValueType::Scalar)
            }
            Function::Diff => {
                if ty != ValueType::Vector {
                    return Err(FemError::InvalidOperation);
                }
                self.expect(Token::Comma, FemError::Syntax)?;
                let axis = match self.advance() {
                    Some(Token::Name(name)) => self.argument_axis(&name).ok_or(FemError::Syntax)?,
                    _ => return Err(FemError::Syntax),
                };
                (Expr::Diff(Box::new(argument), axis), ValueType::Vector)
            }
            Function::Integral => {
                if ty == ValueType::Scalar {
                    return Err(FemError::InvalidOperation);
                }
                (Expr::Integral(Box::new(argument)), ty)
            }
            _ => {
                if ty != ValueType::Scalar {
                    return Err(FemError::InvalidOperation);
                }
                (Expr::Call(function, Box::new(argument)), ValueType::Scalar)
            }
        };

        self.expect(Token::RightParen, FemError::Syntax)?;
        Ok(typed)
    }
}
