//! Tokenizer for single program lines.
use crate::error::FemError;
use crate::program::ast::{Function, Operator};
use crate::program::symbols::Namespace;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    /// A user-defined name, in its original case.
    Name(String),
    /// One of the six section keywords opening a declaration.
    Section(Namespace),
    Function(Function),
    Operator(Operator),
    Assign,
    LeftParen,
    RightParen,
    Comma,
    /// A delimiter with no meaning in the grammar (`.` or `&`).
    Stray(char),
}

impl Token {
    /// Whether the token is a reserved word, i.e. a name that cannot be declared.
    pub fn is_reserved_word(&self) -> bool {
        matches!(
            self,
            Token::Section(_)
                | Token::Function(_)
                | Token::Operator(Operator::Not | Operator::And | Operator::Or | Operator::Var)
        )
    }
}

const SECTIONS: [(&str, Namespace); 6] = [
    ("ARGUMENT", Namespace::Argument),
    ("CONSTANT", Namespace::Constant),
    ("RESULT", Namespace::Result),
    ("LOAD", Namespace::Load),
    ("FUNCTION", Namespace::Function),
    ("FUNCTIONAL", Namespace::Functional),
];

const FUNCTIONS: [(&str, Function); 15] = [
    ("SQRT", Function::Sqrt),
    ("SIN", Function::Sin),
    ("COS", Function::Cos),
    ("TAN", Function::Tan),
    ("EXP", Function::Exp),
    ("ASIN", Function::Asin),
    ("ACOS", Function::Acos),
    ("ATAN", Function::Atan),
    ("ATAN2", Function::Atan2),
    ("SINH", Function::Sinh),
    ("COSH", Function::Cosh),
    ("TANH", Function::Tanh),
    ("DIFF", Function::Diff),
    ("INTEGRAL", Function::Integral),
    ("ABS", Function::Abs),
];

const BOOLEAN_OPERATORS: [(&str, Operator); 3] = [
    ("NOT", Operator::Not),
    ("AND", Operator::And),
    ("OR", Operator::Or),
];

fn lookup<T: Copy>(table: &[(&str, T)], word: &str) -> Option<T> {
    let upper = word.to_ascii_uppercase();
    table
        .iter()
        .find(|(name, _)| *name == upper)
        .map(|(_, value)| *value)
}

fn classify_word(word: &str) -> Token {
    if let Some(namespace) = lookup(&SECTIONS, word) {
        Token::Section(namespace)
    } else if let Some(function) = lookup(&FUNCTIONS, word) {
        Token::Function(function)
    } else if let Some(operator) = lookup(&BOOLEAN_OPERATORS, word) {
        Token::Operator(operator)
    } else if word == "var" {
        Token::Operator(Operator::Var)
    } else {
        Token::Name(word.to_string())
    }
}

/// Splits a line into tokens.
///
/// Blanks and tabs separate tokens. Fails with [`FemError::Syntax`] on characters that belong
/// to no token class and on numbers whose exponent lacks an explicit sign.
pub fn tokenize(line: &str) -> Result<Vec<Token>, FemError> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => pos += 1,
            b'0'..=b'9' => {
                let (number, end) = scan_number(line, pos)?;
                tokens.push(Token::Number(number));
                pos = end;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let start = pos;
                while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                    pos += 1;
                }
                tokens.push(classify_word(&line[start..pos]));
            }
            _ => {
                let next = bytes.get(pos + 1).copied();
                let (token, len) = match (c, next) {
                    (b'*', Some(b'*')) => (Token::Operator(Operator::Pow), 2),
                    (b'=', Some(b'=')) => (Token::Operator(Operator::Eq), 2),
                    (b'<', Some(b'>')) => (Token::Operator(Operator::Ne), 2),
                    (b'<', Some(b'=')) => (Token::Operator(Operator::Le), 2),
                    (b'>', Some(b'=')) => (Token::Operator(Operator::Ge), 2),
                    (b'+', _) => (Token::Operator(Operator::Plus), 1),
                    (b'-', _) => (Token::Operator(Operator::Minus), 1),
                    (b'*', _) => (Token::Operator(Operator::Mul), 1),
                    (b'/', _) => (Token::Operator(Operator::Div), 1),
                    (b'<', _) => (Token::Operator(Operator::Lt), 1),
                    (b'>', _) => (Token::Operator(Operator::Gt), 1),
                    (b'=', _) => (Token::Assign, 1),
                    (b'(', _) => (Token::LeftParen, 1),
                    (b')', _) => (Token::RightParen, 1),
                    (b',', _) => (Token::Comma, 1),
                    (b'.', _) | (b'&', _) => (Token::Stray(c as char), 1),
                    _ => return Err(FemError::Syntax),
                };
                tokens.push(token);
                pos += len;
            }
        }
    }
    Ok(tokens)
}

/// Scans `digits [. digits] [(e|E) (+|-) digits]` starting at `start`.
fn scan_number(line: &str, start: usize) -> Result<(f64, usize), FemError> {
    let bytes = line.as_bytes();
    let digits_from = |mut pos: usize| {
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        pos
    };

    let mut pos = digits_from(start);
    if bytes.get(pos) == Some(&b'.') {
        pos = digits_from(pos + 1);
    }
    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        if !matches!(bytes.get(pos + 1), Some(b'+' | b'-')) {
            return Err(FemError::Syntax);
        }
        let exponent_start = pos + 2;
        pos = digits_from(exponent_start);
        if pos == exponent_start {
            return Err(FemError::Syntax);
        }
    }

    let number = line[start..pos].parse().map_err(|_| FemError::Syntax)?;
    Ok((number, pos))
}
