//! Error types for every phase of the pipeline.
//!
//! Hand-rolled `line/col + Kind` shape rather than a derive-macro error:
//! the Display text required by the host-facing contract is exact-prefix
//! text, and a derive only gets in the way of that.

use std::fmt;

use crate::token::Position;

/// A lexical error: an unrecognized character or malformed literal.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub pos: Position,
    pub msg: String,
}

/// A syntax error: an unexpected token, an unmatched bracket, trailing input.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub pos: Position,
    pub msg: String,
    /// The full source line the error occurred on, for the `^---` indicator.
    pub line_text: String,
}

/// One error accumulated during the semantic/optimizer pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileErrorItem {
    pub pos: Option<Position>,
    pub msg: String,
}

/// A runtime failure, raised while executing bytecode.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    NameError(String),
    AttributeError(String),
    TypeError(String),
    IndexError(String),
    Overflow,
    DivisionByZero,
    OutOfMemory,
    /// Arity mismatches and host-function failures.
    Other(String),
    /// An evaluation that ran out of its instruction budget.
    InstructionLimit,
}

/// The single error type returned by every fallible public entry point.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Lex(LexError),
    Parse(ParseError),
    Compile(Vec<CompileErrorItem>),
    Runtime(RuntimeError),
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LexError: {} at {}:{}", self.msg, self.pos.line, self.pos.col)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ParseError: {} at {}:{}", self.msg, self.pos.line, self.pos.col)?;
        writeln!(f, "{}", self.line_text)?;
        let indicator: String = " ".repeat(self.pos.col.saturating_sub(1)) + "^---";
        write!(f, "{}", indicator)
    }
}

impl fmt::Display for CompileErrorItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pos {
            Some(pos) => write!(f, "CompileError: {} at {}:{}", self.msg, pos.line, pos.col),
            None => write!(f, "CompileError: {}", self.msg),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::NameError(d) => write!(f, "NameError: {}", d),
            RuntimeError::AttributeError(d) => write!(f, "AttributeError: {}", d),
            RuntimeError::TypeError(d) => write!(f, "TypeError: {}", d),
            RuntimeError::IndexError(d) => write!(f, "IndexError: {}", d),
            RuntimeError::Overflow => write!(f, "ArithmeticError: Overflow"),
            RuntimeError::DivisionByZero => write!(f, "ArithmeticError: Divided by zero"),
            RuntimeError::OutOfMemory => write!(f, "Out of Memory"),
            RuntimeError::Other(d) => write!(f, "RuntimeError: {}", d),
            RuntimeError::InstructionLimit => write!(f, "RuntimeError: instruction limit exceeded"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Lex(e) => write!(f, "{}", e),
            Error::Parse(e) => write!(f, "{}", e),
            Error::Compile(items) => {
                let rendered: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "{}", rendered.join("\n"))
            }
            Error::Runtime(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<LexError> for Error {
    fn from(e: LexError) -> Error {
        Error::Lex(e)
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Error {
        Error::Parse(e)
    }
}

impl From<RuntimeError> for Error {
    fn from(e: RuntimeError) -> Error {
        Error::Runtime(e)
    }
}

impl From<Vec<CompileErrorItem>> for Error {
    fn from(items: Vec<CompileErrorItem>) -> Error {
        Error::Compile(items)
    }
}
