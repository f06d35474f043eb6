//! Evaluation errors.

use nuance_trousse::CompactString;
use thiserror::Error;

/// Why an expression could not be turned into a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("Empty expression")]
    Empty,

    #[error("Unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("Unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("Unexpected token at offset {offset}: expected {expected}")]
    UnexpectedToken {
        offset: usize,
        expected: &'static str,
    },

    #[error("Unknown variable {0}")]
    UnknownVariable(CompactString),

    #[error("Variable {0} is defined in terms of itself")]
    RecursiveVariable(CompactString),

    #[error("Unknown function {0}()")]
    UnknownFunction(CompactString),

    #[error("Invalid arguments for {function}(): {message}")]
    InvalidArgument {
        function: CompactString,
        message: &'static str,
    },

    #[error("Cannot apply '{op}' to {lhs} and {rhs}")]
    IncompatibleOperands {
        op: char,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Expression nests deeper than {0} levels")]
    TooDeep(usize),
}
