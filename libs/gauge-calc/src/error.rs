//! Error types for gauge-calc

use thiserror::Error;

/// Calculation engine errors
///
/// The first two variants are fatal to parsing. `Arity` is fatal to a single
/// `evaluate()` call but leaves the expression reusable. `UnsetVariable` and
/// `Synchronization` are expected, recoverable conditions: the host should
/// treat them as "no result this cycle". Nothing is retried internally.
#[derive(Debug, Error)]
pub enum CalcError {
    /// Malformed literal or unterminated quote, with the byte offset of the
    /// offending fragment in the source string
    #[error("Lex error at position {position}: {message}")]
    Lex { message: String, position: usize },

    /// Structural parse failure (unrecognized token, bad argument count, ...)
    #[error("Parse error: {0}")]
    Parse(String),

    /// A parenthesis was opened and never closed, or closed and never opened
    #[error("Mismatched parentheses")]
    MismatchedParentheses,

    /// A comma or semicolon appeared outside a parenthesized function call
    #[error("Argument separator outside a function call")]
    SeparatorOutsideCall,

    /// Fewer operands on the evaluation stack than an operator or function
    /// requires
    #[error("'{name}' requires {required} operand(s), found {available}")]
    Arity {
        name: String,
        required: usize,
        available: usize,
    },

    /// A variable was read before the host ever assigned it a value
    #[error("Variable '{name}' has not been set")]
    UnsetVariable { name: String },

    /// Synchronized variables are not yet aligned to a common minute bucket
    #[error("Variable '{name}' is not yet synchronized")]
    Synchronization { name: String },
}

impl CalcError {
    pub fn lex(message: impl Into<String>, position: usize) -> Self {
        Self::Lex {
            message: message.into(),
            position,
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn arity(name: impl Into<String>, required: usize, available: usize) -> Self {
        Self::Arity {
            name: name.into(),
            required,
            available,
        }
    }

    pub fn unset_variable(name: impl Into<String>) -> Self {
        Self::UnsetVariable { name: name.into() }
    }

    pub fn synchronization(name: impl Into<String>) -> Self {
        Self::Synchronization { name: name.into() }
    }

    /// Whether the host should treat this error as "not ready yet" rather
    /// than a hard failure
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnsetVariable { .. } | Self::Synchronization { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CalcError>;
