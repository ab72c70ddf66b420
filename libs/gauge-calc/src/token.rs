//! Token model: the closed set of node kinds an expression compiles to
//!
//! Tokens are created once at parse time and owned exclusively by their
//! [`Expression`](crate::expression::Expression). Only function tokens carry
//! mutable evaluation state.

use crate::functions::FunctionToken;
use crate::operand::{ArithOp, BitOp, CompareOp, Operand};
use std::fmt;

/// Index of a variable in the owning expression's variable table
pub type VarSlot = usize;

/// Operator stack priority levels (higher binds tighter)
pub mod priority {
    pub const SEMICOLON: u8 = 0;
    pub const PAREN: u8 = 1;
    pub const COMMA: u8 = 2;
    pub const FUNCTION: u8 = 3;
    pub const LOGICAL: u8 = 4;
    pub const COMPARISON: u8 = 5;
    pub const ADDITIVE: u8 = 6;
    pub const MULTIPLICATIVE: u8 = 7;
    pub const NEGATION: u8 = 8;
    pub const POWER: u8 = 9;

    /// Operators at or above this level are right-associative: equal
    /// precedence on the stack top does not pop.
    pub const MAX_LEFT_ASSOCIATIVE: u8 = NEGATION;
}

/// Operator kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Negate,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Equal,
    NotEqual,
    And,
    Or,
    Xor,
    Eqv,
}

impl OpKind {
    pub fn priority(&self) -> u8 {
        match self {
            Self::And | Self::Or | Self::Xor | Self::Eqv => priority::LOGICAL,
            Self::Less
            | Self::LessEq
            | Self::Greater
            | Self::GreaterEq
            | Self::Equal
            | Self::NotEqual => priority::COMPARISON,
            Self::Add | Self::Subtract => priority::ADDITIVE,
            Self::Multiply | Self::Divide => priority::MULTIPLICATIVE,
            Self::Negate => priority::NEGATION,
            Self::Power => priority::POWER,
        }
    }

    /// Number of operands popped from the stack
    pub fn arity(&self) -> usize {
        match self {
            Self::Negate => 1,
            _ => 2,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Power => "^",
            Self::Negate => "-(unary)",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Eqv => "EQV",
        }
    }

    /// Apply the operator to its popped operands (in source order)
    pub fn apply(&self, args: &[Operand], compare_decimals: u32) -> Operand {
        match self {
            Self::Negate => args[0].negate(),
            Self::Add => args[0].arithmetic(ArithOp::Add, &args[1]),
            Self::Subtract => args[0].arithmetic(ArithOp::Subtract, &args[1]),
            Self::Multiply => args[0].arithmetic(ArithOp::Multiply, &args[1]),
            Self::Divide => args[0].arithmetic(ArithOp::Divide, &args[1]),
            Self::Power => args[0].arithmetic(ArithOp::Power, &args[1]),
            Self::Less => args[0].compare(CompareOp::Less, &args[1], compare_decimals),
            Self::LessEq => args[0].compare(CompareOp::LessEq, &args[1], compare_decimals),
            Self::Greater => args[0].compare(CompareOp::Greater, &args[1], compare_decimals),
            Self::GreaterEq => args[0].compare(CompareOp::GreaterEq, &args[1], compare_decimals),
            Self::Equal => args[0].compare(CompareOp::Equal, &args[1], compare_decimals),
            Self::NotEqual => args[0].compare(CompareOp::NotEqual, &args[1], compare_decimals),
            Self::And => args[0].bitwise(BitOp::And, &args[1]),
            Self::Or => args[0].bitwise(BitOp::Or, &args[1]),
            Self::Xor => args[0].bitwise(BitOp::Xor, &args[1]),
            Self::Eqv => args[0].bitwise(BitOp::Eqv, &args[1]),
        }
    }
}

/// Punctuation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunctKind {
    LeftParen,
    RightParen,
    Comma,
    Semicolon,
}

/// A compiled expression node
#[derive(Debug, Clone)]
pub enum Token {
    /// Literal or reserved constant
    Operand(Operand),
    /// Named variable, resolved to a slot in the expression's table
    Variable(VarSlot),
    /// Arithmetic/comparison/bitwise operator or unary negation
    Operator(OpKind),
    /// Stateful or stateless built-in function
    Function(FunctionToken),
    /// Parse-time punctuation; never present in a postfix stream
    Punct(PunctKind),
}

impl Token {
    /// Operator-stack priority of this token
    pub fn priority(&self) -> u8 {
        match self {
            Self::Operator(op) => op.priority(),
            Self::Function(_) => priority::FUNCTION,
            Self::Punct(PunctKind::LeftParen | PunctKind::RightParen) => priority::PAREN,
            Self::Punct(PunctKind::Comma) => priority::COMMA,
            Self::Punct(PunctKind::Semicolon) => priority::SEMICOLON,
            Self::Operand(_) | Self::Variable(_) => u8::MAX,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operand(op) => write!(f, "{}", op.value()),
            Self::Variable(slot) => write!(f, "var#{}", slot),
            Self::Operator(op) => write!(f, "{}", op.symbol()),
            Self::Function(func) => write!(f, "{}", func.kind().name()),
            Self::Punct(PunctKind::LeftParen) => write!(f, "("),
            Self::Punct(PunctKind::RightParen) => write!(f, ")"),
            Self::Punct(PunctKind::Comma) => write!(f, ","),
            Self::Punct(PunctKind::Semicolon) => write!(f, ";"),
        }
    }
}
