//! Infix formula compilation
//!
//! Converts tokenized formula text to the postfix token stream executed by
//! the evaluator, using an operator stack (shunting-yard). Names are resolved
//! statically: operator keywords, built-in functions and reserved constants
//! are matched case-insensitively, and everything else becomes a variable
//! slot in the expression's table.

use crate::error::{CalcError, Result};
use crate::expression::{Expression, Variable};
use crate::functions::{FnKind, FunctionToken};
use crate::operand::{Operand, DEFAULT_COMPARE_DECIMALS};
use crate::reset::ResetOption;
use crate::token::{priority, OpKind, PunctKind, Token, VarSlot};
use crate::tokenizer::{tokenize, Fragment};
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use tracing::debug;

static INTEGER_RE: Lazy<Regex> = Lazy::new(|| compile(r"^\d+$"));
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| compile(r"^(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$"));
static HEX_RE: Lazy<Regex> = Lazy::new(|| compile(r"^&[Hh][0-9A-Fa-f]+$"));
static BINARY_RE: Lazy<Regex> = Lazy::new(|| compile(r"^&[Bb][01]+$"));
static IDENT_RE: Lazy<Regex> = Lazy::new(|| compile(r"^[A-Za-z_][A-Za-z0-9_.]*$"));

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern compiles")
}

/// Parse a formula with default settings
pub fn parse(formula: &str) -> Result<Expression> {
    Parser::new().parse(formula)
}

/// Formula compiler
///
/// ```
/// use gauge_calc::Parser;
///
/// let expr = Parser::new().compare_decimals(2).parse("flow * 1.5")?;
/// # Ok::<(), gauge_calc::CalcError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Parser {
    synchronized: bool,
    compare_decimals: u32,
}

impl Default for Parser {
    fn default() -> Self {
        Self {
            synchronized: false,
            compare_decimals: DEFAULT_COMPARE_DECIMALS,
        }
    }
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Align variable reads to shared minute buckets at evaluation time
    pub fn synchronized(mut self, on: bool) -> Self {
        self.synchronized = on;
        self
    }

    /// Decimal places for the tolerant numeric comparison operators
    pub fn compare_decimals(mut self, decimals: u32) -> Self {
        self.compare_decimals = decimals;
        self
    }

    pub fn parse(&self, formula: &str) -> Result<Expression> {
        let fragments = tokenize(formula)?;
        if fragments.is_empty() {
            return Err(CalcError::parse("empty formula"));
        }

        let mut output: Vec<Token> = Vec::new();
        let mut stack: Vec<Token> = Vec::new();
        let mut vars: Vec<Variable> = Vec::new();
        let mut name_map: FxHashMap<String, VarSlot> = FxHashMap::default();
        // Whether the previous fragment produced a value, which decides
        // between binary and unary readings of '+' and '-'
        let mut prev_atom = false;

        for (i, frag) in fragments.iter().enumerate() {
            let text = frag.text.as_str();
            let upper = text.to_ascii_uppercase();

            match text {
                "(" => {
                    stack.push(Token::Punct(PunctKind::LeftParen));
                    prev_atom = false;
                }
                ")" => {
                    close_paren(&mut output, &mut stack)?;
                    prev_atom = true;
                }
                "," => {
                    separator(&mut output, &mut stack)?;
                    prev_atom = false;
                }
                ";" => {
                    while let Some(top) = stack.last() {
                        if matches!(top, Token::Punct(PunctKind::LeftParen)) {
                            break;
                        }
                        if let Some(tok) = stack.pop() {
                            output.push(tok);
                        }
                    }
                    prev_atom = false;
                }
                "-" if !prev_atom => {
                    push_operator(OpKind::Negate, &mut output, &mut stack);
                    prev_atom = false;
                }
                // Unary plus is a no-op
                "+" if !prev_atom => {}
                _ => {
                    if let Some(op) = operator_for(text, &upper) {
                        push_operator(op, &mut output, &mut stack);
                        prev_atom = false;
                    } else if let Some(kind) = FnKind::lookup(&upper) {
                        if fragments.get(i + 1).map(|f| f.text.as_str()) != Some("(") {
                            return Err(CalcError::parse(format!(
                                "function '{}' must be followed by '('",
                                kind.name()
                            )));
                        }
                        stack.push(Token::Function(FunctionToken::new(kind)));
                        prev_atom = false;
                    } else {
                        output.push(self.operand_or_variable(
                            frag,
                            &upper,
                            &mut vars,
                            &mut name_map,
                        )?);
                        prev_atom = true;
                    }
                }
            }
        }

        while let Some(tok) = stack.pop() {
            match tok {
                Token::Punct(_) | Token::Function(_) => {
                    return Err(CalcError::MismatchedParentheses)
                }
                _ => output.push(tok),
            }
        }

        debug!(
            formula,
            tokens = output.len(),
            variables = vars.len(),
            synchronized = self.synchronized,
            "formula compiled"
        );

        Ok(Expression::from_parts(
            output,
            vars,
            name_map,
            self.synchronized,
            self.compare_decimals,
        ))
    }

    /// Classify a non-operator fragment: reserved constant, literal or
    /// variable reference
    fn operand_or_variable(
        &self,
        frag: &Fragment,
        upper: &str,
        vars: &mut Vec<Variable>,
        name_map: &mut FxHashMap<String, VarSlot>,
    ) -> Result<Token> {
        let text = frag.text.as_str();

        if let Some(value) = constant_for(upper) {
            return Ok(Token::Operand(value));
        }
        if let Some(body) = text.strip_prefix("$\"").and_then(|t| t.strip_suffix('"')) {
            return Ok(Token::Operand(Operand::constant(body)));
        }
        if HEX_RE.is_match(text) {
            let parsed = i64::from_str_radix(&text[2..], 16)
                .map_err(|_| CalcError::lex("hex literal out of range", frag.start))?;
            return Ok(Token::Operand(Operand::constant(parsed)));
        }
        if BINARY_RE.is_match(text) {
            let parsed = i64::from_str_radix(&text[2..], 2)
                .map_err(|_| CalcError::lex("binary literal out of range", frag.start))?;
            return Ok(Token::Operand(Operand::constant(parsed)));
        }
        if NUMBER_RE.is_match(text) {
            // Whole numbers that fit become integers, everything else a double
            if INTEGER_RE.is_match(text) {
                if let Ok(v) = text.parse::<i64>() {
                    return Ok(Token::Operand(Operand::constant(v)));
                }
            }
            let parsed: f64 = text
                .parse()
                .map_err(|_| CalcError::lex("malformed number", frag.start))?;
            return Ok(Token::Operand(Operand::constant(parsed)));
        }
        if IDENT_RE.is_match(text) {
            let slot = *name_map.entry(text.to_string()).or_insert_with(|| {
                vars.push(Variable::new(text));
                vars.len() - 1
            });
            return Ok(Token::Variable(slot));
        }

        Err(CalcError::parse(format!("unrecognized token '{}'", text)))
    }
}

fn operator_for(text: &str, upper: &str) -> Option<OpKind> {
    match text {
        "+" => Some(OpKind::Add),
        "-" => Some(OpKind::Subtract),
        "*" => Some(OpKind::Multiply),
        "/" => Some(OpKind::Divide),
        "^" => Some(OpKind::Power),
        "<" => Some(OpKind::Less),
        "<=" => Some(OpKind::LessEq),
        ">" => Some(OpKind::Greater),
        ">=" => Some(OpKind::GreaterEq),
        "=" => Some(OpKind::Equal),
        "<>" => Some(OpKind::NotEqual),
        _ => match upper {
            "AND" => Some(OpKind::And),
            "OR" => Some(OpKind::Or),
            "XOR" => Some(OpKind::Xor),
            "EQV" => Some(OpKind::Eqv),
            _ => None,
        },
    }
}

/// Reserved constants, matched on the upper-cased fragment
fn constant_for(upper: &str) -> Option<Operand> {
    match upper {
        "PI" => Some(Operand::constant(std::f64::consts::PI)),
        "TRUE" => Some(Operand::constant(1i64)),
        "FALSE" => Some(Operand::constant(0i64)),
        "NAN" => Some(Operand::constant(f64::NAN)),
        _ => [
            ResetOption::Hourly,
            ResetOption::Daily,
            ResetOption::Weekly,
            ResetOption::Monthly,
            ResetOption::Yearly,
            ResetOption::Custom,
        ]
        .into_iter()
        .find(|opt| opt.as_str() == upper)
        .map(|opt| Operand::constant(opt.code())),
    }
}

/// Move pending higher-priority operators to the output, then push
///
/// Equal priority pops for left-associative levels only, so `^` and unary
/// minus nest right-to-left.
fn push_operator(op: OpKind, output: &mut Vec<Token>, stack: &mut Vec<Token>) {
    let priority = op.priority();
    while let Some(top) = stack.last() {
        let top_priority = top.priority();
        if top_priority > priority
            || (top_priority == priority && priority < priority::MAX_LEFT_ASSOCIATIVE)
        {
            if let Some(tok) = stack.pop() {
                output.push(tok);
            }
        } else {
            break;
        }
    }
    stack.push(Token::Operator(op));
}

/// Close a group: flush operators, drop the paren, and emit the owning
/// function (validating its argument count) if this was a call
fn close_paren(output: &mut Vec<Token>, stack: &mut Vec<Token>) -> Result<()> {
    loop {
        match stack.pop() {
            None => return Err(CalcError::MismatchedParentheses),
            Some(Token::Punct(PunctKind::LeftParen)) => break,
            Some(tok) => output.push(tok),
        }
    }
    if matches!(stack.last(), Some(Token::Function(_))) {
        if let Some(Token::Function(func)) = stack.pop() {
            let (min, max) = func.kind().arg_range();
            let argc = func.args();
            if argc < min || argc > max {
                return Err(CalcError::parse(format!(
                    "'{}' takes {}..={} argument(s), got {}",
                    func.kind().name(),
                    min,
                    max,
                    argc
                )));
            }
            output.push(Token::Function(func));
        }
    }
    Ok(())
}

/// Handle an argument comma: flush operators to the call's open paren and
/// bump the owning function's argument count
fn separator(output: &mut Vec<Token>, stack: &mut Vec<Token>) -> Result<()> {
    while !matches!(stack.last(), Some(Token::Punct(PunctKind::LeftParen))) {
        match stack.pop() {
            Some(tok) => output.push(tok),
            None => return Err(CalcError::SeparatorOutsideCall),
        }
    }
    let func_idx = match stack.len().checked_sub(2) {
        Some(idx) => idx,
        None => return Err(CalcError::SeparatorOutsideCall),
    };
    match stack.get_mut(func_idx) {
        Some(Token::Function(func)) => {
            func.increment_args_count();
            Ok(())
        }
        _ => Err(CalcError::SeparatorOutsideCall),
    }
}
