//! Postfix execution
//!
//! Runs a compiled token stream against an operand stack. The stream is
//! mutable because function tokens fold each evaluation pass into their
//! instance state.

use crate::error::{CalcError, Result};
use crate::expression::Variable;
use crate::operand::Operand;
use crate::sync::SyncPool;
use crate::token::Token;

/// Everything a single evaluation pass reads
pub struct EvalContext<'a> {
    pub vars: &'a [Variable],
    /// Present only for synchronized expressions, together with the minute
    /// key the pass is aligned to
    pub sync: Option<&'a SyncPool>,
    pub alignment: Option<i64>,
    pub compare_decimals: u32,
}

impl EvalContext<'_> {
    fn read_variable(&self, slot: usize) -> Result<Operand> {
        let var = self
            .vars
            .get(slot)
            .ok_or_else(|| CalcError::parse(format!("variable slot {} out of range", slot)))?;
        match (self.sync, self.alignment) {
            (Some(pool), Some(key)) => pool
                .value_at(slot, key)
                .ok_or_else(|| CalcError::synchronization(var.name())),
            _ => var
                .value()
                .cloned()
                .ok_or_else(|| CalcError::unset_variable(var.name())),
        }
    }
}

/// Execute a postfix stream and return the final statement's value
///
/// Semicolon-separated statements each leave one value behind; only the last
/// one is returned.
pub fn run(postfix: &mut [Token], ctx: &EvalContext<'_>) -> Result<Operand> {
    let mut stack: Vec<Operand> = Vec::with_capacity(postfix.len());

    for token in postfix.iter_mut() {
        match token {
            Token::Operand(op) => stack.push(op.clone()),
            Token::Variable(slot) => stack.push(ctx.read_variable(*slot)?),
            Token::Operator(op) => {
                let arity = op.arity();
                if stack.len() < arity {
                    return Err(CalcError::arity(op.symbol(), arity, stack.len()));
                }
                let args = stack.split_off(stack.len() - arity);
                stack.push(op.apply(&args, ctx.compare_decimals));
            }
            Token::Function(func) => {
                let result = func.evaluate(&mut stack)?;
                stack.push(result);
            }
            Token::Punct(_) => {
                return Err(CalcError::parse("punctuation in compiled stream"));
            }
        }
    }

    stack
        .pop()
        .ok_or_else(|| CalcError::parse("formula produced no value"))
}
