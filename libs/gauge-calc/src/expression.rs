//! Compiled expressions and their variable tables

use crate::error::{CalcError, Result};
use crate::evaluator::{self, EvalContext};
use crate::operand::{Operand, OperandValue};
use crate::sync::SyncPool;
use crate::token::{Token, VarSlot};
use gauge_time::Timestamp;
use rustc_hash::FxHashMap;
use tracing::debug;

/// A named input of an expression
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    value: Option<Operand>,
}

impl Variable {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&Operand> {
        self.value.as_ref()
    }

    pub fn has_been_set(&self) -> bool {
        self.value.is_some()
    }

    fn set(&mut self, value: Operand) {
        self.value = Some(value);
    }
}

/// A compiled, stateful formula
///
/// Produced by [`Parser::parse`](crate::parser::Parser::parse). The host
/// feeds samples with [`set_value`](Self::set_value) and calls
/// [`evaluate`](Self::evaluate) per cycle; windowed functions accumulate
/// across calls until [`reset`](Self::reset).
#[derive(Debug, Clone)]
pub struct Expression {
    postfix: Vec<Token>,
    vars: Vec<Variable>,
    name_map: FxHashMap<String, VarSlot>,
    sync: Option<SyncPool>,
    compare_decimals: u32,
}

impl Expression {
    pub(crate) fn from_parts(
        postfix: Vec<Token>,
        vars: Vec<Variable>,
        name_map: FxHashMap<String, VarSlot>,
        synchronized: bool,
        compare_decimals: u32,
    ) -> Self {
        let sync = synchronized.then(|| SyncPool::new(vars.len()));
        Self {
            postfix,
            vars,
            name_map,
            sync,
            compare_decimals,
        }
    }

    /// Assign a variable's current sample
    ///
    /// Synchronized expressions also fold the sample into its minute bucket
    /// immediately, so multiple assignments between passes all land in the
    /// history. Returns false when the formula does not reference `name`.
    pub fn set_value(
        &mut self,
        name: &str,
        value: impl Into<OperandValue>,
        timestamp: Timestamp,
    ) -> bool {
        let Some(slot) = self.name_map.get(name).copied() else {
            return false;
        };
        let Some(var) = self.vars.get_mut(slot) else {
            return false;
        };
        let sample = Operand::new(value, timestamp);
        if let Some(pool) = self.sync.as_mut() {
            pool.absorb(slot, sample.as_double(), sample.timestamp());
        }
        var.set(sample);
        true
    }

    /// Run one evaluation pass
    ///
    /// Synchronized expressions read every variable at the newest minute all
    /// of them share; consumed buckets are trimmed only after a successful
    /// pass, so a recoverable error leaves state untouched for the next
    /// cycle.
    pub fn evaluate(&mut self) -> Result<Operand> {
        let alignment = self.alignment()?;
        let ctx = EvalContext {
            vars: &self.vars,
            sync: self.sync.as_ref(),
            alignment,
            compare_decimals: self.compare_decimals,
        };
        let result = evaluator::run(&mut self.postfix, &ctx)?;
        if let (Some(pool), Some(key)) = (self.sync.as_mut(), alignment) {
            pool.trim(key);
        }
        debug!(result = %result, "expression evaluated");
        Ok(result)
    }

    fn alignment(&self) -> Result<Option<i64>> {
        let Some(pool) = self.sync.as_ref() else {
            return Ok(None);
        };
        // A formula without variables has nothing to align
        if self.vars.is_empty() {
            return Ok(None);
        }
        match pool.alignment_key() {
            Some(key) => Ok(Some(key)),
            None => {
                let name = pool
                    .first_empty()
                    .and_then(|slot| self.vars.get(slot))
                    .map(|v| v.name().to_string())
                    .unwrap_or_default();
                Err(CalcError::synchronization(name))
            }
        }
    }

    /// Clear all accumulated state: running extremes, sample and time
    /// windows, reset accumulators and synchronization buckets. Variable
    /// values persist.
    pub fn reset(&mut self) {
        for token in &mut self.postfix {
            if let Token::Function(func) = token {
                func.reset();
            }
        }
        if let Some(pool) = self.sync.as_mut() {
            pool.clear();
        }
    }

    pub fn is_synchronized(&self) -> bool {
        self.sync.is_some()
    }

    pub fn compare_decimals(&self) -> u32 {
        self.compare_decimals
    }

    /// Referenced variable names in first-appearance order
    pub fn variable_names(&self) -> Vec<&str> {
        self.vars.iter().map(|v| v.name()).collect()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.name_map
            .get(name)
            .and_then(|slot| self.vars.get(*slot))
    }

    /// Compiled token stream, for diagnostics
    pub fn postfix(&self) -> &[Token] {
        &self.postfix
    }
}
