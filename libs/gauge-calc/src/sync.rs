//! Minute-bucket synchronization of variable histories
//!
//! A synchronized expression never reads a variable's latest raw value.
//! Instead every sample is folded into a per-variable history keyed by its
//! minute bucket, and an evaluation pass reads all variables at one shared
//! alignment key: the newest minute for which every variable has data. This
//! keeps cross-variable math coherent when sources report at different rates.

use crate::operand::Operand;
use crate::token::VarSlot;
use crate::window::HistoricValue;
use gauge_time::Timestamp;
use std::collections::BTreeMap;
use tracing::debug;

/// Per-variable minute-bucket histories
#[derive(Debug, Clone, Default)]
pub struct SyncPool {
    histories: Vec<BTreeMap<i64, HistoricValue>>,
}

impl SyncPool {
    pub fn new(slots: usize) -> Self {
        Self {
            histories: vec![BTreeMap::new(); slots],
        }
    }

    /// Fold a sample into its variable's minute bucket
    ///
    /// Within a bucket the newest sample wins; an older sample arriving late
    /// never overwrites a newer one.
    pub fn absorb(&mut self, slot: VarSlot, value: f64, timestamp: Timestamp) {
        let Some(history) = self.histories.get_mut(slot) else {
            return;
        };
        let key = timestamp.minute_key();
        match history.get_mut(&key) {
            Some(existing) if existing.timestamp > timestamp => {}
            Some(existing) => *existing = HistoricValue::new(value, timestamp),
            None => {
                history.insert(key, HistoricValue::new(value, timestamp));
            }
        }
    }

    /// The newest minute key at which every variable has a sample, or `None`
    /// while any history is still empty
    pub fn alignment_key(&self) -> Option<i64> {
        let mut key = i64::MAX;
        for history in &self.histories {
            let newest = *history.keys().next_back()?;
            key = key.min(newest);
        }
        if self.histories.is_empty() {
            return None;
        }
        Some(key)
    }

    /// The first variable slot with no history yet
    pub fn first_empty(&self) -> Option<VarSlot> {
        self.histories.iter().position(|h| h.is_empty())
    }

    /// The sample for `slot` in the bucket at `key`
    pub fn value_at(&self, slot: VarSlot, key: i64) -> Option<Operand> {
        self.histories
            .get(slot)?
            .get(&key)
            .map(|h| Operand::double(h.value, h.timestamp))
    }

    /// Discard buckets at or before a consumed alignment key
    pub fn trim(&mut self, key: i64) {
        let mut dropped = 0usize;
        for history in &mut self.histories {
            let keep = history.split_off(&(key + 1));
            dropped += history.len();
            *history = keep;
        }
        debug!(key, dropped, "synchronization buckets trimmed");
    }

    pub fn clear(&mut self) {
        for history in &mut self.histories {
            history.clear();
        }
    }
}
