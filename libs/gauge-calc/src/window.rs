//! Sliding-window maintenance and reductions
//!
//! Shared by every time-windowed function: a sorted list of historic samples,
//! age-based pruning against the newest sample, and the numeric reductions
//! (min/max/mean/median/total/standard deviation) applied to the retained
//! window.

use gauge_time::Timestamp;
use serde::{Deserialize, Serialize};

/// One retained sample of a sliding window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricValue {
    pub value: f64,
    pub timestamp: Timestamp,
}

impl HistoricValue {
    pub fn new(value: f64, timestamp: Timestamp) -> Self {
        Self { value, timestamp }
    }
}

/// Pruning predicate for [`prune`]
///
/// `DropAtBoundary` removes samples whose age reaches the window span
/// exactly; `KeepAtBoundary` retains the boundary sample so it can serve as
/// "the value one window-length ago".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cutoff {
    DropAtBoundary,
    KeepAtBoundary,
}

/// Insert a sample into a window kept sorted ascending by timestamp
///
/// Samples usually arrive in order, so the common case is a push to the end.
pub fn insert_sorted(window: &mut Vec<HistoricValue>, sample: HistoricValue) {
    match window.last() {
        Some(last) if last.timestamp > sample.timestamp => {
            let at = window.partition_point(|h| h.timestamp <= sample.timestamp);
            window.insert(at, sample);
        }
        _ => window.push(sample),
    }
}

/// Drop samples older than `span` ticks relative to the newest retained
/// sample. Returns the number of samples removed.
pub fn prune(window: &mut Vec<HistoricValue>, span: i64, cutoff: Cutoff) -> usize {
    let Some(newest) = window.last().map(|h| h.timestamp) else {
        return 0;
    };
    let expired = window.partition_point(|h| {
        let age = newest - h.timestamp;
        match cutoff {
            Cutoff::DropAtBoundary => age >= span,
            Cutoff::KeepAtBoundary => age > span,
        }
    });
    window.drain(..expired);
    expired
}

// ============================================================================
// Reductions
// ============================================================================

/// Minimum over finite values; NaN when none
pub fn min(values: impl Iterator<Item = f64>) -> f64 {
    values
        .filter(|v| v.is_finite())
        .fold(f64::NAN, |acc, v| if acc.is_nan() || v < acc { v } else { acc })
}

/// Maximum over finite values; NaN when none
pub fn max(values: impl Iterator<Item = f64>) -> f64 {
    values
        .filter(|v| v.is_finite())
        .fold(f64::NAN, |acc, v| if acc.is_nan() || v > acc { v } else { acc })
}

/// Sum over finite values; NaN when none
pub fn total(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0u64;
    for v in values.filter(|v| v.is_finite()) {
        sum += v;
        count += 1;
    }
    if count == 0 {
        f64::NAN
    } else {
        sum
    }
}

/// Arithmetic mean; non-finite values are excluded from the denominator
pub fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0u64;
    for v in values.filter(|v| v.is_finite()) {
        sum += v;
        count += 1;
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Median of the finite values; the two middle elements are averaged for
/// even counts
pub fn median(values: impl Iterator<Item = f64>) -> f64 {
    let mut sorted: Vec<f64> = values.filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Two-pass population standard deviation over the finite values
pub fn std_dev(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let m = mean(values.clone());
    if m.is_nan() {
        return f64::NAN;
    }
    let mut sum_sq = 0.0;
    let mut count = 0u64;
    for v in values.filter(|v| v.is_finite()) {
        let d = v - m;
        sum_sq += d * d;
        count += 1;
    }
    (sum_sq / count as f64).sqrt()
}
