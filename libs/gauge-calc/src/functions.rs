//! Built-in windowed aggregate functions
//!
//! Every function is a token with its own per-instance state: an unbounded
//! running extreme, a count-bounded FIFO, a time-bounded sorted window or a
//! periodic-reset accumulator. State mutates as a side effect of evaluation
//! and is cleared by [`Expression::reset()`](crate::expression::Expression::reset).
//!
//! | Function | Signature | Description |
//! |----------|-----------|-------------|
//! | `RUNNINGMIN` / `RUNNINGMAX` | `(x)` | running extreme since start/reset |
//! | `SAMPLEAVG` / `SAMPLEMEDIAN` | `(x, n)` | reduction over the last n samples |
//! | `WINDOWMIN` / `WINDOWMAX` / `WINDOWAVG` / `WINDOWMEDIAN` / `WINDOWTOTAL` / `WINDOWSTDDEV` | `(x, w)` | reduction over the last w ticks |
//! | `WINDOWOLDEST` | `(x, w [, default])` | value one window-length ago |
//! | `AVGRESET` / `TOTALRESET` / `MINRESET` / `MAXRESET` / `STDDEVRESET` | `(x, t, opt [, flag])` | accumulator cleared by a reset policy |
//!
//! Non-finite samples never enter any accumulator, but every function
//! returns NaN until it has seen at least one finite sample.

use crate::error::{CalcError, Result};
use crate::operand::Operand;
use crate::reset::{reset_due, ResetOption};
use crate::window::{self, Cutoff, HistoricValue};
use gauge_time::Timestamp;
use std::collections::VecDeque;
use tracing::debug;

/// Built-in function selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FnKind {
    RunningMin,
    RunningMax,
    SampleAvg,
    SampleMedian,
    WindowMin,
    WindowMax,
    WindowAvg,
    WindowMedian,
    WindowTotal,
    WindowStdDev,
    WindowOldest,
    AvgReset,
    TotalReset,
    MinReset,
    MaxReset,
    StdDevReset,
}

impl FnKind {
    /// Grammar name (the registry is upper-cased, lookups case-insensitive)
    pub fn name(&self) -> &'static str {
        match self {
            Self::RunningMin => "RUNNINGMIN",
            Self::RunningMax => "RUNNINGMAX",
            Self::SampleAvg => "SAMPLEAVG",
            Self::SampleMedian => "SAMPLEMEDIAN",
            Self::WindowMin => "WINDOWMIN",
            Self::WindowMax => "WINDOWMAX",
            Self::WindowAvg => "WINDOWAVG",
            Self::WindowMedian => "WINDOWMEDIAN",
            Self::WindowTotal => "WINDOWTOTAL",
            Self::WindowStdDev => "WINDOWSTDDEV",
            Self::WindowOldest => "WINDOWOLDEST",
            Self::AvgReset => "AVGRESET",
            Self::TotalReset => "TOTALRESET",
            Self::MinReset => "MINRESET",
            Self::MaxReset => "MAXRESET",
            Self::StdDevReset => "STDDEVRESET",
        }
    }

    /// Resolve an upper-cased name to a function kind
    pub fn lookup(upper: &str) -> Option<FnKind> {
        match upper {
            "RUNNINGMIN" => Some(Self::RunningMin),
            "RUNNINGMAX" => Some(Self::RunningMax),
            "SAMPLEAVG" => Some(Self::SampleAvg),
            "SAMPLEMEDIAN" => Some(Self::SampleMedian),
            "WINDOWMIN" => Some(Self::WindowMin),
            "WINDOWMAX" => Some(Self::WindowMax),
            "WINDOWAVG" => Some(Self::WindowAvg),
            "WINDOWMEDIAN" => Some(Self::WindowMedian),
            "WINDOWTOTAL" => Some(Self::WindowTotal),
            "WINDOWSTDDEV" => Some(Self::WindowStdDev),
            "WINDOWOLDEST" => Some(Self::WindowOldest),
            "AVGRESET" => Some(Self::AvgReset),
            "TOTALRESET" => Some(Self::TotalReset),
            "MINRESET" => Some(Self::MinReset),
            "MAXRESET" => Some(Self::MaxReset),
            "STDDEVRESET" => Some(Self::StdDevReset),
            _ => None,
        }
    }

    /// Inclusive argument-count range
    pub fn arg_range(&self) -> (usize, usize) {
        match self {
            Self::RunningMin | Self::RunningMax => (1, 1),
            Self::SampleAvg | Self::SampleMedian => (2, 2),
            Self::WindowMin
            | Self::WindowMax
            | Self::WindowAvg
            | Self::WindowMedian
            | Self::WindowTotal
            | Self::WindowStdDev => (2, 2),
            Self::WindowOldest => (2, 3),
            Self::AvgReset
            | Self::TotalReset
            | Self::MinReset
            | Self::MaxReset
            | Self::StdDevReset => (3, 4),
        }
    }
}

// ============================================================================
// Per-instance state
// ============================================================================

/// Running extreme state: the best value seen so far and its timestamp
#[derive(Debug, Clone, Default)]
pub struct RunningExtremeState {
    current: Option<HistoricValue>,
}

/// Count-bounded FIFO of the most recent finite samples
#[derive(Debug, Clone, Default)]
pub struct SampleWindowState {
    values: VecDeque<f64>,
}

/// Time-bounded sorted window
#[derive(Debug, Clone, Default)]
pub struct TimeWindowState {
    window: Vec<HistoricValue>,
    /// Whether pruning has ever discarded a sample (the window has filled)
    pruned: bool,
}

/// Periodic-reset accumulator
#[derive(Debug, Clone, Default)]
pub struct ResetAccumState {
    last: Option<Timestamp>,
    sum: f64,
    count: u64,
    extreme: f64,
    /// Retained only by the standard-deviation variant
    samples: Vec<f64>,
}

/// State payload, one variant per function family
#[derive(Debug, Clone)]
enum FnState {
    Running(RunningExtremeState),
    Samples(SampleWindowState),
    Window(TimeWindowState),
    Reset(ResetAccumState),
}

impl FnState {
    fn for_kind(kind: FnKind) -> Self {
        match kind {
            FnKind::RunningMin | FnKind::RunningMax => Self::Running(Default::default()),
            FnKind::SampleAvg | FnKind::SampleMedian => Self::Samples(Default::default()),
            FnKind::WindowMin
            | FnKind::WindowMax
            | FnKind::WindowAvg
            | FnKind::WindowMedian
            | FnKind::WindowTotal
            | FnKind::WindowStdDev
            | FnKind::WindowOldest => Self::Window(Default::default()),
            FnKind::AvgReset
            | FnKind::TotalReset
            | FnKind::MinReset
            | FnKind::MaxReset
            | FnKind::StdDevReset => Self::Reset(Default::default()),
        }
    }
}

// ============================================================================
// Function token
// ============================================================================

/// A function call site with its tracked argument count and instance state
#[derive(Debug, Clone)]
pub struct FunctionToken {
    kind: FnKind,
    args: usize,
    state: FnState,
}

impl FunctionToken {
    pub fn new(kind: FnKind) -> Self {
        Self {
            kind,
            args: 1,
            state: FnState::for_kind(kind),
        }
    }

    pub fn kind(&self) -> FnKind {
        self.kind
    }

    /// Tracked argument count (commas seen at parse time + 1)
    pub fn args(&self) -> usize {
        self.args
    }

    /// Record one more comma-separated argument
    pub fn increment_args_count(&mut self) {
        self.args += 1;
    }

    /// Clear all evaluation state (running extremes, windows, accumulators)
    pub fn reset(&mut self) {
        self.state = FnState::for_kind(self.kind);
    }

    /// Pop this call's operands off the stack and push back one result
    pub fn evaluate(&mut self, stack: &mut Vec<Operand>) -> Result<Operand> {
        let argc = self.args;
        if stack.len() < argc {
            return Err(CalcError::arity(self.kind.name(), argc, stack.len()));
        }
        let args = stack.split_off(stack.len() - argc);
        match &mut self.state {
            FnState::Running(st) => Ok(eval_running(self.kind, st, &args)),
            FnState::Samples(st) => Ok(eval_samples(self.kind, st, &args)),
            FnState::Window(st) => Ok(eval_window(self.kind, st, &args)),
            FnState::Reset(st) => eval_reset(self.kind, st, &args),
        }
    }
}

// ============================================================================
// Family implementations
// ============================================================================

fn eval_running(kind: FnKind, st: &mut RunningExtremeState, args: &[Operand]) -> Operand {
    let value = args[0].as_double();
    let ts = args[0].timestamp();

    if value.is_finite() {
        let supersedes = match &st.current {
            None => true,
            Some(cur) if kind == FnKind::RunningMin => value < cur.value,
            Some(cur) => value > cur.value,
        };
        if supersedes {
            st.current = Some(HistoricValue::new(value, ts));
        }
    }

    match &st.current {
        Some(cur) => Operand::double(cur.value, cur.timestamp),
        None => Operand::double(f64::NAN, ts),
    }
}

fn eval_samples(kind: FnKind, st: &mut SampleWindowState, args: &[Operand]) -> Operand {
    let value = args[0].as_double();
    let ts = args[0].timestamp();
    // The bound is re-read every call, so expressions may resize the window
    let bound = args[1].as_integer().max(0) as usize;

    if value.is_finite() {
        st.values.push_back(value);
    }
    while st.values.len() > bound {
        st.values.pop_front();
    }

    let result = match kind {
        FnKind::SampleAvg => window::mean(st.values.iter().copied()),
        _ => window::median(st.values.iter().copied()),
    };
    Operand::double(result, ts)
}

fn eval_window(kind: FnKind, st: &mut TimeWindowState, args: &[Operand]) -> Operand {
    let value = args[0].as_double();
    let ts = args[0].timestamp();
    let span = args[1].as_integer();

    if value.is_finite() {
        window::insert_sorted(&mut st.window, HistoricValue::new(value, ts));
        // WINDOWOLDEST keeps the boundary sample so it can report the value
        // one full window-length ago; the reductions drop it.
        let cutoff = if kind == FnKind::WindowOldest {
            Cutoff::KeepAtBoundary
        } else {
            Cutoff::DropAtBoundary
        };
        if window::prune(&mut st.window, span, cutoff) > 0 {
            st.pruned = true;
        }
    }

    debug!(
        function = kind.name(),
        value,
        span,
        retained = st.window.len(),
        "window update"
    );

    let values = st.window.iter().map(|h| h.value);
    let result = match kind {
        FnKind::WindowMin => window::min(values),
        FnKind::WindowMax => window::max(values),
        FnKind::WindowAvg => window::mean(values),
        FnKind::WindowMedian => window::median(values),
        FnKind::WindowTotal => window::total(values),
        FnKind::WindowStdDev => window::std_dev(values),
        _ => return eval_window_oldest(st, span, &args.get(2).cloned(), ts),
    };
    Operand::double(result, ts)
}

/// Value-at-time: the oldest retained sample once the window spans the
/// requested duration, otherwise the caller-supplied default (or NaN)
fn eval_window_oldest(
    st: &TimeWindowState,
    span: i64,
    default: &Option<Operand>,
    ts: Timestamp,
) -> Operand {
    let spans_window = match (st.window.first(), st.window.last()) {
        (Some(oldest), Some(newest)) => st.pruned || newest.timestamp - oldest.timestamp >= span,
        _ => false,
    };
    if spans_window {
        // Window is non-empty here, so first() always yields a sample
        match st.window.first() {
            Some(oldest) => Operand::double(oldest.value, oldest.timestamp),
            None => Operand::double(f64::NAN, ts),
        }
    } else {
        match default {
            Some(op) => Operand::double(op.as_double(), ts),
            None => Operand::double(f64::NAN, ts),
        }
    }
}

fn eval_reset(kind: FnKind, st: &mut ResetAccumState, args: &[Operand]) -> Result<Operand> {
    let value = args[0].as_double();
    let ts = args[1].as_timestamp();
    let code = args[2].as_integer();
    let option = ResetOption::from_code(code)
        .ok_or_else(|| CalcError::parse(format!("invalid reset option code {}", code)))?;
    let flag = args.get(3).map(|a| a.as_double() != 0.0).unwrap_or(false);

    if value.is_finite() {
        let restart = match st.last {
            None => true,
            Some(prev) => reset_due(prev, ts, option, flag),
        };
        if restart {
            debug!(function = kind.name(), option = %option, value, "accumulator reset");
            st.sum = value;
            st.count = 1;
            st.extreme = value;
            st.samples.clear();
        } else {
            st.sum += value;
            st.count += 1;
            st.extreme = match kind {
                FnKind::MinReset => st.extreme.min(value),
                _ => st.extreme.max(value),
            };
        }
        if kind == FnKind::StdDevReset {
            st.samples.push(value);
        }
        st.last = Some(ts);
    }

    let result = if st.count == 0 {
        f64::NAN
    } else {
        match kind {
            FnKind::AvgReset => st.sum / st.count as f64,
            FnKind::TotalReset => st.sum,
            FnKind::MinReset | FnKind::MaxReset => st.extreme,
            _ => window::std_dev(st.samples.iter().copied()),
        }
    };
    Ok(Operand::double(result, ts))
}
