//! gauge-calc - Streaming telemetry expression engine
//!
//! Compiles infix formulas over timestamped telemetry into postfix token
//! streams and evaluates them repeatedly as new samples arrive. Windowed
//! functions carry per-call-site state, so one compiled [`Expression`] folds
//! an entire sample stream into running aggregates.
//!
//! # Example
//!
//! ```rust
//! use gauge_calc::{parse, Timestamp};
//!
//! let mut expr = parse("WINDOWAVG(flow, 60000) * scale")?;
//! expr.set_value("scale", 1.5, Timestamp::from_millis(1_000));
//! expr.set_value("flow", 20.0, Timestamp::from_millis(1_000));
//! assert_eq!(expr.evaluate()?.as_double(), 30.0);
//!
//! expr.set_value("flow", 40.0, Timestamp::from_millis(31_000));
//! assert_eq!(expr.evaluate()?.as_double(), 45.0);
//! # Ok::<(), gauge_calc::CalcError>(())
//! ```
//!
//! # Operators
//!
//! `+ - * / ^`, unary `-`, comparison `< <= > >= = <>` (decimal-rounded,
//! yielding integer 0/1) and 32-bit bitwise `AND OR XOR EQV`. `^` and unary
//! `-` are right-associative; everything else is left-associative.
//!
//! # Built-in Functions
//!
//! | Function | Signature | Description |
//! |----------|-----------|-------------|
//! | `RUNNINGMIN` / `RUNNINGMAX` | `(x)` | extreme since start or reset |
//! | `SAMPLEAVG` / `SAMPLEMEDIAN` | `(x, n)` | over the last n samples |
//! | `WINDOWMIN` / `WINDOWMAX` / `WINDOWAVG` / `WINDOWMEDIAN` / `WINDOWTOTAL` / `WINDOWSTDDEV` | `(x, w)` | over the last w milliseconds |
//! | `WINDOWOLDEST` | `(x, w [, default])` | value one window-length ago |
//! | `AVGRESET` / `TOTALRESET` / `MINRESET` / `MAXRESET` / `STDDEVRESET` | `(x, t, opt [, flag])` | accumulator cleared by a reset policy |
//!
//! # Constants
//!
//! `PI`, `TRUE` (1), `FALSE` (0), `NAN`, and the reset policy codes
//! `HOURLY DAILY WEEKLY MONTHLY YEARLY CUSTOM`. Literals: `3.5`, `1e-3`,
//! `&HFF` (hex), `&B101` (binary), `$"text"`.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod expression;
pub mod functions;
pub mod operand;
pub mod parser;
pub mod reset;
pub mod sync;
pub mod token;
pub mod tokenizer;
pub mod window;

pub use config::{ExpressionConfig, ExpressionsFile};
pub use error::{CalcError, Result};
pub use expression::{Expression, Variable};
pub use functions::{FnKind, FunctionToken};
pub use operand::{Operand, OperandKind, OperandValue, DEFAULT_COMPARE_DECIMALS};
pub use parser::{parse, Parser};
pub use reset::ResetOption;
pub use token::{OpKind, Token};
pub use window::HistoricValue;

pub use gauge_time::Timestamp;
