//! Operand model: tagged runtime values and their coercion rules
//!
//! Every value flowing through the evaluator is an [`Operand`]: a tagged
//! payload (double, integer, text or timestamp) plus the timestamp of the
//! sample it was derived from. Binary operators pick their result kind from
//! a coercion ladder evaluated over the two operand kinds:
//!
//! - arithmetic: text (concatenation, `+` with two texts only) > double >
//!   timestamp (tick arithmetic) > integer
//! - comparison: text (case-insensitive lexical) > double (decimal-rounded,
//!   NaN-tolerant) > timestamp (tick compare) > integer
//! - `AND OR XOR EQV`: both sides truncated to 32-bit integers
//!
//! The result of any binary operation carries the later of the two input
//! timestamps.

use gauge_time::Timestamp;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Decimal places used by the tolerant numeric comparison when the host does
/// not configure one
pub const DEFAULT_COMPARE_DECIMALS: u32 = 8;

/// Operand kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandKind {
    Double,
    Integer,
    Text,
    Time,
}

/// Tagged operand payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperandValue {
    Integer(i64),
    Double(f64),
    Text(String),
    Time(Timestamp),
}

impl From<f64> for OperandValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<i64> for OperandValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<&str> for OperandValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for OperandValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Timestamp> for OperandValue {
    fn from(v: Timestamp) -> Self {
        Self::Time(v)
    }
}

/// A runtime value plus the timestamp of the sample it was derived from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operand {
    value: OperandValue,
    timestamp: Timestamp,
}

impl Operand {
    pub fn new(value: impl Into<OperandValue>, timestamp: Timestamp) -> Self {
        Self {
            value: value.into(),
            timestamp,
        }
    }

    pub fn double(value: f64, timestamp: Timestamp) -> Self {
        Self::new(OperandValue::Double(value), timestamp)
    }

    pub fn integer(value: i64, timestamp: Timestamp) -> Self {
        Self::new(OperandValue::Integer(value), timestamp)
    }

    pub fn text(value: impl Into<String>, timestamp: Timestamp) -> Self {
        Self::new(OperandValue::Text(value.into()), timestamp)
    }

    pub fn time(value: Timestamp, timestamp: Timestamp) -> Self {
        Self::new(OperandValue::Time(value), timestamp)
    }

    /// Constant operand carrying the epoch timestamp
    pub fn constant(value: impl Into<OperandValue>) -> Self {
        Self::new(value, Timestamp::default())
    }

    pub fn kind(&self) -> OperandKind {
        match self.value {
            OperandValue::Double(_) => OperandKind::Double,
            OperandValue::Integer(_) => OperandKind::Integer,
            OperandValue::Text(_) => OperandKind::Text,
            OperandValue::Time(_) => OperandKind::Time,
        }
    }

    pub fn value(&self) -> &OperandValue {
        &self.value
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Numeric view of the operand; unparsable text becomes NaN
    pub fn as_double(&self) -> f64 {
        match &self.value {
            OperandValue::Double(v) => *v,
            OperandValue::Integer(v) => *v as f64,
            OperandValue::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
            OperandValue::Time(t) => t.millis() as f64,
        }
    }

    /// Integer view; non-finite doubles become 0
    pub fn as_integer(&self) -> i64 {
        match &self.value {
            OperandValue::Integer(v) => *v,
            OperandValue::Time(t) => t.millis(),
            _ => {
                let d = self.as_double();
                if d.is_finite() {
                    d as i64
                } else {
                    0
                }
            }
        }
    }

    /// Text view
    pub fn as_text(&self) -> String {
        match &self.value {
            OperandValue::Text(s) => s.clone(),
            OperandValue::Double(v) => v.to_string(),
            OperandValue::Integer(v) => v.to_string(),
            OperandValue::Time(t) => t.to_string(),
        }
    }

    /// Timestamp view; numeric operands are interpreted as raw ticks
    pub fn as_timestamp(&self) -> Timestamp {
        match &self.value {
            OperandValue::Time(t) => *t,
            _ => Timestamp::from_millis(self.as_integer()),
        }
    }

    /// 32-bit truncating integer view used by the keyword bitwise operators.
    /// In-range values truncate toward zero; out-of-range values wrap.
    pub fn as_int32(&self) -> i32 {
        self.as_integer() as i32
    }

    /// Whether the operand is a non-finite double (NaN or infinity)
    pub fn is_non_finite(&self) -> bool {
        matches!(self.value, OperandValue::Double(v) if !v.is_finite())
    }
}

impl fmt::Display for OperandValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Double(v) => write!(f, "{}", v),
            Self::Integer(v) => write!(f, "{}", v),
            Self::Text(s) => write!(f, "{}", s),
            Self::Time(t) => write!(f, "{}", t),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.value, self.timestamp)
    }
}

// ============================================================================
// Binary operations
// ============================================================================

/// Arithmetic operation selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

/// Comparison operation selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Equal,
    NotEqual,
}

/// Keyword bitwise/logical operation selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
    And,
    Or,
    Xor,
    Eqv,
}

impl Operand {
    /// Apply an arithmetic operator, following the coercion ladder
    pub fn arithmetic(&self, op: ArithOp, rhs: &Operand) -> Operand {
        let ts = Timestamp::latest_of(self.timestamp, rhs.timestamp);

        // Text concatenation applies only to `+` with two text operands; a
        // text operand next to a numeric one falls through to the double rule.
        if op == ArithOp::Add
            && self.kind() == OperandKind::Text
            && rhs.kind() == OperandKind::Text
        {
            let mut s = self.as_text();
            s.push_str(&rhs.as_text());
            return Operand::text(s, ts);
        }

        if op == ArithOp::Power {
            return Operand::double(self.as_double().powf(rhs.as_double()), ts);
        }

        let has_double = self.kind() == OperandKind::Double
            || rhs.kind() == OperandKind::Double
            || self.kind() == OperandKind::Text
            || rhs.kind() == OperandKind::Text;
        if has_double {
            return Operand::double(arith_f64(op, self.as_double(), rhs.as_double()), ts);
        }

        let has_time = self.kind() == OperandKind::Time || rhs.kind() == OperandKind::Time;
        if has_time {
            return self.time_arithmetic(op, rhs, ts);
        }

        // Integer op integer; division falls back to double when inexact
        let (a, b) = (self.as_integer(), rhs.as_integer());
        match op {
            ArithOp::Add => Operand::integer(a.saturating_add(b), ts),
            ArithOp::Subtract => Operand::integer(a.saturating_sub(b), ts),
            ArithOp::Multiply => Operand::integer(a.saturating_mul(b), ts),
            ArithOp::Divide => {
                if b != 0 && a % b == 0 {
                    Operand::integer(a / b, ts)
                } else {
                    Operand::double(a as f64 / b as f64, ts)
                }
            }
            // Power returned above; kept for match completeness
            ArithOp::Power => Operand::double((a as f64).powf(b as f64), ts),
        }
    }

    /// Duration arithmetic: offsetting an instant by ticks yields an instant;
    /// the difference of two instants yields ticks.
    fn time_arithmetic(&self, op: ArithOp, rhs: &Operand, ts: Timestamp) -> Operand {
        let both_time = self.kind() == OperandKind::Time && rhs.kind() == OperandKind::Time;
        match op {
            ArithOp::Subtract if both_time => {
                Operand::integer(self.as_timestamp() - rhs.as_timestamp(), ts)
            }
            ArithOp::Add | ArithOp::Subtract => {
                let (instant, offset) = if self.kind() == OperandKind::Time {
                    (self.as_timestamp(), rhs.as_integer())
                } else {
                    (rhs.as_timestamp(), self.as_integer())
                };
                let signed = if op == ArithOp::Subtract { -offset } else { offset };
                Operand::time(instant + signed, ts)
            }
            ArithOp::Multiply | ArithOp::Divide | ArithOp::Power => {
                Operand::double(arith_f64(op, self.as_double(), rhs.as_double()), ts)
            }
        }
    }

    /// Apply a comparison operator; the result is an integer 0/1 operand
    pub fn compare(&self, op: CompareOp, rhs: &Operand, decimals: u32) -> Operand {
        let ts = Timestamp::latest_of(self.timestamp, rhs.timestamp);
        let ordering = self.ordering(rhs, decimals);

        let truth = match (op, ordering) {
            // One-NaN comparisons are incomparable: everything is false
            // except `<>`, which reports the operands as unequal.
            (CompareOp::NotEqual, None) => true,
            (_, None) => false,
            (CompareOp::Less, Some(o)) => o == Ordering::Less,
            (CompareOp::LessEq, Some(o)) => o != Ordering::Greater,
            (CompareOp::Greater, Some(o)) => o == Ordering::Greater,
            (CompareOp::GreaterEq, Some(o)) => o != Ordering::Less,
            (CompareOp::Equal, Some(o)) => o == Ordering::Equal,
            (CompareOp::NotEqual, Some(o)) => o != Ordering::Equal,
        };
        Operand::integer(i64::from(truth), ts)
    }

    fn ordering(&self, rhs: &Operand, decimals: u32) -> Option<Ordering> {
        if self.kind() == OperandKind::Text && rhs.kind() == OperandKind::Text {
            let a = self.as_text().to_lowercase();
            let b = rhs.as_text().to_lowercase();
            return Some(a.cmp(&b));
        }
        if self.kind() == OperandKind::Double
            || rhs.kind() == OperandKind::Double
            || self.kind() == OperandKind::Text
            || rhs.kind() == OperandKind::Text
        {
            return decimal_cmp(self.as_double(), rhs.as_double(), decimals);
        }
        // Timestamps and integers compare exactly on their tick/raw value
        Some(self.as_integer().cmp(&rhs.as_integer()))
    }

    /// Apply a keyword bitwise operator over 32-bit truncated operands
    pub fn bitwise(&self, op: BitOp, rhs: &Operand) -> Operand {
        let ts = Timestamp::latest_of(self.timestamp, rhs.timestamp);
        let (a, b) = (self.as_int32(), rhs.as_int32());
        let result = match op {
            BitOp::And => a & b,
            BitOp::Or => a | b,
            BitOp::Xor => a ^ b,
            BitOp::Eqv => (a & b) | (!a & !b),
        };
        Operand::integer(i64::from(result), ts)
    }

    /// Unary negation
    pub fn negate(&self) -> Operand {
        match &self.value {
            OperandValue::Integer(v) => Operand::integer(0i64.saturating_sub(*v), self.timestamp),
            _ => Operand::double(-self.as_double(), self.timestamp),
        }
    }
}

fn arith_f64(op: ArithOp, a: f64, b: f64) -> f64 {
    match op {
        ArithOp::Add => a + b,
        ArithOp::Subtract => a - b,
        ArithOp::Multiply => a * b,
        ArithOp::Divide => a / b,
        ArithOp::Power => a.powf(b),
    }
}

/// Decimal-rounding comparison tolerant of floating-point noise
///
/// Values are scaled by `10^decimals` and floor-rounded before comparing, so
/// representation noise below the configured precision compares equal. Two
/// NaNs compare equal; a single NaN makes the pair incomparable (`None`).
/// Infinities are replaced by finite sentinel extremes before scaling.
pub fn decimal_cmp(a: f64, b: f64, decimals: u32) -> Option<Ordering> {
    if a.is_nan() && b.is_nan() {
        return Some(Ordering::Equal);
    }
    if a.is_nan() || b.is_nan() {
        return None;
    }
    let scale = 10f64.powi(decimals as i32);
    let sa = (clamp_infinite(a) * scale).floor();
    let sb = (clamp_infinite(b) * scale).floor();
    sa.partial_cmp(&sb)
}

fn clamp_infinite(v: f64) -> f64 {
    if v == f64::INFINITY {
        f64::MAX
    } else if v == f64::NEG_INFINITY {
        f64::MIN
    } else {
        v
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn at(ticks: i64) -> Timestamp {
        Timestamp::from_millis(ticks)
    }

    #[test]
    fn test_double_plus_numeric_text_is_double() {
        let a = Operand::integer(1, at(0));
        let b = Operand::text("2", at(5));
        let r = a.arithmetic(ArithOp::Add, &b);
        assert_eq!(r.kind(), OperandKind::Double);
        assert_eq!(r.as_double(), 3.0);
        assert_eq!(r.timestamp(), at(5));
    }

    #[test]
    fn test_text_concatenation() {
        let a = Operand::text("a", at(1));
        let b = Operand::text("b", at(2));
        let r = a.arithmetic(ArithOp::Add, &b);
        assert_eq!(r.kind(), OperandKind::Text);
        assert_eq!(r.as_text(), "ab");
    }

    #[test]
    fn test_integer_arithmetic_stays_integer() {
        let a = Operand::integer(6, at(0));
        let b = Operand::integer(3, at(0));
        assert_eq!(
            a.arithmetic(ArithOp::Multiply, &b).value(),
            &OperandValue::Integer(18)
        );
        assert_eq!(
            a.arithmetic(ArithOp::Divide, &b).value(),
            &OperandValue::Integer(2)
        );
    }

    #[test]
    fn test_inexact_integer_division_is_double() {
        let a = Operand::integer(5, at(0));
        let b = Operand::integer(2, at(0));
        let r = a.arithmetic(ArithOp::Divide, &b);
        assert_eq!(r.kind(), OperandKind::Double);
        assert_eq!(r.as_double(), 2.5);
    }

    #[test]
    fn test_time_arithmetic() {
        let t = Operand::time(at(60_000), at(60_000));
        let offset = Operand::integer(30_000, at(60_000));
        let later = t.arithmetic(ArithOp::Add, &offset);
        assert_eq!(later.as_timestamp(), at(90_000));

        let earlier = Operand::time(at(10_000), at(10_000));
        let diff = later.arithmetic(ArithOp::Subtract, &earlier);
        assert_eq!(diff.value(), &OperandValue::Integer(80_000));
    }

    #[test]
    fn test_result_timestamp_is_latest() {
        let a = Operand::double(1.0, at(100));
        let b = Operand::double(2.0, at(50));
        assert_eq!(a.arithmetic(ArithOp::Add, &b).timestamp(), at(100));
    }

    #[test]
    fn test_nan_comparison_semantics() {
        let nan = Operand::double(f64::NAN, at(0));
        let five = Operand::double(5.0, at(0));

        // NaN <> NaN is false: two NaNs compare equal
        assert_eq!(
            nan.compare(CompareOp::NotEqual, &nan, 8).as_integer(),
            0
        );
        assert_eq!(nan.compare(CompareOp::Equal, &nan, 8).as_integer(), 1);

        // One NaN is incomparable: only `<>` reports true
        assert_eq!(nan.compare(CompareOp::NotEqual, &five, 8).as_integer(), 1);
        assert_eq!(nan.compare(CompareOp::Less, &five, 8).as_integer(), 0);
        assert_eq!(nan.compare(CompareOp::GreaterEq, &five, 8).as_integer(), 0);
    }

    #[test]
    fn test_decimal_tolerant_comparison() {
        let a = Operand::double(0.1 + 0.2, at(0));
        let b = Operand::double(0.3, at(0));
        assert_eq!(a.compare(CompareOp::Equal, &b, 8).as_integer(), 1);
        // At full precision the representation noise is visible again
        assert_eq!(decimal_cmp(0.1 + 0.2, 0.3, 17), Some(Ordering::Greater));
    }

    #[test]
    fn test_infinity_sentinels() {
        assert_eq!(
            decimal_cmp(f64::INFINITY, f64::INFINITY, 8),
            Some(Ordering::Equal)
        );
        assert_eq!(
            decimal_cmp(f64::NEG_INFINITY, 1.0, 8),
            Some(Ordering::Less)
        );
        assert_eq!(
            decimal_cmp(f64::INFINITY, 1.0, 8),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_case_insensitive_text_compare() {
        let a = Operand::text("Alpha", at(0));
        let b = Operand::text("alpha", at(0));
        assert_eq!(a.compare(CompareOp::Equal, &b, 8).as_integer(), 1);
        let c = Operand::text("beta", at(0));
        assert_eq!(a.compare(CompareOp::Less, &c, 8).as_integer(), 1);
    }

    #[test]
    fn test_bitwise_eqv() {
        let a = Operand::integer(0b1100, at(0));
        let b = Operand::integer(0b1010, at(0));
        let r = a.bitwise(BitOp::Eqv, &b);
        assert_eq!(r.as_int32(), (0b1100 & 0b1010) | (!0b1100 & !0b1010));
    }

    #[test]
    fn test_negate() {
        assert_eq!(
            Operand::integer(5, at(0)).negate().value(),
            &OperandValue::Integer(-5)
        );
        assert_eq!(Operand::double(2.5, at(0)).negate().as_double(), -2.5);
    }

    #[test]
    fn test_unparsable_text_is_nan() {
        assert!(Operand::text("bogus", at(0)).as_double().is_nan());
    }
}
