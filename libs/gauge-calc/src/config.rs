//! Declarative expression catalogs
//!
//! Hosts usually load a set of formulas from a YAML or JSON file rather than
//! constructing parsers by hand. [`ExpressionConfig`] is one catalog entry;
//! [`ExpressionsFile`] is the whole document.
//!
//! ```yaml
//! expressions:
//!   - name: line1_efficiency
//!     formula: output_kw / input_kw * 100
//!     synchronized: true
//!   - name: daily_total
//!     formula: TOTALRESET(flow, ts, DAILY)
//! ```

use crate::error::Result;
use crate::expression::Expression;
use crate::parser::Parser;
use serde::{Deserialize, Serialize};

/// One catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressionConfig {
    /// Unique name the host publishes results under
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,
    /// Formula source text
    pub formula: String,
    /// Align variable reads to shared minute buckets
    #[serde(default = "defaults::bool_false")]
    pub synchronized: bool,
    /// Decimal places for tolerant numeric comparison
    #[serde(default = "defaults::compare_decimals")]
    pub compare_decimals: u32,
    /// Disabled entries are kept in the catalog but never compiled
    #[serde(default = "defaults::bool_true")]
    pub enabled: bool,
}

impl ExpressionConfig {
    /// Compile this entry into an evaluable expression
    pub fn compile(&self) -> Result<Expression> {
        Parser::new()
            .synchronized(self.synchronized)
            .compare_decimals(self.compare_decimals)
            .parse(&self.formula)
    }
}

/// A whole expression catalog document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpressionsFile {
    #[serde(default)]
    pub expressions: Vec<ExpressionConfig>,
}

impl ExpressionsFile {
    /// Compile every enabled entry, pairing each with its name
    pub fn compile_enabled(&self) -> Result<Vec<(String, Expression)>> {
        self.expressions
            .iter()
            .filter(|cfg| cfg.enabled)
            .map(|cfg| Ok((cfg.name.clone(), cfg.compile()?)))
            .collect()
    }
}

mod defaults {
    use crate::operand::DEFAULT_COMPARE_DECIMALS;

    pub fn bool_true() -> bool {
        true
    }

    pub fn bool_false() -> bool {
        false
    }

    pub fn compare_decimals() -> u32 {
        DEFAULT_COMPARE_DECIMALS
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::operand::DEFAULT_COMPARE_DECIMALS;

    #[test]
    fn test_yaml_round_trip_with_defaults() {
        let yaml = r#"
expressions:
  - name: efficiency
    formula: output / input * 100
    synchronized: true
  - name: plain
    formula: a + b
"#;
        let file: ExpressionsFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(file.expressions.len(), 2);

        let eff = &file.expressions[0];
        assert!(eff.synchronized);
        assert!(eff.enabled);
        assert_eq!(eff.compare_decimals, DEFAULT_COMPARE_DECIMALS);

        let plain = &file.expressions[1];
        assert!(!plain.synchronized);
        assert!(plain.description.is_none());
    }

    #[test]
    fn test_json_catalog_round_trip() {
        let json = r#"{"expressions":[{"name":"sum","formula":"a + b"}]}"#;
        let file: ExpressionsFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.expressions.len(), 1);
        assert!(file.expressions[0].enabled);
        assert!(!file.expressions[0].synchronized);

        let back = serde_json::to_string(&file).unwrap();
        let again: ExpressionsFile = serde_json::from_str(&back).unwrap();
        assert_eq!(again.expressions[0].name, "sum");
        assert_eq!(again.expressions[0].formula, "a + b");
    }

    #[test]
    fn test_compile_enabled_skips_disabled() {
        let yaml = r#"
expressions:
  - name: on
    formula: a + 1
  - name: off
    formula: b + 1
    enabled: false
"#;
        let file: ExpressionsFile = serde_yaml::from_str(yaml).unwrap();
        let compiled = file.compile_enabled().unwrap();
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].0, "on");
    }

    #[test]
    fn test_compile_propagates_settings() {
        let cfg = ExpressionConfig {
            name: "s".into(),
            description: None,
            formula: "a + b".into(),
            synchronized: true,
            compare_decimals: 3,
            enabled: true,
        };
        let expr = cfg.compile().unwrap();
        assert!(expr.is_synchronized());
        assert_eq!(expr.compare_decimals(), 3);
    }

    #[test]
    fn test_bad_formula_fails_compile() {
        let cfg = ExpressionConfig {
            name: "bad".into(),
            description: None,
            formula: "(a +".into(),
            synchronized: false,
            compare_decimals: DEFAULT_COMPARE_DECIMALS,
            enabled: true,
        };
        assert!(cfg.compile().is_err());
    }
}
