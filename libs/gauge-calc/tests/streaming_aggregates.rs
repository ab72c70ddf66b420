//! Streaming aggregate tests
//!
//! Drives compiled expressions across multiple evaluation passes the way a
//! telemetry host does: feed samples, evaluate, repeat. Covers the stateful
//! function families, reset policies, state reset and minute-bucket
//! synchronization.

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use gauge_calc::{parse, CalcError, Expression, ExpressionsFile, Parser, Timestamp};
use gauge_time::{TICKS_PER_DAY, TICKS_PER_MINUTE};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("gauge_calc=debug")
        .with_test_writer()
        .try_init();
}

fn at(ticks: i64) -> Timestamp {
    Timestamp::from_millis(ticks)
}

/// Feed one sample and evaluate
fn step(expr: &mut Expression, name: &str, value: f64, ticks: i64) -> f64 {
    expr.set_value(name, value, at(ticks));
    expr.evaluate().unwrap().as_double()
}

// ============================================================================
// Running and count-windowed functions
// ============================================================================

#[test]
fn test_running_extremes_over_stream() {
    init_tracing();
    let mut expr = parse("RUNNINGMAX(t) - RUNNINGMIN(t)").unwrap();
    assert_eq!(step(&mut expr, "t", 20.0, 0), 0.0);
    assert_eq!(step(&mut expr, "t", 25.0, 1_000), 5.0);
    assert_eq!(step(&mut expr, "t", 18.0, 2_000), 7.0);
    assert_eq!(step(&mut expr, "t", 22.0, 3_000), 7.0);
}

#[test]
fn test_sample_window_average() {
    let mut expr = parse("SAMPLEAVG(x, 3)").unwrap();
    for (v, t, expected) in [
        (1.0, 0, 1.0),
        (2.0, 1, 1.5),
        (3.0, 2, 2.0),
        (4.0, 3, 3.0), // 1.0 fell out of the window
    ] {
        assert_eq!(step(&mut expr, "x", v, t), expected);
    }
}

#[test]
fn test_sample_median_resists_spikes() {
    let mut expr = parse("SAMPLEMEDIAN(x, 5)").unwrap();
    step(&mut expr, "x", 10.0, 0);
    step(&mut expr, "x", 11.0, 1);
    step(&mut expr, "x", 9999.0, 2); // spike
    step(&mut expr, "x", 12.0, 3);
    assert_eq!(step(&mut expr, "x", 9.0, 4), 11.0);
}

// ============================================================================
// Time-windowed functions
// ============================================================================

#[test]
fn test_time_window_total_expires_samples() {
    let mut expr = parse("WINDOWTOTAL(flow, 60000)").unwrap();
    assert_eq!(step(&mut expr, "flow", 10.0, 0), 10.0);
    assert_eq!(step(&mut expr, "flow", 20.0, 30_000), 30.0);
    // 70s in: the first sample aged past the 60s window
    assert_eq!(step(&mut expr, "flow", 5.0, 70_000), 25.0);
}

#[test]
fn test_time_window_stddev() {
    let mut expr = parse("WINDOWSTDDEV(x, 600000)").unwrap();
    let samples = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0];
    for (i, v) in samples.iter().enumerate() {
        step(&mut expr, "x", *v, i as i64 * 1_000);
    }
    let last = step(&mut expr, "x", 9.0, 8_000);
    assert!((last - 2.0).abs() < 1e-12);
}

#[test]
fn test_window_oldest_for_rate_of_change() {
    // Change over the last minute: current minus the value one window ago
    let mut expr = parse("total - WINDOWOLDEST(total, 60000, total)").unwrap();
    // Until the window spans a minute the default (current value) yields 0
    assert_eq!(step(&mut expr, "total", 100.0, 0), 0.0);
    assert_eq!(step(&mut expr, "total", 130.0, 30_000), 0.0);
    assert_eq!(step(&mut expr, "total", 170.0, 60_000), 70.0);
    assert_eq!(step(&mut expr, "total", 220.0, 90_000), 90.0);
}

#[test]
fn test_non_finite_samples_never_enter_windows() {
    let mut expr = parse("WINDOWAVG(x, 60000)").unwrap();
    assert!(step(&mut expr, "x", f64::NAN, 0).is_nan());
    assert_eq!(step(&mut expr, "x", 4.0, 1_000), 4.0);
    // NaN is ignored, the average still reflects only finite samples
    assert_eq!(step(&mut expr, "x", f64::NAN, 2_000), 4.0);
    assert_eq!(step(&mut expr, "x", 8.0, 3_000), 6.0);
}

// ============================================================================
// Reset accumulators
// ============================================================================

// 2023-11-14 22:13:20 UTC
const BASE: i64 = 1_700_000_000_000;

fn reset_step(expr: &mut Expression, value: f64, ticks: i64) -> f64 {
    expr.set_value("flow", value, at(ticks));
    expr.set_value("ts", at(ticks), at(ticks));
    expr.evaluate().unwrap().as_double()
}

#[test]
fn test_daily_total_restarts_at_midnight() {
    let mut expr = parse("TOTALRESET(flow, ts, DAILY)").unwrap();
    assert_eq!(reset_step(&mut expr, 10.0, BASE), 10.0);
    assert_eq!(reset_step(&mut expr, 5.0, BASE + 60_000), 15.0);
    // Crossing the calendar day discards the accumulated total
    assert_eq!(reset_step(&mut expr, 7.0, BASE + TICKS_PER_DAY), 7.0);
    assert_eq!(reset_step(&mut expr, 3.0, BASE + TICKS_PER_DAY + 60_000), 10.0);
}

#[test]
fn test_hourly_average() {
    let mut expr = parse("AVGRESET(flow, ts, HOURLY)").unwrap();
    assert_eq!(reset_step(&mut expr, 4.0, BASE), 4.0);
    assert_eq!(reset_step(&mut expr, 8.0, BASE + 1_000), 6.0);
}

#[test]
fn test_custom_reset_flag() {
    let mut expr = parse("MAXRESET(flow, ts, CUSTOM, trigger)").unwrap();
    expr.set_value("trigger", 0i64, at(BASE));
    assert_eq!(reset_step(&mut expr, 9.0, BASE), 9.0);
    assert_eq!(reset_step(&mut expr, 5.0, BASE + 1_000), 9.0);
    // Raising the flag restarts the extreme at the next sample
    expr.set_value("trigger", 1i64, at(BASE + 2_000));
    assert_eq!(reset_step(&mut expr, 5.0, BASE + 2_000), 5.0);
}

// ============================================================================
// State reset
// ============================================================================

#[test]
fn test_reset_then_replay_reproduces_results() {
    let mut expr = parse("SAMPLEAVG(x, 3) + WINDOWMAX(x, 60000)").unwrap();
    let samples = [(5.0, 0i64), (9.0, 10_000), (2.0, 20_000), (7.0, 70_000)];

    let first: Vec<f64> = samples
        .iter()
        .map(|(v, t)| step(&mut expr, "x", *v, *t))
        .collect();
    expr.reset();
    let replay: Vec<f64> = samples
        .iter()
        .map(|(v, t)| step(&mut expr, "x", *v, *t))
        .collect();
    assert_eq!(first, replay);
}

#[test]
fn test_expression_reset_gives_clean_slate() {
    let mut expr = parse("RUNNINGMAX(x) + WINDOWTOTAL(x, 60000)").unwrap();
    step(&mut expr, "x", 10.0, 0);
    step(&mut expr, "x", 20.0, 1_000);
    expr.reset();
    // First pass after reset sees only the new sample
    assert_eq!(step(&mut expr, "x", 3.0, 2_000), 6.0);
}

// ============================================================================
// Synchronization
// ============================================================================

#[test]
fn test_synchronized_expression_end_to_end() {
    init_tracing();
    let mut expr = Parser::new()
        .synchronized(true)
        .parse("output / input * 100")
        .unwrap();

    // Only one source has reported: not aligned yet
    expr.set_value("output", 90.0, at(10_000));
    assert!(matches!(
        expr.evaluate(),
        Err(CalcError::Synchronization { .. })
    ));

    // Both sources in minute 0: aligned read succeeds
    expr.set_value("input", 100.0, at(40_000));
    assert_eq!(expr.evaluate().unwrap().as_double(), 90.0);

    // Sources drift across minutes: alignment stays on the shared minute
    expr.set_value("output", 80.0, at(TICKS_PER_MINUTE + 1_000));
    expr.set_value("output", 70.0, at(2 * TICKS_PER_MINUTE));
    expr.set_value("input", 100.0, at(TICKS_PER_MINUTE + 30_000));
    assert_eq!(expr.evaluate().unwrap().as_double(), 80.0);
}

// ============================================================================
// Catalog-driven hosts
// ============================================================================

#[test]
fn test_catalog_compile_and_run() {
    let yaml = r#"
expressions:
  - name: efficiency
    description: instantaneous efficiency percentage
    formula: output / input * 100
    synchronized: true
  - name: peak_flow
    formula: RUNNINGMAX(flow)
  - name: legacy
    formula: broken +
    enabled: false
"#;
    let file: ExpressionsFile = serde_yaml::from_str(yaml).unwrap();
    let mut compiled = file.compile_enabled().unwrap();
    assert_eq!(compiled.len(), 2);

    let (name, peak) = &mut compiled[1];
    assert_eq!(name, "peak_flow");
    peak.set_value("flow", 42.0, at(0));
    assert_eq!(peak.evaluate().unwrap().as_double(), 42.0);
}
