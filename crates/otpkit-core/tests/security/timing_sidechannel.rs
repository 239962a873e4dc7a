//! Timing side-channel validation for code verification.
//!
//! Uses Welch's t-test to verify that verification timing does not leak
//! whether a candidate matches. Timing distributions for matching and
//! non-matching candidates are compared and the t-statistic must stay
//! below 4.5.
//!
//! **Methodology:** simplified dudect-style analysis:
//! 1. Class A is a matching code, class B a non-matching code
//! 2. Time N interleaved iterations of each class
//! 3. Compute Welch's t-statistic on the two distributions
//! 4. Assert |t| < 4.5
//!
//! **Caveat:** scheduling noise can occasionally cause false positives.

use std::time::Instant;

use otpkit_core::{constant_time_eq, engine, FixedClock, TotpConfig};

/// Number of timing samples per class.
const SAMPLES: usize = 10_000;

/// Welch's t-test threshold. |t| < 4.5 means no detectable timing difference.
const T_THRESHOLD: f64 = 4.5;

#[inline(never)]
fn black_box_verify(secret: &[u8], code: &str, config: &TotpConfig, clock: &FixedClock) -> bool {
    let result = engine::verify(secret, code, config, clock)
        .expect("verify should not error during timing test");
    std::hint::black_box(result)
}

#[inline(never)]
fn black_box_eq(a: &[u8], b: &[u8]) -> bool {
    std::hint::black_box(constant_time_eq(std::hint::black_box(a), std::hint::black_box(b)))
}

/// Welch's t-statistic: `(mean_a - mean_b) / sqrt(var_a/n_a + var_b/n_b)`.
#[allow(clippy::cast_precision_loss)]
fn welch_t_statistic(a: &[f64], b: &[f64]) -> f64 {
    if a.len() < 2 || b.len() < 2 {
        return f64::NAN;
    }

    let n_a = a.len() as f64;
    let n_b = b.len() as f64;

    let mean_a: f64 = a.iter().sum::<f64>() / n_a;
    let mean_b: f64 = b.iter().sum::<f64>() / n_b;

    let var_a: f64 = a.iter().map(|x| (x - mean_a).powi(2)).sum::<f64>() / (n_a - 1.0);
    let var_b: f64 = b.iter().map(|x| (x - mean_b).powi(2)).sum::<f64>() / (n_b - 1.0);

    let denominator = (var_a / n_a + var_b / n_b).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }

    (mean_a - mean_b) / denominator
}

/// Interleave two timed closures and return |t|.
#[allow(clippy::cast_precision_loss)]
fn measure(mut class_a: impl FnMut() -> bool, mut class_b: impl FnMut() -> bool) -> f64 {
    // Warm up caches.
    for _ in 0..100 {
        class_a();
        class_b();
    }

    let mut times_a = Vec::with_capacity(SAMPLES);
    let mut times_b = Vec::with_capacity(SAMPLES);
    for _ in 0..SAMPLES {
        let start = Instant::now();
        let _ = class_a();
        times_a.push(start.elapsed().as_nanos() as f64);

        let start = Instant::now();
        let _ = class_b();
        times_b.push(start.elapsed().as_nanos() as f64);
    }
    welch_t_statistic(&times_a, &times_b).abs()
}

#[test]
fn verify_constant_time_no_timing_leak() {
    let secret = b"12345678901234567890";
    let config = TotpConfig::default();
    let clock = FixedClock::at_epoch_seconds(1_234_567_890);

    let valid_code = engine::generate_now(secret, &config, &clock).expect("generate valid code");
    let invalid_code = if valid_code == "000000" {
        "111111".to_owned()
    } else {
        "000000".to_owned()
    };

    let abs_t = measure(
        || black_box_verify(secret, &valid_code, &config, &clock),
        || black_box_verify(secret, &invalid_code, &config, &clock),
    );
    eprintln!("verify timing: |t| = {abs_t:.2} (threshold: {T_THRESHOLD}), samples = {SAMPLES}");
    assert!(
        abs_t < T_THRESHOLD,
        "Timing side-channel detected: |t| = {abs_t:.2} exceeds threshold {T_THRESHOLD}"
    );
}

#[test]
fn constant_time_eq_early_vs_late_difference() {
    let reference = *b"48213579";
    let early = *b"98213579";
    let late = *b"48213570";

    let abs_t = measure(
        || black_box_eq(&reference, &early),
        || black_box_eq(&reference, &late),
    );
    eprintln!("constant_time_eq timing: |t| = {abs_t:.2} (threshold: {T_THRESHOLD})");
    assert!(
        abs_t < T_THRESHOLD,
        "constant_time_eq leaks mismatch position: |t| = {abs_t:.2}"
    );
}

/// Two identical constant distributions should yield t = 0.
#[test]
fn welch_t_test_identical_distributions() {
    let a = vec![1.0; 100];
    let b = vec![1.0; 100];
    let t = welch_t_statistic(&a, &b);
    assert!(t.abs() < 0.001, "identical distributions should yield t ≈ 0, got {t}");
}

/// Mean 100 vs mean 200 with low variance should produce |t| >> 4.5.
#[test]
fn welch_t_test_different_distributions() {
    let a: Vec<f64> = (0..1000).map(|i| 100.0 + f64::from(i % 3)).collect();
    let b: Vec<f64> = (0..1000).map(|i| 200.0 + f64::from(i % 3)).collect();
    let t = welch_t_statistic(&a, &b);
    assert!(t.abs() > 100.0, "clearly different distributions should yield |t| >> 4.5, got {t:.2}");
}
