//! NIST SP 800-22 inspired randomness tests over bit sequences.
//!
//! Every test takes a slice of bits (one `u8` per bit, values 0 or 1) and
//! returns a [`TestResult`] with a p-value (where applicable), a pass/fail
//! determination at significance 0.01, and a letter grade (A through F).
//!
//! Degenerate inputs never panic: they produce a failing result whose
//! `details` explain why.

use statrs::distribution::{ContinuousCDF, Normal};
use statrs::function::erf::erfc;
use statrs::function::gamma::gamma_ur;
use std::collections::BTreeMap;
use std::f64::consts::LN_2;

/// Significance level shared by every test in the battery.
pub const SIGNIFICANCE: f64 = 0.01;

/// Default window length for [`serial_test`].
pub const DEFAULT_SERIAL_WINDOW: usize = 4;

/// Default window length for [`approximate_entropy`].
pub const DEFAULT_APEN_WINDOW: usize = 3;

// ═══════════════════════════════════════════════════════════════════════════════
// Core types
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of a single randomness test.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub p_value: Option<f64>,
    pub statistic: f64,
    pub details: String,
    pub grade: char,
}

impl TestResult {
    /// Assign a letter grade based on p-value.
    ///
    /// - A: p >= 0.1
    /// - B: p >= 0.01
    /// - C: p >= 0.001
    /// - D: p >= 0.0001
    /// - F: otherwise or None
    pub fn grade_from_p(p: Option<f64>) -> char {
        match p {
            Some(p) if p >= 0.1 => 'A',
            Some(p) if p >= 0.01 => 'B',
            Some(p) if p >= 0.001 => 'C',
            Some(p) if p >= 0.0001 => 'D',
            _ => 'F',
        }
    }

    /// Determine pass/fail from p-value against a threshold.
    pub fn pass_from_p(p: Option<f64>, threshold: f64) -> bool {
        match p {
            Some(p) => p >= threshold,
            None => false,
        }
    }

    fn from_p(name: &str, p: f64, statistic: f64, details: String) -> Self {
        let p = p.clamp(0.0, 1.0);
        TestResult {
            name: name.to_string(),
            passed: TestResult::pass_from_p(Some(p), SIGNIFICANCE),
            p_value: Some(p),
            statistic,
            details,
            grade: TestResult::grade_from_p(Some(p)),
        }
    }

    fn rejected(name: &str, statistic: f64, details: String) -> Self {
        TestResult {
            name: name.to_string(),
            passed: false,
            p_value: Some(0.0),
            statistic,
            details,
            grade: 'F',
        }
    }
}

/// Tunable window lengths for the pattern-based tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryParams {
    pub serial_window: usize,
    pub apen_window: usize,
}

impl Default for BatteryParams {
    fn default() -> Self {
        Self {
            serial_window: DEFAULT_SERIAL_WINDOW,
            apen_window: DEFAULT_APEN_WINDOW,
        }
    }
}

/// A selectable test of the battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassicalTest {
    Runs,
    Serial,
    ApproximateEntropy,
    /// Cumulative sums with the incomplete-gamma approximation.
    Cusum,
    /// Cumulative sums with the forward-mode NIST p-value.
    CusumExact,
    RandomExcursions,
    Monobit,
}

impl ClassicalTest {
    pub const ALL: [ClassicalTest; 7] = [
        ClassicalTest::Runs,
        ClassicalTest::Serial,
        ClassicalTest::ApproximateEntropy,
        ClassicalTest::Cusum,
        ClassicalTest::CusumExact,
        ClassicalTest::RandomExcursions,
        ClassicalTest::Monobit,
    ];

    /// Stable identifier used in configuration and report rows.
    pub fn name(self) -> &'static str {
        match self {
            Self::Runs => "runs",
            Self::Serial => "serial",
            Self::ApproximateEntropy => "approximate_entropy",
            Self::Cusum => "cusum",
            Self::CusumExact => "cusum_exact",
            Self::RandomExcursions => "random_excursions",
            Self::Monobit => "monobit",
        }
    }

    /// Look a test up by its identifier (case-insensitive, `-` and `_` interchangeable).
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim().to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|t| t.name() == wanted)
    }

    /// Comma-separated list of every identifier, for error messages.
    pub fn supported_names() -> String {
        Self::ALL
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn run(self, bits: &[u8], params: &BatteryParams) -> TestResult {
        match self {
            Self::Runs => runs_test(bits),
            Self::Serial => serial_test(bits, params.serial_window),
            Self::ApproximateEntropy => approximate_entropy(bits, params.apen_window),
            Self::Cusum => cusum_test(bits),
            Self::CusumExact => cusum_test_exact(bits),
            Self::RandomExcursions => random_excursions(bits),
            Self::Monobit => monobit_frequency(bits),
        }
    }
}

impl std::fmt::Display for ClassicalTest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Return a failing `TestResult` when data is too short.
fn insufficient(name: &str, needed: usize, got: usize) -> TestResult {
    TestResult {
        name: name.to_string(),
        passed: false,
        p_value: None,
        statistic: 0.0,
        details: format!("Insufficient data: need {needed}, got {got}"),
        grade: 'F',
    }
}

/// Running ±1 sums S_1..S_n of the bit sequence.
fn partial_sums(bits: &[u8]) -> Vec<i64> {
    let mut sums = Vec::with_capacity(bits.len());
    let mut s: i64 = 0;
    for &bit in bits {
        s += if bit == 1 { 1 } else { -1 };
        sums.push(s);
    }
    sums
}

/// Regularized upper incomplete gamma Q(a, x), with Q(a, 0) = 1.
fn upper_gamma(a: f64, x: f64) -> f64 {
    if x <= 0.0 { 1.0 } else { gamma_ur(a, x) }
}

/// Counts of every overlapping (cyclic) window of `m` bits.
fn window_counts(bits: &[u8], m: usize) -> Vec<u64> {
    let n = bits.len();
    let mut counts = vec![0u64; 1usize << m];
    if m == 0 {
        counts[0] = n as u64;
        return counts;
    }
    for i in 0..n {
        let mut val = 0usize;
        for j in 0..m {
            val = (val << 1) | (bits[(i + j) % n] & 1) as usize;
        }
        counts[val] += 1;
    }
    counts
}

// ═══════════════════════════════════════════════════════════════════════════════
// Frequency
// ═══════════════════════════════════════════════════════════════════════════════

/// Monobit frequency -- proportion of 1s vs 0s should be ~50%.
pub fn monobit_frequency(bits: &[u8]) -> TestResult {
    let name = "Monobit Frequency";
    let n = bits.len();
    if n < 100 {
        return insufficient(name, 100, n);
    }
    let s: i64 = bits.iter().map(|&b| if b == 1 { 1i64 } else { -1i64 }).sum();
    let s_obs = (s as f64).abs() / (n as f64).sqrt();
    let p = erfc(s_obs / 2.0_f64.sqrt());
    TestResult::from_p(name, p, s_obs, format!("S={s}, n={n}"))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Runs
// ═══════════════════════════════════════════════════════════════════════════════

/// Runs test -- number of uninterrupted runs of 0s or 1s.
///
/// The frequency pre-check is a hard rejection: when the proportion of ones
/// deviates from 0.5 by more than `2/sqrt(n)` the runs statistic is not
/// evaluated at all.
pub fn runs_test(bits: &[u8]) -> TestResult {
    let name = "Runs Test";
    let n = bits.len();
    if n < 100 {
        return insufficient(name, 100, n);
    }
    let ones: usize = bits.iter().map(|&b| b as usize).sum();
    let prop = ones as f64 / n as f64;
    if (prop - 0.5).abs() > 2.0 / (n as f64).sqrt() {
        return TestResult::rejected(name, 0.0, format!("Pre-test failed: proportion={prop:.4}"));
    }
    let runs = 1 + bits.windows(2).filter(|w| w[0] != w[1]).count();
    let spread = prop * (1.0 - prop);
    if spread < 1e-12 {
        return TestResult::rejected(name, 0.0, "Zero variance".to_string());
    }
    let expected = 2.0 * n as f64 * spread;
    let statistic = (runs as f64 - expected).abs() / (2.0 * (2.0 * n as f64).sqrt() * spread);
    let p = erfc(statistic);
    TestResult::from_p(
        name,
        p,
        statistic,
        format!("runs={runs}, expected={expected:.0}"),
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// Serial / approximate entropy
// ═══════════════════════════════════════════════════════════════════════════════

/// Helper: psi-squared for the serial test (chi-square of window counts vs uniform).
fn psi_sq(bits: &[u8], m: usize) -> f64 {
    if m == 0 {
        return 0.0;
    }
    let n = bits.len() as f64;
    let num_patterns = (1usize << m) as f64;
    let sum_sq: f64 = window_counts(bits, m)
        .iter()
        .map(|&c| (c as f64) * (c as f64))
        .sum();
    sum_sq * num_patterns / n - n
}

/// Serial test -- frequency of overlapping `m`-bit patterns.
///
/// p-value = Q(2^(m-1)/2, ∇ψ²/2), i.e. chi-square with 2^(m-1) degrees of freedom.
pub fn serial_test(bits: &[u8], m: usize) -> TestResult {
    let name = "Serial Test";
    if !(2..=16).contains(&m) {
        return TestResult::rejected(name, 0.0, format!("Window m={m} outside 2..=16"));
    }
    let n = bits.len();
    let needed = (1 << m) + 10;
    if n < needed {
        return insufficient(name, needed, n);
    }
    let delta = (psi_sq(bits, m) - psi_sq(bits, m - 1)).max(0.0);
    let dof = (1u64 << (m - 1)) as f64;
    let p = upper_gamma(dof / 2.0, delta / 2.0);
    TestResult::from_p(name, p, delta, format!("m={m}, n_bits={n}"))
}

/// Approximate entropy -- compare `m` and `m+1` bit pattern frequencies.
///
/// χ² = 2n(ln 2 − ApEn), p-value = Q(2^(m-1), χ²/2).
pub fn approximate_entropy(bits: &[u8], m: usize) -> TestResult {
    let name = "Approximate Entropy";
    if !(1..=15).contains(&m) {
        return TestResult::rejected(name, 0.0, format!("Window m={m} outside 1..=15"));
    }
    let n = bits.len();
    let needed = (1usize << (m + 1)).max(64);
    if n < needed {
        return insufficient(name, needed, n);
    }

    let phi = |block_len: usize| -> f64 {
        window_counts(bits, block_len)
            .iter()
            .filter(|&&c| c > 0)
            .map(|&c| {
                let p = c as f64 / n as f64;
                p * p.ln()
            })
            .sum()
    };

    let apen = phi(m) - phi(m + 1);
    let chi2 = (2.0 * n as f64 * (LN_2 - apen)).max(0.0);
    let shape = (1u64 << (m - 1)) as f64;
    let p = upper_gamma(shape, chi2 / 2.0);
    TestResult::from_p(name, p, chi2, format!("ApEn={apen:.6}, m={m}"))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Random walk tests
// ═══════════════════════════════════════════════════════════════════════════════

/// Cumulative sums -- maximum excursion of the ±1 walk.
///
/// The p-value uses Q(1/2, z²/2n), a two-sided normal tail of `z/sqrt(n)`.
/// This is an approximation of the true cumulative-sums distribution; see
/// [`cusum_test_exact`] for the forward-mode NIST series.
pub fn cusum_test(bits: &[u8]) -> TestResult {
    let name = "Cumulative Sums";
    let n = bits.len();
    if n < 100 {
        return insufficient(name, 100, n);
    }
    let z = partial_sums(bits)
        .iter()
        .map(|s| s.unsigned_abs())
        .max()
        .unwrap_or(0) as f64;
    let p = upper_gamma(0.5, z * z / (2.0 * n as f64));
    TestResult::from_p(name, p, z, format!("max|S|={z:.0}, n={n} (approximate)"))
}

/// Cumulative sums with the forward-mode NIST SP 800-22 p-value.
pub fn cusum_test_exact(bits: &[u8]) -> TestResult {
    let name = "Cumulative Sums (exact)";
    let n = bits.len();
    if n < 100 {
        return insufficient(name, 100, n);
    }
    let z = partial_sums(bits)
        .iter()
        .map(|s| s.unsigned_abs())
        .max()
        .unwrap_or(0) as f64;
    if z < 1e-10 {
        return TestResult::from_p(name, 1.0, 0.0, format!("max|S|=0, n={n}"));
    }

    let nf = n as f64;
    let sqrt_n = nf.sqrt();
    let norm = Normal::standard();
    let phi = |x: f64| norm.cdf(x);

    let mut sum1 = 0.0;
    for k in ((-nf / z + 1.0) / 4.0).trunc() as i64..=((nf / z - 1.0) / 4.0).trunc() as i64 {
        let kf = k as f64;
        sum1 += phi((4.0 * kf + 1.0) * z / sqrt_n) - phi((4.0 * kf - 1.0) * z / sqrt_n);
    }
    let mut sum2 = 0.0;
    for k in ((-nf / z - 3.0) / 4.0).trunc() as i64..=((nf / z - 1.0) / 4.0).trunc() as i64 {
        let kf = k as f64;
        sum2 += phi((4.0 * kf + 3.0) * z / sqrt_n) - phi((4.0 * kf + 1.0) * z / sqrt_n);
    }
    let p = 1.0 - sum1 + sum2;
    TestResult::from_p(name, p, z, format!("max|S|={z:.0}, n={n}"))
}

/// Random excursions -- visit counts per state of the ±1 walk.
///
/// A walk that never returns to zero has no cycles and is rejected outright.
/// Otherwise, with `J` cycles, each distinct visited state `x` is checked with
/// `erfc(|ξ(x) − J| / sqrt(2J(4|x| − 2)))`; the sequence passes only if every
/// state does. The reported p-value is the smallest per-state p-value.
pub fn random_excursions(bits: &[u8]) -> TestResult {
    let name = "Random Excursions";
    let n = bits.len();
    if n < 100 {
        return insufficient(name, 100, n);
    }
    let sums = partial_sums(bits);
    let returns = sums.iter().filter(|&&s| s == 0).count();
    if returns == 0 {
        return TestResult::rejected(name, 0.0, "Walk never returns to zero".to_string());
    }
    // The trailing excursion counts as a cycle when the walk ends away from zero.
    let cycles = returns + usize::from(sums.last().is_some_and(|&s| s != 0));

    let mut visits: BTreeMap<i64, u64> = BTreeMap::new();
    for &s in sums.iter().filter(|&&s| s != 0) {
        *visits.entry(s).or_insert(0) += 1;
    }
    if visits.is_empty() {
        return TestResult::rejected(name, cycles as f64, "No visited states".to_string());
    }

    let j = cycles as f64;
    let mut worst_state = 0i64;
    let mut worst_p = 1.0f64;
    let mut failures = 0usize;
    for (&state, &count) in &visits {
        let scale = (2.0 * j * (4.0 * state.unsigned_abs() as f64 - 2.0)).sqrt();
        let p = erfc((count as f64 - j).abs() / scale);
        if p < SIGNIFICANCE {
            failures += 1;
        }
        if p < worst_p {
            worst_p = p;
            worst_state = state;
        }
    }

    let mut result = TestResult::from_p(
        name,
        worst_p,
        j,
        format!(
            "J={cycles}, states={}, failing={failures}, worst x={worst_state} p={worst_p:.4}",
            visits.len()
        ),
    );
    result.passed = failures == 0;
    result
}

// ═══════════════════════════════════════════════════════════════════════════════
// Test battery
// ═══════════════════════════════════════════════════════════════════════════════

/// Run the selected tests, in order, on one bit sequence.
pub fn run_battery(bits: &[u8], tests: &[ClassicalTest], params: &BatteryParams) -> Vec<TestResult> {
    tests
        .iter()
        .map(|&test| {
            match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| test.run(bits, params))) {
                Ok(result) => result,
                Err(_) => TestResult {
                    name: test.name().to_string(),
                    passed: false,
                    p_value: None,
                    statistic: 0.0,
                    details: "Test panicked".to_string(),
                    grade: 'F',
                },
            }
        })
        .collect()
}

/// Run every test of the battery with default windows.
pub fn run_all_tests(bits: &[u8]) -> Vec<TestResult> {
    run_battery(bits, &ClassicalTest::ALL, &BatteryParams::default())
}
