//! Compression-based test of the independence hypothesis.
//!
//! For a sequence of `t` symbols with empirical entropy rate `h` (order-k
//! conditional estimate) that a compressor shrinks to `c` bits, the test
//! statistic is `t*h - c`. The null hypothesis (the order-k model explains
//! the sequence) is rejected when the compressor beats the entropy bound by
//! more than `log(1/alpha)`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::Codec;
use crate::entropy::conditional_entropy;
use crate::error::{Error, Result};
use crate::sequence::BinarySequence;

/// Default context order of the entropy estimate.
pub const DEFAULT_ORDER: usize = 6;

/// Default significance level.
pub const DEFAULT_ALPHA: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accept,
    Reject,
}

impl Verdict {
    pub fn is_accept(self) -> bool {
        self == Self::Accept
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accept => write!(f, "Accept"),
            Self::Reject => write!(f, "Reject"),
        }
    }
}

/// Unit of the statistic and threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogBase {
    /// log2; statistic in bits.
    #[default]
    Bits,
    /// ln; statistic converted to nats with `ln 2`.
    Nats,
}

impl LogBase {
    /// `log(1/alpha)` in this unit.
    pub fn threshold(self, alpha: f64) -> f64 {
        match self {
            Self::Bits => (1.0 / alpha).log2(),
            Self::Nats => (1.0 / alpha).ln(),
        }
    }

    /// Convert a quantity measured in bits into this unit.
    pub fn from_bits(self, bits: f64) -> f64 {
        match self {
            Self::Bits => bits,
            Self::Nats => bits * std::f64::consts::LN_2,
        }
    }
}

impl std::fmt::Display for LogBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bits => write!(f, "bits"),
            Self::Nats => write!(f, "nats"),
        }
    }
}

impl FromStr for LogBase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "bits" | "log2" | "2" => Ok(Self::Bits),
            "nats" | "ln" | "e" => Ok(Self::Nats),
            other => Err(Error::invalid(
                "log_base",
                format!("expected `bits` or `nats`, got `{other}`"),
            )),
        }
    }
}

/// Everything measured while testing one sequence against one compressor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressionOutcome {
    /// Adapter that produced the compressed output.
    pub codec: String,
    /// Sequence length `t` in symbols (bits or bytes).
    pub symbols: usize,
    /// Entropy rate `h` in bits per symbol.
    pub entropy: f64,
    /// Compressed size `c` in bits.
    pub compressed_bits: u64,
    pub statistic: f64,
    pub threshold: f64,
    pub verdict: Verdict,
}

/// The compression test at a fixed significance level and context order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionTest {
    alpha: f64,
    order: usize,
    log_base: LogBase,
}

impl Default for CompressionTest {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            order: DEFAULT_ORDER,
            log_base: LogBase::Bits,
        }
    }
}

impl CompressionTest {
    pub fn new(alpha: f64, order: usize, log_base: LogBase) -> Result<Self> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(Error::invalid(
                "alpha",
                format!("must lie in (0, 1), got {alpha}"),
            ));
        }
        Ok(Self {
            alpha,
            order,
            log_base,
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn log_base(&self) -> LogBase {
        self.log_base
    }

    pub fn threshold(&self) -> f64 {
        self.log_base.threshold(self.alpha)
    }

    /// `t*h - c`, with `h` in bits per symbol and `c` in bits, expressed in
    /// the test's unit.
    pub fn statistic(&self, symbols: usize, entropy_bits: f64, compressed_bits: u64) -> f64 {
        self.log_base
            .from_bits(symbols as f64 * entropy_bits - compressed_bits as f64)
    }

    pub fn decide(&self, symbols: usize, entropy_bits: f64, compressed_bits: u64) -> Verdict {
        if self.statistic(symbols, entropy_bits, compressed_bits) <= self.threshold() {
            Verdict::Accept
        } else {
            Verdict::Reject
        }
    }

    /// Test a bit sequence: entropy over the bit alphabet, compression of the
    /// packed bytes.
    pub fn evaluate_bits(
        &self,
        sequence: &BinarySequence,
        codec: &dyn Codec,
    ) -> Result<CompressionOutcome> {
        if sequence.is_empty() {
            return Err(Error::invalid("size", "cannot test an empty sequence"));
        }
        let entropy = conditional_entropy(sequence.bits(), self.order)?;
        let artifact = codec.compress(&sequence.pack())?;
        let compressed_bits = artifact.len_bits();
        Ok(self.outcome(artifact.codec, sequence.len(), entropy, compressed_bits))
    }

    /// Test a byte sequence: entropy over the byte alphabet, compression of
    /// the bytes as they are.
    pub fn evaluate_bytes(&self, bytes: &[u8], codec: &dyn Codec) -> Result<CompressionOutcome> {
        if bytes.is_empty() {
            return Err(Error::invalid("size", "cannot test an empty byte sequence"));
        }
        let entropy = conditional_entropy(bytes, self.order)?;
        let artifact = codec.compress(bytes)?;
        let compressed_bits = artifact.len_bits();
        Ok(self.outcome(artifact.codec, bytes.len(), entropy, compressed_bits))
    }

    fn outcome(
        &self,
        codec: String,
        symbols: usize,
        entropy: f64,
        compressed_bits: u64,
    ) -> CompressionOutcome {
        let statistic = self.statistic(symbols, entropy, compressed_bits);
        let threshold = self.threshold();
        let verdict = self.decide(symbols, entropy, compressed_bits);
        log::debug!(
            "{codec}: t={symbols} h={entropy:.4} c={compressed_bits} stat={statistic:.2} thr={threshold:.2} -> {verdict}"
        );
        CompressionOutcome {
            codec,
            symbols,
            entropy,
            compressed_bits,
            statistic,
            threshold,
            verdict,
        }
    }
}
