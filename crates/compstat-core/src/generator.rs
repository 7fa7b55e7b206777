//! Synthetic sequence generators with tunable dependency.
//!
//! # Markov chain
//!
//! The first `memory` bits form the preamble (see [`Preamble`]). Every later
//! bit looks at the parity `s` of the previous `memory` bits: one parity
//! draws the next bit as 1 with probability `p`, the other draws a fair coin.
//! Which parity is biased is a named [`ParityConvention`]. With `p = 0.5`
//! the marginal distribution is exactly uniform, so only the dependency
//! structure distinguishes the output from a fair coin.
//!
//! # Linear congruential generator
//!
//! `X_{k+1} = (A X_k + C) mod M`, emitting `X_1..X_n`. Bytes are extracted
//! from the words by [`extract_8bit_words`].

use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sequence::BinarySequence;

/// Which window parity drives the biased branch of the Markov generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParityConvention {
    /// Even parity (`s == 0`) draws 1 with probability `p`; odd parity is fair.
    #[default]
    BiasOnEven,
    /// Odd parity (`s == 1`) draws 1 with probability `p`; even parity is fair.
    BiasOnOdd,
}

impl ParityConvention {
    fn biased(self, parity: usize) -> bool {
        match self {
            Self::BiasOnEven => parity == 0,
            Self::BiasOnOdd => parity == 1,
        }
    }
}

impl std::fmt::Display for ParityConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BiasOnEven => write!(f, "even"),
            Self::BiasOnOdd => write!(f, "odd"),
        }
    }
}

impl FromStr for ParityConvention {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "even" | "bias_on_even" => Ok(Self::BiasOnEven),
            "odd" | "bias_on_odd" => Ok(Self::BiasOnOdd),
            other => Err(Error::invalid(
                "parity",
                format!("expected `even` or `odd`, got `{other}`"),
            )),
        }
    }
}

/// How the first `memory` bits of a Markov sequence are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preamble {
    /// Fair coin flips from the generator's RNG.
    #[default]
    Random,
    /// All zeros, so small samples start from a fixed state.
    Zeros,
}

impl std::fmt::Display for Preamble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Random => write!(f, "random"),
            Self::Zeros => write!(f, "zeros"),
        }
    }
}

impl FromStr for Preamble {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "zeros" | "zero" => Ok(Self::Zeros),
            other => Err(Error::invalid(
                "preamble",
                format!("expected `random` or `zeros`, got `{other}`"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Markov chain
// ---------------------------------------------------------------------------

/// Fully validated parameters of one Markov generation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkovParams {
    pub size: usize,
    pub probability: f64,
    pub memory: usize,
    pub parity: ParityConvention,
    pub preamble: Preamble,
}

impl MarkovParams {
    pub fn new(size: usize, probability: f64, memory: usize) -> Result<Self> {
        let params = Self {
            size,
            probability,
            memory,
            parity: ParityConvention::default(),
            preamble: Preamble::default(),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn with_parity(mut self, parity: ParityConvention) -> Self {
        self.parity = parity;
        self
    }

    pub fn with_preamble(mut self, preamble: Preamble) -> Self {
        self.preamble = preamble;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::invalid("size", "must be positive"));
        }
        if !(self.probability > 0.0 && self.probability <= 1.0) {
            return Err(Error::invalid(
                "probability",
                format!("must lie in (0, 1], got {}", self.probability),
            ));
        }
        if self.memory > self.size {
            return Err(Error::invalid(
                "memory",
                format!(
                    "memory {} exceeds sequence size {}",
                    self.memory, self.size
                ),
            ));
        }
        Ok(())
    }

    /// Generate one sequence drawing randomness from `rng`.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> BinarySequence {
        let m = self.memory;
        let mut bits = Vec::with_capacity(self.size);
        for _ in 0..m {
            bits.push(match self.preamble {
                Preamble::Random => u8::from(rng.random::<bool>()),
                Preamble::Zeros => 0,
            });
        }

        // Running sum of the trailing `m` bits.
        let mut window: usize = bits.iter().map(|&b| b as usize).sum();
        for i in m..self.size {
            let bit = if self.parity.biased(window % 2) {
                rng.random_bool(self.probability)
            } else {
                rng.random_bool(0.5)
            };
            let bit = u8::from(bit);
            bits.push(bit);
            if m > 0 {
                window = window + bit as usize - bits[i - m] as usize;
            }
        }
        BinarySequence::from_bits_unchecked(bits)
    }

    /// Generate reproducibly from a 64-bit seed.
    pub fn generate_seeded(&self, seed: u64) -> BinarySequence {
        let mut rng = StdRng::seed_from_u64(seed);
        self.generate(&mut rng)
    }
}

// ---------------------------------------------------------------------------
// Linear congruential generator
// ---------------------------------------------------------------------------

/// Parameters of a linear congruential generator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LcgParams {
    pub modulus: u64,
    pub multiplier: u64,
    pub increment: u64,
    pub seed: u64,
    pub count: usize,
}

impl LcgParams {
    pub fn new(modulus: u64, multiplier: u64, increment: u64, seed: u64, count: usize) -> Result<Self> {
        let params = Self {
            modulus,
            multiplier,
            increment,
            seed,
            count,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.modulus <= 256 {
            return Err(Error::invalid(
                "modulus",
                format!("must exceed 256 for byte extraction, got {}", self.modulus),
            ));
        }
        // A and C are reduced mod M by the recurrence; only A = 0 (mod M)
        // degenerates into a constant stream.
        if self.multiplier % self.modulus == 0 {
            return Err(Error::invalid(
                "multiplier",
                format!(
                    "must not be a multiple of the modulus {}, got {}",
                    self.modulus, self.multiplier
                ),
            ));
        }
        if self.seed >= self.modulus {
            return Err(Error::invalid(
                "seed",
                format!("must be below the modulus {}, got {}", self.modulus, self.seed),
            ));
        }
        if self.count == 0 {
            return Err(Error::invalid("count", "must be positive"));
        }
        Ok(())
    }

    /// Iterator over `X_1..X_n`.
    pub fn iter(&self) -> LcgIter {
        LcgIter {
            state: self.seed,
            params: *self,
            remaining: self.count,
        }
    }

    pub fn words(&self) -> Vec<u64> {
        self.iter().collect()
    }

    /// Words reduced to bytes with [`extract_8bit_words`].
    pub fn bytes(&self) -> Vec<u8> {
        extract_8bit_words(&self.words(), self.modulus)
    }

    /// Short label used in report rows.
    pub fn label(&self) -> String {
        format!(
            "lcg(M={}, A={}, C={}, X0={})",
            self.modulus, self.multiplier, self.increment, self.seed
        )
    }
}

impl FromStr for LcgParams {
    type Err = Error;

    /// Parse `M,A,C,X0,N`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 5 {
            return Err(Error::invalid(
                "lcg",
                format!("expected `M,A,C,X0,N`, got `{s}`"),
            ));
        }
        let num = |name: &'static str, raw: &str| -> Result<u64> {
            raw.parse::<u64>()
                .map_err(|e| Error::invalid(name, format!("`{raw}`: {e}")))
        };
        Self::new(
            num("modulus", parts[0])?,
            num("multiplier", parts[1])?,
            num("increment", parts[2])?,
            num("seed", parts[3])?,
            usize::try_from(num("count", parts[4])?).map_err(|e| {
                Error::invalid("count", format!("`{}` does not fit this platform: {e}", parts[4]))
            })?,
        )
    }
}

/// Iterator produced by [`LcgParams::iter`].
#[derive(Debug, Clone)]
pub struct LcgIter {
    state: u64,
    params: LcgParams,
    remaining: usize,
}

impl Iterator for LcgIter {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let p = &self.params;
        let next = (p.multiplier as u128 * self.state as u128 + p.increment as u128)
            % p.modulus as u128;
        self.state = next as u64;
        Some(self.state)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for LcgIter {}

/// Reduce LCG words to bytes without modulo bias.
///
/// Words at or above `256 * floor(M / 256)` are dropped; every retained word
/// `X` contributes `(X / 256) % 256`, its second-least-significant byte.
pub fn extract_8bit_words(words: &[u64], modulus: u64) -> Vec<u8> {
    let limit = 256 * (modulus / 256);
    words
        .iter()
        .filter(|&&x| x < limit)
        .map(|&x| ((x / 256) % 256) as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_markov_params() {
        assert!(MarkovParams::new(0, 0.5, 1).is_err());
        assert!(MarkovParams::new(100, 0.0, 1).is_err());
        assert!(MarkovParams::new(100, 1.01, 1).is_err());
        assert!(MarkovParams::new(100, f64::NAN, 1).is_err());
        assert!(MarkovParams::new(4, 0.5, 5).is_err());
        assert!(MarkovParams::new(100, 1.0, 3).is_ok());
    }

    #[test]
    fn markov_is_seed_reproducible() {
        let params = MarkovParams::new(4096, 0.7, 3).unwrap();
        assert_eq!(params.generate_seeded(7), params.generate_seeded(7));
        assert_ne!(params.generate_seeded(7), params.generate_seeded(8));
    }

    #[test]
    fn zero_preamble_is_fixed() {
        let params = MarkovParams::new(64, 0.5, 6)
            .unwrap()
            .with_preamble(Preamble::Zeros);
        let seq = params.generate_seeded(3);
        assert_eq!(&seq.bits()[..6], &[0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn certain_bias_follows_parity_rule() {
        // p = 1 with even parity biased: an even window always emits 1.
        let params = MarkovParams::new(2000, 1.0, 2)
            .unwrap()
            .with_preamble(Preamble::Zeros);
        let seq = params.generate_seeded(11);
        let bits = seq.bits();
        assert_eq!(bits[2], 1);
        for i in 2..bits.len() {
            if (bits[i - 2] + bits[i - 1]) % 2 == 0 {
                assert_eq!(bits[i], 1, "even window at {i} produced 0");
            }
        }
    }

    #[test]
    fn odd_convention_mirrors_even() {
        let params = MarkovParams::new(2000, 1.0, 1)
            .unwrap()
            .with_parity(ParityConvention::BiasOnOdd);
        let seq = params.generate_seeded(5);
        let bits = seq.bits();
        for i in 1..bits.len() {
            if bits[i - 1] == 1 {
                assert_eq!(bits[i], 1);
            }
        }
    }

    #[test]
    fn memory_zero_is_iid_bernoulli() {
        let params = MarkovParams::new(20_000, 0.9, 0).unwrap();
        let seq = params.generate_seeded(1);
        let frac = seq.ones() as f64 / seq.len() as f64;
        assert!((frac - 0.9).abs() < 0.02, "fraction of ones {frac}");
    }

    #[test]
    fn parity_and_preamble_parse() {
        assert_eq!("odd".parse::<ParityConvention>().unwrap(), ParityConvention::BiasOnOdd);
        assert_eq!("EVEN".parse::<ParityConvention>().unwrap(), ParityConvention::BiasOnEven);
        assert!("both".parse::<ParityConvention>().is_err());
        assert_eq!("zeros".parse::<Preamble>().unwrap(), Preamble::Zeros);
    }

    #[test]
    fn lcg_randu_first_words() {
        let params = LcgParams::new(1 << 31, (1 << 16) + 3, 0, 1, 3).unwrap();
        assert_eq!(params.words(), vec![65539, 393225, 1769499]);
        assert_eq!(params.bytes(), vec![0, 0, 0]);
    }

    #[test]
    fn lcg_rejects_bad_params() {
        assert!(LcgParams::new(256, 5, 1, 1, 10).is_err());
        assert!(LcgParams::new(1000, 0, 1, 1, 10).is_err());
        assert!(LcgParams::new(1000, 2000, 1, 1, 10).is_err());
        assert!(LcgParams::new(1000, 5, 1, 1000, 10).is_err());
        assert!(LcgParams::new(1000, 5, 1, 1, 0).is_err());
    }

    #[test]
    fn lcg_reduces_multiplier_and_increment() {
        let reduced = LcgParams::new(1000, 21, 7, 3, 50).unwrap();
        let raw = LcgParams::new(1000, 3021, 2007, 3, 50).unwrap();
        assert_eq!(raw.words(), reduced.words());
        assert_eq!(raw.words()[0], (3021 * 3 + 2007) % 1000);
    }

    #[test]
    fn lcg_handles_64_bit_parameters() {
        let params = LcgParams::new(u64::MAX, u64::MAX - 1, 12345, u64::MAX - 2, 100).unwrap();
        let words = params.words();
        assert_eq!(words.len(), 100);
        assert!(words.iter().all(|&w| w < u64::MAX));
    }

    #[test]
    fn lcg_parses_tuple() {
        let params: LcgParams = "2147483648, 65539, 0, 1, 400000".parse().unwrap();
        assert_eq!(params.modulus, 1 << 31);
        assert_eq!(params.count, 400_000);
        assert!("1,2,3".parse::<LcgParams>().is_err());
        assert!("a,2,3,4,5".parse::<LcgParams>().is_err());
        let err = "1000,21,1,0,-4".parse::<LcgParams>().unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "count", .. }));
    }

    #[test]
    fn extraction_drops_biased_tail_exactly() {
        // floor(1000 / 256) = 3, so only words below 768 survive.
        let words: Vec<u64> = (0..1000).collect();
        let bytes = extract_8bit_words(&words, 1000);
        assert_eq!(bytes.len(), 768);
        assert_eq!(bytes.iter().filter(|&&b| b == 0).count(), 256);
        assert_eq!(bytes.iter().filter(|&&b| b == 2).count(), 256);
        assert!(bytes.iter().all(|&b| b <= 2));
    }

    #[test]
    fn extraction_keeps_everything_for_aligned_modulus() {
        let words: Vec<u64> = (0..4096).map(|i| i * 977 % 65536).collect();
        let bytes = extract_8bit_words(&words, 65536);
        assert_eq!(bytes.len(), words.len());
        assert_eq!(bytes[1], (977 / 256) as u8);
    }
}
