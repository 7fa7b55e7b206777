//! # compstat-core
//!
//! **Does a compressor know something your entropy model doesn't?**
//!
//! `compstat-core` is a research harness for testing independence of binary
//! sequences. It generates sequences with tunable dependency (Markov chains
//! with parity-driven bias, linear congruential generators), estimates their
//! empirical entropy rate, compresses them with off-the-shelf codecs, and
//! turns `t*h - c` into an Accept/Reject verdict. The classical battery from
//! `compstat-tests` runs on the same grid for comparison.
//!
//! ## Quick Start
//!
//! ```no_run
//! use compstat_core::{CompressionTest, GzipCodec, MarkovParams};
//!
//! let seq = MarkovParams::new(1 << 14, 0.8, 5)?.generate_seeded(42);
//! let outcome = CompressionTest::default().evaluate_bits(&seq, &GzipCodec::default())?;
//! println!("{} (statistic {:.1})", outcome.verdict, outcome.statistic);
//! # Ok::<(), compstat_core::Error>(())
//! ```
//!
//! ## Architecture
//!
//! Generator → {Entropy estimator, Codec} → Compression test → Verdict
//!
//! The [`driver`] sweeps a [`SweepConfig`] grid of probes × parameters and
//! returns an ordered [`ExperimentReport`].

pub mod codec;
pub mod config;
pub mod driver;
pub mod entropy;
pub mod error;
pub mod generator;
pub mod hypothesis;
pub mod sequence;

pub use codec::{
    BrotliCodec, Bzip2Codec, Codec, CodecChain, CodecKind, CompressedArtifact, DeflateCodec,
    GzipCodec, LzmaCodec, SevenZipPpmd, ZlibCodec, ZstdCodec,
};
pub use config::{SweepConfig, load_config_from_path};
pub use driver::{Cell, CellRunner, CellSource, ExperimentReport, Probe, ResultRow, run_sweep};
pub use entropy::{conditional_entropy, entropy_profile, shannon_entropy};
pub use error::{Error, Result};
pub use generator::{LcgParams, MarkovParams, ParityConvention, Preamble, extract_8bit_words};
pub use hypothesis::{CompressionOutcome, CompressionTest, LogBase, Verdict};
pub use sequence::{BinarySequence, pack_bits, unpack_all, unpack_bits};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
