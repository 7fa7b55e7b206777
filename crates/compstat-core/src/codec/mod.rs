//! Uniform `compress(bytes) -> bytes` adapters over external compressors.
//!
//! Every compressor implements [`Codec`]. In-memory codecs live in
//! [`stream`]; archive-format compressors that need files on disk live in
//! [`archive`]. A [`CodecChain`] tries a ranked list of adapters and reports
//! which one produced the output.

pub mod archive;
pub mod stream;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};

pub use archive::{ScopedArtifact, SevenZipPpmd, SEVEN_ZIP_PROGRAMS};
pub use stream::{
    BrotliCodec, Bzip2Codec, DeflateCodec, GzipCodec, LzmaCodec, ZlibCodec, ZstdCodec,
};

/// Default time budget for compressors that run as child processes.
pub const DEFAULT_EXTERNAL_TIMEOUT: Duration = Duration::from_secs(120);

/// Output of one compression call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedArtifact {
    /// Adapter that actually produced the bytes.
    pub codec: String,
    pub data: Vec<u8>,
}

impl CompressedArtifact {
    pub fn len_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn len_bits(&self) -> u64 {
        self.data.len() as u64 * 8
    }
}

/// A byte-oriented compressor. Implementations are stateless per call.
pub trait Codec: Send + Sync {
    /// Identifier reported in results (e.g. `"gzip"`, `"ppmd/7z"`).
    fn name(&self) -> &str;

    /// Whether the adapter can run on this machine.
    fn is_available(&self) -> bool {
        true
    }

    fn compress(&self, data: &[u8]) -> Result<CompressedArtifact>;
}

/// Compressors selectable by name in an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecKind {
    Gzip,
    Zlib,
    Deflate,
    Bzip2,
    Brotli,
    Zstd,
    Lzma,
    Ppmd,
}

impl CodecKind {
    pub const ALL: [CodecKind; 8] = [
        CodecKind::Gzip,
        CodecKind::Zlib,
        CodecKind::Deflate,
        CodecKind::Bzip2,
        CodecKind::Brotli,
        CodecKind::Zstd,
        CodecKind::Lzma,
        CodecKind::Ppmd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Zlib => "zlib",
            Self::Deflate => "deflate",
            Self::Bzip2 => "bzip2",
            Self::Brotli => "brotli",
            Self::Zstd => "zstd",
            Self::Lzma => "lzma",
            Self::Ppmd => "ppmd",
        }
    }

    pub fn supported_names() -> String {
        Self::ALL
            .iter()
            .map(|k| k.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Resolve a compressor name, accepting a few common aliases.
    pub fn from_name(name: &str) -> Result<Self> {
        let wanted = name.trim().to_lowercase();
        let kind = match wanted.as_str() {
            "gzip" | "gz" => Self::Gzip,
            "zlib" => Self::Zlib,
            "deflate" => Self::Deflate,
            "bzip2" | "bz2" => Self::Bzip2,
            "brotli" | "br" => Self::Brotli,
            "zstd" | "zstandard" => Self::Zstd,
            "lzma" | "xz" => Self::Lzma,
            "ppmd" | "7z" => Self::Ppmd,
            _ => {
                return Err(Error::UnsupportedCompressor {
                    requested: name.to_string(),
                    supported: Self::supported_names(),
                });
            }
        };
        Ok(kind)
    }

    /// Build the adapter for this compressor.
    ///
    /// `external_timeout` bounds compressors that run as child processes.
    pub fn adapter(self, external_timeout: Duration) -> Box<dyn Codec> {
        match self {
            Self::Gzip => Box::new(GzipCodec::default()),
            Self::Zlib => Box::new(ZlibCodec::default()),
            Self::Deflate => Box::new(DeflateCodec::default()),
            Self::Bzip2 => Box::new(Bzip2Codec::default()),
            Self::Brotli => Box::new(BrotliCodec::default()),
            Self::Zstd => Box::new(ZstdCodec::default()),
            Self::Lzma => Box::new(LzmaCodec::default()),
            Self::Ppmd => Box::new(CodecChain::new(
                "ppmd",
                SEVEN_ZIP_PROGRAMS
                    .iter()
                    .map(|program| {
                        Box::new(SevenZipPpmd::new(program, external_timeout)) as Box<dyn Codec>
                    })
                    .collect(),
            )),
        }
    }
}

impl std::fmt::Display for CodecKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Ranked fallback
// ---------------------------------------------------------------------------

/// Ranked list of adapters for the same compressor family.
///
/// Candidates are tried in order. Unavailable candidates are skipped, failing
/// ones are logged and the next is tried. A timeout is not retried on the
/// next candidate. The returned artifact names the adapter that succeeded.
pub struct CodecChain {
    name: String,
    candidates: Vec<Box<dyn Codec>>,
    /// 1 + index of the last candidate that succeeded, 0 before any success.
    selected: AtomicUsize,
}

impl CodecChain {
    pub fn new(name: impl Into<String>, candidates: Vec<Box<dyn Codec>>) -> Self {
        Self {
            name: name.into(),
            candidates,
            selected: AtomicUsize::new(0),
        }
    }
}

impl Codec for CodecChain {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.candidates.iter().any(|c| c.is_available())
    }

    fn compress(&self, data: &[u8]) -> Result<CompressedArtifact> {
        let mut attempts = Vec::new();
        for (rank, candidate) in self.candidates.iter().enumerate() {
            if !candidate.is_available() {
                log::debug!("{}: skipping unavailable adapter {}", self.name, candidate.name());
                attempts.push(format!("{}: unavailable", candidate.name()));
                continue;
            }
            match candidate.compress(data) {
                Ok(artifact) => {
                    if self.selected.swap(rank + 1, Ordering::Relaxed) != rank + 1 {
                        log::info!(
                            "{}: using adapter {} (rank {})",
                            self.name,
                            artifact.codec,
                            rank + 1
                        );
                    }
                    return Ok(artifact);
                }
                Err(err @ Error::Timeout { .. }) => return Err(err),
                Err(err) => {
                    log::warn!(
                        "{}: adapter {} failed, trying next candidate: {err}",
                        self.name,
                        candidate.name()
                    );
                    attempts.push(format!("{}: {err}", candidate.name()));
                }
            }
        }
        Err(Error::codec(
            self.name.clone(),
            format!("no adapter succeeded ({})", attempts.join("; ")),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl Codec for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn compress(&self, _data: &[u8]) -> Result<CompressedArtifact> {
            Err(Error::codec("failing", "boom"))
        }
    }

    struct Missing;

    impl Codec for Missing {
        fn name(&self) -> &str {
            "missing"
        }

        fn is_available(&self) -> bool {
            false
        }

        fn compress(&self, _data: &[u8]) -> Result<CompressedArtifact> {
            unreachable!("unavailable adapters are never called")
        }
    }

    struct Slow;

    impl Codec for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        fn compress(&self, _data: &[u8]) -> Result<CompressedArtifact> {
            Err(Error::Timeout {
                what: "slow".into(),
                after: Duration::from_secs(1),
            })
        }
    }

    struct Counting(AtomicUsize);

    impl Codec for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn compress(&self, data: &[u8]) -> Result<CompressedArtifact> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(CompressedArtifact {
                codec: "counting".into(),
                data: data.to_vec(),
            })
        }
    }

    #[test]
    fn every_kind_resolves_by_name() {
        for kind in CodecKind::ALL {
            assert_eq!(CodecKind::from_name(kind.name()).unwrap(), kind);
        }
        assert_eq!(CodecKind::from_name("XZ").unwrap(), CodecKind::Lzma);
    }

    #[test]
    fn unknown_name_lists_supported_set() {
        let err = CodecKind::from_name("lz4").unwrap_err();
        match err {
            Error::UnsupportedCompressor {
                requested,
                supported,
            } => {
                assert_eq!(requested, "lz4");
                assert!(supported.contains("gzip"));
                assert!(supported.contains("ppmd"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn chain_falls_back_in_rank_order() {
        let chain = CodecChain::new(
            "family",
            vec![
                Box::new(Missing),
                Box::new(Failing),
                Box::new(Counting(AtomicUsize::new(0))),
            ],
        );
        let out = chain.compress(b"abc").unwrap();
        assert_eq!(out.codec, "counting");
        assert_eq!(out.data, b"abc");
    }

    #[test]
    fn chain_reports_every_failure() {
        let chain = CodecChain::new("family", vec![Box::new(Missing), Box::new(Failing)]);
        let err = chain.compress(b"abc").unwrap_err().to_string();
        assert!(err.contains("missing: unavailable"));
        assert!(err.contains("boom"));
    }

    #[test]
    fn chain_does_not_retry_after_timeout() {
        let chain = CodecChain::new(
            "family",
            vec![Box::new(Slow), Box::new(Counting(AtomicUsize::new(0)))],
        );
        assert!(matches!(
            chain.compress(b"abc"),
            Err(Error::Timeout { .. })
        ));
    }

    #[test]
    fn artifact_length_in_bits() {
        let artifact = CompressedArtifact {
            codec: "x".into(),
            data: vec![0; 5],
        };
        assert_eq!(artifact.len_bytes(), 5);
        assert_eq!(artifact.len_bits(), 40);
    }
}
