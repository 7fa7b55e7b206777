//! In-memory compressors: everything that can encode straight into a `Vec<u8>`.
//!
//! All adapters default to their strongest setting, since the experiments
//! measure how close a compressor gets to the entropy bound.

use std::io::Write;

use flate2::Compression;
use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};

use super::{Codec, CompressedArtifact};
use crate::error::{Error, Result};

fn artifact(codec: &str, data: Vec<u8>) -> CompressedArtifact {
    CompressedArtifact {
        codec: codec.to_string(),
        data,
    }
}

/// Feed `data` through a `Write` encoder and finish it.
fn encode<W, F>(name: &str, mut encoder: W, data: &[u8], finish: F) -> Result<CompressedArtifact>
where
    W: Write,
    F: FnOnce(W) -> std::io::Result<Vec<u8>>,
{
    encoder.write_all(data).map_err(|e| Error::codec(name, e))?;
    let out = finish(encoder).map_err(|e| Error::codec(name, e))?;
    Ok(artifact(name, out))
}

// ---------------------------------------------------------------------------
// DEFLATE family (flate2)
// ---------------------------------------------------------------------------

/// gzip container around DEFLATE.
#[derive(Debug, Clone, Copy)]
pub struct GzipCodec {
    pub level: u32,
}

impl Default for GzipCodec {
    fn default() -> Self {
        Self { level: 9 }
    }
}

impl Codec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn compress(&self, data: &[u8]) -> Result<CompressedArtifact> {
        let encoder = GzEncoder::new(Vec::new(), Compression::new(self.level));
        encode(self.name(), encoder, data, |e| e.finish())
    }
}

/// zlib container around DEFLATE.
#[derive(Debug, Clone, Copy)]
pub struct ZlibCodec {
    pub level: u32,
}

impl Default for ZlibCodec {
    fn default() -> Self {
        Self { level: 9 }
    }
}

impl Codec for ZlibCodec {
    fn name(&self) -> &str {
        "zlib"
    }

    fn compress(&self, data: &[u8]) -> Result<CompressedArtifact> {
        let encoder = ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        encode(self.name(), encoder, data, |e| e.finish())
    }
}

/// Raw DEFLATE stream, no container.
#[derive(Debug, Clone, Copy)]
pub struct DeflateCodec {
    pub level: u32,
}

impl Default for DeflateCodec {
    fn default() -> Self {
        Self { level: 9 }
    }
}

impl Codec for DeflateCodec {
    fn name(&self) -> &str {
        "deflate"
    }

    fn compress(&self, data: &[u8]) -> Result<CompressedArtifact> {
        let encoder = DeflateEncoder::new(Vec::new(), Compression::new(self.level));
        encode(self.name(), encoder, data, |e| e.finish())
    }
}

// ---------------------------------------------------------------------------
// Block sorting / context modelling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct Bzip2Codec {
    pub level: u32,
}

impl Default for Bzip2Codec {
    fn default() -> Self {
        Self { level: 9 }
    }
}

impl Codec for Bzip2Codec {
    fn name(&self) -> &str {
        "bzip2"
    }

    fn compress(&self, data: &[u8]) -> Result<CompressedArtifact> {
        let encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::new(self.level));
        encode(self.name(), encoder, data, |e| e.finish())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BrotliCodec {
    pub quality: u32,
    pub lgwin: u32,
}

impl Default for BrotliCodec {
    fn default() -> Self {
        Self {
            quality: 11,
            lgwin: 22,
        }
    }
}

impl Codec for BrotliCodec {
    fn name(&self) -> &str {
        "brotli"
    }

    fn compress(&self, data: &[u8]) -> Result<CompressedArtifact> {
        let encoder = brotli::CompressorWriter::new(Vec::new(), 4096, self.quality, self.lgwin);
        encode(self.name(), encoder, data, |e| Ok(e.into_inner()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    pub level: i32,
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self { level: 19 }
    }
}

impl Codec for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn compress(&self, data: &[u8]) -> Result<CompressedArtifact> {
        let out = zstd::encode_all(data, self.level).map_err(|e| Error::codec(self.name(), e))?;
        Ok(artifact(self.name(), out))
    }
}

/// LZMA2 in the xz container.
#[derive(Debug, Clone, Copy)]
pub struct LzmaCodec {
    pub preset: u32,
}

impl Default for LzmaCodec {
    fn default() -> Self {
        Self { preset: 9 }
    }
}

impl Codec for LzmaCodec {
    fn name(&self) -> &str {
        "lzma"
    }

    fn compress(&self, data: &[u8]) -> Result<CompressedArtifact> {
        let encoder = xz2::write::XzEncoder::new(Vec::new(), self.preset);
        encode(self.name(), encoder, data, |e| e.finish())
    }
}
