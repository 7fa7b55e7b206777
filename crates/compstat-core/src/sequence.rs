//! Binary sequences and their byte packing.
//!
//! Bits are packed 8 per byte, most significant bit first. When the length is
//! not a multiple of 8, the final partial group of `r` bits is **left-padded**
//! with `8 - r` zero bits: the `r` bits occupy the low-order positions of the
//! last byte. For example `[1, 0, 1]` packs to `0b0000_0101`.

use crate::error::{Error, Result};

/// An immutable sequence of bits, one `u8` (0 or 1) per bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinarySequence {
    bits: Vec<u8>,
}

impl BinarySequence {
    /// Wrap a vector of bits, rejecting values other than 0 and 1.
    pub fn from_bits(bits: Vec<u8>) -> Result<Self> {
        if let Some(pos) = bits.iter().position(|&b| b > 1) {
            return Err(Error::invalid(
                "bits",
                format!("value {} at index {pos} is not a bit", bits[pos]),
            ));
        }
        Ok(Self { bits })
    }

    /// Expand every byte into 8 bits, MSB first.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bits: unpack_all(bytes),
        }
    }

    pub(crate) fn from_bits_unchecked(bits: Vec<u8>) -> Self {
        debug_assert!(bits.iter().all(|&b| b <= 1));
        Self { bits }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Number of ones in the sequence.
    pub fn ones(&self) -> usize {
        self.bits.iter().map(|&b| b as usize).sum()
    }

    /// Packed form handed to byte-oriented compressors.
    pub fn pack(&self) -> Vec<u8> {
        pack_bits(&self.bits)
    }

    pub fn into_bits(self) -> Vec<u8> {
        self.bits
    }
}

impl AsRef<[u8]> for BinarySequence {
    fn as_ref(&self) -> &[u8] {
        &self.bits
    }
}

/// Pack bits into bytes, MSB first, left-padding the final partial byte.
pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| chunk.iter().fold(0u8, |byte, &bit| (byte << 1) | (bit & 1)))
        .collect()
}

/// Inverse of [`pack_bits`] given the original bit length.
pub fn unpack_bits(bytes: &[u8], bit_len: usize) -> Result<Vec<u8>> {
    let expected = bit_len.div_ceil(8);
    if bytes.len() != expected {
        return Err(Error::invalid(
            "bit_len",
            format!(
                "{bit_len} bits need {expected} packed bytes, got {}",
                bytes.len()
            ),
        ));
    }
    let mut bits = Vec::with_capacity(bit_len);
    let full = bit_len / 8;
    for &byte in &bytes[..full] {
        for shift in (0..8).rev() {
            bits.push((byte >> shift) & 1);
        }
    }
    let rem = bit_len % 8;
    if rem > 0 {
        let last = bytes[full];
        for shift in (0..rem).rev() {
            bits.push((last >> shift) & 1);
        }
    }
    Ok(bits)
}

/// Expand every byte into 8 bits, MSB first.
///
/// Applied to the output of [`pack_bits`] for a length that is not a multiple
/// of 8, the padding zeros appear immediately before the final partial group.
pub fn unpack_all(bytes: &[u8]) -> Vec<u8> {
    let mut bits = Vec::with_capacity(bytes.len() * 8);
    for &byte in bytes {
        for shift in (0..8).rev() {
            bits.push((byte >> shift) & 1);
        }
    }
    bits
}
