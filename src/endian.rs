//! Runtime-selected byte order, plus the `bincode` plumbing that lets the
//! rest of the crate decode/encode fixed-width records in whichever
//! endianness [`crate::identity`] inferred for a given file.

use bincode::Options;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::LeptonError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bits {
    B32,
    B64,
}

impl Bits {
    pub fn header_size(self) -> usize {
        match self {
            Bits::B32 => crate::layout::elf32::EHDR_SIZE,
            Bits::B64 => crate::layout::elf64::EHDR_SIZE,
        }
    }
}

/// Decode a fixed-width little/big-endian record using `bincode`'s
/// fixed-integer encoding (no varint, no length prefixes), with the byte
/// order chosen at runtime instead of fixed to native/little.
pub fn decode<T: DeserializeOwned>(bytes: &[u8], endian: Endian) -> Result<T, LeptonError> {
    let opts = bincode::options().with_fixint_encoding();
    let result = match endian {
        Endian::Little => opts.with_little_endian().deserialize(bytes),
        Endian::Big => opts.with_big_endian().deserialize(bytes),
    };
    result.map_err(|source| LeptonError::DecodeError {
        reason: source.to_string(),
    })
}

pub fn encode<T: Serialize>(value: &T, endian: Endian) -> Vec<u8> {
    let opts = bincode::options().with_fixint_encoding();
    match endian {
        Endian::Little => opts.with_little_endian().serialize(value),
        Endian::Big => opts.with_big_endian().serialize(value),
    }
    .expect("fixed-width ELF records always serialize")
}

/// Read a `u16` at `offset` in `endian`, or `None` if it doesn't fit.
pub fn read_u16(data: &[u8], offset: usize, endian: Endian) -> Option<u16> {
    let bytes: [u8; 2] = data.get(offset..offset + 2)?.try_into().ok()?;
    Some(match endian {
        Endian::Little => u16::from_le_bytes(bytes),
        Endian::Big => u16::from_be_bytes(bytes),
    })
}

/// Read a `u32` at `offset` in `endian`, or `None` if it doesn't fit.
pub fn read_u32(data: &[u8], offset: usize, endian: Endian) -> Option<u32> {
    let bytes: [u8; 4] = data.get(offset..offset + 4)?.try_into().ok()?;
    Some(match endian {
        Endian::Little => u32::from_le_bytes(bytes),
        Endian::Big => u32::from_be_bytes(bytes),
    })
}

/// Read a `u64` at `offset` in `endian`, or `None` if it doesn't fit.
pub fn read_u64(data: &[u8], offset: usize, endian: Endian) -> Option<u64> {
    let bytes: [u8; 8] = data.get(offset..offset + 8)?.try_into().ok()?;
    Some(match endian {
        Endian::Little => u64::from_le_bytes(bytes),
        Endian::Big => u64::from_be_bytes(bytes),
    })
}
