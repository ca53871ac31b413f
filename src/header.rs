//! ELF Header Builder: produces a [`Header`] either by byte-exact cloning
//! the input's header fields (clone mode) or by synthesizing a canonical
//! header from the Architecture Registry while preserving the fields that
//! are not architecturally fixed (rebuild mode).
//!
//! Fields are stored as their exact on-disk byte representation rather
//! than as native integers, since clone mode must preserve whatever bytes
//! were actually on disk even when they disagree with the inferred
//! endianness.

use getset::CopyGetters;
use serde::{Deserialize, Serialize};

use crate::arch::ArchValues;
use crate::endian::{Bits, Endian};
use crate::error::LeptonError;
use crate::identity::Identity;
use crate::layout::{self, elf32, elf64};

#[derive(Debug, Clone, Serialize, Deserialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Header32 {
    e_ident: [u8; 16],
    e_type: [u8; 2],
    e_machine: [u8; 2],
    e_version: [u8; 4],
    e_entry: [u8; 4],
    e_phoff: [u8; 4],
    e_shoff: [u8; 4],
    e_flags: [u8; 4],
    e_ehsize: [u8; 2],
    e_phentsize: [u8; 2],
    e_phnum: [u8; 2],
    e_shentsize: [u8; 2],
    e_shnum: [u8; 2],
    e_shstrndx: [u8; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Header64 {
    e_ident: [u8; 16],
    e_type: [u8; 2],
    e_machine: [u8; 2],
    e_version: [u8; 4],
    e_entry: [u8; 8],
    e_phoff: [u8; 8],
    e_shoff: [u8; 8],
    e_flags: [u8; 4],
    e_ehsize: [u8; 2],
    e_phentsize: [u8; 2],
    e_phnum: [u8; 2],
    e_shentsize: [u8; 2],
    e_shnum: [u8; 2],
    e_shstrndx: [u8; 2],
}

/// Tagged sum over the two on-disk header layouts. Every accessor takes the
/// inferred [`Endian`] explicitly rather than storing it, since the same
/// record is read by several components that already carry an `Identity`.
#[derive(Debug, Clone)]
pub enum Header {
    H32(Header32),
    H64(Header64),
}

impl Header {
    pub fn bits(&self) -> Bits {
        match self {
            Header::H32(_) => Bits::B32,
            Header::H64(_) => Bits::B64,
        }
    }

    pub fn ei_class(&self) -> u8 {
        match self {
            Header::H32(h) => h.e_ident()[4],
            Header::H64(h) => h.e_ident()[4],
        }
    }

    pub fn e_phoff(&self, endian: Endian) -> u64 {
        match self {
            Header::H32(h) => decode_u32(&h.e_phoff(), endian) as u64,
            Header::H64(h) => decode_u64(&h.e_phoff(), endian),
        }
    }

    pub fn e_shoff(&self, endian: Endian) -> u64 {
        match self {
            Header::H32(h) => decode_u32(&h.e_shoff(), endian) as u64,
            Header::H64(h) => decode_u64(&h.e_shoff(), endian),
        }
    }

    pub fn e_phentsize(&self, endian: Endian) -> u16 {
        match self {
            Header::H32(h) => decode_u16(&h.e_phentsize(), endian),
            Header::H64(h) => decode_u16(&h.e_phentsize(), endian),
        }
    }

    pub fn e_phnum(&self, endian: Endian) -> u16 {
        match self {
            Header::H32(h) => decode_u16(&h.e_phnum(), endian),
            Header::H64(h) => decode_u16(&h.e_phnum(), endian),
        }
    }

    pub fn e_shentsize(&self, endian: Endian) -> u16 {
        match self {
            Header::H32(h) => decode_u16(&h.e_shentsize(), endian),
            Header::H64(h) => decode_u16(&h.e_shentsize(), endian),
        }
    }

    pub fn e_shnum(&self, endian: Endian) -> u16 {
        match self {
            Header::H32(h) => decode_u16(&h.e_shnum(), endian),
            Header::H64(h) => decode_u16(&h.e_shnum(), endian),
        }
    }

    pub fn e_shstrndx(&self, endian: Endian) -> u16 {
        match self {
            Header::H32(h) => decode_u16(&h.e_shstrndx(), endian),
            Header::H64(h) => decode_u16(&h.e_shstrndx(), endian),
        }
    }

    /// The only post-construction mutation this crate performs: the
    /// Section Header Table Builder writes back `e_shoff`/`e_shnum`/
    /// `e_shstrndx` once it has discovered them in rebuild mode.
    pub fn set_section_table_location(
        &mut self,
        endian: Endian,
        shoff: u64,
        shnum: u16,
        shstrndx: u16,
    ) {
        match self {
            Header::H32(h) => {
                h.e_shoff = encode_u32(shoff as u32, endian);
                h.e_shnum = encode_u16(shnum, endian);
                h.e_shstrndx = encode_u16(shstrndx, endian);
            }
            Header::H64(h) => {
                h.e_shoff = encode_u64(shoff, endian);
                h.e_shnum = encode_u16(shnum, endian);
                h.e_shstrndx = encode_u16(shstrndx, endian);
            }
        }
    }

    /// Serialize in on-disk order. Every field already holds its exact
    /// on-disk bytes, so this is a concatenation, not a re-encode.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Header::H32(h) => {
                let mut out = Vec::with_capacity(elf32::EHDR_SIZE);
                out.extend_from_slice(&h.e_ident());
                out.extend_from_slice(&h.e_type());
                out.extend_from_slice(&h.e_machine());
                out.extend_from_slice(&h.e_version());
                out.extend_from_slice(&h.e_entry());
                out.extend_from_slice(&h.e_phoff());
                out.extend_from_slice(&h.e_shoff());
                out.extend_from_slice(&h.e_flags());
                out.extend_from_slice(&h.e_ehsize());
                out.extend_from_slice(&h.e_phentsize());
                out.extend_from_slice(&h.e_phnum());
                out.extend_from_slice(&h.e_shentsize());
                out.extend_from_slice(&h.e_shnum());
                out.extend_from_slice(&h.e_shstrndx());
                out
            }
            Header::H64(h) => {
                let mut out = Vec::with_capacity(elf64::EHDR_SIZE);
                out.extend_from_slice(&h.e_ident());
                out.extend_from_slice(&h.e_type());
                out.extend_from_slice(&h.e_machine());
                out.extend_from_slice(&h.e_version());
                out.extend_from_slice(&h.e_entry());
                out.extend_from_slice(&h.e_phoff());
                out.extend_from_slice(&h.e_shoff());
                out.extend_from_slice(&h.e_flags());
                out.extend_from_slice(&h.e_ehsize());
                out.extend_from_slice(&h.e_phentsize());
                out.extend_from_slice(&h.e_phnum());
                out.extend_from_slice(&h.e_shentsize());
                out.extend_from_slice(&h.e_shnum());
                out.extend_from_slice(&h.e_shstrndx());
                out
            }
        }
    }
}

fn decode_u16(bytes: &[u8], endian: Endian) -> u16 {
    match endian {
        Endian::Little => u16::from_le_bytes(bytes.try_into().unwrap()),
        Endian::Big => u16::from_be_bytes(bytes.try_into().unwrap()),
    }
}

fn decode_u32(bytes: &[u8], endian: Endian) -> u32 {
    match endian {
        Endian::Little => u32::from_le_bytes(bytes.try_into().unwrap()),
        Endian::Big => u32::from_be_bytes(bytes.try_into().unwrap()),
    }
}

fn decode_u64(bytes: &[u8], endian: Endian) -> u64 {
    match endian {
        Endian::Little => u64::from_le_bytes(bytes.try_into().unwrap()),
        Endian::Big => u64::from_be_bytes(bytes.try_into().unwrap()),
    }
}

fn encode_u16(value: u16, endian: Endian) -> [u8; 2] {
    match endian {
        Endian::Little => value.to_le_bytes(),
        Endian::Big => value.to_be_bytes(),
    }
}

fn encode_u32(value: u32, endian: Endian) -> [u8; 4] {
    match endian {
        Endian::Little => value.to_le_bytes(),
        Endian::Big => value.to_be_bytes(),
    }
}

fn encode_u64(value: u64, endian: Endian) -> [u8; 8] {
    match endian {
        Endian::Little => value.to_le_bytes(),
        Endian::Big => value.to_be_bytes(),
    }
}

fn read_array<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N], LeptonError> {
    data.get(offset..offset + N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| LeptonError::DecodeError {
            reason: format!("header field at offset {offset:#x} ({N} bytes) out of bounds"),
        })
}

/// Clone mode: byte-exact copy of the input's header fields. Note that the
/// *copied* bytes are left exactly as observed -- if the file's own
/// `EI_DATA` disagreed with the inferred endianness, that disagreement
/// survives into the cloned header, since nothing here is re-encoded.
pub fn build_clone(data: &[u8], identity: &Identity) -> Result<Header, LeptonError> {
    match identity.bits {
        Bits::B32 => Ok(Header::H32(Header32 {
            e_ident: read_array(data, 0)?,
            e_type: read_array(data, elf32::E_TYPE)?,
            e_machine: read_array(data, elf32::E_MACHINE)?,
            e_version: read_array(data, elf32::E_VERSION)?,
            e_entry: read_array(data, elf32::E_ENTRY)?,
            e_phoff: read_array(data, elf32::E_PHOFF)?,
            e_shoff: read_array(data, elf32::E_SHOFF)?,
            e_flags: read_array(data, elf32::E_FLAGS)?,
            e_ehsize: read_array(data, elf32::E_EHSIZE)?,
            e_phentsize: read_array(data, elf32::E_PHENTSIZE)?,
            e_phnum: read_array(data, elf32::E_PHNUM)?,
            e_shentsize: read_array(data, elf32::E_SHENTSIZE)?,
            e_shnum: read_array(data, elf32::E_SHNUM)?,
            e_shstrndx: read_array(data, elf32::E_SHSTRNDX)?,
        })),
        Bits::B64 => Ok(Header::H64(Header64 {
            e_ident: read_array(data, 0)?,
            e_type: read_array(data, elf64::E_TYPE)?,
            e_machine: read_array(data, elf64::E_MACHINE)?,
            e_version: read_array(data, elf64::E_VERSION)?,
            e_entry: read_array(data, elf64::E_ENTRY)?,
            e_phoff: read_array(data, elf64::E_PHOFF)?,
            e_shoff: read_array(data, elf64::E_SHOFF)?,
            e_flags: read_array(data, elf64::E_FLAGS)?,
            e_ehsize: read_array(data, elf64::E_EHSIZE)?,
            e_phentsize: read_array(data, elf64::E_PHENTSIZE)?,
            e_phnum: read_array(data, elf64::E_PHNUM)?,
            e_shentsize: read_array(data, elf64::E_SHENTSIZE)?,
            e_shnum: read_array(data, elf64::E_SHNUM)?,
            e_shstrndx: read_array(data, elf64::E_SHSTRNDX)?,
        })),
    }
}

/// Rebuild mode: `e_ident`, `e_machine`, `e_version`, `e_ehsize`,
/// `e_phoff`, `e_phentsize`, `e_shentsize` and `e_flags` are synthesized
/// from the Architecture Registry; `e_type`, `e_entry`, `e_shoff`,
/// `e_phnum`, `e_shnum`, `e_shstrndx` are read from the input and
/// re-encoded in the inferred endianness.
///
/// Returns `Ok(None)` when the observed `e_phoff` is less than the
/// architecture's canonical offset -- forcing the canonical offset would
/// make the header overlap the program header table and overwrite payload
/// bytes, so the file is reported unreconstructable instead.
pub fn build_rebuild(
    data: &[u8],
    identity: &Identity,
    arch: &ArchValues,
) -> Result<Option<Header>, LeptonError> {
    let endian = identity.endian;

    let e_ident = {
        let mut ident = [0u8; 16];
        ident[0..4].copy_from_slice(&layout::ELF_MAGIC);
        ident[4] = arch.ei_class;
        ident[5] = arch.ei_data;
        ident[6] = arch.ei_version;
        ident[7] = arch.ei_osabi;
        ident[8] = arch.ei_abiversion;
        ident[9..16].copy_from_slice(&arch.padding);
        ident
    };
    let e_machine = encode_u16(identity.e_machine, endian);
    let e_version = encode_u32(arch.e_version, endian);
    let e_ehsize = encode_u16(arch.e_ehsize, endian);
    let e_phentsize = encode_u16(arch.e_phentsize, endian);
    let e_shentsize = encode_u16(arch.e_shentsize, endian);
    let e_flags = [0u8; 4];

    match identity.bits {
        Bits::B32 => {
            let observed_e_phoff = decode_u32(&read_array::<4>(data, elf32::E_PHOFF)?, endian) as u64;
            if observed_e_phoff < arch.e_phoff {
                return Ok(None);
            }

            let e_type = {
                let v = decode_u16(&read_array::<2>(data, elf32::E_TYPE)?, endian);
                encode_u16(v, endian)
            };
            let e_entry = {
                let v = decode_u32(&read_array::<4>(data, elf32::E_ENTRY)?, endian);
                encode_u32(v, endian)
            };
            let e_shoff = {
                let v = decode_u32(&read_array::<4>(data, elf32::E_SHOFF)?, endian);
                encode_u32(v, endian)
            };
            let e_phnum = {
                let v = decode_u16(&read_array::<2>(data, elf32::E_PHNUM)?, endian);
                encode_u16(v, endian)
            };
            let e_shnum = {
                let v = decode_u16(&read_array::<2>(data, elf32::E_SHNUM)?, endian);
                encode_u16(v, endian)
            };
            let e_shstrndx = {
                let v = decode_u16(&read_array::<2>(data, elf32::E_SHSTRNDX)?, endian);
                encode_u16(v, endian)
            };

            Ok(Some(Header::H32(Header32 {
                e_ident,
                e_type,
                e_machine,
                e_version,
                e_entry,
                e_phoff: encode_u32(arch.e_phoff as u32, endian),
                e_shoff,
                e_flags,
                e_ehsize,
                e_phentsize,
                e_phnum,
                e_shentsize,
                e_shnum,
                e_shstrndx,
            })))
        }
        Bits::B64 => {
            let observed_e_phoff = decode_u64(&read_array::<8>(data, elf64::E_PHOFF)?, endian);
            if observed_e_phoff < arch.e_phoff {
                return Ok(None);
            }

            let e_type = {
                let v = decode_u16(&read_array::<2>(data, elf64::E_TYPE)?, endian);
                encode_u16(v, endian)
            };
            let e_entry = {
                let v = decode_u64(&read_array::<8>(data, elf64::E_ENTRY)?, endian);
                encode_u64(v, endian)
            };
            let e_shoff = {
                let v = decode_u64(&read_array::<8>(data, elf64::E_SHOFF)?, endian);
                encode_u64(v, endian)
            };
            let e_phnum = {
                let v = decode_u16(&read_array::<2>(data, elf64::E_PHNUM)?, endian);
                encode_u16(v, endian)
            };
            let e_shnum = {
                let v = decode_u16(&read_array::<2>(data, elf64::E_SHNUM)?, endian);
                encode_u16(v, endian)
            };
            let e_shstrndx = {
                let v = decode_u16(&read_array::<2>(data, elf64::E_SHSTRNDX)?, endian);
                encode_u16(v, endian)
            };

            Ok(Some(Header::H64(Header64 {
                e_ident,
                e_type,
                e_machine,
                e_version,
                e_entry,
                e_phoff: encode_u64(arch.e_phoff, endian),
                e_shoff,
                e_flags,
                e_ehsize,
                e_phentsize,
                e_phnum,
                e_shentsize,
                e_shnum,
                e_shstrndx,
            })))
        }
    }
}
