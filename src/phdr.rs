//! Program Header Table Builder: decodes every `Elf32_Phdr`/`Elf64_Phdr`
//! entry reachable from the constructed [`Header`], skipping any entry that
//! doesn't fit rather than failing the whole table.
//!
//! `e_phnum`/`e_phoff`/`e_phentsize` are all read back from the `Header`
//! using the inferred endianness, not a hardcoded byte order.

use getset::CopyGetters;
use serde::{Deserialize, Serialize};

use crate::endian::{Bits, Endian};
use crate::error::LeptonError;
use crate::header::Header;
use crate::layout::{elf32, elf64};

#[derive(Debug, Clone, Serialize, Deserialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Phdr32 {
    p_type: u32,
    p_offset: u32,
    p_vaddr: u32,
    p_paddr: u32,
    p_filesz: u32,
    p_memsz: u32,
    p_flags: u32,
    p_align: u32,
}

/// ELF64 program header entries reorder `p_flags` immediately after
/// `p_type`, ahead of the offset/address fields -- the one place the two
/// bitnesses genuinely disagree on field order, not just width.
#[derive(Debug, Clone, Serialize, Deserialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Phdr64 {
    p_type: u32,
    p_flags: u32,
    p_offset: u64,
    p_vaddr: u64,
    p_paddr: u64,
    p_filesz: u64,
    p_memsz: u64,
    p_align: u64,
}

#[derive(Debug, Clone)]
pub enum Phdr {
    P32(Phdr32),
    P64(Phdr64),
}

impl Phdr {
    pub fn p_offset(&self) -> u64 {
        match self {
            Phdr::P32(p) => p.p_offset() as u64,
            Phdr::P64(p) => p.p_offset(),
        }
    }

    pub fn p_filesz(&self) -> u64 {
        match self {
            Phdr::P32(p) => p.p_filesz() as u64,
            Phdr::P64(p) => p.p_filesz(),
        }
    }

    pub fn to_bytes(&self, endian: Endian) -> Vec<u8> {
        match self {
            Phdr::P32(p) => crate::endian::encode(p, endian),
            Phdr::P64(p) => crate::endian::encode(p, endian),
        }
    }
}

/// Decode every program header entry the constructed `Header` claims to
/// have. An entry whose bytes don't fit in `data` is dropped, not fatal --
/// later entries are still attempted.
pub fn build_program_header_table(data: &[u8], header: &Header, endian: Endian) -> Vec<Phdr> {
    let phoff = header.e_phoff(endian) as usize;
    let phnum = header.e_phnum(endian) as usize;
    let phentsize = header.e_phentsize(endian) as usize;

    let mut table = Vec::with_capacity(phnum);
    for index in 0..phnum {
        let start = match phoff.checked_add(index * phentsize) {
            Some(s) => s,
            None => break,
        };
        let end = match start.checked_add(phentsize) {
            Some(e) => e,
            None => break,
        };
        let entry_bytes = match data.get(start..end) {
            Some(bytes) => bytes,
            None => continue,
        };

        let decoded = match header.bits() {
            Bits::B32 => decode_entry32(entry_bytes, endian),
            Bits::B64 => decode_entry64(entry_bytes, endian),
        };
        if let Ok(entry) = decoded {
            table.push(entry);
        }
    }
    table
}

fn decode_entry32(bytes: &[u8], endian: Endian) -> Result<Phdr, LeptonError> {
    let expected = elf32::phdr::ENTRY_SIZE;
    if bytes.len() != expected {
        return Err(LeptonError::DecodeError {
            reason: format!("ELF32 program header entry has {} bytes, expected {expected}", bytes.len()),
        });
    }
    crate::endian::decode(bytes, endian).map(Phdr::P32)
}

fn decode_entry64(bytes: &[u8], endian: Endian) -> Result<Phdr, LeptonError> {
    let expected = elf64::phdr::ENTRY_SIZE;
    if bytes.len() != expected {
        return Err(LeptonError::DecodeError {
            reason: format!("ELF64 program header entry has {} bytes, expected {expected}", bytes.len()),
        });
    }
    crate::endian::decode(bytes, endian).map(Phdr::P64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::Machine;
    use crate::identity::Identity;
    use crate::layout;

    fn amd64_identity() -> Identity {
        Identity {
            endian: Endian::Little,
            bits: Bits::B64,
            machine: Machine::Amd64,
            e_machine: 62,
        }
    }

    fn file_with_one_phdr() -> Vec<u8> {
        let mut data = vec![0u8; 0x40 + 56];
        data[0..4].copy_from_slice(&layout::ELF_MAGIC);
        data[4] = 2;
        data[5] = 1;
        data[6] = 1;
        data[elf64::E_VERSION..elf64::E_VERSION + 4].copy_from_slice(&1u32.to_le_bytes());
        data[elf64::E_MACHINE..elf64::E_MACHINE + 2].copy_from_slice(&62u16.to_le_bytes());
        data[elf64::E_PHOFF..elf64::E_PHOFF + 8].copy_from_slice(&0x40u64.to_le_bytes());
        data[elf64::E_PHENTSIZE..elf64::E_PHENTSIZE + 2].copy_from_slice(&56u16.to_le_bytes());
        data[elf64::E_PHNUM..elf64::E_PHNUM + 2].copy_from_slice(&1u16.to_le_bytes());

        let entry_off = 0x40;
        data[entry_off..entry_off + 4].copy_from_slice(&1u32.to_le_bytes()); // p_type = PT_LOAD
        data[entry_off + 4..entry_off + 8].copy_from_slice(&5u32.to_le_bytes()); // p_flags
        data[entry_off + 8..entry_off + 16].copy_from_slice(&0u64.to_le_bytes()); // p_offset
        data
    }

    #[test]
    fn decodes_one_entry() {
        let data = file_with_one_phdr();
        let identity = amd64_identity();
        let header = crate::header::build_clone(&data, &identity).unwrap();
        let table = build_program_header_table(&data, &header, identity.endian);
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].p_offset(), 0);
    }

    #[test]
    fn skips_entries_past_eof() {
        let mut data = file_with_one_phdr();
        let identity = amd64_identity();
        let header_bytes_phnum = elf64::E_PHNUM;
        data[header_bytes_phnum..header_bytes_phnum + 2].copy_from_slice(&5u16.to_le_bytes());
        let header = crate::header::build_clone(&data, &identity).unwrap();
        let table = build_program_header_table(&data, &header, identity.endian);
        assert_eq!(table.len(), 1, "only the one in-bounds entry should survive");
    }
}
