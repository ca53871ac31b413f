//! Identity Inference: decide endianness, bitness, and machine from bytes
//! that cannot be trusted to describe themselves accurately.
//!
//! The key move in both heuristics is to distrust the single
//! `EI_DATA`/`EI_CLASS` bytes and instead corroborate against a field
//! loaders actually depend on (`e_version`, `e_phentsize`).

use crate::arch::{self, ArchValues, Machine};
use crate::endian::{read_u16, read_u32, Bits, Endian};
use crate::error::LeptonError;
use crate::layout::{self, elf32, elf64, ident};

/// The outcome of identity inference: everything downstream needs to read
/// the rest of the file correctly.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub endian: Endian,
    pub bits: Bits,
    pub machine: Machine,
    pub e_machine: u16,
}

impl Identity {
    pub fn arch_values(&self) -> ArchValues {
        arch::lookup(self.e_machine, self.bits, self.endian)
            .expect("machine was already validated during inference")
            .1
    }
}

pub fn infer(data: &[u8]) -> Result<Identity, LeptonError> {
    if data.len() < 4 || data[0..4] != layout::ELF_MAGIC {
        return Err(LeptonError::InvalidMagic {
            found: data.get(0..4).unwrap_or(data).to_vec(),
        });
    }

    let endian = is_little_endian(data).ok_or(LeptonError::UndeterminedEndianness)?;
    let bits = is_32_bit(data, endian).ok_or(LeptonError::UndeterminedBitness)?;

    let e_machine = match bits {
        Bits::B32 => read_u16(data, elf32::E_MACHINE, endian),
        Bits::B64 => read_u16(data, elf64::E_MACHINE, endian),
    }
    .ok_or(LeptonError::UndeterminedBitness)?;

    let (machine, _) = arch::lookup(e_machine, bits, endian)?;

    Ok(Identity {
        endian,
        bits,
        machine,
        e_machine,
    })
}

/// Returns `Some(Endian::Little)`/`Some(Endian::Big)` once one of the two
/// byte-order interpretations of `e_version` equals 1, `None` if neither
/// does (undetermined). Deliberately ignores `EI_DATA`: it is a single byte
/// an adversary can flip for free, whereas a conforming ELF almost always
/// carries `e_version == 1`.
fn is_little_endian(data: &[u8]) -> Option<Endian> {
    const EXPECTED_E_VERSION: u32 = 1;

    if read_u32(data, elf32::E_VERSION, Endian::Little) == Some(EXPECTED_E_VERSION) {
        return Some(Endian::Little);
    }
    if read_u32(data, elf32::E_VERSION, Endian::Big) == Some(EXPECTED_E_VERSION) {
        return Some(Endian::Big);
    }
    None
}

/// Returns `Some(Bits::B32)` if the ELF32-position `e_phentsize` reads as
/// 32, `Some(Bits::B64)` if the ELF64-position `e_phentsize` reads as 56,
/// `None` otherwise. `EI_CLASS` itself is never consulted.
fn is_32_bit(data: &[u8], endian: Endian) -> Option<Bits> {
    let e_phentsize_32 = read_u16(data, elf32::E_PHENTSIZE, endian);
    if e_phentsize_32 == Some(layout::EXPECTED_32BIT_PHENTSIZE) {
        return Some(Bits::B32);
    }

    let e_phentsize_64 = read_u16(data, elf64::E_PHENTSIZE, endian);
    if e_phentsize_64 == Some(layout::EXPECTED_64BIT_PHENTSIZE) {
        return Some(Bits::B64);
    }

    None
}

/// `EI_CLASS`/`EI_DATA` as actually observed in the input -- used only by
/// clone-mode builders, which copy what's there rather than trusting it.
pub fn observed_ei_class(data: &[u8]) -> Option<u8> {
    data.get(ident::EI_CLASS).copied()
}

pub fn observed_ei_data(data: &[u8]) -> Option<u8> {
    data.get(ident::EI_DATA).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_amd64_le() -> Vec<u8> {
        let mut data = vec![0u8; 0x40];
        data[0..4].copy_from_slice(&layout::ELF_MAGIC);
        data[4] = 2; // EI_CLASS = ELFCLASS64
        data[5] = 1; // EI_DATA = ELFDATA2LSB
        data[6] = 1; // EI_VERSION
        data[elf64::E_VERSION..elf64::E_VERSION + 4].copy_from_slice(&1u32.to_le_bytes());
        data[elf64::E_MACHINE..elf64::E_MACHINE + 2].copy_from_slice(&62u16.to_le_bytes());
        data[elf64::E_PHENTSIZE..elf64::E_PHENTSIZE + 2].copy_from_slice(&56u16.to_le_bytes());
        data
    }

    #[test]
    fn infers_little_endian_amd64() {
        let data = minimal_amd64_le();
        let id = infer(&data).unwrap();
        assert_eq!(id.endian, Endian::Little);
        assert_eq!(id.bits, Bits::B64);
        assert_eq!(id.machine, Machine::Amd64);
    }

    #[test]
    fn distrusts_flipped_ei_data() {
        let mut data = minimal_amd64_le();
        data[5] = 2; // lie: claim big-endian
        let id = infer(&data).unwrap();
        assert_eq!(id.endian, Endian::Little, "e_version dword must win over EI_DATA");
    }

    #[test]
    fn rejects_bad_magic() {
        let mut data = minimal_amd64_le();
        data[0] = 0;
        assert!(matches!(infer(&data), Err(LeptonError::InvalidMagic { .. })));
    }

    #[test]
    fn undetermined_endianness_is_an_error() {
        let mut data = minimal_amd64_le();
        data[elf64::E_VERSION..elf64::E_VERSION + 4].copy_from_slice(&2u32.to_le_bytes());
        assert!(matches!(infer(&data), Err(LeptonError::UndeterminedEndianness)));
    }

    #[test]
    fn distrusts_falsely_64_bit_ei_class() {
        // i386 file, but EI_CLASS lies and claims ELFCLASS64.
        let mut data = vec![0u8; elf32::EHDR_SIZE];
        data[0..4].copy_from_slice(&layout::ELF_MAGIC);
        data[4] = 2; // EI_CLASS = ELFCLASS64 (false)
        data[5] = 1; // EI_DATA = ELFDATA2LSB
        data[6] = 1; // EI_VERSION
        data[elf32::E_VERSION..elf32::E_VERSION + 4].copy_from_slice(&1u32.to_le_bytes());
        data[elf32::E_MACHINE..elf32::E_MACHINE + 2].copy_from_slice(&3u16.to_le_bytes());
        data[elf32::E_PHENTSIZE..elf32::E_PHENTSIZE + 2].copy_from_slice(&32u16.to_le_bytes());

        let id = infer(&data).unwrap();
        assert_eq!(id.bits, Bits::B32, "e_phentsize == 32 must win over a falsely-64-bit EI_CLASS");
        assert_eq!(id.machine, Machine::I386);
    }
}
