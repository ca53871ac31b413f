//! Architecture Registry: maps an inferred `e_machine` value to the
//! canonical header field values a conforming file of that architecture is
//! expected to carry. Each machine owns a fixed set of `ei_*`/`e_*` values,
//! with MIPS alone varying by bitness and endianness.

use crate::endian::{Bits, Endian};
use crate::error::LeptonError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Machine {
    I386,
    Amd64,
    Arm,
    Ppc,
    Mips,
}

const EM_386: u16 = 3;
const EM_PPC: u16 = 20;
const EM_ARM: u16 = 40;
const EM_AMD64: u16 = 62;
const EM_MIPS: u16 = 8;

/// Canonical values a conforming header of this architecture carries.
#[derive(Debug, Clone, Copy)]
pub struct ArchValues {
    pub ei_class: u8,
    pub ei_data: u8,
    pub ei_version: u8,
    pub ei_osabi: u8,
    pub ei_abiversion: u8,
    pub padding: [u8; 7],
    pub e_version: u32,
    pub e_phoff: u64,
    pub e_ehsize: u16,
    pub e_phentsize: u16,
    pub e_shentsize: u16,
}

const PADDING: [u8; 7] = [0; 7];

/// 32-bit little-endian canonical values shared by i386, ARM, and
/// little-endian 32-bit MIPS. AMD64 and PPC/MIPS variants each differ in at
/// least one field, so they get their own constructors below.
fn elf32_le(ei_class_unused: u8) -> ArchValues {
    let _ = ei_class_unused;
    ArchValues {
        ei_class: 1,
        ei_data: 1,
        ei_version: 1,
        ei_osabi: 0,
        ei_abiversion: 0,
        padding: PADDING,
        e_version: 1,
        e_phoff: 0x34,
        e_ehsize: 0x34,
        e_phentsize: 0x20,
        e_shentsize: 0x28,
    }
}

fn i386() -> ArchValues {
    elf32_le(1)
}

fn arm() -> ArchValues {
    elf32_le(1)
}

fn ppc() -> ArchValues {
    ArchValues {
        ei_data: 2,
        ..elf32_le(1)
    }
}

fn amd64() -> ArchValues {
    ArchValues {
        ei_class: 2,
        ei_data: 1,
        ei_version: 1,
        ei_osabi: 0,
        ei_abiversion: 0,
        padding: PADDING,
        e_version: 1,
        e_phoff: 0x40,
        e_ehsize: 0x40,
        e_phentsize: 0x38,
        e_shentsize: 0x40,
    }
}

fn mips(bits: Bits, endian: Endian) -> ArchValues {
    let ei_data = if endian == Endian::Little { 1 } else { 2 };
    match bits {
        Bits::B32 => ArchValues {
            ei_class: 1,
            ei_data,
            ei_version: 1,
            ei_osabi: 0,
            ei_abiversion: 0,
            padding: PADDING,
            e_version: 1,
            e_phoff: 0x34,
            e_ehsize: 0x34,
            e_phentsize: 0x20,
            e_shentsize: 0x28,
        },
        Bits::B64 => ArchValues {
            ei_class: 2,
            ei_data,
            ei_version: 1,
            ei_osabi: 0,
            ei_abiversion: 0,
            padding: PADDING,
            e_version: 1,
            e_phoff: 0x40,
            e_ehsize: 0x40,
            e_phentsize: 0x38,
            e_shentsize: 0x40,
        },
    }
}

/// Resolve the architecture for a numeric `e_machine` value, returning the
/// canonical field values a conforming header of that architecture, under
/// `bits`/`endian`, is expected to carry.
///
/// Unknown `e_machine` values are rejected with `UnsupportedArch`: this
/// registry stays closed to unrecognized machines even though it is
/// conceptually extensible.
pub fn lookup(e_machine: u16, bits: Bits, endian: Endian) -> Result<(Machine, ArchValues), LeptonError> {
    match e_machine {
        EM_386 => Ok((Machine::I386, i386())),
        EM_AMD64 => Ok((Machine::Amd64, amd64())),
        EM_ARM => Ok((Machine::Arm, arm())),
        EM_PPC => Ok((Machine::Ppc, ppc())),
        EM_MIPS => Ok((Machine::Mips, mips(bits, endian))),
        other => Err(LeptonError::UnsupportedArch { e_machine: other }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amd64_matches_canonical_values() {
        let (machine, values) = lookup(EM_AMD64, Bits::B64, Endian::Little).unwrap();
        assert_eq!(machine, Machine::Amd64);
        assert_eq!(values.e_phoff, 0x40);
        assert_eq!(values.e_ehsize, values.e_phoff as u16);
        assert_eq!(values.e_phentsize, 56);
    }

    #[test]
    fn i386_matches_canonical_values() {
        let (machine, values) = lookup(EM_386, Bits::B32, Endian::Little).unwrap();
        assert_eq!(machine, Machine::I386);
        assert_eq!(values.e_phoff, 0x34);
        assert_eq!(values.e_phentsize, 32);
    }

    #[test]
    fn mips_varies_by_bits_and_endian() {
        let (_, le32) = lookup(EM_MIPS, Bits::B32, Endian::Little).unwrap();
        let (_, be64) = lookup(EM_MIPS, Bits::B64, Endian::Big).unwrap();
        assert_eq!(le32.ei_data, 1);
        assert_eq!(le32.e_phoff, 0x34);
        assert_eq!(be64.ei_data, 2);
        assert_eq!(be64.e_phoff, 0x40);
    }

    #[test]
    fn unknown_machine_is_rejected() {
        let err = lookup(0xBEEF, Bits::B64, Endian::Little).unwrap_err();
        assert!(matches!(err, LeptonError::UnsupportedArch { e_machine: 0xBEEF }));
    }
}
