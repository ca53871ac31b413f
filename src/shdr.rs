//! Section Header Table Builder: the hardest subsystem. In clone mode this
//! is a straight read at `e_shoff`/`e_shnum`. In rebuild mode the header's
//! own claims about where the table lives are assumed untrustworthy (the
//! common case for a stripped binary: `e_shoff == e_shnum == 0`), so the
//! table has to be located by scanning the buffer itself: a backward
//! zero-run scan, a 5-sample `PROGBITS`/`sh_flags` plausibility check, and
//! a `.shstrtab` marker search for `shstrndx`.

use getset::CopyGetters;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::endian::{Bits, Endian};
use crate::error::LeptonError;
use crate::header::Header;
use crate::layout::{elf32, elf64, SHT_PROGBITS, SHT_STRTAB, SHN_NAME_MARKER};

#[derive(Debug, Clone, Serialize, Deserialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Shdr32 {
    sh_name: u32,
    sh_type: u32,
    sh_flags: u32,
    sh_addr: u32,
    sh_offset: u32,
    sh_size: u32,
    sh_link: u32,
    sh_info: u32,
    sh_addralign: u32,
    sh_entsize: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Shdr64 {
    sh_name: u32,
    sh_type: u32,
    sh_flags: u64,
    sh_addr: u64,
    sh_offset: u64,
    sh_size: u64,
    sh_link: u32,
    sh_info: u32,
    sh_addralign: u64,
    sh_entsize: u64,
}

#[derive(Debug, Clone)]
pub enum Shdr {
    S32(Shdr32),
    S64(Shdr64),
}

impl Shdr {
    pub fn sh_type(&self) -> u32 {
        match self {
            Shdr::S32(s) => s.sh_type(),
            Shdr::S64(s) => s.sh_type(),
        }
    }

    pub fn sh_flags(&self) -> u64 {
        match self {
            Shdr::S32(s) => s.sh_flags() as u64,
            Shdr::S64(s) => s.sh_flags(),
        }
    }

    pub fn sh_offset(&self) -> u64 {
        match self {
            Shdr::S32(s) => s.sh_offset() as u64,
            Shdr::S64(s) => s.sh_offset(),
        }
    }

    pub fn sh_size(&self) -> u64 {
        match self {
            Shdr::S32(s) => s.sh_size() as u64,
            Shdr::S64(s) => s.sh_size(),
        }
    }

    pub fn to_bytes(&self, endian: Endian) -> Vec<u8> {
        match self {
            Shdr::S32(s) => crate::endian::encode(s, endian),
            Shdr::S64(s) => crate::endian::encode(s, endian),
        }
    }
}

fn entry_size(bits: Bits) -> usize {
    match bits {
        Bits::B32 => elf32::shdr::ENTRY_SIZE,
        Bits::B64 => elf64::shdr::ENTRY_SIZE,
    }
}

fn decode_entry(bytes: &[u8], bits: Bits, endian: Endian) -> Result<Shdr, LeptonError> {
    let expected = entry_size(bits);
    if bytes.len() != expected {
        return Err(LeptonError::DecodeError {
            reason: format!("section header entry has {} bytes, expected {expected}", bytes.len()),
        });
    }
    match bits {
        Bits::B32 => crate::endian::decode(bytes, endian).map(Shdr::S32),
        Bits::B64 => crate::endian::decode(bytes, endian).map(Shdr::S64),
    }
}

fn read_table(data: &[u8], bits: Bits, endian: Endian, shoff: usize, shnum: usize) -> Vec<Shdr> {
    let entsize = entry_size(bits);
    let mut table = Vec::with_capacity(shnum);
    for index in 0..shnum {
        let start = match shoff.checked_add(index * entsize) {
            Some(s) => s,
            None => break,
        };
        let end = match start.checked_add(entsize) {
            Some(e) => e,
            None => break,
        };
        let bytes = match data.get(start..end) {
            Some(b) => b,
            None => continue,
        };
        if let Ok(entry) = decode_entry(bytes, bits, endian) {
            table.push(entry);
        }
    }
    table
}

/// Clone mode: trust the header's `e_shoff`/`e_shnum`.
pub fn build_clone(data: &[u8], header: &Header, endian: Endian) -> Vec<Shdr> {
    let shoff = header.e_shoff(endian) as usize;
    let shnum = header.e_shnum(endian) as usize;
    read_table(data, header.bits(), endian, shoff, shnum)
}

/// Rebuild mode: discover `(shoff, shnum, shstrndx)` by scanning, then write
/// them back into `header` and return the decoded table. Returns an empty
/// table (not an error) when no candidate verifies -- an absent section
/// header table is never treated as a failure; `SectionTableNotFound` is
/// logged and swallowed the same way `DecodeError` is elsewhere in this
/// crate, never surfaced through a `Result`.
pub fn build_rebuild(data: &[u8], header: &mut Header, endian: Endian) -> Vec<Shdr> {
    let bits = header.bits();
    let entsize = entry_size(bits);

    let shoff = match discover_shoff(data, entsize, endian) {
        Some(offset) => offset,
        None => {
            warn!("{}", LeptonError::SectionTableNotFound);
            return Vec::new();
        }
    };

    let shnum = discover_shnum(data, shoff, entsize);
    if shnum == 0 {
        warn!("{}", LeptonError::SectionTableNotFound);
        return Vec::new();
    }

    let table = read_table(data, bits, endian, shoff, shnum);
    let shstrndx = discover_shstrndx(data, &table);

    header.set_section_table_location(endian, shoff as u64, shnum as u16, shstrndx as u16);
    table
}

/// Backward zero-run scan for the all-zero null first entry, trying each
/// candidate latest-first and verifying via [`verify_candidate`]. This is
/// the `Scanning`/`Verifying`/`Accepted`/`Rejected` walk: every candidate
/// that fails verification (`Rejected`) falls through to the next earlier
/// candidate (`Scanning` resumes); the first to pass (`Accepted`) wins.
fn discover_shoff(data: &[u8], entsize: usize, endian: Endian) -> Option<usize> {
    if data.len() < entsize {
        return None;
    }
    let last_start = data.len() - entsize;
    let mut candidate = last_start as isize;
    while candidate >= 0 {
        let offset = candidate as usize;
        if data[offset..offset + entsize].iter().all(|&b| b == 0)
            && verify_candidate(data, offset, entsize, endian)
        {
            return Some(offset);
        }
        candidate -= 1;
    }
    None
}

/// Sample up to 5 entries immediately following the candidate zero entry.
/// Any `PROGBITS` sample with an implausible `sh_flags` disqualifies the
/// candidate outright; the candidate is accepted once at least one
/// `PROGBITS` sample passes.
fn verify_candidate(data: &[u8], zero_entry_offset: usize, entsize: usize, endian: Endian) -> bool {
    const SAMPLE_BUDGET: usize = 5;

    let mut saw_pass = false;
    for sample in 0..SAMPLE_BUDGET {
        let start = zero_entry_offset + entsize * (sample + 1);
        let end = start + entsize;
        let entry = match data.get(start..end) {
            Some(e) => e,
            None => break,
        };

        let sh_type = read_u32_field(entry, 0, endian);
        if sh_type != SHT_PROGBITS {
            continue;
        }

        let sh_flags = read_flags_field(entry, entsize, endian);
        if is_plausible_flags(sh_flags) {
            saw_pass = true;
        } else {
            return false;
        }
    }
    saw_pass
}

fn read_u32_field(entry: &[u8], offset: usize, endian: Endian) -> u32 {
    let bytes: [u8; 4] = entry[offset..offset + 4].try_into().unwrap();
    match endian {
        Endian::Little => u32::from_le_bytes(bytes),
        Endian::Big => u32::from_be_bytes(bytes),
    }
}

/// `sh_flags` sits at different offsets/widths between ELF32 and ELF64;
/// `entsize` alone disambiguates which layout `entry` uses.
fn read_flags_field(entry: &[u8], entsize: usize, endian: Endian) -> u64 {
    if entsize == elf32::shdr::ENTRY_SIZE {
        let bytes: [u8; 4] = entry[elf32::shdr::SH_FLAGS..elf32::shdr::SH_FLAGS + 4].try_into().unwrap();
        (match endian {
            Endian::Little => u32::from_le_bytes(bytes),
            Endian::Big => u32::from_be_bytes(bytes),
        }) as u64
    } else {
        let bytes: [u8; 8] = entry[elf64::shdr::SH_FLAGS..elf64::shdr::SH_FLAGS + 8].try_into().unwrap();
        match endian {
            Endian::Little => u64::from_le_bytes(bytes),
            Endian::Big => u64::from_be_bytes(bytes),
        }
    }
}

fn is_plausible_flags(sh_flags: u64) -> bool {
    sh_flags <= 7 || (0xF000_0000..=0xF000_0007).contains(&sh_flags)
}

/// Exact-fit rule first; failing that, forward-scan for the first all-zero
/// entry whose distance from `shoff` is a whole number of entries.
fn discover_shnum(data: &[u8], shoff: usize, entsize: usize) -> usize {
    let remaining = data.len().saturating_sub(shoff);
    if entsize > 0 && remaining % entsize == 0 && remaining > 0 {
        return remaining / entsize;
    }

    let mut index = 1;
    loop {
        let start = shoff + entsize * index;
        let end = start + entsize;
        match data.get(start..end) {
            Some(entry) if entry.iter().all(|&b| b == 0) => return index,
            Some(_) => index += 1,
            None => return 0,
        }
    }
}

/// Find the section whose bytes contain the literal marker `.shstrtab`
/// among the `SHT_STRTAB` entries; that section is by convention the
/// section-name string table naming itself.
fn discover_shstrndx(data: &[u8], table: &[Shdr]) -> usize {
    for (index, entry) in table.iter().enumerate() {
        if entry.sh_type() != SHT_STRTAB {
            continue;
        }
        let start = entry.sh_offset() as usize;
        let end = start.saturating_add(entry.sh_size() as usize);
        if let Some(slice) = data.get(start..end) {
            if contains_subslice(slice, SHN_NAME_MARKER) {
                return index;
            }
        }
    }
    0
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() || haystack.len() < needle.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| window == needle)
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

    fn push_shdr64(
        data: &mut Vec<u8>,
        sh_name: u32,
        sh_type: u32,
        sh_flags: u64,
        sh_offset: u64,
        sh_size: u64,
    ) {
        data.extend_from_slice(&sh_name.to_le_bytes());
        data.extend_from_slice(&sh_type.to_le_bytes());
        data.extend_from_slice(&sh_flags.to_le_bytes());
        data.extend_from_slice(&0u64.to_le_bytes()); // sh_addr
        data.extend_from_slice(&sh_offset.to_le_bytes());
        data.extend_from_slice(&sh_size.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes()); // sh_link
        data.extend_from_slice(&0u32.to_le_bytes()); // sh_info
        data.extend_from_slice(&1u64.to_le_bytes()); // sh_addralign
        data.extend_from_slice(&0u64.to_le_bytes()); // sh_entsize
    }

    fn stripped_amd64_file() -> Vec<u8> {
        let mut data = vec![0u8; 0x40];
        data[0..4].copy_from_slice(&layout::ELF_MAGIC);
        data[4] = 2;
        data[5] = 1;
        data[6] = 1;
        data[elf64::E_VERSION..elf64::E_VERSION + 4].copy_from_slice(&1u32.to_le_bytes());
        data[elf64::E_MACHINE..elf64::E_MACHINE + 2].copy_from_slice(&62u16.to_le_bytes());
        data[elf64::E_PHOFF..elf64::E_PHOFF + 8].copy_from_slice(&0x40u64.to_le_bytes());
        data[elf64::E_PHENTSIZE..elf64::E_PHENTSIZE + 2].copy_from_slice(&56u16.to_le_bytes());

        let shstrtab_contents = b"\0.shstrtab\0.text\0";
        let shstrtab_off = data.len();
        data.extend_from_slice(shstrtab_contents);

        let shoff = data.len();
        push_shdr64(&mut data, 0, 0, 0, 0, 0); // null entry, all zero
        push_shdr64(&mut data, 11, SHT_PROGBITS, 6, shstrtab_off as u64 + 20, 0x100); // plausible PROGBITS
        push_shdr64(&mut data, 1, SHT_STRTAB, 0, shstrtab_off as u64, shstrtab_contents.len() as u64);

        let _ = shoff;
        data
    }

    #[test]
    fn discovers_stripped_section_table() {
        let data = stripped_amd64_file();
        let identity = amd64_identity();
        let mut header = crate::header::build_clone(&data, &identity).unwrap();
        let table = build_rebuild(&data, &mut header, identity.endian);
        assert_eq!(table.len(), 3);
        assert_eq!(header.e_shnum(identity.endian), 3);
        assert_eq!(header.e_shstrndx(identity.endian), 2);
    }

    #[test]
    fn implausible_flags_reject_candidate() {
        let mut data = stripped_amd64_file();
        let shoff = data.len() - 3 * elf64::shdr::ENTRY_SIZE;
        let flags_off = shoff + elf64::shdr::ENTRY_SIZE + elf64::shdr::SH_FLAGS;
        data[flags_off..flags_off + 8].copy_from_slice(&0xDEAD_BEEFu64.to_le_bytes());

        let identity = amd64_identity();
        let mut header = crate::header::build_clone(&data, &identity).unwrap();
        let table = build_rebuild(&data, &mut header, identity.endian);
        assert!(table.is_empty(), "implausible sh_flags must reject the only candidate");
    }

    #[test]
    fn plausible_flags_helper() {
        assert!(is_plausible_flags(0));
        assert!(is_plausible_flags(7));
        assert!(!is_plausible_flags(8));
        assert!(is_plausible_flags(0xF000_0003));
        assert!(!is_plausible_flags(0xF000_0008));
    }
}
