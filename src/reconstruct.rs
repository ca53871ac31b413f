//! Reconstructor: assembles the final byte stream from a constructed
//! header, program header table, and section header table, filling the
//! gaps between them from the original buffer. The gap-fill offsets
//! (`e_phoff`, `e_shoff`) are decoded in the inferred endianness rather
//! than a hardcoded byte order (see `DESIGN.md`).

use crate::endian::Endian;
use crate::header::Header;
use crate::phdr::Phdr;
use crate::shdr::Shdr;

/// `header_bytes | gap-to-phoff | phdr_bytes | gap-to-shoff | shdr_bytes | remainder`.
///
/// Gaps are copied verbatim from `data` at their original offsets, so any
/// payload living between the tables survives untouched. When a boundary
/// has already been passed (e.g. `e_shoff` lies before the end of the
/// program header table because the file is unusual), the gap is simply
/// empty rather than going backwards.
pub fn reconstruct(data: &[u8], header: &Header, phdrs: &[Phdr], shdrs: &[Shdr], endian: Endian) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());

    let header_bytes = header.to_bytes();
    out.extend_from_slice(&header_bytes);

    let e_phoff = header.e_phoff(endian) as usize;
    copy_gap(&mut out, data, out.len(), e_phoff);

    let phentsize = header.e_phentsize(endian) as usize;
    for (index, entry) in phdrs.iter().enumerate() {
        let want_start = e_phoff + index * phentsize;
        pad_to(&mut out, want_start);
        out.extend_from_slice(&entry.to_bytes(endian));
    }

    let e_shoff = header.e_shoff(endian) as usize;
    copy_gap(&mut out, data, out.len(), e_shoff);

    let shentsize = header.e_shentsize(endian) as usize;
    for (index, entry) in shdrs.iter().enumerate() {
        let want_start = e_shoff + index * shentsize;
        pad_to(&mut out, want_start);
        out.extend_from_slice(&entry.to_bytes(endian));
    }

    if out.len() < data.len() {
        out.extend_from_slice(&data[out.len()..]);
    }

    out
}

/// Copy `data[from..to]` verbatim, tolerating `to <= from` (no gap) and
/// `to` beyond `data.len()` (clamped).
fn copy_gap(out: &mut Vec<u8>, data: &[u8], from: usize, to: usize) {
    if to <= from {
        return;
    }
    let end = to.min(data.len());
    if end > from {
        out.extend_from_slice(&data[from..end]);
    }
}

/// Zero-pad `out` up to `want_len` if it's currently shorter. Used when a
/// table's claimed offset lands past whatever gap-fill already produced.
fn pad_to(out: &mut Vec<u8>, want_len: usize) {
    if out.len() < want_len {
        out.resize(want_len, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::Machine;
    use crate::identity::Identity;
    use crate::layout;
    use crate::endian::Bits;

    fn amd64_identity() -> Identity {
        Identity {
            endian: Endian::Little,
            bits: Bits::B64,
            machine: Machine::Amd64,
            e_machine: 62,
        }
    }

    fn minimal_file() -> Vec<u8> {
        let mut data = vec![0u8; 0x40 + 56];
        data[0..4].copy_from_slice(&layout::ELF_MAGIC);
        data[4] = 2;
        data[5] = 1;
        data[6] = 1;
        data[layout::elf64::E_VERSION..layout::elf64::E_VERSION + 4].copy_from_slice(&1u32.to_le_bytes());
        data[layout::elf64::E_MACHINE..layout::elf64::E_MACHINE + 2].copy_from_slice(&62u16.to_le_bytes());
        data[layout::elf64::E_PHOFF..layout::elf64::E_PHOFF + 8].copy_from_slice(&0x40u64.to_le_bytes());
        data[layout::elf64::E_PHENTSIZE..layout::elf64::E_PHENTSIZE + 2].copy_from_slice(&56u16.to_le_bytes());
        data[layout::elf64::E_PHNUM..layout::elf64::E_PHNUM + 2].copy_from_slice(&1u16.to_le_bytes());
        data
    }

    #[test]
    fn clone_mode_round_trips_canonical_file() {
        let data = minimal_file();
        let identity = amd64_identity();
        let header = crate::header::build_clone(&data, &identity).unwrap();
        let phdrs = crate::phdr::build_program_header_table(&data, &header, identity.endian);
        let shdrs = crate::shdr::build_clone(&data, &header, identity.endian);
        let out = reconstruct(&data, &header, &phdrs, &shdrs, identity.endian);
        assert_eq!(out, data);
    }

    #[test]
    fn output_always_starts_with_magic() {
        let data = minimal_file();
        let identity = amd64_identity();
        let header = crate::header::build_clone(&data, &identity).unwrap();
        let out = reconstruct(&data, &header, &[], &[], identity.endian);
        assert_eq!(&out[0..4], &layout::ELF_MAGIC);
    }

    #[test]
    fn output_is_never_shorter_than_input() {
        let data = minimal_file();
        let identity = amd64_identity();
        let header = crate::header::build_clone(&data, &identity).unwrap();
        let phdrs = crate::phdr::build_program_header_table(&data, &header, identity.endian);
        let out = reconstruct(&data, &header, &phdrs, &[], identity.endian);
        assert!(out.len() >= data.len());
    }
}
