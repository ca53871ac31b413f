//! Embedded-ELF Scanner: finds ELF-magic occurrences inside the payload
//! that plausibly belong to a different, nested binary rather than
//! incidental byte noise. A candidate passes two filters: an all-zero
//! `EI_PAD` and an `e_machine` match against the parent.

use crate::layout::{self, ident};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedElf {
    pub bytes: Vec<u8>,
    pub offset: usize,
}

/// Every offset `> 0` where the ELF magic recurs, filtered to candidates
/// whose `EI_PAD` is all zero and whose `e_machine` matches `parent_e_machine`,
/// sorted ascending and sliced non-overlapping against each other (and the
/// end of the buffer).
pub fn scan(data: &[u8], parent_e_machine: u16) -> Vec<EmbeddedElf> {
    let mut offsets = find_magic_offsets(data);
    offsets.retain(|&offset| is_plausible_candidate(data, offset, parent_e_machine));
    offsets.sort_unstable();

    let mut out = Vec::with_capacity(offsets.len());
    for (i, &offset) in offsets.iter().enumerate() {
        let end = offsets.get(i + 1).copied().unwrap_or(data.len());
        out.push(EmbeddedElf {
            bytes: data[offset..end].to_vec(),
            offset,
        });
    }
    out
}

fn find_magic_offsets(data: &[u8]) -> Vec<usize> {
    if data.len() < 4 {
        return Vec::new();
    }
    (1..=data.len() - 4)
        .filter(|&offset| data[offset..offset + 4] == layout::ELF_MAGIC)
        .collect()
}

fn is_plausible_candidate(data: &[u8], offset: usize, parent_e_machine: u16) -> bool {
    let pad_start = offset + ident::EI_PAD;
    let pad_end = pad_start + ident::EI_PAD_LEN;
    let Some(pad) = data.get(pad_start..pad_end) else {
        return false;
    };
    if !pad.iter().all(|&b| b == 0) {
        return false;
    }

    let machine_start = offset + layout::E_MACHINE;
    let machine_end = machine_start + layout::E_MACHINE_LEN;
    let Some(machine_bytes) = data.get(machine_start..machine_end) else {
        return false;
    };
    let le = u16::from_le_bytes(machine_bytes.try_into().unwrap());
    let be = u16::from_be_bytes(machine_bytes.try_into().unwrap());
    le == parent_e_machine || be == parent_e_machine
}
