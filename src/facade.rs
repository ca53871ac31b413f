//! Orchestrating façade: the one call most users need. A single struct
//! built via one constructor call that stitches the lower-level pieces
//! together, returning a typed `Result`, and the only component in this
//! crate permitted to log.

use getset::Getters;
use log::{error, warn};

use crate::embedded::{self, EmbeddedElf};
use crate::endian::Endian;
use crate::error::LeptonError;
use crate::header::{self, Header};
use crate::identity::{self, Identity};
use crate::phdr::{self, Phdr};
use crate::reconstruct;
use crate::shdr::{self, Shdr};

#[derive(Getters)]
#[getset(get = "pub")]
pub struct ElfFile {
    identity: Identity,
    header: Header,
    program_headers: Vec<Phdr>,
    section_headers: Vec<Shdr>,
    #[getset(skip)]
    embedded: Vec<EmbeddedElf>,
    #[getset(skip)]
    data: Vec<u8>,
}

impl ElfFile {
    /// Runs Identity Inference, the Header Builder, both table builders,
    /// and the Embedded-ELF Scanner, in that order. `rebuild = true` uses
    /// rebuild mode for the header and section table (canonical
    /// reconstruction); `rebuild = false` clones every field byte-exact.
    pub fn analyze(data: &[u8], rebuild: bool) -> Result<ElfFile, LeptonError> {
        let identity = identity::infer(data).map_err(|err| {
            error!("identity inference failed: {err}");
            err
        })?;

        let mut header = if rebuild {
            let arch = identity.arch_values();
            match header::build_rebuild(data, &identity, &arch) {
                Ok(Some(header)) => header,
                Ok(None) => {
                    let observed = header::build_clone(data, &identity)
                        .map(|h| h.e_phoff(identity.endian))
                        .unwrap_or(0);
                    warn!(
                        "rebuilt header would overlap the program header table \
                         (observed e_phoff {observed:#x} < canonical {:#x}); aborting",
                        arch.e_phoff
                    );
                    return Err(LeptonError::HeaderOverlap {
                        observed,
                        canonical: arch.e_phoff,
                    });
                }
                Err(err) => {
                    error!("header construction failed: {err}");
                    return Err(err);
                }
            }
        } else {
            header::build_clone(data, &identity).map_err(|err| {
                error!("header construction failed: {err}");
                err
            })?
        };

        let program_headers = phdr::build_program_header_table(data, &header, identity.endian);

        let section_headers = if rebuild {
            shdr::build_rebuild(data, &mut header, identity.endian)
        } else {
            shdr::build_clone(data, &header, identity.endian)
        };

        let embedded = embedded::scan(data, identity.e_machine);

        Ok(ElfFile {
            identity,
            header,
            program_headers,
            section_headers,
            embedded,
            data: data.to_vec(),
        })
    }

    pub fn endian(&self) -> Endian {
        self.identity.endian
    }

    /// Reassembles the byte stream from the parsed records, filling gaps
    /// from the original buffer.
    pub fn reconstruct(&self) -> Vec<u8> {
        reconstruct::reconstruct(
            &self.data,
            &self.header,
            &self.program_headers,
            &self.section_headers,
            self.identity.endian,
        )
    }

    pub fn embedded_elves(&self) -> &[EmbeddedElf] {
        &self.embedded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{self, elf64};

    fn minimal_amd64_file() -> Vec<u8> {
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
        data
    }

    #[test]
    fn clone_mode_analyzes_and_round_trips() {
        let data = minimal_amd64_file();
        let elf = ElfFile::analyze(&data, false).unwrap();
        assert_eq!(elf.reconstruct(), data);
        assert!(elf.embedded_elves().is_empty());
    }

    #[test]
    fn rebuild_mode_reports_overlap() {
        let mut data = minimal_amd64_file();
        data[elf64::E_PHOFF..elf64::E_PHOFF + 8].copy_from_slice(&0x10u64.to_le_bytes());
        let err = ElfFile::analyze(&data, true).unwrap_err();
        assert!(matches!(err, LeptonError::HeaderOverlap { .. }));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut data = minimal_amd64_file();
        data[0] = 0;
        let err = ElfFile::analyze(&data, false).unwrap_err();
        assert!(matches!(err, LeptonError::InvalidMagic { .. }));
    }
}
