//! The closed error sum surfaced by this crate.
//!
//! Only the five "structural" variants ever reach a caller through a
//! `Result`; `DecodeError` and `SectionTableNotFound` are used internally by
//! the section header table builder to report a non-aborting discovery
//! failure and are never returned from a public function -- `build_rebuild`
//! logs them and falls back to an empty table rather than surfacing them.
//! `Io` exists purely so the `lepton` binary can use one error type end to
//! end -- the library itself never touches the filesystem and never
//! constructs it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LeptonError {
    #[error("not an ELF file: expected magic 7F 45 4C 46, found {found:02x?}")]
    InvalidMagic { found: Vec<u8> },

    #[error("unsupported architecture: e_machine = {e_machine:#06x}")]
    UnsupportedArch { e_machine: u16 },

    #[error("could not determine endianness from e_version/EI_DATA heuristics")]
    UndeterminedEndianness,

    #[error("could not determine bitness from e_phentsize heuristics")]
    UndeterminedBitness,

    #[error(
        "rebuilt header would overlap the program header table: observed e_phoff \
         ({observed:#x}) is less than the canonical offset ({canonical:#x}) for this architecture"
    )]
    HeaderOverlap { observed: u64, canonical: u64 },

    #[error("failed to decode a fixed-width record: {reason}")]
    DecodeError { reason: String },

    #[error("no section header table candidate survived discovery")]
    SectionTableNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
