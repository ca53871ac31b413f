pub mod arch;
pub mod embedded;
pub mod endian;
pub mod error;
pub mod facade;
pub mod header;
pub mod identity;
pub mod layout;
pub mod phdr;
pub mod reconstruct;
pub mod shdr;

#[cfg(feature = "cli")]
pub mod logging;

pub use crate::embedded::EmbeddedElf;
pub use crate::error::LeptonError;
pub use crate::facade::ElfFile;
