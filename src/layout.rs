//! Field offsets and fixed sizes for the ELF32/ELF64 header, program-header
//! entry, and section-header entry layouts.
//!
//! These constants mirror the ELF specification directly; they are not
//! inferred or heuristic, unlike most of the rest of this crate.

/// `EI_MAG0..EI_MAG3`
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Size of the `e_ident` block.
pub const EI_NIDENT: usize = 16;

pub const SHT_PROGBITS: u32 = 1;
pub const SHT_STRTAB: u32 = 3;

pub const SHN_NAME_MARKER: &[u8] = b".shstrtab";

/// Offsets within `e_ident`, identical across ELF32/ELF64.
pub mod ident {
    pub const EI_CLASS: usize = 4;
    pub const EI_DATA: usize = 5;
    pub const EI_VERSION: usize = 6;
    pub const EI_OSABI: usize = 7;
    pub const EI_ABIVERSION: usize = 8;
    pub const EI_PAD: usize = 9;
    pub const EI_PAD_LEN: usize = super::EI_NIDENT - EI_PAD;
}

/// `e_machine` lives at the same offset in both ELF32 and ELF64.
pub const E_MACHINE: usize = 0x12;
pub const E_MACHINE_LEN: usize = 2;

pub mod elf32 {
    pub const E_TYPE: usize = 0x10;
    pub const E_MACHINE: usize = 0x12;
    pub const E_VERSION: usize = 0x14;
    pub const E_ENTRY: usize = 0x18;
    pub const E_PHOFF: usize = 0x1C;
    pub const E_SHOFF: usize = 0x20;
    pub const E_FLAGS: usize = 0x24;
    pub const E_EHSIZE: usize = 0x28;
    pub const E_PHENTSIZE: usize = 0x2A;
    pub const E_PHNUM: usize = 0x2C;
    pub const E_SHENTSIZE: usize = 0x2E;
    pub const E_SHNUM: usize = 0x30;
    pub const E_SHSTRNDX: usize = 0x32;

    /// Size of the ELF32 header, i.e. the canonical `e_ehsize`/`e_phoff`.
    pub const EHDR_SIZE: usize = 0x34;

    pub mod phdr {
        pub const P_TYPE: usize = 0;
        pub const P_OFFSET: usize = 4;
        pub const P_VADDR: usize = 8;
        pub const P_PADDR: usize = 12;
        pub const P_FILESZ: usize = 16;
        pub const P_MEMSZ: usize = 20;
        pub const P_FLAGS: usize = 24;
        pub const P_ALIGN: usize = 28;
        pub const ENTRY_SIZE: usize = 32;
    }

    pub mod shdr {
        pub const SH_NAME: usize = 0;
        pub const SH_TYPE: usize = 4;
        pub const SH_FLAGS: usize = 8;
        pub const SH_ADDR: usize = 12;
        pub const SH_OFFSET: usize = 16;
        pub const SH_SIZE: usize = 20;
        pub const SH_LINK: usize = 24;
        pub const SH_INFO: usize = 28;
        pub const SH_ADDRALIGN: usize = 32;
        pub const SH_ENTSIZE: usize = 36;
        pub const ENTRY_SIZE: usize = 40;
    }
}

pub mod elf64 {
    pub const E_TYPE: usize = 0x10;
    pub const E_MACHINE: usize = 0x12;
    pub const E_VERSION: usize = 0x14;
    pub const E_ENTRY: usize = 0x18;
    pub const E_PHOFF: usize = 0x20;
    pub const E_SHOFF: usize = 0x28;
    pub const E_FLAGS: usize = 0x30;
    pub const E_EHSIZE: usize = 0x34;
    pub const E_PHENTSIZE: usize = 0x36;
    pub const E_PHNUM: usize = 0x38;
    pub const E_SHENTSIZE: usize = 0x3A;
    pub const E_SHNUM: usize = 0x3C;
    pub const E_SHSTRNDX: usize = 0x3E;

    /// Size of the ELF64 header, i.e. the canonical `e_ehsize`/`e_phoff`.
    pub const EHDR_SIZE: usize = 0x40;

    pub mod phdr {
        pub const P_TYPE: usize = 0;
        pub const P_FLAGS: usize = 4;
        pub const P_OFFSET: usize = 8;
        pub const P_VADDR: usize = 16;
        pub const P_PADDR: usize = 24;
        pub const P_FILESZ: usize = 32;
        pub const P_MEMSZ: usize = 40;
        pub const P_ALIGN: usize = 48;
        pub const ENTRY_SIZE: usize = 56;
    }

    pub mod shdr {
        pub const SH_NAME: usize = 0;
        pub const SH_TYPE: usize = 4;
        pub const SH_FLAGS: usize = 8;
        pub const SH_ADDR: usize = 16;
        pub const SH_OFFSET: usize = 24;
        pub const SH_SIZE: usize = 32;
        pub const SH_LINK: usize = 40;
        pub const SH_INFO: usize = 44;
        pub const SH_ADDRALIGN: usize = 48;
        pub const SH_ENTSIZE: usize = 56;
        pub const ENTRY_SIZE: usize = 64;
    }
}

/// `e_phentsize` as declared by a conforming ELF32 header.
pub const EXPECTED_32BIT_PHENTSIZE: u16 = 32;
/// `e_phentsize` as declared by a conforming ELF64 header.
pub const EXPECTED_64BIT_PHENTSIZE: u16 = 56;
