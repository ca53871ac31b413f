use std::fs;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use log::{debug, info};
use memmap2::MmapOptions;

use lepton_forensics::logging;
use lepton_forensics::{ElfFile, LeptonError};

/// Forensic ELF parser and reconstructor for damaged, stripped, or
/// adversarial binaries.
#[derive(Parser)]
#[clap(version)]
struct Cli {
    /// Path to the input file.
    path: PathBuf,

    /// Use rebuild mode (canonical reconstruction) instead of clone mode.
    #[clap(long)]
    rebuild: bool,

    /// Write the reconstructed file here.
    #[clap(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Write any embedded ELF candidates into this directory.
    #[clap(long = "extract-embedded")]
    extract_embedded: Option<PathBuf>,

    /// Print a shell completion script for the given shell and exit.
    #[clap(long = "generate-completions", arg_enum)]
    generate_completions: Option<Shell>,
}

fn main() -> Result<(), LeptonError> {
    logging::init_logging();

    let cli = Cli::parse();

    if let Some(shell) = cli.generate_completions {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
        return Ok(());
    }

    let expanded_path = shellexpand::tilde(&cli.path.to_string_lossy()).into_owned();
    let file = fs::File::open(&expanded_path)?;
    let mmap = unsafe { MmapOptions::new().map(&file)? };

    info!("analyzing {} ({} bytes)", cli.path.display(), mmap.len());
    let elf = ElfFile::analyze(&mmap, cli.rebuild)?;

    println!("architecture: {:?}", elf.identity().machine);
    println!("endianness:   {:?}", elf.identity().endian);
    println!("bitness:      {:?}", elf.identity().bits);
    println!("program headers: {}", elf.program_headers().len());
    println!("section headers: {}", elf.section_headers().len());
    println!("embedded ELF candidates: {}", elf.embedded_elves().len());

    if let Some(output) = cli.output {
        let rebuilt = elf.reconstruct();
        debug!("writing {} reconstructed bytes to {}", rebuilt.len(), output.display());
        fs::write(&output, rebuilt)?;
        println!("wrote reconstructed file to {}", output.display());
    }

    if let Some(dir) = cli.extract_embedded {
        fs::create_dir_all(&dir)?;
        for embedded in elf.embedded_elves() {
            let name = format!("embedded_{:#x}.elf", embedded.offset);
            let path = dir.join(name);
            debug!("writing {} bytes to {}", embedded.bytes.len(), path.display());
            fs::write(&path, &embedded.bytes)?;
        }
        println!("extracted {} embedded candidate(s) to {}", elf.embedded_elves().len(), dir.display());
    }

    Ok(())
}
