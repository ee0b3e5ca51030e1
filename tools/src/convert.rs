//! The `convert` subcommand

use crate::utils::{jobs, report, ToolArgs};
use amigamod::{
    convert::{Converter, Naming},
    discover::{find_archives, DiscoverOptions},
    interrupt::Interrupt,
};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the `convert` subcommand
#[derive(Args)]
#[clap(
    author,
    version,
    about = "Convert every subsong in a set of .lha archives to MP3, next to the archive",
    long_about = "Convert walks the given folders recursively and converts every subsong of every module it finds in .lha archives to MP3.\n\nThe MP3s are placed next to their archive, and named after it: an archive with a single song becomes <archive>.mp3, otherwise its songs are numbered <archive>_1.mp3, <archive>_2.mp3, and so on.\n\nFolders ending in -skipthis are left alone. Songs that already have a non-empty MP3 are skipped, so an interrupted run can simply be started again."
)]
pub struct ConvertArgs {
    /// Folders containing .lha files, or individual .lha files
    #[clap(required = true)]
    paths: Vec<PathBuf>,

    /// The number of archives to convert at the same time (defaults to the number of CPUs)
    #[clap(short, long)]
    jobs: Option<usize>,

    #[clap(flatten)]
    tools: ToolArgs,
}

/// Convert every subsong in a set of .lha archives to MP3, next to the archive
pub fn convert(args: ConvertArgs) -> Result<()> {
    let archives = find_archives(&args.paths, &DiscoverOptions::recursive())?;
    if archives.is_empty() {
        println!("No .lha files found");
        return Ok(());
    }

    let interrupt = Interrupt::install().context("Could not install the Ctrl-C handler")?;
    let converter = Converter::new(args.tools.toolchain()?, Naming::Archive, interrupt);
    let summary = converter
        .run(&archives, jobs(args.jobs)?)
        .context("Could not convert the archives")?;

    report(summary)
}
