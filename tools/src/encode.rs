//! The `encode` subcommand

use crate::utils::{jobs, report, ToolArgs};
use amigamod::{
    convert::{Converter, Naming},
    discover::{find_archives, DiscoverOptions},
    interrupt::Interrupt,
    naming::ModuleNaming,
};
use anyhow::{Context, Result};
use clap::Args;
use std::{env::current_dir, fs::create_dir_all, path::PathBuf};

/// Arguments for the `encode` subcommand
#[derive(Args)]
#[clap(
    author,
    version,
    about = "Encode the modules in .lha archives to MP3s named after each module",
    long_about = None
)]
pub struct EncodeArgs {
    /// Folders containing .lha files, or individual .lha files
    #[clap(required = true)]
    paths: Vec<PathBuf>,

    /// The destination folder to place the MP3s
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// The number of archives to encode at the same time (defaults to the number of CPUs)
    #[clap(short, long)]
    jobs: Option<usize>,

    #[clap(flatten)]
    tools: ToolArgs,
}

/// Encode the modules in .lha archives to MP3s named after each module
pub fn encode(args: EncodeArgs) -> Result<()> {
    let archives = find_archives(&args.paths, &DiscoverOptions::flat())?;
    if archives.is_empty() {
        println!("No .lha files found");
        return Ok(());
    }

    let folder = match args.output {
        Some(folder) => folder,
        None => current_dir().context("Could not fetch current working directory")?,
    };
    create_dir_all(&folder).context("Could not create output directory")?;

    let interrupt = Interrupt::install().context("Could not install the Ctrl-C handler")?;
    let converter = Converter::new(
        args.tools.toolchain()?,
        Naming::Module(ModuleNaming::new(folder)),
        interrupt,
    )
    .stop_on_error(true);

    let summary = converter
        .run(&archives, jobs(args.jobs)?)
        .context("Could not encode the archives")?;

    report(summary)
}
