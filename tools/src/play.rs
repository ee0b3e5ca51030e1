//! The `play` subcommand

use crate::utils::ToolArgs;
use amigamod::{
    discover::{find_archives, DiscoverOptions},
    interrupt::Interrupt,
    play::Player,
    toolchain::PlayOutcome,
};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

/// Arguments for the `play` subcommand
#[derive(Args)]
#[clap(
    author,
    version,
    about = "Play every subsong in a set of .lha archives through uade123",
    long_about = None
)]
pub struct PlayArgs {
    /// Folders containing .lha files, or individual .lha files
    #[clap(required = true)]
    paths: Vec<PathBuf>,

    #[clap(flatten)]
    tools: ToolArgs,
}

/// Play every subsong in a set of .lha archives through uade123
pub fn play(args: PlayArgs) -> Result<()> {
    let archives = find_archives(&args.paths, &DiscoverOptions::flat())?;

    let interrupt = Interrupt::install().context("Could not install the Ctrl-C handler")?;
    let player = Player::new(args.tools.toolchain()?, interrupt);

    if player.play_all(&archives).context("Playback failed")? == PlayOutcome::Interrupted {
        info!("Ctrl-C captured, exiting nicely...");
    }

    Ok(())
}
