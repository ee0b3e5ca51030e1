use anyhow::Result;
use clap::Parser;

use amigamod_tools::convert::{convert, ConvertArgs};
use amigamod_tools::encode::{encode, EncodeArgs};
use amigamod_tools::init_logging;
use amigamod_tools::mirror::{mirror, MirrorArgs};
use amigamod_tools::play::{play, PlayArgs};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
enum Cli {
    Convert(ConvertArgs),
    Encode(EncodeArgs),
    Play(PlayArgs),
    Mirror(MirrorArgs),
}

fn main() -> Result<()> {
    init_logging();

    match Cli::parse_from(wild::args()) {
        Cli::Convert(args) => convert(args),
        Cli::Encode(args) => encode(args),
        Cli::Play(args) => play(args),
        Cli::Mirror(args) => mirror(args),
    }
}
