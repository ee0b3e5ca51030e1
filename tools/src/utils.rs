use amigamod::{convert::Summary, toolchain::Toolchain};
use anyhow::{ensure, Context, Result};
use clap::Args;
use colored::Colorize;
use std::{
    io::{stdin, stdout, Write},
    path::PathBuf,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Paths to the external programs, shared by every subcommand that extracts or decodes
#[derive(Args, Debug)]
pub struct ToolArgs {
    /// The LHA extractor to use
    #[clap(long, env = "AMIGAMOD_LHA", default_value = "lha")]
    lha: PathBuf,

    /// The uade123 player to use
    #[clap(long, env = "AMIGAMOD_UADE", default_value = "uade123")]
    uade: PathBuf,

    /// The LAME encoder to use
    #[clap(long, env = "AMIGAMOD_LAME", default_value = "lame")]
    lame: PathBuf,

    /// LAME's VBR quality, from 0 (best) to 9 (smallest)
    #[clap(short = 'V', long, default_value = "2")]
    quality: u8,
}

impl ToolArgs {
    pub fn toolchain(&self) -> Result<Toolchain> {
        ensure!(
            self.quality <= 9,
            "VBR quality must be between 0 and 9, got {}",
            self.quality
        );

        Ok(Toolchain {
            lha: self.lha.clone(),
            uade: self.uade.clone(),
            lame: self.lame.clone(),
            quality: self.quality,
        })
    }
}

/// Check a `--jobs` value, where `None` means one job per CPU
pub fn jobs(jobs: Option<usize>) -> Result<Option<usize>> {
    ensure!(jobs != Some(0), "At least one job must run at a time");
    Ok(jobs)
}

/// Log to stderr, filtered by `RUST_LOG` (`info` by default)
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Ask a yes/no question on the terminal
///
/// Only "yes" and "y" (in any casing) count as yes.
pub fn confirm(question: &str) -> Result<bool> {
    print!("{question} (yes/no): ");
    stdout().flush().context("Could not write to the terminal")?;

    let mut line = String::new();
    stdin()
        .read_line(&mut line)
        .context("Could not read terminal input")?;

    Ok(is_yes(&line))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "yes" | "y")
}

/// Print the outcome of a conversion batch, failing if anything went wrong
pub fn report(summary: Summary) -> Result<()> {
    if summary.interrupted {
        println!("Caught interrupt, terminating workers");
        std::process::exit(1);
    }

    for (archive, err) in &summary.failures {
        println!("{} {}", "Failed".red(), archive.display());
        println!("  {}", chain(err));
    }

    info!(
        "{} converted, {} skipped, {} failed",
        summary.converted.to_string().green(),
        summary.skipped,
        summary.failed.to_string().red()
    );

    ensure!(
        summary.failures.is_empty(),
        "{} archive(s) could not be converted",
        summary.failures.len()
    );

    Ok(())
}

/// Flatten an error and its sources into a single line
pub fn chain(err: &dyn std::error::Error) -> String {
    let mut line = err.to_string();
    let mut source = err.source();
    while let Some(err) = source {
        line.push_str(": ");
        line.push_str(&err.to_string());
        source = err.source();
    }

    line
}
