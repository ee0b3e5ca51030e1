//! The `mirror` subcommand

use crate::utils::{chain, confirm};
use amigamod::{
    interrupt::Interrupt,
    mirror::{
        Entry, FtpConnector, Mirror, MirrorConfig, RetryPolicy, DEFAULT_BASE_PATH,
        DEFAULT_DOWNLOAD_DIR, DEFAULT_HOST, DEFAULT_PARALLEL, DEFAULT_PROGRESS_FILE,
    },
};
use anyhow::{bail, ensure, Context, Result};
use clap::Args;
use colored::Colorize;
use humantime::parse_duration;
use std::path::PathBuf;
use tracing::info;

/// The number of entries shown from either end of the list before downloading
const PREVIEW: usize = 5;

/// Arguments for the `mirror` subcommand
#[derive(Args, Debug)]
#[clap(
    author,
    version,
    about = "Mirror the .lha files on an FTP server, sorted by author",
    long_about = "Mirror walks a folder on an anonymous FTP server and downloads every .lha file in it to <download-dir>/<author>/<file>, where the author is the folder the file lives in.\n\nThe list of files and which of them are done is kept in a checkpoint file. Run the command again after an interruption to pick up where it left off, partial files included."
)]
pub struct MirrorArgs {
    /// The FTP server to connect to
    #[clap(long, env = "AMIGAMOD_FTP_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// The FTP control port
    #[clap(long, default_value = "21")]
    port: u16,

    /// The remote folder to mirror
    #[clap(long, default_value = DEFAULT_BASE_PATH)]
    base_path: String,

    /// The local folder to download into
    #[clap(short, long, default_value = DEFAULT_DOWNLOAD_DIR)]
    download_dir: PathBuf,

    /// The checkpoint file keeping track of the file list and finished downloads
    #[clap(long, default_value = DEFAULT_PROGRESS_FILE)]
    progress_file: PathBuf,

    /// The number of simultaneous downloads
    #[clap(short, long, default_value_t = DEFAULT_PARALLEL)]
    parallel: usize,

    /// The number of attempts per file before giving up on it
    #[clap(long, default_value = "3")]
    retries: u32,

    /// The connection timeout, e.g. "30s"
    #[clap(long, default_value = "30s")]
    timeout: String,

    /// Answer yes to every question
    #[clap(short, long)]
    yes: bool,

    /// Walk the server again, even if a checkpoint exists
    #[clap(long)]
    recollect: bool,
}

impl MirrorArgs {
    fn config(&self) -> Result<MirrorConfig> {
        ensure!(self.parallel > 0, "At least one download must run at a time");
        ensure!(self.retries > 0, "At least one attempt must be made per file");

        Ok(MirrorConfig {
            base_path: self.base_path.clone(),
            download_dir: self.download_dir.clone(),
            progress_file: self.progress_file.clone(),
            parallel: self.parallel,
            retry: RetryPolicy {
                attempts: self.retries,
                ..RetryPolicy::default()
            },
        })
    }

    fn ask(&self, question: &str) -> Result<bool> {
        if self.yes {
            return Ok(true);
        }

        confirm(question)
    }
}

/// Mirror the .lha files on an FTP server, sorted by author
pub fn mirror(args: MirrorArgs) -> Result<()> {
    let timeout = parse_duration(&args.timeout).context("Invalid timeout string")?;
    let connector = FtpConnector::new(args.host.clone(), timeout).port(args.port);

    let interrupt = Interrupt::new();
    let mirror = Mirror::new(connector, args.config()?, interrupt.clone());

    let cached = match mirror.load().context("Could not read the checkpoint")? {
        Some(progress) if !args.recollect => {
            println!(
                "Cached list found with {} files.",
                progress.entries().len()
            );
            // Only --recollect walks the server again in unattended runs
            if !args.yes && confirm("Recollect file list?")? {
                None
            } else {
                Some(progress)
            }
        }
        _ => None,
    };

    let progress = match cached {
        Some(progress) => progress,
        None => {
            info!("Collecting list of files to download...");
            let progress = mirror
                .collect()
                .with_context(|| format!("Could not collect the file list from {}", args.host))?;
            info!("Found {} files to download.", progress.entries().len());
            progress
        }
    };

    println!("Total files to download: {}", progress.entries().len());
    print_preview(progress.entries());

    if !args.ask("Proceed with download?")? {
        println!("Download cancelled.");
        return Ok(());
    }

    if progress.pending().is_empty() {
        println!("All files already downloaded.");
        return Ok(());
    }

    interrupt
        .watch()
        .context("Could not install the Ctrl-C handler")?;

    let outcome = mirror.download(progress).context("Could not download the files")?;

    if outcome.interrupted {
        println!("Download paused. Run the script again to resume.");
        return Ok(());
    }

    if !outcome.failures.is_empty() {
        for (entry, err) in &outcome.failures {
            println!("{} {}", "Failed".red(), entry.remote_path);
            println!("  {}", chain(err));
        }

        bail!(
            "{} file(s) could not be downloaded, run again to retry them",
            outcome.failures.len()
        );
    }

    println!("Download completed.");
    Ok(())
}

fn print_preview(entries: &[Entry]) {
    if entries.is_empty() {
        return;
    }

    println!("Examples:");
    for entry in preview(entries) {
        println!("- {} -> {}", entry.remote_path, entry.local_path.display());
    }
}

/// The first and last few entries, without repeating any when the list is short
fn preview(entries: &[Entry]) -> impl Iterator<Item = &Entry> {
    let head = entries.len().min(PREVIEW);
    let tail = entries.len().saturating_sub(PREVIEW).max(head);

    entries[..head].iter().chain(entries[tail..].iter())
}
