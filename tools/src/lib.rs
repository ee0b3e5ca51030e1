//! # Amiga Music Tools
//!
//! Amiga game music lives on in huge collections of tracker modules, usually packed as one
//! `.lha` archive per game or composer. This crate provides a command-line utility for turning
//! those archives into something a modern music player understands, listening to them directly,
//! and mirroring them from an FTP server in the first place.
//!
//! Everything is done by external programs: `lha` for extraction, [uade123](https://zakalwe.fi/uade/)
//! for decoding and playback, and `lame` for MP3 encoding. They need to be on the `PATH`, or
//! passed with `--lha`, `--uade` and `--lame` (or the `AMIGAMOD_LHA`, `AMIGAMOD_UADE` and
//! `AMIGAMOD_LAME` environment variables). Log output can be tuned with `RUST_LOG`.
//!
//! ## Convert
//!
//! ```console
//! amigamod-tools-convert 0.1.0
//! Convert every subsong in a set of .lha archives to MP3, next to the archive
//!
//! USAGE:
//!     amigamod-tools convert [OPTIONS] <PATHS>...
//!
//! ARGS:
//!     <PATHS>...    Folders containing .lha files, or individual .lha files
//!
//! OPTIONS:
//!     -h, --help                 Print help information
//!     -j, --jobs <JOBS>          The number of archives to convert at the same time
//!         --lame <LAME>          The LAME encoder to use [env: AMIGAMOD_LAME=] [default: lame]
//!         --lha <LHA>            The LHA extractor to use [env: AMIGAMOD_LHA=] [default: lha]
//!         --uade <UADE>          The uade123 player to use [env: AMIGAMOD_UADE=] [default: uade123]
//!     -V, --quality <QUALITY>    LAME's VBR quality, from 0 (best) to 9 (smallest) [default: 2]
//! ```
//!
//! ### Example
//!
//! ```console
//! 4ntler@mbp > amigamod-tools convert ~/music
//! File: mdat.turrican has 3 subsongs
//! Converting: mdat.turrican (subsong 1) to /home/4ntler/music/Huelsbeck/Turrican_1.mp3
//! Converting: mdat.turrican (subsong 2) to /home/4ntler/music/Huelsbeck/Turrican_2.mp3
//! Converting: mdat.turrican (subsong 3) to /home/4ntler/music/Huelsbeck/Turrican_3.mp3
//! 3 converted, 0 skipped, 0 failed
//! ```
//!
//! ## Encode
//!
//! Like `convert`, but only looks at the archives directly inside the given folders, and names
//! the MP3s after the module instead of the archive.
//!
//! ```console
//! 4ntler@mbp > amigamod-tools encode ~/music/Huelsbeck -o ~/mp3
//! File: mdat.turrican has 2 subsongs
//! Converting: mdat.turrican (subsong 1) to /home/4ntler/mp3/Turrican_Title_sub1.mp3
//! Converting: mdat.turrican (subsong 2) to /home/4ntler/mp3/Turrican_Title_sub2.mp3
//! 2 converted, 0 skipped, 0 failed
//! ```
//!
//! ## Play
//!
//! ```console
//! 4ntler@mbp > amigamod-tools play ~/music/Huelsbeck
//! File: mdat.turrican has 2 subsongs
//! Playing: Turrican Title (subsong 1)
//! ^CCtrl-C captured, exiting nicely...
//! ```
//!
//! ## Mirror
//!
//! ```console
//! amigamod-tools-mirror 0.1.0
//! Mirror the .lha files on an FTP server, sorted by author
//!
//! USAGE:
//!     amigamod-tools mirror [OPTIONS]
//!
//! OPTIONS:
//!         --base-path <BASE_PATH>            The remote folder to mirror
//!     -d, --download-dir <DOWNLOAD_DIR>      The local folder to download into
//!     -h, --help                             Print help information
//!         --host <HOST>                      The FTP server to connect to
//!     -p, --parallel <PARALLEL>              The number of simultaneous downloads [default: 3]
//!         --port <PORT>                      The FTP control port [default: 21]
//!         --progress-file <PROGRESS_FILE>    The checkpoint file [default: progress.json]
//!         --recollect                        Walk the server again, even if a checkpoint exists
//!         --retries <RETRIES>                The number of attempts per file [default: 3]
//!         --timeout <TIMEOUT>                The connection timeout, e.g. "30s" [default: 30s]
//!     -y, --yes                              Answer yes to every question
//! ```
//!
//! ### Example
//!
//! ```console
//! 4ntler@mbp > amigamod-tools mirror
//! Cached list found with 6123 files.
//! Recollect file list? (yes/no): no
//! Total files to download: 6123
//! Examples:
//! - /pub/exotica/media/audio/UnExoticA/Game/Huelsbeck/Turrican.lha -> amiga_music_by_author/Huelsbeck/Turrican.lha
//! ...
//! Proceed with download? (yes/no): yes
//! ```

pub mod convert;
pub mod encode;
pub mod mirror;
pub mod play;
pub(crate) mod utils;

pub use utils::init_logging;
