//! Utilities for working with Amiga music archives
//!
//! Large collections of Amiga tracker and chiptune modules (think [UnExoticA](https://www.exotica.org.uk/wiki/UnExoticA))
//! are distributed as `.lha` archives, one per game or author. This crate contains the glue for
//! getting music out of them: finding archives on disk, extracting them, asking
//! [UADE](https://zakalwe.fi/uade/) which subsongs a module contains, and feeding those subsongs
//! to a player or an MP3 encoder. It can also mirror an FTP archive of `.lha` files to disk,
//! resuming where a previous run left off.
//!
//! None of the heavy lifting happens in-process. Extraction is done by `lha`, decoding and
//! playback by `uade123`, encoding by `lame`, and file transfer by an FTP client. See
//! [`toolchain::Toolchain`] for how those binaries are invoked.

pub mod archive;
pub mod convert;
pub mod discover;
pub mod info;
pub mod interrupt;
pub mod mirror;
pub mod naming;
pub mod play;
pub mod toolchain;
