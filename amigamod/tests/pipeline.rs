//! Drives the conversion pipeline end-to-end, with shell scripts standing in for `lha`,
//! `uade123` and `lame`.

#![cfg(unix)]

use amigamod::{
    convert::{ConvertError, Converter, Naming},
    discover::{DiscoverOptions, find_archives},
    interrupt::Interrupt,
    naming::ModuleNaming,
    play::Player,
    toolchain::{PlayOutcome, ToolError, Toolchain},
};
use anyhow::Result;
use std::{
    fs::{self, Permissions},
    os::unix::fs::PermissionsExt,
    path::Path,
    sync::OnceLock,
    thread,
    time::{Duration, Instant},
};
use tempfile::{TempDir, tempdir};

const LHA: &str = r#"#!/bin/sh
dest="${1#xw=}"
mkdir -p "$dest/sub"
printf 'module' > "$dest/song.mod"
printf 'intro' > "$dest/sub/intro.mod"
printf 'text' > "$dest/readme.txt"
"#;

const UADE: &str = r#"#!/bin/sh
if [ "$1" = "--get-info" ]; then
  case "$2" in
    *song.mod) printf 'modulename: Main Theme\nsubsongs: cur 1 min 1 max 2\n' ;;
    *intro.mod) printf 'modulename:\nsubsongs: cur 1 min 1 max 1\n' ;;
    *) exit 1 ;;
  esac
  exit 0
fi
if [ "$1" = "-f" ]; then
  printf 'pcm-%s' "$6"
fi
"#;

// Rejects the main song, so only the intro is playable
const UADE_INTRO_ONLY: &str = r#"#!/bin/sh
case "$2" in *song.mod) exit 1 ;; esac
exec "$(dirname "$0")/uade123" "$@"
"#;

const LAME: &str = r#"#!/bin/sh
for last; do :; done
cat > "$last"
"#;

// Writes the output, then fails for anything from an archive called "Bad ..."
const LAME_FAILS_BAD: &str = r#"#!/bin/sh
for last; do :; done
cat > "$last"
case "$last" in *Bad*) exit 1 ;; esac
"#;

const LAME_HANGS: &str = r#"#!/bin/sh
exec sleep 30
"#;

const UADE_CANNOT_DECODE: &str = r#"#!/bin/sh
if [ "$1" = "-f" ]; then exit 1; fi
exec "$(dirname "$0")/uade123" "$@"
"#;

// Logs every subsong it is asked to play, and fails on the main song
const UADE_PLAY_LOG: &str = r#"#!/bin/sh
if [ "$1" = "-s" ]; then
  echo "$2 $(basename "$3")" >> "$(dirname "$0")/played.log"
  case "$3" in *song.mod) exit 1 ;; esac
  exit 0
fi
exec "$(dirname "$0")/uade123" "$@"
"#;

const UADE_PLAY_HANGS: &str = r#"#!/bin/sh
if [ "$1" = "-s" ]; then exec sleep 30; fi
exec "$(dirname "$0")/uade123" "$@"
"#;

// Every test shares one set of scripts, written before anything is spawned, so no script is
// still open for writing when another thread executes it
fn scripts() -> &'static Path {
    static TOOLS: OnceLock<TempDir> = OnceLock::new();

    let dir = TOOLS.get_or_init(|| {
        let dir = tempdir().unwrap();
        let scripts = [
            ("lha", LHA),
            ("uade123", UADE),
            ("uade-intro-only", UADE_INTRO_ONLY),
            ("lame", LAME),
            ("lame-fails-bad", LAME_FAILS_BAD),
            ("lame-hangs", LAME_HANGS),
            ("uade-cannot-decode", UADE_CANNOT_DECODE),
            ("uade-play-log", UADE_PLAY_LOG),
            ("uade-play-hangs", UADE_PLAY_HANGS),
        ];

        for (name, script) in scripts {
            let path = dir.path().join(name);
            fs::write(&path, script).unwrap();
            fs::set_permissions(&path, Permissions::from_mode(0o755)).unwrap();
        }
        dir
    });

    dir.path()
}

fn toolchain() -> Toolchain {
    let dir = scripts();

    Toolchain {
        lha: dir.join("lha"),
        uade: dir.join("uade123"),
        lame: dir.join("lame"),
        ..Toolchain::default()
    }
}

fn archive(folder: &Path, name: &str) -> Result<()> {
    fs::create_dir_all(folder)?;
    fs::write(folder.join(name), b"-lh5-")?;
    Ok(())
}

#[test]
fn converts_next_to_the_archive() -> Result<()> {
    let dir = tempdir()?;
    let music = dir.path().join("music");
    archive(&music, "Game Name.lha")?;
    archive(&music.join("old-skipthis"), "Ignored.lha")?;

    let archives = find_archives([&music], &DiscoverOptions::recursive())?;
    assert_eq!(archives, vec![music.join("Game Name.lha")]);

    let converter = Converter::new(toolchain(), Naming::Archive, Interrupt::new());
    let summary = converter.run(&archives, Some(2))?;

    assert!(summary.is_success());
    assert_eq!(summary.converted, 3);
    assert_eq!(fs::read_to_string(music.join("Game_Name_1.mp3"))?, "pcm-1");
    assert_eq!(fs::read_to_string(music.join("Game_Name_2.mp3"))?, "pcm-2");
    assert_eq!(fs::read_to_string(music.join("Game_Name_3.mp3"))?, "pcm-1");
    assert!(!music.join("old-skipthis/Ignored_1.mp3").exists());

    // A second run finds everything already converted
    let summary = converter.run(&archives, Some(2))?;
    assert_eq!(summary.converted, 0);
    assert_eq!(summary.skipped, 3);

    Ok(())
}

#[test]
fn converts_by_module_name() -> Result<()> {
    let dir = tempdir()?;
    archive(dir.path(), "game.lha")?;
    let output = dir.path().join("out");
    fs::create_dir_all(&output)?;

    let archives = find_archives([dir.path()], &DiscoverOptions::flat())?;
    let converter = Converter::new(
        toolchain(),
        Naming::Module(ModuleNaming::new(&output)),
        Interrupt::new(),
    )
    .stop_on_error(true);

    let summary = converter.run(&archives, None)?;

    assert!(summary.is_success());
    assert_eq!(fs::read_to_string(output.join("Main_Theme_sub1.mp3"))?, "pcm-1");
    assert_eq!(fs::read_to_string(output.join("Main_Theme_sub2.mp3"))?, "pcm-2");
    assert_eq!(fs::read_to_string(output.join("intromod.mp3"))?, "pcm-1");

    Ok(())
}

#[test]
fn single_song_archive_keeps_its_name() -> Result<()> {
    let dir = tempdir()?;
    archive(dir.path(), "Solo.lha")?;

    let solo = Toolchain {
        uade: scripts().join("uade-intro-only"),
        ..toolchain()
    };

    let converter = Converter::new(solo, Naming::Archive, Interrupt::new());
    let report = converter.convert_archive(&dir.path().join("Solo.lha"))?;

    assert_eq!(report.converted, 1);
    assert_eq!(fs::read_to_string(dir.path().join("Solo.mp3"))?, "pcm-1");

    Ok(())
}

#[test]
fn failed_songs_are_removed_and_the_batch_continues() -> Result<()> {
    let dir = tempdir()?;
    archive(dir.path(), "Bad Game.lha")?;
    archive(dir.path(), "Good.lha")?;

    let tools = Toolchain {
        lame: scripts().join("lame-fails-bad"),
        ..toolchain()
    };

    let archives = find_archives([dir.path()], &DiscoverOptions::flat())?;
    let converter = Converter::new(tools, Naming::Archive, Interrupt::new());
    let summary = converter.run(&archives, Some(2))?;

    assert!(!summary.is_success());
    assert!(summary.failures.is_empty());
    assert_eq!(summary.failed, 3);
    assert_eq!(summary.converted, 3);

    for n in 1..=3 {
        assert!(!dir.path().join(format!("Bad_Game_{n}.mp3")).exists());
        assert!(dir.path().join(format!("Good_{n}.mp3")).exists());
    }

    Ok(())
}

#[test]
fn stop_on_error_fails_only_that_archive() -> Result<()> {
    let dir = tempdir()?;
    archive(dir.path(), "Bad Game.lha")?;
    archive(dir.path(), "Good.lha")?;

    let tools = Toolchain {
        lame: scripts().join("lame-fails-bad"),
        ..toolchain()
    };

    let archives = find_archives([dir.path()], &DiscoverOptions::flat())?;
    let converter = Converter::new(tools, Naming::Archive, Interrupt::new()).stop_on_error(true);
    let summary = converter.run(&archives, Some(2))?;

    assert_eq!(summary.failures.len(), 1);
    let (failed, err) = &summary.failures[0];
    assert_eq!(failed, &dir.path().join("Bad Game.lha"));
    assert!(matches!(err, ConvertError::Encode { .. }));

    assert_eq!(summary.converted, 3);
    assert!(!dir.path().join("Bad_Game_1.mp3").exists());
    assert!(!dir.path().join("Bad_Game_2.mp3").exists());
    assert!(dir.path().join("Good_3.mp3").exists());

    Ok(())
}

#[test]
fn failed_decoder_stops_the_encoder() -> Result<()> {
    let dir = tempdir()?;
    let module = dir.path().join("song.mod");
    fs::write(&module, b"module")?;

    let tools = Toolchain {
        uade: scripts().join("uade-cannot-decode"),
        lame: scripts().join("lame-hangs"),
        ..toolchain()
    };

    let start = Instant::now();
    let err = tools
        .encode(&module, 1, &dir.path().join("song.mp3"))
        .unwrap_err();

    assert!(start.elapsed() < Duration::from_secs(10));
    match err {
        ToolError::Status { program, .. } => assert!(program.ends_with("uade-cannot-decode")),
        other => panic!("unexpected error: {other}"),
    }

    Ok(())
}

#[test]
fn unplayable_module_is_skipped() -> Result<()> {
    let dir = tempdir()?;
    archive(dir.path(), "game.lha")?;

    let tools = Toolchain {
        uade: scripts().join("uade-play-log"),
        ..toolchain()
    };

    let player = Player::new(tools, Interrupt::new());
    let outcome = player.play_all([dir.path().join("game.lha")])?;
    assert_eq!(outcome, PlayOutcome::Finished);

    // The second subsong of the failing module is never attempted
    let played = fs::read_to_string(scripts().join("played.log"))?;
    assert_eq!(played, "1 song.mod\n1 intro.mod\n");

    Ok(())
}

#[test]
fn ctrl_c_stops_playback() -> Result<()> {
    let dir = tempdir()?;
    archive(dir.path(), "game.lha")?;

    let tools = Toolchain {
        uade: scripts().join("uade-play-hangs"),
        ..toolchain()
    };

    let interrupt = Interrupt::new();
    let player = Player::new(tools, interrupt.clone());

    let start = Instant::now();
    let ctrl_c = thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        interrupt.trigger();
    });

    let outcome = player.play_all([dir.path().join("game.lha")])?;
    ctrl_c.join().unwrap();

    assert_eq!(outcome, PlayOutcome::Interrupted);
    assert!(start.elapsed() < Duration::from_secs(10));

    Ok(())
}
