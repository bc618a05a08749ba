//! kiln - package capability discovery and artifact builds
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! Installed packages declare what they provide in an INI-like block:
//! artifact builders under `[kiln.artifacts]` and subcommands under
//! `[kiln.runtime]`. The `kiln` binary collects those declarations, builds
//! artifacts in dependency order and dispatches to whichever package
//! registered a command.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.kiln/
//! └── packages/             # default KILN_PATH
//!     └── lib1/
//!         ├── package.toml
//!         ├── entry_points.txt
//!         └── kiln_artifacts/   # generated
//! ```

pub mod builders;
pub mod cmd;
pub mod manifest;
pub mod session;

pub use session::Session;

use clap::{Arg, ArgAction, Command};

/// Level used when neither `-v` nor `-q` is given.
const BASE_LEVEL: usize = 2;

const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// The top-level parser, before any package commands are mounted.
pub fn root_command() -> Command {
    Command::new("kiln")
        .version(env!("KILN_VERSION"))
        .about("kiln - build artifacts and run commands declared by installed packages")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Be more verbose; repeat for more")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Be less verbose; repeat for less")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            Arg::new("versions")
                .long("versions")
                .help("Print the package providing each command and exit")
                .action(ArgAction::SetTrue),
        )
}

/// Count `-v` and `-q` occurrences ahead of parsing, so logging is set up
/// before packages are scanned.
pub fn count_verbosity<S: AsRef<str>>(args: &[S]) -> (usize, usize) {
    let mut verbose = 0;
    let mut quiet = 0;

    for arg in args.iter().skip(1).map(AsRef::as_ref) {
        match arg {
            "--" => break,
            "--verbose" => verbose += 1,
            "--quiet" => quiet += 1,
            short if short.len() > 1 && short.starts_with('-') && !short.starts_with("--") => {
                let flags = &short[1..];
                if flags.chars().all(|c| c == 'v' || c == 'q') {
                    verbose += flags.matches('v').count();
                    quiet += flags.matches('q').count();
                }
            }
            _ => {}
        }
    }

    (verbose, quiet)
}

/// Filter directive for the given counts. Each `-v` and `-q` cancel out;
/// the result is clamped to `off..=trace`.
pub fn log_level(verbose: usize, quiet: usize) -> &'static str {
    let idx = (BASE_LEVEL + verbose).saturating_sub(quiet);
    LEVELS[idx.min(LEVELS.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_verbosity() {
        assert_eq!(count_verbosity(&["kiln", "-vv", "build", "-q"]), (2, 1));
        assert_eq!(count_verbosity(&["kiln", "--verbose", "-vq"]), (2, 1));
        assert_eq!(count_verbosity(&["kiln", "build", "--", "-v"]), (0, 0));
        assert_eq!(count_verbosity(&["kiln", "-x", "-"]), (0, 0));
    }

    #[test]
    fn test_log_level_clamps() {
        assert_eq!(log_level(0, 0), "warn");
        assert_eq!(log_level(1, 0), "info");
        assert_eq!(log_level(2, 1), "info");
        assert_eq!(log_level(9, 0), "trace");
        assert_eq!(log_level(0, 9), "off");
        assert_eq!(log_level(1, 1), "warn");
    }

    #[test]
    fn test_root_command_is_valid() {
        root_command().debug_assert();
    }
}
