// Copyright (c) 2025 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Command line interface.

use crate::cddb::CddbClient;
use crate::config::CddbConfig;
use crate::disc;
use crate::output::{Output, OutputFormat};
use crate::report::{self, Outcome, ReportOptions};
use crate::Config;
use clap::{ArgAction, Parser};
use log::LevelFilter;
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::convert::Infallible;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit code used when no disc could be opened.
const EXIT_NO_DISC: u8 = 255;

/// Parse an integer the way C's `atoi` does.
///
/// Leading whitespace and an optional sign are accepted, parsing stops at the first non-digit, and
/// anything unparseable yields `0`.
#[expect(clippy::unnecessary_wraps)]
fn parse_lenient_int(value: &str) -> Result<i64, Infallible> {
    let value = value.trim_start();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let number = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |number, digit| {
            number
                .saturating_mul(10)
                .saturating_add(i64::from(digit - b'0'))
        });
    Ok(if negative { -number } else { number })
}

/// Command line Arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, disable_help_flag = true)]
struct Args {
    /// Print audio CD album info.
    #[arg(short, long)]
    album: bool,
    /// Print title info for all tracks.
    #[arg(short, long)]
    listing: bool,
    /// Use CD-TEXT.
    #[arg(short = 'T', long)]
    cdtext: bool,
    /// Use CDDB.
    #[arg(short = 'D', long)]
    cddb: bool,
    /// XML output.
    #[arg(short, long)]
    xml: bool,
    /// CDDB port number to use.
    #[arg(short = 'P', long, value_name = "INT", value_parser = parse_lenient_int, allow_hyphen_values = true)]
    cddb_port: Option<i64>,
    /// CDDB server to contact for information.
    #[arg(long, value_name = "STRING")]
    cddb_server: Option<String>,
    /// Location of CDDB cache directory.
    #[arg(long, value_name = "STRING")]
    cddb_cache: Option<String>,
    /// Email address to give CDDB server.
    #[arg(long, value_name = "STRING")]
    cddb_email: Option<String>,
    /// Disable caching of CDDB entries locally.
    #[arg(long)]
    no_cddb_cache: bool,
    /// CDDB timeout value in seconds.
    #[arg(long, value_name = "INT", value_parser = parse_lenient_int, allow_hyphen_values = true)]
    cddb_timeout: Option<i64>,
    /// CD device or CUE sheet image.
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,
    /// Path to configuration file.
    #[arg(short, long, required = false)]
    config_path: Option<PathBuf>,
    /// Show debug information.
    #[arg(short, long)]
    verbose: bool,
    /// Show this help message.
    #[arg(short = '?', long, action = ArgAction::SetTrue)]
    help: bool,
    /// Display brief usage message.
    #[arg(long)]
    usage: bool,
}

impl Args {
    /// Get the desired log level, depending on the verbose flag passed on the command line.
    fn log_level_filter(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        }
    }

    /// Configuration values given on the command line.
    fn config_overrides(&self) -> Config {
        Config {
            cddb: CddbConfig {
                server: self.cddb_server.clone(),
                port: self.cddb_port,
                cache_dir: self.cddb_cache.clone(),
                disable_cache: self.no_cddb_cache.then_some(true),
                email: self.cddb_email.clone(),
                timeout: self.cddb_timeout,
            },
        }
    }

    /// Get the current configuration.
    fn config(&self) -> crate::Result<Config> {
        let config_path = self.config_path.clone().or_else(Config::find_config_file);
        let config = match config_path {
            Some(path) => {
                log::debug!("Loading configuration from {}", path.display());
                Config::load_from_path(path)?
            }
            None => Config::default(),
        };
        Ok(config
            .with_overrides(&self.config_overrides())
            .with_defaults()?)
    }

    /// What to report.
    fn report_options(&self) -> ReportOptions {
        ReportOptions {
            album: self.album,
            listing: self.listing,
            cdtext: self.cdtext,
            cddb: self.cddb,
        }
    }

    /// The output format.
    fn output_format(&self) -> OutputFormat {
        if self.xml {
            OutputFormat::Xml
        } else {
            OutputFormat::Plain
        }
    }
}

/// Full help text.
fn help_text(program: &str) -> String {
    format!(
        "Usage: {program} [OPTION...]
  -a, --album                     Print audio CD album info
  -l, --listing                   Print title info for all tracks
  -T, --cdtext                    Use CD-Text
  -D, --cddb                      Use CDDB
  -x, --xml                       XML output
  -i, --input=PATH                CD device or CUE sheet image to read
                                  (default: the default CD-ROM drive)

CDDB options:
  -P, --cddb-port=INT             CDDB port number to use (default 8880)
  --cddb-server=STRING            CDDB server to contact for information
                                  (default: gnudb.gnudb.org)
  --cddb-cache=STRING             Location of CDDB cache directory
                                  (default $XDG_CACHE_HOME/cdtextinfo/cddb)
  --cddb-email=STRING             Email address to give CDDB server
                                  (default me@home)
  --no-cddb-cache                 Disable caching of CDDB entries
                                  locally (default caches)
  --cddb-timeout=INT              CDDB timeout value in seconds
                                  (default 10 seconds)

Other options:
  -c, --config-path=PATH          Configuration file to use
                                  (default $XDG_CONFIG_HOME/cdtextinfo/config.toml)
  -v, --verbose                   Show debug information
  -V, --version                   Print version

Help options:
  -?, --help                      Show this help message
  --usage                         Display brief usage message

Example: {program} -xalDT
  Will query album info and track listing from both CD-Text and CDDB and display as XML
"
    )
}

/// Brief usage text.
fn usage_text(program: &str) -> String {
    format!(
        "Usage: {program} [-a|--album] [-l|--listing]
        [-T|--cdtext] [-D|--cddb] [-x|--xml] [-i|--input PATH]
        [-P|--cddb-port INT] [--cddb-server=STRING]
        [--cddb-cache=STRING] [--cddb-email=STRING]
        [--no-cddb-cache] [--cddb-timeout=INT]
        [-c|--config-path PATH] [-v|--verbose] [-V|--version]
        [-?|--help] [--usage]
"
    )
}

/// Name the program was invoked as.
fn program_name() -> String {
    std::env::args_os()
        .next()
        .map_or_else(|| env!("CARGO_PKG_NAME").to_string(), |arg| {
            arg.to_string_lossy().into_owned()
        })
}

/// Set up logging to standard error.
fn init_logging(level: LevelFilter) {
    if let Err(err) = TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize logging: {err}");
    }
}

/// Main entry point.
///
/// Returns `0` on success, `1` on configuration errors and `255` if no disc could be opened.
pub fn main() -> ExitCode {
    let args = Args::parse();

    if args.help {
        print!("{}", help_text(&program_name()));
        return ExitCode::SUCCESS;
    }
    if args.usage {
        eprint!("{}", usage_text(&program_name()));
        return ExitCode::FAILURE;
    }

    init_logging(args.log_level_filter());

    let settings = match args
        .config()
        .and_then(|config| Ok(config.cddb_settings()?))
    {
        Ok(settings) => settings,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let disc = disc::open(args.input.as_deref());
    let mut service = CddbClient::new(settings);
    let mut output = Output::new(io::stdout().lock(), args.output_format());

    match report::run(&mut output, &args.report_options(), disc, &mut service) {
        Ok(Outcome::Completed) => ExitCode::SUCCESS,
        Ok(Outcome::NoDisc) => ExitCode::from(EXIT_NO_DISC),
        Err(err) => {
            log::error!("Failed to write output: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    macro_rules! add_lenient_int_test {
        ($name:ident, $input:expr, $expected:expr) => {
            paste::paste! {
                #[test]
                fn [<test_parse_lenient_int_ $name>]() {
                    assert_eq!(parse_lenient_int($input), Ok($expected));
                }
            }
        };
    }

    add_lenient_int_test!(plain, "8880", 8880);
    add_lenient_int_test!(leading_whitespace_and_garbage, " 42abc", 42);
    add_lenient_int_test!(negative, "-3", -3);
    add_lenient_int_test!(positive_sign, "+7", 7);
    add_lenient_int_test!(garbage, "abc", 0);
    add_lenient_int_test!(empty, "", 0);
    add_lenient_int_test!(overflow, "99999999999999999999999", i64::MAX);

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("cdtextinfo").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_bundled_flags() {
        let args = parse(&["-xalDT"]);
        assert_eq!(
            args.report_options(),
            ReportOptions {
                album: true,
                listing: true,
                cdtext: true,
                cddb: true,
            }
        );
        assert_eq!(args.output_format(), OutputFormat::Xml);
        assert_eq!(args.log_level_filter(), LevelFilter::Warn);
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.report_options(), ReportOptions::default());
        assert_eq!(args.output_format(), OutputFormat::Plain);
        assert_eq!(args.config_overrides(), Config::default());
        assert!(!args.help);
        assert!(!args.usage);
    }

    #[test]
    fn test_cddb_options() {
        let args = parse(&[
            "-P8000",
            "--cddb-server=cddb.example.org",
            "--cddb-cache",
            "~/cddb",
            "--cddb-email=user@example.org",
            "--no-cddb-cache",
            "--cddb-timeout=-1",
        ]);
        assert_eq!(
            args.config_overrides().cddb,
            CddbConfig {
                server: Some("cddb.example.org".to_string()),
                port: Some(8000),
                cache_dir: Some("~/cddb".to_string()),
                disable_cache: Some(true),
                email: Some("user@example.org".to_string()),
                timeout: Some(-1),
            }
        );
    }

    #[test]
    fn test_lenient_port() {
        assert_eq!(parse(&["-P", "abc"]).cddb_port, Some(0));
        assert_eq!(parse(&["--cddb-port", "-3"]).cddb_port, Some(-3));
        assert_eq!(parse(&["--cddb-timeout", "5s"]).cddb_timeout, Some(5));
    }

    #[test]
    fn test_help_and_usage() {
        assert!(parse(&["-?"]).help);
        assert!(parse(&["--help"]).help);
        assert!(parse(&["--usage"]).usage);
    }

    #[test]
    fn test_input_and_verbose() {
        let args = parse(&["-v", "-i", "album.cue"]);
        assert_eq!(args.input, Some(PathBuf::from("album.cue")));
        assert_eq!(args.log_level_filter(), LevelFilter::Debug);
    }

    #[test]
    fn test_invalid_arguments() {
        let err = Args::try_parse_from(["cdtextinfo", "--bogus"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);

        let err = Args::try_parse_from(["cdtextinfo", "--cddb-server"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cddb]\nserver = \"cddb.example.org\"\nport = 8000\n").unwrap();

        let path = path.to_string_lossy().into_owned();
        let config = parse(&["-c", &path, "-P", "9000"]).config().unwrap();
        assert_eq!(config.cddb.server.as_deref(), Some("cddb.example.org"));
        assert_eq!(config.cddb.port, Some(9000));
        assert_eq!(config.cddb.email.as_deref(), Some("me@home"));
    }

    #[test]
    fn test_config_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cddb\n").unwrap();

        let path = path.to_string_lossy().into_owned();
        assert!(parse(&["-c", &path]).config().is_err());

        let missing = dir.path().join("missing.toml");
        let missing = missing.to_string_lossy().into_owned();
        assert!(parse(&["-c", &missing]).config().is_err());
    }

    #[test]
    fn test_help_text() {
        let help = help_text("cdtextinfo");
        assert!(help.starts_with("Usage: cdtextinfo [OPTION...]\n"));
        assert!(help.contains("Example: cdtextinfo -xalDT\n"));
        assert!(usage_text("./cdtextinfo").starts_with("Usage: ./cdtextinfo [-a|--album]"));
    }
}
