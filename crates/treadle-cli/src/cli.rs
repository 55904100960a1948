//! Command-line definition and parameter extraction.
//!
//! `build_cli` declares the commands; the `*Params` structs pull typed
//! values back out of `ArgMatches` and convert into the command handlers'
//! argument structs.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

use crate::commands::build::BuildArgs;
use crate::commands::check::CheckArgs;

pub fn build_cli() -> Command {
    Command::new("treadle")
        .about("Compiler for the Treadle tape language")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("build")
                .about("Compile a source file to target code")
                .arg(file_arg())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("FILE")
                        .value_parser(value_parser!(PathBuf))
                        .help("Write target code here instead of stdout"),
                )
                .arg(
                    Arg::new("raw")
                        .long("raw")
                        .action(ArgAction::SetTrue)
                        .help("Skip the peephole pass on the emitted code"),
                )
                .arg(color_arg()),
        )
        .subcommand(
            Command::new("check")
                .about("Analyze a source file without emitting target code")
                .arg(file_arg())
                .arg(
                    Arg::new("strict")
                        .long("strict")
                        .action(ArgAction::SetTrue)
                        .help("Treat warnings as errors"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Emit diagnostics as JSON"),
                )
                .arg(color_arg()),
        )
}

/// Source file (positional).
fn file_arg() -> Arg {
    Arg::new("file")
        .value_name("FILE")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Source file to compile")
}

/// Color output control (--color).
fn color_arg() -> Arg {
    Arg::new("color")
        .long("color")
        .value_name("WHEN")
        .default_value("auto")
        .value_parser(["auto", "always", "never"])
        .help("Colorize output")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn should_colorize(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => std::io::stderr().is_terminal(),
        }
    }
}

fn parse_color(m: &ArgMatches) -> ColorChoice {
    match m.get_one::<String>("color").map(String::as_str) {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

pub struct BuildParams {
    pub file: PathBuf,
    pub output: Option<PathBuf>,
    pub raw: bool,
    pub color: ColorChoice,
}

impl BuildParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            file: m.get_one::<PathBuf>("file").cloned().expect("file is required"),
            output: m.get_one::<PathBuf>("output").cloned(),
            raw: m.get_flag("raw"),
            color: parse_color(m),
        }
    }
}

impl From<BuildParams> for BuildArgs {
    fn from(p: BuildParams) -> Self {
        Self {
            file: p.file,
            output: p.output,
            raw: p.raw,
            color: p.color.should_colorize(),
        }
    }
}

pub struct CheckParams {
    pub file: PathBuf,
    pub strict: bool,
    pub json: bool,
    pub color: ColorChoice,
}

impl CheckParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            file: m.get_one::<PathBuf>("file").cloned().expect("file is required"),
            strict: m.get_flag("strict"),
            json: m.get_flag("json"),
            color: parse_color(m),
        }
    }
}

impl From<CheckParams> for CheckArgs {
    fn from(p: CheckParams) -> Self {
        Self {
            file: p.file,
            strict: p.strict,
            json: p.json,
            color: p.color.should_colorize(),
        }
    }
}
