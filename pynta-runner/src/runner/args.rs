use std::path::PathBuf;

use clap::Parser;

use super::summary::SummaryFormat;

/// The command line arguments of the `pynta` binary
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "pynta",
    author,
    version,
    about = "Compile, run and check a C program and write a report for each stage",
    long_about = None,
)]
pub struct CommandLineArgs {
    /// The TOML input file describing the source file and the checks
    #[arg(value_name = "INPUT_FILE")]
    pub input_file: PathBuf,

    /// Don't run the program under valgrind even if enabled in the input file
    #[arg(long = "no-valgrind", env = "PYNTA_NO_VALGRIND")]
    pub no_valgrind: bool,

    /// Save a machine-readable summary of all stages
    ///
    /// If given without a value, the summary is saved in the `json` format.
    #[arg(
        long = "save-summary",
        value_enum,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "json",
        env = "PYNTA_SAVE_SUMMARY"
    )]
    pub save_summary: Option<SummaryFormat>,

    /// The destination of the summary file if `--save-summary` is given
    #[arg(long = "summary-path", default_value = "summary.json", value_name = "PATH")]
    pub summary_path: PathBuf,

    /// Exit with exit code `3` if any stage detected a problem
    #[arg(long = "strict", env = "PYNTA_STRICT")]
    pub strict: bool,
}
