//! The grading stages and the main [`run`] function of the `pynta` binary
mod args;
pub mod compiler;
pub mod config;
pub mod launcher;
pub mod memcheck;
pub mod output;
pub mod parser;
pub mod report;
pub mod summary;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

pub use self::args::CommandLineArgs;
use self::compiler::Compiler;
use self::config::Input;
use self::launcher::Launcher;
use self::output::OutputSummary;
use self::parser::ParsingSummary;
use self::report::Report;
use self::summary::GradingSummary;
use crate::error::Error;

/// The environment variables `pynta` reads
pub mod envs {
    /// Configure the coloring of the output: `never`, `always` or `auto`
    pub const PYNTA_COLOR: &str = "PYNTA_COLOR";
    /// The log level like `warn`, `info`, `debug`
    pub const PYNTA_LOG: &str = "PYNTA_LOG";

    /// Used as fallback for [`PYNTA_COLOR`]
    pub const CARGO_TERM_COLOR: &str = "CARGO_TERM_COLOR";
}

/// Save the report of a stage to `report_path` and print its summary to stdout
fn finish_stage<T>(stage: &T, report_path: &Path) -> Result<()>
where
    T: Report,
{
    stage.save_report(report_path)?;
    let summary = stage.summary();
    if !summary.is_empty() {
        println!("{summary}");
    }
    Ok(())
}

/// Run all grading stages configured in the input file of the command line `args`
///
/// Reports are written after each stage and the one-line summaries are printed to stdout. A
/// stage detecting a problem in the graded program is not an error here. Errors are returned
/// only if a stage couldn't be performed at all.
pub fn grade(args: &CommandLineArgs) -> Result<GradingSummary> {
    let current_dir =
        std::env::current_dir().with_context(|| "Failed to detect the current directory")?;

    let mut input = Input::from_path(&args.input_file)?;
    if args.no_valgrind {
        debug!("Valgrind disabled with --no-valgrind");
        input.valgrind.enable = false;
    }

    let compiler = Compiler::new(&input, &current_dir)?;
    let compilation = compiler.compile()?;
    finish_stage(&compilation, &input.compilation.report_path)?;

    let mut summary = GradingSummary::new(&args.input_file, &input.filename, compilation);

    if let Some(parsing) = &input.parsing {
        let parsing_summary = ParsingSummary::new(&input.filename, &parsing.functions)?;
        finish_stage(&parsing_summary, &parsing.report_path)?;
        summary.parsing = Some(parsing_summary);
    }

    if summary.compilation.compiled() {
        let launcher = Launcher::new(&input, compiler.exe_file(), &current_dir)?;
        let execution = launcher.launch()?;
        finish_stage(&execution, &input.execution.report_path)?;

        let outputs = OutputSummary::check(&input.output, &execution.stdout, &execution.stderr);
        finish_stage(&outputs, &input.output_report_path)?;

        summary.execution = Some(execution);
        summary.outputs = Some(outputs);
    } else {
        info!(
            "Compilation of '{}' failed: Skipping the execution",
            input.filename.display()
        );
    }

    if let Some(format) = args.save_summary {
        summary.save(format, &args.summary_path)?;
    }

    Ok(summary)
}

/// The main library function of the `pynta` binary
///
/// Parses the command line arguments and grades. With `--strict`, a grading with failed stages is
/// returned as [`Error::ChecksFailed`].
pub fn run() -> Result<()> {
    let args = CommandLineArgs::parse();
    debug!("Command line arguments: {args:?}");

    let summary = grade(&args)?;

    let failed = summary.failed_stages();
    if args.strict && !failed.is_empty() {
        return Err(Error::ChecksFailed(failed).into());
    }

    Ok(())
}
