//! The machine-readable summary of a complete grading run
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use super::compiler::CompilationSummary;
use super::launcher::ExecutionSummary;
use super::output::OutputSummary;
use super::parser::ParsingSummary;
use super::report::Report;

/// The version of the summary format
pub const SUMMARY_VERSION: &str = "1";

/// The format (json, ...) in which the summary file should be saved
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
pub enum SummaryFormat {
    /// The format in a space optimal json representation without newlines
    Json,
    /// The format in pretty printed json
    PrettyJson,
}

/// The `GradingSummary` contains the results of all stages of a grading run
///
/// Stages which were not run (no `[parsing]` section, compilation failed, ...) are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradingSummary {
    /// The version of this format
    pub version: String,
    /// The path to the input file
    pub input_file: PathBuf,
    /// The path to the C source file
    pub source_file: PathBuf,
    /// The compilation stage
    pub compilation: CompilationSummary,
    /// The parsing stage
    pub parsing: Option<ParsingSummary>,
    /// The execution stage including the memcheck results
    pub execution: Option<ExecutionSummary>,
    /// The output checks
    pub outputs: Option<OutputSummary>,
}

impl GradingSummary {
    /// Create a new `GradingSummary` after the compilation stage
    pub fn new(input_file: &Path, source_file: &Path, compilation: CompilationSummary) -> Self {
        Self {
            version: SUMMARY_VERSION.to_owned(),
            input_file: input_file.to_owned(),
            source_file: source_file.to_owned(),
            compilation,
            parsing: None,
            execution: None,
            outputs: None,
        }
    }

    /// The names of all stages which ran and detected a problem
    pub fn failed_stages(&self) -> Vec<String> {
        let mut failed = vec![];
        if !self.compilation.is_ok() {
            failed.push("compilation".to_owned());
        }
        if self.parsing.as_ref().is_some_and(|p| !p.is_ok()) {
            failed.push("parsing".to_owned());
        }
        if self.execution.as_ref().is_some_and(|e| !e.is_ok()) {
            failed.push("execution".to_owned());
        }
        if self.outputs.as_ref().is_some_and(|o| !o.is_ok()) {
            failed.push("output".to_owned());
        }
        failed
    }

    /// Save this `GradingSummary` in json format into the file at `path`
    pub fn save_json(&self, path: &Path, pretty: bool) -> Result<()> {
        debug!("Saving summary to '{}'", path.display());
        let file = File::create(path)
            .with_context(|| format!("Failed to create json summary file '{}'", path.display()))?;
        let mut writer = BufWriter::new(file);
        if pretty {
            serde_json::to_writer_pretty(&mut writer, self)
                .with_context(|| "Failed to serialize to json".to_owned())?;
        } else {
            serde_json::to_writer(&mut writer, self)
                .with_context(|| "Failed to serialize to json".to_owned())?;
        }

        writer
            .flush()
            .with_context(|| format!("Failed to write json summary file '{}'", path.display()))
    }

    /// Save this `GradingSummary` in the given `format`
    pub fn save(&self, format: SummaryFormat, path: &Path) -> Result<()> {
        match format {
            SummaryFormat::Json => self.save_json(path, false),
            SummaryFormat::PrettyJson => self.save_json(path, true),
        }
    }
}
