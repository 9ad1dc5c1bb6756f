//! The module containing the crate main [`Error`] type

use std::fmt::Display;
use std::path::PathBuf;

/// The main pynta error type
#[derive(Debug, PartialEq, Clone, Eq)]
pub enum Error {
    /// At least one stage failed and `--strict` was given
    ///
    /// `ChecksFailed(failed_stages)`
    ChecksFailed(Vec<String>),
    /// The input file could not be read or contains invalid values
    ///
    /// `ConfigError(input_file, message)`
    ConfigError(PathBuf, String),
    /// The error when trying to start an external [`std::process::Command`] fails
    ///
    /// `LaunchError(executable_path, message)`
    LaunchError(PathBuf, String),
    /// A required key is missing in the input file
    ///
    /// `MissingKey(input_file, key)`
    MissingKey(PathBuf, String),
    /// The generic error when parsing of a log file or source file fails
    ///
    /// `ParseError(file_path, message)`
    ParseError(PathBuf, String),
    /// The C source file does not exist
    ///
    /// `SourceNotFound(source_file)`
    SourceNotFound(PathBuf),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChecksFailed(stages) => {
                write!(f, "Grading failed in: {}", stages.join(", "))
            }
            Self::ConfigError(path, message) => {
                write!(f, "Invalid input file '{}': {message}", path.display())
            }
            Self::LaunchError(exec, message) => {
                write!(f, "Error launching '{}': {message}", exec.display())
            }
            Self::MissingKey(path, key) => {
                write!(f, "Required key '{key}' not found in '{}'", path.display())
            }
            Self::ParseError(path, message) => {
                write!(f, "Error parsing file '{}': {message}", path.display())
            }
            Self::SourceNotFound(path) => {
                write!(
                    f,
                    "Source file '{}' does not exist or it is not accessible",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for Error {}
