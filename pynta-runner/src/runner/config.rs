//! The input file read from the command-line and its defaults

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::Error;

/// The default values of the input file keys
pub mod defaults {
    /// The regular compiler command
    pub const COMPILATION_COMMAND: &str = "gcc";
    /// Run the all-warnings compiler command
    pub const COMPILATION_ALL_WARNINGS: bool = true;
    /// The compiler command with all warnings enabled
    pub const COMPILATION_ALL_WARNINGS_COMMAND: &str = "gcc -Wall";
    /// The report of the compilation stage
    pub const COMPILATION_REPORT_PATH: &str = "compilation_report.txt";

    /// No arguments
    pub const EXECUTION_ARGUMENTS: &str = "";
    /// The report of the execution stage
    pub const EXECUTION_REPORT_PATH: &str = "execution_report.txt";

    /// Run the program under valgrind
    pub const VALGRIND_ENABLE: bool = true;
    /// The valgrind command with memcheck checking leaks and file descriptors
    pub const VALGRIND_COMMAND: &str =
        "valgrind --leak-check=full --show-leak-kinds=all --track-fds=yes";
    /// The log file of valgrind
    pub const VALGRIND_LOG_FILE: &str = "valgrind_log.txt";

    /// The report of the parsing stage
    pub const PARSING_REPORT_PATH: &str = "parsing_report.txt";

    /// The report of the output checks
    pub const OUTPUT_REPORT_PATH: &str = "output_report.txt";
}

/// The keys which have no default value and must be present in the input file
const REQUIRED_KEYS: [&str; 1] = ["filename"];

/// The fully resolved input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Input {
    /// The C source file to compile
    pub filename: PathBuf,
    /// Options for the compiler
    #[serde(default)]
    pub compilation: Compilation,
    /// Options for the execution of the compiled program
    #[serde(default)]
    pub execution: Execution,
    /// Options for valgrind
    #[serde(default)]
    pub valgrind: Valgrind,
    /// If present, check the signatures of functions in the source file
    #[serde(default)]
    pub parsing: Option<Parsing>,
    /// The path of the report about the outputs of the program
    #[serde(default = "default_output_report_path")]
    pub output_report_path: PathBuf,
    /// The outputs of the program to check
    #[serde(default)]
    pub output: Vec<OutputSpec>,
}

/// The `[compilation]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Compilation {
    /// The regular compiler command. Its result decides if the compilation succeeded.
    pub command: String,
    /// If true, compile a second time with the `all_warnings_command`
    pub all_warnings: bool,
    /// The compiler command used only to collect warnings
    pub all_warnings_command: String,
    /// The path of the compilation report
    pub report_path: PathBuf,
}

/// The `[execution]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Execution {
    /// The arguments passed to the program, split like a shell would do
    pub arguments: String,
    /// The path of the execution report
    pub report_path: PathBuf,
}

/// The `[valgrind]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Valgrind {
    /// Run the program under valgrind and compile with debug information
    pub enable: bool,
    /// The valgrind command including all tool arguments except `--log-file`
    pub command: String,
    /// The log file passed to valgrind with `--log-file`
    pub log_file: PathBuf,
}

/// The `[parsing]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Parsing {
    /// The path of the parsing report
    pub report_path: PathBuf,
    /// The required functions
    pub functions: Vec<FunctionSpec>,
}

/// A function the source file is required to define
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionSpec {
    /// The name of the function
    pub name: String,
    /// The expected return type like `int` or `char *`
    pub return_type: String,
    /// The expected argument types in order. Empty for `f()` and `f(void)`.
    #[serde(default)]
    pub arg_types: Vec<String>,
}

/// One `[[output]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSpec {
    /// The `type` key
    #[serde(rename = "type")]
    pub kind: StreamKind,
    /// The file to check. Only used (and required) if the kind is [`StreamKind::File`]
    #[serde(default)]
    pub name: Option<PathBuf>,
    /// If true, the output has to be empty
    #[serde(default)]
    pub empty: bool,
    /// If present, the output has to be equal to the content of this file
    #[serde(default)]
    pub equal_to: Option<PathBuf>,
}

/// The kind of output a [`OutputSpec`] refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StreamKind {
    /// The standard output of the program
    Stdout,
    /// The standard error of the program
    Stderr,
    /// A file produced by the program
    File,
}

fn default_output_report_path() -> PathBuf {
    PathBuf::from(defaults::OUTPUT_REPORT_PATH)
}

impl Input {
    /// Read and validate the input file at `path`
    ///
    /// Missing sections and keys are filled in with their defaults.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file '{}'", path.display()))?;
        Self::from_toml_str(path, &content)
    }

    /// Parse the `content` of the input file. The `path` is only used in error messages.
    pub fn from_toml_str(path: &Path, content: &str) -> Result<Self> {
        let table: toml::Table = content
            .parse()
            .map_err(|error: toml::de::Error| {
                Error::ConfigError(path.to_owned(), error.message().to_owned())
            })?;

        for key in REQUIRED_KEYS {
            if !table.contains_key(key) {
                return Err(Error::MissingKey(path.to_owned(), key.to_owned()).into());
            }
        }

        let input: Self = toml::Value::Table(table)
            .try_into()
            .map_err(|error: toml::de::Error| {
                Error::ConfigError(path.to_owned(), error.message().to_owned())
            })?;

        input.validate(path)?;
        debug!("Input from '{}': {input:?}", path.display());

        Ok(input)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        for output in &self.output {
            if output.kind == StreamKind::File && output.name.is_none() {
                return Err(Error::ConfigError(
                    path.to_owned(),
                    "An output of type 'file' needs a 'name'".to_owned(),
                )
                .into());
            }
        }

        Ok(())
    }
}

impl OutputSpec {
    /// The name used in summaries and reports: the file name or `stdout`/`stderr`
    pub fn display_name(&self) -> String {
        match (&self.kind, &self.name) {
            (StreamKind::File, Some(name)) => name.display().to_string(),
            (kind, _) => kind.to_string(),
        }
    }
}

impl Default for Compilation {
    fn default() -> Self {
        Self {
            command: defaults::COMPILATION_COMMAND.to_owned(),
            all_warnings: defaults::COMPILATION_ALL_WARNINGS,
            all_warnings_command: defaults::COMPILATION_ALL_WARNINGS_COMMAND.to_owned(),
            report_path: PathBuf::from(defaults::COMPILATION_REPORT_PATH),
        }
    }
}

impl Default for Execution {
    fn default() -> Self {
        Self {
            arguments: defaults::EXECUTION_ARGUMENTS.to_owned(),
            report_path: PathBuf::from(defaults::EXECUTION_REPORT_PATH),
        }
    }
}

impl Default for Valgrind {
    fn default() -> Self {
        Self {
            enable: defaults::VALGRIND_ENABLE,
            command: defaults::VALGRIND_COMMAND.to_owned(),
            log_file: PathBuf::from(defaults::VALGRIND_LOG_FILE),
        }
    }
}

impl Default for Parsing {
    fn default() -> Self {
        Self {
            report_path: PathBuf::from(defaults::PARSING_REPORT_PATH),
            functions: Vec::default(),
        }
    }
}
