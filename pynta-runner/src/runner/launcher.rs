//! The module responsible for the actual run of the compiled program

use std::io::Write;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use anyhow::Result;
use log::{debug, info, log_enabled, warn, Level};
use serde::Serialize;

use super::config::Input;
use super::memcheck::{MemcheckLogfileParser, MemcheckSummary};
use super::report::{write_section, Report};
use crate::error::Error;
use crate::util::{make_absolute, resolve_binary_path, split_command, write_all_to_stderr};

/// The valgrind command wrapping the program
#[derive(Debug, Clone, PartialEq, Eq)]
struct ValgrindCommand {
    bin: PathBuf,
    args: Vec<String>,
    log_file: PathBuf,
}

/// Runs the compiled program, optionally under valgrind
#[derive(Debug, Clone)]
pub struct Launcher {
    exe_file: PathBuf,
    arguments: Vec<String>,
    valgrind: Option<ValgrindCommand>,
    current_dir: PathBuf,
}

/// How the program terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The program exited with this exit code
    Code(i32),
    /// The program was terminated by this signal
    Signal(i32),
    /// Neither exit code nor signal are available
    Abnormal,
}

/// The result of a [`Launcher`] run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    /// The full command line which was executed
    pub command: Vec<String>,
    /// How the program terminated
    pub termination: Termination,
    /// The captured stdout of the program
    pub stdout: String,
    /// The captured stderr of the program
    pub stderr: String,
    /// Present if the program ran under valgrind
    pub memcheck: Option<MemcheckSummary>,
}

impl From<ExitStatus> for Termination {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            Self::Code(code)
        } else if let Some(signal) = status.signal() {
            Self::Signal(signal)
        } else {
            Self::Abnormal
        }
    }
}

impl Launcher {
    /// Create a new `Launcher` for the executable `exe_file`
    pub fn new(input: &Input, exe_file: &Path, current_dir: &Path) -> Result<Self> {
        let arguments = split_command(&input.execution.arguments)?;

        let valgrind = if input.valgrind.enable {
            let mut words = split_command(&input.valgrind.command)?;
            if words.is_empty() {
                return Err(Error::LaunchError(
                    PathBuf::from("valgrind"),
                    "The valgrind command is empty".to_owned(),
                )
                .into());
            }
            let bin = resolve_binary_path(words.remove(0))?;

            if let Some(arg) = words
                .iter()
                .find(|arg| arg.starts_with("--log-file") || arg.starts_with("--xml"))
            {
                warn!(
                    "Ignoring valgrind argument '{arg}': The log file is configured with \
                     'valgrind.log_file'"
                );
                words.retain(|arg| !(arg.starts_with("--log-file") || arg.starts_with("--xml")));
            }

            Some(ValgrindCommand {
                bin,
                args: words,
                log_file: make_absolute(current_dir, &input.valgrind.log_file),
            })
        } else {
            None
        };

        Ok(Self {
            exe_file: exe_file.to_owned(),
            arguments,
            valgrind,
            current_dir: current_dir.to_owned(),
        })
    }

    /// The complete command line: the valgrind command if present, the executable and arguments
    pub fn command_line(&self) -> Vec<String> {
        let mut command_line = vec![];
        if let Some(valgrind) = &self.valgrind {
            command_line.push(valgrind.bin.display().to_string());
            command_line.extend(valgrind.args.iter().cloned());
            command_line.push(format!("--log-file={}", valgrind.log_file.display()));
        }
        command_line.push(self.exe_file.display().to_string());
        command_line.extend(self.arguments.iter().cloned());
        command_line
    }

    /// Run the program and, if valgrind was used, parse the memcheck log file
    pub fn launch(&self) -> Result<ExecutionSummary> {
        let command_line = self.command_line();
        debug!("Running '{}'", command_line.join(" "));

        let Some((program, args)) = command_line.split_first() else {
            return Err(
                Error::LaunchError(self.exe_file.clone(), "Empty command line".to_owned()).into(),
            );
        };
        let output = Command::new(program)
            .args(args)
            .current_dir(&self.current_dir)
            .output()
            .map_err(|error| Error::LaunchError(PathBuf::from(program), error.to_string()))?;

        if log_enabled!(Level::Info) {
            info!("'{}' stdout:", self.exe_file.display());
            write_all_to_stderr(&output.stdout);
            info!("'{}' stderr:", self.exe_file.display());
            write_all_to_stderr(&output.stderr);
        }

        let memcheck = self
            .valgrind
            .as_ref()
            .map(|valgrind| {
                MemcheckLogfileParser {
                    root_dir: self.current_dir.clone(),
                }
                .parse(&valgrind.log_file)
            })
            .transpose()?;

        Ok(ExecutionSummary {
            command: command_line,
            termination: output.status.into(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            memcheck,
        })
    }
}

impl ExecutionSummary {
    /// True if the program exited with exit code `0`
    pub fn succeeded(&self) -> bool {
        self.termination == Termination::Code(0)
    }
}

impl Report for ExecutionSummary {
    fn is_ok(&self) -> bool {
        self.succeeded() && self.memcheck.as_ref().map_or(true, MemcheckSummary::is_ok)
    }

    fn summary(&self) -> String {
        let mut lines = vec![match self.termination {
            Termination::Code(0) => "Execution: OK (exit code 0)".to_owned(),
            Termination::Code(code) => format!("Execution: FAILED (exit code {code})"),
            Termination::Signal(signal) => {
                format!("Execution: FAILED (terminated by signal {signal})")
            }
            Termination::Abnormal => "Execution: FAILED (terminated abnormally)".to_owned(),
        }];

        if let Some(memcheck) = &self.memcheck {
            lines.push(memcheck.summary());
        }

        lines.join("\n")
    }

    fn write_report(&self, writer: &mut dyn Write) -> std::io::Result<()> {
        write_section(writer, "COMMAND")?;
        writeln!(writer, "{}", self.command.join(" "))?;

        write_section(writer, "EXIT STATUS")?;
        match self.termination {
            Termination::Code(code) => writeln!(writer, "Exit code: {code}")?,
            Termination::Signal(signal) => writeln!(writer, "Terminated by signal: {signal}")?,
            Termination::Abnormal => writeln!(writer, "Terminated abnormally")?,
        }

        for (title, content) in [("STDOUT", &self.stdout), ("STDERR", &self.stderr)] {
            write_section(writer, title)?;
            write!(writer, "{content}")?;
            if !content.is_empty() && !content.ends_with('\n') {
                writeln!(writer)?;
            }
        }

        if let Some(memcheck) = &self.memcheck {
            write_section(writer, "VALGRIND")?;
            for line in &memcheck.details {
                writeln!(writer, "{line}")?;
            }
            writeln!(writer, "{}", memcheck.summary().trim_start())?;
        }

        Ok(())
    }
}
