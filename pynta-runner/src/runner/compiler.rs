//! Compile the C source file and collect the diagnostics of the compiler
//!
//! The compiler is invoked twice if requested: once with the regular command, which decides if
//! the compilation succeeded, and once with all warnings enabled just to collect warnings.

use std::fmt::Display;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Result;
use lazy_static::lazy_static;
use log::{debug, log_enabled, trace, Level};
use regex::Regex;
use serde::Serialize;

use super::config::Input;
use super::report::{write_section, Report};
use crate::error::Error;
use crate::util::{resolve_binary_path, split_command, write_all_to_stderr};

/// The flag to produce debug information readable by valgrind
const DEBUG_INFO_FLAG: &str = "-g2";

lazy_static! {
    static ref GCC_WITH_COLUMN_RE: Regex = Regex::new(
        r"^(?<file>.*):(?<line>\d+):(?<column>\d+):.*?(?<severity>warning|error):(?<message>.*)$"
    )
    .expect("Regex should compile");
    static ref GCC_WITHOUT_COLUMN_RE: Regex =
        Regex::new(r"^(?<file>.*):(?<line>\d+):.*?(?<severity>warning|error):(?<message>.*)$")
            .expect("Regex should compile");
    static ref GCC_LINKER_RE: Regex =
        Regex::new(r"^(?<file>.*):(.*): (?<severity>undefined reference)(?<message>.*)$")
            .expect("Regex should compile");
}

/// The severity of a compiler diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Severity {
    /// A compiler error including fatal errors
    Error,
    /// A compiler warning
    Warning,
    /// An `undefined reference` of the linker
    Linker,
    /// Anything else
    Unknown,
}

/// A single compiler warning or error no matter which compiler (gcc or clang) emitted it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// The file as reported by the compiler
    pub file: String,
    /// The severity
    pub severity: Severity,
    /// The message without the location and severity prefix
    pub message: String,
    /// The line number if present
    pub line: Option<u32>,
    /// The column if present
    pub column: Option<u32>,
}

/// Compiles the source file of an [`Input`]
#[derive(Debug, Clone)]
pub struct Compiler {
    command: String,
    all_warnings_command: Option<String>,
    source_file: PathBuf,
    exe_file: PathBuf,
}

/// The result of a [`Compiler`] run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilationSummary {
    /// The regular compiler command without the output and source file
    pub command: String,
    /// The all-warnings compiler command if it was run
    pub all_warnings_command: Option<String>,
    /// The path of the executable
    pub exe_file: PathBuf,
    /// The exit code of the regular compiler command. `None` if terminated by a signal.
    pub return_code: Option<i32>,
    /// The errors (including linker errors) of the regular compiler command
    pub errors: Vec<Entry>,
    /// The warnings of the regular compiler command
    pub warnings: Vec<Entry>,
    /// The warnings of the all-warnings compiler command
    pub all_warnings: Vec<Entry>,
}

impl Severity {
    fn from_match(value: &str) -> Self {
        if value.contains("error") {
            Self::Error
        } else if value.contains("warning") {
            Self::Warning
        } else if value.contains("undefined reference") {
            Self::Linker
        } else {
            Self::Unknown
        }
    }
}

impl Entry {
    /// Try to extract an `Entry` from a single line of compiler output
    ///
    /// Returns `None` if the line is not a diagnostic, like the `In function 'main':` lines or the
    /// source code excerpts of gcc.
    pub fn from_line(line: &str) -> Option<Self> {
        let line = line.trim_end();
        if let Some(caps) = GCC_WITH_COLUMN_RE.captures(line) {
            Some(Self {
                file: caps["file"].trim().to_owned(),
                severity: Severity::from_match(&caps["severity"]),
                message: caps["message"].trim().to_owned(),
                line: caps["line"].parse().ok(),
                column: caps["column"].parse().ok(),
            })
        } else if let Some(caps) = GCC_WITHOUT_COLUMN_RE.captures(line) {
            Some(Self {
                file: caps["file"].trim().to_owned(),
                severity: Severity::from_match(&caps["severity"]),
                message: caps["message"].trim().to_owned(),
                line: caps["line"].parse().ok(),
                column: None,
            })
        } else {
            GCC_LINKER_RE.captures(line).map(|caps| Self {
                file: caps["file"].trim().to_owned(),
                severity: Severity::from_match(&caps["severity"]),
                message: format!("{}{}", &caps["severity"], &caps["message"]),
                line: None,
                column: None,
            })
        }
    }

    /// Extract all entries from the output of a compiler run
    pub fn from_output(output: &str) -> impl Iterator<Item = Self> + '_ {
        output.lines().filter_map(Self::from_line)
    }
}

impl Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(
                f,
                "{}: line {line}, column {column}: {}",
                self.severity, self.message
            ),
            (Some(line), None) => write!(f, "{}: line {line}: {}", self.severity, self.message),
            _ => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

impl Compiler {
    /// Create a new `Compiler` for the source file of the `input`
    ///
    /// The executable is named after the stem of the source file and placed in the current
    /// directory.
    pub fn new(input: &Input, current_dir: &Path) -> Result<Self> {
        let source_file = input.filename.clone();
        if !source_file.is_file() {
            return Err(Error::SourceNotFound(source_file).into());
        }

        let exe_name = source_file
            .file_stem()
            .ok_or_else(|| Error::SourceNotFound(source_file.clone()))?;
        let exe_file = current_dir.join(exe_name);

        let mut command = input.compilation.command.clone();
        let mut all_warnings_command = input
            .compilation
            .all_warnings
            .then(|| input.compilation.all_warnings_command.clone());

        if input.valgrind.enable {
            debug!("Valgrind is enabled: Compiling with debug information");
            command = format!("{command} {DEBUG_INFO_FLAG}");
            all_warnings_command = all_warnings_command.map(|c| format!("{c} {DEBUG_INFO_FLAG}"));
        }

        Ok(Self {
            command,
            all_warnings_command,
            source_file,
            exe_file,
        })
    }

    /// The path of the executable produced by a successful compilation
    pub fn exe_file(&self) -> &Path {
        &self.exe_file
    }

    /// Run the regular and, if configured, the all-warnings compiler command
    pub fn compile(&self) -> Result<CompilationSummary> {
        let (return_code, output) = self.invoke(&self.command)?;

        let mut errors = vec![];
        let mut warnings = vec![];
        for entry in Entry::from_output(&output) {
            match entry.severity {
                Severity::Warning => warnings.push(entry),
                Severity::Error | Severity::Linker => errors.push(entry),
                Severity::Unknown => {}
            }
        }

        let mut all_warnings = vec![];
        if let Some(all_warnings_command) = &self.all_warnings_command {
            let (_, output) = self.invoke(all_warnings_command)?;
            all_warnings.extend(
                Entry::from_output(&output).filter(|entry| entry.severity == Severity::Warning),
            );
        }

        Ok(CompilationSummary {
            command: self.command.clone(),
            all_warnings_command: self.all_warnings_command.clone(),
            exe_file: self.exe_file.clone(),
            return_code,
            errors,
            warnings,
            all_warnings,
        })
    }

    /// Invoke the compiler `command` and return the exit code and the merged stdout and stderr
    fn invoke(&self, command: &str) -> Result<(Option<i32>, String)> {
        let mut words = split_command(command)?;
        if words.is_empty() {
            return Err(Error::LaunchError(
                PathBuf::from(command),
                "The compiler command is empty".to_owned(),
            )
            .into());
        }
        let compiler = resolve_binary_path(words.remove(0))?;

        debug!(
            "Compiling '{}' with '{command}'",
            self.source_file.display()
        );
        let output = Command::new(&compiler)
            .args(words)
            .arg("-o")
            .arg(&self.exe_file)
            .arg(&self.source_file)
            .output()
            .map_err(|error| Error::LaunchError(compiler.clone(), error.to_string()))?;

        if log_enabled!(Level::Trace) {
            trace!("Compiler output of '{command}':");
            write_all_to_stderr(&output.stdout);
            write_all_to_stderr(&output.stderr);
        }

        let mut merged = String::from_utf8_lossy(&output.stdout).into_owned();
        merged.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok((output.status.code(), merged))
    }
}

impl CompilationSummary {
    /// True if the regular compiler command succeeded
    pub fn compiled(&self) -> bool {
        self.return_code == Some(0)
    }
}

impl Report for CompilationSummary {
    fn is_ok(&self) -> bool {
        self.compiled()
    }

    fn summary(&self) -> String {
        let mut lines = vec![];

        if self.compiled() {
            lines.push(format!("Compilation: OK ({} warnings)", self.warnings.len()));
        } else {
            lines.push(format!(
                "Compilation: FAILED ({} error(s))",
                self.errors.len()
            ));
        }

        if !self.all_warnings.is_empty() {
            lines.push(format!(
                "\tCompiling with all warnings enabled found {} warnings",
                self.all_warnings.len()
            ));
        }

        lines.join("\n")
    }

    fn write_report(&self, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.compiled() {
            writeln!(writer, "--> COMPILATION SUCCESSFUL <--")?;
        } else {
            writeln!(writer, "--> COMPILATION FAILED <--")?;
        }
        writeln!(writer)?;

        write_section(writer, &format!("OUTPUT FOR '{}'", self.command))?;
        for entry in self.errors.iter().chain(&self.warnings) {
            writeln!(writer, "{entry}")?;
        }

        if let Some(all_warnings_command) = &self.all_warnings_command {
            write_section(writer, &format!("OUTPUT FOR '{all_warnings_command}'"))?;
            for entry in &self.all_warnings {
                writeln!(writer, "{entry}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn input(source_file: &Path, valgrind: bool, all_warnings: bool) -> Input {
        Input::from_toml_str(
            Path::new("input.toml"),
            &format!(
                "filename = '{}'\n[compilation]\nall_warnings = {all_warnings}\n[valgrind]\nenable \
                 = {valgrind}",
                source_file.display()
            ),
        )
        .unwrap()
    }

    fn entry(severity: Severity, message: &str, line: Option<u32>, column: Option<u32>) -> Entry {
        Entry {
            file: "pairs.c".to_owned(),
            severity,
            message: message.to_owned(),
            line,
            column,
        }
    }

    #[rstest]
    #[case::warning_with_column(
        "pairs.c:7:8: warning: unused variable 'j' [-Wunused-variable]",
        entry(Severity::Warning, "unused variable 'j' [-Wunused-variable]", Some(7), Some(8))
    )]
    #[case::error_with_column(
        "pairs.c:12:3: error: expected ';' before '}' token",
        entry(Severity::Error, "expected ';' before '}' token", Some(12), Some(3))
    )]
    #[case::fatal_error(
        "pairs.c:1:10: fatal error: missing.h: No such file or directory",
        entry(Severity::Error, "missing.h: No such file or directory", Some(1), Some(10))
    )]
    #[case::warning_without_column(
        "pairs.c:3: warning: return type defaults to 'int'",
        entry(Severity::Warning, "return type defaults to 'int'", Some(3), None)
    )]
    #[case::linker(
        "/usr/bin/ld: pairs.c:(.text+0x1e): undefined reference to `double_it'",
        Entry {
            file: "/usr/bin/ld: pairs.c".to_owned(),
            severity: Severity::Linker,
            message: "undefined reference to `double_it'".to_owned(),
            line: None,
            column: None,
        }
    )]
    fn test_entry_from_line(#[case] line: &str, #[case] expected: Entry) {
        assert_eq!(Entry::from_line(line), Some(expected));
    }

    #[rstest]
    #[case::function_context("pairs.c: In function 'main':")]
    #[case::source_excerpt("    7 |         int j;")]
    #[case::marker("      |             ^")]
    #[case::empty("")]
    #[case::summary("collect2: error: ld returned 1 exit status")]
    fn test_entry_from_line_when_no_diagnostic(#[case] line: &str) {
        assert_eq!(Entry::from_line(line), None);
    }

    #[rstest]
    #[case::with_column(Some(7), Some(8), "WARNING: line 7, column 8: unused")]
    #[case::without_column(Some(7), None, "WARNING: line 7: unused")]
    #[case::without_line(None, None, "WARNING: unused")]
    fn test_entry_display(
        #[case] line: Option<u32>,
        #[case] column: Option<u32>,
        #[case] expected: &str,
    ) {
        assert_eq!(
            entry(Severity::Warning, "unused", line, column).to_string(),
            expected
        );
    }

    #[rstest]
    #[case::default(false, true, "gcc", Some("gcc -Wall"))]
    #[case::valgrind(true, true, "gcc -g2", Some("gcc -Wall -g2"))]
    #[case::valgrind_without_all_warnings(true, false, "gcc -g2", None)]
    #[case::without_all_warnings(false, false, "gcc", None)]
    fn test_compiler_new(
        #[case] valgrind: bool,
        #[case] all_warnings: bool,
        #[case] expected_command: &str,
        #[case] expected_all_warnings_command: Option<&str>,
    ) {
        let source_dir = tempfile::tempdir().unwrap();
        let current_dir = tempfile::tempdir().unwrap();
        let source_file = source_dir.path().join("pairs.c");
        std::fs::write(&source_file, "int main(void) { return 0; }\n").unwrap();

        let compiler = Compiler::new(
            &input(&source_file, valgrind, all_warnings),
            current_dir.path(),
        )
        .unwrap();

        assert_eq!(compiler.command, expected_command);
        assert_eq!(
            compiler.all_warnings_command.as_deref(),
            expected_all_warnings_command
        );
        assert_eq!(compiler.source_file, source_file);
        assert_eq!(compiler.exe_file(), current_dir.path().join("pairs"));
    }

    #[test]
    fn test_compiler_new_when_source_missing() {
        let dir = tempfile::tempdir().unwrap();
        let source_file = dir.path().join("missing.c");

        let error = Compiler::new(&input(&source_file, true, true), dir.path()).unwrap_err();

        assert_eq!(
            error.downcast_ref::<Error>(),
            Some(&Error::SourceNotFound(source_file))
        );
    }

    fn summary(return_code: i32) -> CompilationSummary {
        CompilationSummary {
            command: "gcc -g2".to_owned(),
            all_warnings_command: Some("gcc -Wall -g2".to_owned()),
            exe_file: PathBuf::from("/work/pairs"),
            return_code: Some(return_code),
            errors: vec![],
            warnings: vec![],
            all_warnings: vec![],
        }
    }

    #[test]
    fn test_summary_when_compiled() {
        let mut summary = summary(0);
        summary
            .warnings
            .push(entry(Severity::Warning, "unused", Some(1), Some(1)));

        assert!(summary.is_ok());
        assert_eq!(summary.summary(), "Compilation: OK (1 warnings)");
    }

    #[test]
    fn test_summary_when_failed_with_all_warnings() {
        let mut summary = summary(1);
        summary
            .errors
            .push(entry(Severity::Error, "boom", Some(2), Some(1)));
        summary
            .all_warnings
            .push(entry(Severity::Warning, "unused", Some(1), Some(1)));
        summary
            .all_warnings
            .push(entry(Severity::Warning, "unused", Some(3), Some(1)));

        assert!(!summary.is_ok());
        assert_eq!(
            summary.summary(),
            "Compilation: FAILED (1 error(s))\n\tCompiling with all warnings enabled found 2 \
             warnings"
        );
    }

    #[test]
    fn test_write_report() {
        let mut summary = summary(1);
        summary
            .errors
            .push(entry(Severity::Error, "boom", Some(2), Some(1)));
        summary
            .warnings
            .push(entry(Severity::Warning, "unused", Some(1), None));
        summary
            .all_warnings
            .push(entry(Severity::Warning, "shadowed", Some(4), Some(9)));

        let mut buffer = vec![];
        summary.write_report(&mut buffer).unwrap();

        let mut expected = vec![];
        writeln!(expected, "--> COMPILATION FAILED <--\n").unwrap();
        write_section(&mut expected, "OUTPUT FOR 'gcc -g2'").unwrap();
        writeln!(expected, "ERROR: line 2, column 1: boom").unwrap();
        writeln!(expected, "WARNING: line 1: unused").unwrap();
        write_section(&mut expected, "OUTPUT FOR 'gcc -Wall -g2'").unwrap();
        writeln!(expected, "WARNING: line 4, column 9: shadowed").unwrap();

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            String::from_utf8(expected).unwrap()
        );
    }
}
