//! Check the outputs of the program: stdout, stderr and produced files

use std::fs;
use std::io::Write;
use std::path::Path;

use log::debug;
use serde::Serialize;

use super::config::{OutputSpec, StreamKind};
use super::report::{write_section, Report};

/// The result of checking a single output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputCheck {
    /// `stdout`, `stderr` or the name of the file
    pub name: String,
    /// The kind of output
    pub kind: StreamKind,
    /// The failed expectations. Empty if the output is ok.
    pub errors: Vec<String>,
}

/// The results of checking all configured outputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputSummary {
    /// The checks in the order of the `[[output]]` entries
    pub outputs: Vec<OutputCheck>,
}

impl OutputCheck {
    /// Check the `content` of an output against the expectations of the `spec`
    ///
    /// If the `content` is `None`, the output (a file) doesn't exist and no further checks are
    /// performed. The content is compared byte by byte, so it doesn't need to be valid UTF-8.
    pub fn new(spec: &OutputSpec, content: Option<&[u8]>) -> Self {
        let name = spec.display_name();
        let mut errors = vec![];

        match content {
            None => errors.push(format!("File '{name}' not present")),
            Some(content) => {
                if spec.empty && !content.is_empty() {
                    errors.push("Not empty as it should be".to_owned());
                }

                if let Some(equal_to) = &spec.equal_to {
                    if let Some(error) = compare_with_file(content, equal_to) {
                        errors.push(error);
                    }
                }
            }
        }

        Self {
            name,
            kind: spec.kind,
            errors,
        }
    }

    /// Check a file output which exists but couldn't be read
    pub fn unreadable(spec: &OutputSpec, error: &std::io::Error) -> Self {
        let name = spec.display_name();
        Self {
            errors: vec![format!("File '{name}' could not be read: {error}")],
            name,
            kind: spec.kind,
        }
    }

    /// True if this output has errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Compare the `content` with the `expected` file and return the error message if they differ
fn compare_with_file(content: &[u8], expected: &Path) -> Option<String> {
    if !expected.is_file() {
        return Some(format!(
            "'equal_to' file '{}' not found",
            expected.display()
        ));
    }

    match fs::read(expected) {
        Err(error) => {
            debug!("Failed to read '{}': {error}", expected.display());
            Some(format!(
                "'equal_to' file '{}' could not be read: {error}",
                expected.display()
            ))
        }
        Ok(expected_content) if expected_content != content => Some(format!(
            "Not equal to the content of the '{}' file",
            expected.display()
        )),
        Ok(_) => None,
    }
}

impl OutputSummary {
    /// Check all outputs in `specs` with the captured `stdout` and `stderr` of the program
    ///
    /// Files are read relative to the current directory. A file output is not present if there's
    /// no regular file with this name.
    pub fn check(specs: &[OutputSpec], stdout: &str, stderr: &str) -> Self {
        let outputs = specs
            .iter()
            .map(|spec| match (spec.kind, &spec.name) {
                (StreamKind::Stdout, _) => OutputCheck::new(spec, Some(stdout.as_bytes())),
                (StreamKind::Stderr, _) => OutputCheck::new(spec, Some(stderr.as_bytes())),
                (StreamKind::File, name) => match name.as_deref().filter(|name| name.is_file()) {
                    None => OutputCheck::new(spec, None),
                    Some(name) => match fs::read(name) {
                        Ok(content) => OutputCheck::new(spec, Some(&content)),
                        Err(error) => {
                            debug!("Failed to read '{}': {error}", name.display());
                            OutputCheck::unreadable(spec, &error)
                        }
                    },
                },
            })
            .collect();

        Self { outputs }
    }
}

impl Report for OutputSummary {
    fn is_ok(&self) -> bool {
        !self.outputs.iter().any(OutputCheck::has_errors)
    }

    fn summary(&self) -> String {
        self.outputs
            .iter()
            .map(|output| {
                if output.has_errors() {
                    format!(
                        "Output {}: FAILED ({} errors)",
                        output.name,
                        output.errors.len()
                    )
                } else {
                    format!("Output {}: OK", output.name)
                }
            })
            .collect::<Vec<String>>()
            .join("\n")
    }

    fn write_report(&self, writer: &mut dyn Write) -> std::io::Result<()> {
        for output in &self.outputs {
            write_section(writer, &format!("OUTPUT {}", output.name))?;
            if output.has_errors() {
                for error in &output.errors {
                    writeln!(writer, "{error}")?;
                }
            } else {
                writeln!(writer, "OK")?;
            }
        }

        Ok(())
    }
}
