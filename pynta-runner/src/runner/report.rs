//! The reports and one-line summaries every stage produces

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;

/// The width of a section header in a report file
const SECTION_WIDTH: usize = 60;

/// A stage of the grading which can be summarized and reported
pub trait Report {
    /// True if this stage didn't detect any problem
    fn is_ok(&self) -> bool;

    /// The summary of this stage as printed to stdout. Can span multiple lines.
    fn summary(&self) -> String;

    /// Write the full report to the `writer`
    fn write_report(&self, writer: &mut dyn Write) -> std::io::Result<()>;

    /// Write the full report into the file at `path`, replacing any previous content
    fn save_report(&self, path: &Path) -> Result<()> {
        debug!("Writing report to '{}'", path.display());
        let file = File::create(path)
            .with_context(|| format!("Failed to create report file '{}'", path.display()))?;
        let mut writer = BufWriter::new(file);
        self.write_report(&mut writer)
            .and_then(|()| writer.flush())
            .with_context(|| format!("Failed to write report file '{}'", path.display()))
    }
}

/// Write the header of a new section titled `title`
pub fn write_section(writer: &mut dyn Write, title: &str) -> std::io::Result<()> {
    writeln!(writer, "{}", "=".repeat(SECTION_WIDTH))?;
    writeln!(writer, "{title}")?;
    writeln!(writer, "{}", "=".repeat(SECTION_WIDTH))
}
