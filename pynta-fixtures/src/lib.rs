//! Small programs writing numeric pairs to a file which they never close
//!
//! The programs are graded in the demos and tests of `pynta`: the leaked file handle is what a
//! memory checker like valgrind with `--track-fds=yes` is expected to detect.

use std::fs::File;
use std::io::{self, BufWriter, IntoInnerError, Write};

/// The number of pairs written
pub const N: u32 = 10;

/// The file the pairs are written to, relative to the current directory
pub const OUTPUT_FILE: &str = "output.dat";

/// The line written to stderr after the loop
pub const DEBUG_MESSAGE: &str = "Some debug info that shouldn't be here...";

/// The line written to the output file for the counter `i` (without newline)
///
/// The second number is `i / 100` with three decimals, so `format_pair(1)` is `1 0.010`.
pub fn format_pair(i: u32) -> String {
    format!("{i} {:.3}", f64::from(i) / 100.0)
}

/// Write the pairs for `0..n` to `file` and the counters to `stdout`
pub fn write_pairs<F, O>(file: &mut F, stdout: &mut O, n: u32) -> io::Result<()>
where
    F: Write,
    O: Write,
{
    for i in 0..n {
        writeln!(file, "{}", format_pair(i))?;
        writeln!(stdout, "{i}")?;
    }
    Ok(())
}

/// Returns `2 * x`
pub fn double(x: i64) -> i64 {
    2 * x
}

/// Write `x` on a line of its own
pub fn print_int<W>(writer: &mut W, x: i64) -> io::Result<()>
where
    W: Write,
{
    writeln!(writer, "{x}")
}

/// Flush the buffered `file` and leak the handle without closing it
///
/// All data is on disk afterwards but the file descriptor stays open until the process exits.
pub fn leak(file: BufWriter<File>) -> io::Result<()> {
    let file = file.into_inner().map_err(IntoInnerError::into_error)?;
    std::mem::forget(file);
    Ok(())
}

/// Run the fixture: `full` additionally prints `double(N)` after the loop
pub fn run(full: bool) -> anyhow::Result<()> {
    let mut file = BufWriter::new(File::create(OUTPUT_FILE)?);
    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    write_pairs(&mut file, &mut stdout, N)?;
    eprintln!("{DEBUG_MESSAGE}");

    if full {
        print_int(&mut stdout, double(i64::from(N)))?;
    }
    stdout.flush()?;

    leak(file)?;
    Ok(())
}
