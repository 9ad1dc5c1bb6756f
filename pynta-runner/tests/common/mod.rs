#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use pynta_runner::runner::memcheck::{MemcheckLogfileParser, MemcheckSummary};

pub const FIXTURES_ROOT: &str = "tests/fixtures";

pub fn get_fixtures_path<T>(name: T) -> PathBuf
where
    T: AsRef<Path>,
{
    PathBuf::from(FIXTURES_ROOT).join(name.as_ref())
}

pub fn parse_memcheck_fixture<T>(name: T) -> anyhow::Result<MemcheckSummary>
where
    T: AsRef<Path>,
{
    MemcheckLogfileParser {
        root_dir: PathBuf::from("/work"),
    }
    .parse(&get_fixtures_path(Path::new("memcheck").join(name)))
}

/// The `pynta` binary running in `current_dir` without any color codes
pub fn pynta(current_dir: &Path) -> Command {
    let mut command = Command::cargo_bin("pynta").expect("The pynta binary should exist");
    command
        .current_dir(current_dir)
        .env("PYNTA_COLOR", "never")
        .env_remove("PYNTA_LOG")
        .env_remove("PYNTA_STRICT")
        .env_remove("PYNTA_NO_VALGRIND")
        .env_remove("PYNTA_SAVE_SUMMARY");
    command
}

/// Copy the C fixture `name` into `dir`
pub fn copy_c_fixture(name: &str, dir: &Path) -> PathBuf {
    let dest = dir.join(name);
    std::fs::copy(get_fixtures_path(Path::new("c").join(name)), &dest)
        .expect("Copying the fixture should succeed");
    dest
}

/// True if `gcc` is available. Tests which need to compile return early if not.
pub fn has_gcc() -> bool {
    which::which("gcc").is_ok()
}
