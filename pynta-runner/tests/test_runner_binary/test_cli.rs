use predicates::prelude::*;

use crate::common;

#[test]
fn test_when_no_input_file_then_usage_error() {
    let dir = tempfile::tempdir().unwrap();

    common::pynta(dir.path())
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("<INPUT_FILE>"));
}

#[test]
fn test_when_input_file_missing() {
    let dir = tempfile::tempdir().unwrap();

    common::pynta(dir.path())
        .arg("does_not_exist.toml")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Failed to read input file 'does_not_exist.toml'",
        ));
}

#[test]
fn test_when_filename_key_missing() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pynta.toml"), "[valgrind]\nenable = false\n").unwrap();

    common::pynta(dir.path())
        .arg("pynta.toml")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "Error: Required key 'filename' not found in 'pynta.toml'",
        ));
}

#[test]
fn test_when_unknown_key() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("pynta.toml"),
        "filename = \"pairs.c\"\n[valgrind]\nxml_file = \"valgrind.xml\"\n",
    )
    .unwrap();

    common::pynta(dir.path())
        .arg("pynta.toml")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid input file 'pynta.toml'"));
}

#[test]
fn test_when_source_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pynta.toml"), "filename = \"nope.c\"\n").unwrap();

    common::pynta(dir.path())
        .arg("pynta.toml")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Source file 'nope.c' does not exist or it is not accessible",
        ));
}
