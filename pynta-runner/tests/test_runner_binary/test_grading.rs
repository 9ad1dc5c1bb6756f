use std::fs;
use std::path::Path;

use predicates::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::common;

const PAIRS_TOML: &str = r#"filename = "pairs.c"

[[output]]
type = "stdout"
equal_to = "expected_stdout.txt"

[[output]]
type = "stderr"
empty = true

[[output]]
type = "file"
name = "output.dat"
equal_to = "expected_output.dat"
"#;

fn setup(dir: &Path, source: &str, input: &str) {
    common::copy_c_fixture(source, dir);
    common::copy_c_fixture("expected_stdout.txt", dir);
    common::copy_c_fixture("expected_output.dat", dir);
    fs::write(dir.join("pynta.toml"), input).unwrap();
}

#[test]
fn test_grading_without_valgrind() {
    if !common::has_gcc() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path(), "pairs.c", PAIRS_TOML);

    common::pynta(dir.path())
        .args(["--no-valgrind", "pynta.toml"])
        .assert()
        .success()
        .stdout(
            "Compilation: OK (0 warnings)\nExecution: OK (exit code 0)\nOutput stdout: \
             OK\nOutput stderr: FAILED (1 errors)\nOutput output.dat: OK\n",
        );

    let compilation_report = fs::read_to_string(dir.path().join("compilation_report.txt")).unwrap();
    assert!(compilation_report.starts_with("--> COMPILATION SUCCESSFUL <--\n"));

    let execution_report = fs::read_to_string(dir.path().join("execution_report.txt")).unwrap();
    assert!(execution_report.contains("Some debug info that shouldn't be here...\n"));
    assert!(!execution_report.contains("VALGRIND"));

    let output_report = fs::read_to_string(dir.path().join("output_report.txt")).unwrap();
    assert!(output_report.contains("OUTPUT stderr\n"));
    assert!(output_report.contains("Not empty as it should be\n"));

    assert!(!dir.path().join("valgrind_log.txt").exists());
    assert!(!dir.path().join("parsing_report.txt").exists());
}

#[test]
fn test_grading_when_strict_and_output_failed() {
    if !common::has_gcc() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path(), "pairs.c", PAIRS_TOML);

    common::pynta(dir.path())
        .args(["--no-valgrind", "--strict", "pynta.toml"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Grading failed in: output"));
}

#[test]
fn test_grading_when_compilation_failed() {
    if !common::has_gcc() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path(), "broken.c", "filename = \"broken.c\"\n");

    common::pynta(dir.path())
        .args(["--no-valgrind", "pynta.toml"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Compilation: FAILED ("))
        .stdout(predicate::str::contains("Execution").not());

    let compilation_report = fs::read_to_string(dir.path().join("compilation_report.txt")).unwrap();
    assert!(compilation_report.starts_with("--> COMPILATION FAILED <--\n"));
    assert!(compilation_report.contains("ERROR: line 4"));
    assert!(!dir.path().join("execution_report.txt").exists());

    common::pynta(dir.path())
        .args(["--no-valgrind", "--strict", "pynta.toml"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Grading failed in: compilation"));
}

#[test]
fn test_grading_with_parsing() {
    if !common::has_gcc() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    setup(
        dir.path(),
        "pairs_full.c",
        r#"filename = "pairs_full.c"

[execution]
report_path = "run.txt"

[parsing]
[[parsing.functions]]
name = "double_it"
return_type = "int"
arg_types = ["int"]

[[parsing.functions]]
name = "print_int"
return_type = "void"
arg_types = ["int"]

[[parsing.functions]]
name = "tripled"
return_type = "int"
arg_types = ["int"]
"#,
    );

    common::pynta(dir.path())
        .args(["--no-valgrind", "pynta.toml"])
        .assert()
        .success()
        .stdout(
            "Compilation: OK (0 warnings)\nParsing: FAILED (1 error(s))\nExecution: OK (exit \
             code 0)\n",
        );

    assert_eq!(
        fs::read_to_string(dir.path().join("parsing_report.txt")).unwrap(),
        "Function tripled not found\n"
    );
    let execution_report = fs::read_to_string(dir.path().join("run.txt")).unwrap();
    assert!(execution_report.contains("9\n20\n"));
}

#[test]
fn test_grading_with_save_summary() {
    if !common::has_gcc() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path(), "pairs.c", PAIRS_TOML);

    common::pynta(dir.path())
        .args([
            "--no-valgrind",
            "--save-summary=pretty-json",
            "--summary-path",
            "grading.json",
            "pynta.toml",
        ])
        .assert()
        .success();

    let summary: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("grading.json")).unwrap())
            .unwrap();
    assert_eq!(summary["version"], "1");
    assert_eq!(summary["source_file"], "pairs.c");
    assert_eq!(summary["compilation"]["return_code"], 0);
    assert_eq!(summary["parsing"], Value::Null);
    assert_eq!(summary["execution"]["termination"]["code"], 0);
    assert_eq!(summary["execution"]["memcheck"], Value::Null);
    assert_eq!(summary["outputs"]["outputs"][1]["name"], "stderr");
    assert_eq!(
        summary["outputs"]["outputs"][1]["errors"][0],
        "Not empty as it should be"
    );
}

#[test]
fn test_grading_with_valgrind() {
    if !common::has_gcc() || which::which("valgrind").is_err() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path(), "pairs.c", PAIRS_TOML);

    common::pynta(dir.path())
        .arg("pynta.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("Execution: OK (exit code 0)\n\tValgrind: FAILED ("))
        .stdout(predicate::str::contains("1 file descriptor(s) left open)"));

    assert!(dir.path().join("valgrind_log.txt").is_file());
    let execution_report = fs::read_to_string(dir.path().join("execution_report.txt")).unwrap();
    assert!(execution_report.contains("VALGRIND\n"));
}
