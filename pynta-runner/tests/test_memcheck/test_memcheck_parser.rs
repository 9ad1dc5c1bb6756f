use std::path::PathBuf;

use pretty_assertions::assert_eq;
use pynta_runner::error::Error;
use pynta_runner::runner::memcheck::{BlockCount, ErrorCounts, FileDescriptors, HeapUsage};
use rstest::rstest;

use crate::common;

#[test]
fn test_parse_when_leaked_file() {
    let summary = common::parse_memcheck_fixture("leaked_file.log").unwrap();

    assert_eq!(summary.pid, 4242);
    assert_eq!(summary.command, Some(PathBuf::from("pairs")));
    assert_eq!(summary.errors, ErrorCounts::default());
    assert_eq!(
        summary.file_descriptors,
        Some(FileDescriptors { open: 4, std: 3 })
    );
    assert_eq!(
        summary.heap,
        Some(HeapUsage {
            in_use_at_exit: BlockCount {
                bytes: 472,
                blocks: 1
            },
            allocs: 3,
            frees: 2,
            bytes_allocated: 5592,
        })
    );
    assert!(summary
        .details
        .contains(&"Open file descriptor 3: output.dat".to_owned()));
    assert!(!summary.is_ok());
    assert_eq!(
        summary.summary(),
        "\tValgrind: FAILED (0 error(s), 0 bytes lost, 472 bytes still reachable, 1 file \
         descriptor(s) left open)"
    );
}

#[test]
fn test_parse_when_clean_with_time_stamps() {
    let summary = common::parse_memcheck_fixture("clean.log").unwrap();

    assert_eq!(summary.pid, 5001);
    assert_eq!(summary.command, Some(PathBuf::from("clean")));
    assert_eq!(summary.leaks.lost_bytes(), 0);
    assert_eq!(summary.leaked_file_descriptors(), 0);
    assert_eq!(summary.details.first().unwrap(), "HEAP SUMMARY:");
    assert!(summary.is_ok());
    assert_eq!(summary.summary(), "\tValgrind: OK");
}

#[test]
fn test_parse_when_errors_and_lost_memory() {
    let summary = common::parse_memcheck_fixture("with_errors.log").unwrap();

    assert_eq!(summary.pid, 31337);
    assert_eq!(summary.command, Some(PathBuf::from("broken 3")));
    assert_eq!(
        summary.errors,
        ErrorCounts {
            errors: 2,
            contexts: 2,
            suppressed_errors: 0,
            suppressed_contexts: 0,
        }
    );
    assert_eq!(
        summary.leaks.definitely_lost,
        BlockCount {
            bytes: 1024,
            blocks: 1
        }
    );
    assert_eq!(summary.leaks.lost_bytes(), 1064);
    assert_eq!(summary.file_descriptors, None);
    assert_eq!(summary.details.first().unwrap(), "Invalid write of size 4");
    assert_eq!(
        summary.summary(),
        "\tValgrind: FAILED (2 error(s), 1064 bytes lost, 0 bytes still reachable, 0 file \
         descriptor(s) left open)"
    );
}

#[rstest]
#[case::empty("empty.log", "Empty file")]
#[case::truncated("no_error_summary.log", "No error summary found")]
fn test_parse_when_invalid(#[case] name: &str, #[case] message: &str) {
    let error = common::parse_memcheck_fixture(name).unwrap_err();

    assert_eq!(
        error.downcast_ref::<Error>(),
        Some(&Error::ParseError(
            common::get_fixtures_path(format!("memcheck/{name}")),
            message.to_owned()
        ))
    );
}

#[test]
fn test_parse_when_file_missing() {
    let error = common::parse_memcheck_fixture("does_not_exist.log").unwrap_err();
    assert!(error.to_string().starts_with("Error opening log file"));
}
