//! The parser for the log file of valgrind's memcheck tool

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::Serialize;

use crate::error::Error;
use crate::util::{make_relative, parse_grouped_u64};

/// Valgrind counts stdin, stdout and stderr as open file descriptors
const STD_FILE_DESCRIPTORS: u64 = 3;

// The different regex have to consider --time-stamp=yes
lazy_static! {
    static ref EXTRACT_FIELDS_RE: Regex = Regex::new(
        r"^\s*(==|--)([0-9:.]+\s+)?[0-9]+(==|--)\s*(?<key>.*?)\s*:\s*(?<value>.*)\s*$"
    )
    .expect("Regex should compile");
    static ref EMPTY_LINE_RE: Regex = Regex::new(r"^\s*(==|--)([0-9:.]+\s+)?[0-9]+(==|--)\s*$")
        .expect("Regex should compile");
    static ref STRIP_PREFIX_RE: Regex =
        Regex::new(r"^\s*(==|--)([0-9:.]+\s+)?[0-9]+(==|--) ?(?<rest>.*)$")
            .expect("Regex should compile");
    static ref EXTRACT_PID_RE: Regex =
        Regex::new(r"^\s*(==|--)([0-9:.]+\s+)?(?<pid>[0-9]+)(==|--).*")
            .expect("Regex should compile");
    static ref BYTES_IN_BLOCKS_RE: Regex =
        Regex::new(r"^(?<bytes>[0-9,]+) bytes in (?<blocks>[0-9,]+) blocks?")
            .expect("Regex should compile");
    static ref HEAP_USAGE_RE: Regex = Regex::new(
        r"^(?<allocs>[0-9,]+) allocs?, (?<frees>[0-9,]+) frees?, (?<bytes>[0-9,]+) bytes allocated"
    )
    .expect("Regex should compile");
    static ref ERROR_SUMMARY_RE: Regex = Regex::new(
        r"^(?<errs>[0-9,]+) errors? from (?<ctxs>[0-9,]+) contexts? \(suppressed: (?<s_errs>[0-9,]+) from (?<s_ctxs>[0-9,]+)\)"
    )
    .expect("Regex should compile");
    static ref FILE_DESCRIPTORS_RE: Regex =
        Regex::new(r"^(?<open>[0-9]+) open(?: \((?<std>[0-9]+) std\))? at exit")
            .expect("Regex should compile");
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum State {
    Header,
    HeaderSpace,
    Body,
}

/// An amount of memory in bytes spread over a number of heap blocks
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockCount {
    /// The total size in bytes
    pub bytes: u64,
    /// The number of heap blocks
    pub blocks: u64,
}

/// The `ERROR SUMMARY` of memcheck
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ErrorCounts {
    /// The number of errors
    pub errors: u64,
    /// The number of distinct contexts the errors came from
    pub contexts: u64,
    /// The number of suppressed errors
    pub suppressed_errors: u64,
    /// The number of contexts of the suppressed errors
    pub suppressed_contexts: u64,
}

/// The `HEAP SUMMARY` of memcheck
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeapUsage {
    /// The memory still allocated when the program exited
    pub in_use_at_exit: BlockCount,
    /// The total number of allocations
    pub allocs: u64,
    /// The total number of frees
    pub frees: u64,
    /// The total amount of allocated bytes
    pub bytes_allocated: u64,
}

/// The `LEAK SUMMARY` of memcheck
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeakSummary {
    /// `definitely lost`
    pub definitely_lost: BlockCount,
    /// `indirectly lost`
    pub indirectly_lost: BlockCount,
    /// `possibly lost`
    pub possibly_lost: BlockCount,
    /// `still reachable`
    pub still_reachable: BlockCount,
    /// `suppressed`
    pub suppressed: BlockCount,
}

/// The file descriptors open at exit as reported with `--track-fds=yes`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileDescriptors {
    /// All file descriptors open at exit including the standard ones
    pub open: u64,
    /// The open standard file descriptors (stdin, stdout, stderr)
    pub std: u64,
}

/// Everything extracted from a memcheck log file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemcheckSummary {
    /// The path to the log file
    pub log_path: PathBuf,
    /// The pid of the process
    pub pid: i32,
    /// The command as shown in the header of the log file
    pub command: Option<PathBuf>,
    /// The error counts of the `ERROR SUMMARY`
    pub errors: ErrorCounts,
    /// Not present if memcheck didn't print a `HEAP SUMMARY`
    pub heap: Option<HeapUsage>,
    /// All zero if memcheck didn't print a `LEAK SUMMARY`
    pub leaks: LeakSummary,
    /// Only present if valgrind was run with `--track-fds=yes`
    pub file_descriptors: Option<FileDescriptors>,
    /// The lines of the log file after the header without the `==PID==` prefix
    pub details: Vec<String>,
}

/// Parses memcheck log files
#[derive(Debug, Clone)]
pub struct MemcheckLogfileParser {
    /// Paths in the log file are shown relative to this directory
    pub root_dir: PathBuf,
}

/// Extract the pid from a line of a valgrind log file
pub fn extract_pid(line: &str) -> Option<i32> {
    EXTRACT_PID_RE
        .captures(line.trim())
        .and_then(|caps| caps["pid"].parse::<i32>().ok())
}

fn parse_block_count(value: &str) -> Option<BlockCount> {
    BYTES_IN_BLOCKS_RE.captures(value).and_then(|caps| {
        Some(BlockCount {
            bytes: parse_grouped_u64(&caps["bytes"])?,
            blocks: parse_grouped_u64(&caps["blocks"])?,
        })
    })
}

fn parse_heap_usage(value: &str) -> Option<(u64, u64, u64)> {
    HEAP_USAGE_RE.captures(value).and_then(|caps| {
        Some((
            parse_grouped_u64(&caps["allocs"])?,
            parse_grouped_u64(&caps["frees"])?,
            parse_grouped_u64(&caps["bytes"])?,
        ))
    })
}

fn parse_error_summary(value: &str) -> Option<ErrorCounts> {
    ERROR_SUMMARY_RE.captures(value).and_then(|caps| {
        Some(ErrorCounts {
            errors: parse_grouped_u64(&caps["errs"])?,
            contexts: parse_grouped_u64(&caps["ctxs"])?,
            suppressed_errors: parse_grouped_u64(&caps["s_errs"])?,
            suppressed_contexts: parse_grouped_u64(&caps["s_ctxs"])?,
        })
    })
}

fn parse_file_descriptors(value: &str) -> Option<FileDescriptors> {
    FILE_DESCRIPTORS_RE.captures(value).and_then(|caps| {
        Some(FileDescriptors {
            open: caps["open"].parse().ok()?,
            std: caps
                .name("std")
                .map_or(Some(STD_FILE_DESCRIPTORS), |m| m.as_str().parse().ok())?,
        })
    })
}

impl MemcheckLogfileParser {
    /// Parse the memcheck log file at `path`
    pub fn parse(&self, path: &Path) -> Result<MemcheckSummary> {
        let file = File::open(path)
            .with_context(|| format!("Error opening log file '{}'", path.display()))?;
        let lines = BufReader::new(file)
            .lines()
            .collect::<std::io::Result<Vec<String>>>()
            .with_context(|| format!("Error reading log file '{}'", path.display()))?;

        self.parse_lines(path, lines)
    }

    /// Parse the already read `lines` of the log file at `path`
    pub fn parse_lines<I>(&self, path: &Path, lines: I) -> Result<MemcheckSummary>
    where
        I: IntoIterator<Item = String>,
    {
        let mut iter = lines.into_iter().skip_while(|l| l.trim().is_empty());

        let line = iter
            .next()
            .ok_or_else(|| Error::ParseError(path.to_owned(), "Empty file".to_owned()))?;
        let pid = extract_pid(&line).ok_or_else(|| {
            Error::ParseError(
                path.to_owned(),
                format!("Not a valgrind log file. Expected the pid in the first line: '{line}'"),
            )
        })?;

        let mut command = None;
        let mut errors = None;
        let mut heap: Option<HeapUsage> = None;
        let mut leaks = LeakSummary::default();
        let mut file_descriptors = None;
        let mut details = vec![];

        let mut state = State::Header;
        for line in iter {
            match &state {
                State::Header if !EMPTY_LINE_RE.is_match(&line) => {
                    if let Some(caps) = EXTRACT_FIELDS_RE.captures(&line) {
                        if caps["key"].eq_ignore_ascii_case("command") {
                            command = Some(make_relative(&self.root_dir, &caps["value"]));
                        }
                    }
                }
                State::Header => state = State::HeaderSpace,
                State::HeaderSpace if EMPTY_LINE_RE.is_match(&line) => {}
                State::HeaderSpace | State::Body => {
                    state = State::Body;

                    if let Some(caps) = EXTRACT_FIELDS_RE.captures(&line) {
                        let value = caps["value"].trim();
                        match caps["key"].to_ascii_lowercase().as_str() {
                            "error summary" => {
                                let counts = parse_error_summary(value).ok_or_else(|| {
                                    Error::ParseError(
                                        path.to_owned(),
                                        format!("Failed to extract error summary from '{value}'"),
                                    )
                                })?;
                                errors = Some(counts);
                                continue;
                            }
                            "in use at exit" => {
                                if let Some(count) = parse_block_count(value) {
                                    heap.get_or_insert_with(HeapUsage::default).in_use_at_exit =
                                        count;
                                }
                            }
                            "total heap usage" => {
                                if let Some((allocs, frees, bytes)) = parse_heap_usage(value) {
                                    let heap = heap.get_or_insert_with(HeapUsage::default);
                                    heap.allocs = allocs;
                                    heap.frees = frees;
                                    heap.bytes_allocated = bytes;
                                }
                            }
                            "definitely lost" => {
                                leaks.definitely_lost =
                                    parse_block_count(value).unwrap_or_default();
                            }
                            "indirectly lost" => {
                                leaks.indirectly_lost =
                                    parse_block_count(value).unwrap_or_default();
                            }
                            "possibly lost" => {
                                leaks.possibly_lost = parse_block_count(value).unwrap_or_default();
                            }
                            "still reachable" => {
                                leaks.still_reachable =
                                    parse_block_count(value).unwrap_or_default();
                            }
                            "suppressed" => {
                                leaks.suppressed = parse_block_count(value).unwrap_or_default();
                            }
                            "file descriptors" => {
                                file_descriptors = parse_file_descriptors(value);
                            }
                            _ => {}
                        }
                    }

                    if let Some(caps) = STRIP_PREFIX_RE.captures(&line) {
                        details.push(caps["rest"].to_owned());
                    } else {
                        details.push(line);
                    }
                }
            }
        }

        // Remove the last empty lines from the details
        while details.last().is_some_and(|last| last.trim().is_empty()) {
            details.pop();
        }

        let errors = errors.ok_or_else(|| {
            Error::ParseError(path.to_owned(), "No error summary found".to_owned())
        })?;

        debug!(
            "Memcheck log '{}': {errors:?}, {leaks:?}, {file_descriptors:?}",
            path.display()
        );

        Ok(MemcheckSummary {
            log_path: make_relative(&self.root_dir, path),
            pid,
            command,
            errors,
            heap,
            leaks,
            file_descriptors,
            details,
        })
    }
}

impl FileDescriptors {
    /// The number of file descriptors left open which are not stdin, stdout or stderr
    pub fn leaked(&self) -> u64 {
        self.open.saturating_sub(self.std)
    }
}

impl LeakSummary {
    /// The bytes which are definitely, indirectly or possibly lost
    pub fn lost_bytes(&self) -> u64 {
        self.definitely_lost.bytes + self.indirectly_lost.bytes + self.possibly_lost.bytes
    }
}

impl MemcheckSummary {
    /// The number of file descriptors left open at exit, zero if fds weren't tracked
    pub fn leaked_file_descriptors(&self) -> u64 {
        self.file_descriptors
            .as_ref()
            .map_or(0, FileDescriptors::leaked)
    }

    /// True if there are no errors, no leaked memory and no leaked file descriptors
    pub fn is_ok(&self) -> bool {
        self.errors.errors == 0
            && self.leaks.lost_bytes() == 0
            && self.leaks.still_reachable.bytes == 0
            && self.leaked_file_descriptors() == 0
    }

    /// The one-line summary
    pub fn summary(&self) -> String {
        if self.is_ok() {
            "\tValgrind: OK".to_owned()
        } else {
            format!(
                "\tValgrind: FAILED ({} error(s), {} bytes lost, {} bytes still reachable, {} \
                 file descriptor(s) left open)",
                self.errors.errors,
                self.leaks.lost_bytes(),
                self.leaks.still_reachable.bytes,
                self.leaked_file_descriptors()
            )
        }
    }
}
