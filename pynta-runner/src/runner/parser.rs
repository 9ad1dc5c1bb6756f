//! Extract the function signatures of a C source file and check them against requirements
//!
//! This is not a C parser. The source is cleaned from comments and redundant whitespace and
//! function definitions are extracted with a regex, which is good enough for the small programs
//! this crate is meant for.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::Serialize;

use super::config::FunctionSpec;
use super::report::Report;
use crate::error::Error;

/// Keywords followed by parentheses and a block which are not function definitions
const CONTROL_KEYWORDS: [&str; 4] = ["if", "for", "while", "switch"];

lazy_static! {
    static ref SINGLE_LINE_COMMENT_RE: Regex = Regex::new(r"//.*").expect("Regex should compile");
    static ref MULTI_LINE_COMMENT_RE: Regex =
        Regex::new(r"(?s)/\*.*?\*/").expect("Regex should compile");
    static ref PREPROCESSOR_RE: Regex =
        Regex::new(r"(?m)^[ \t]*#.*$").expect("Regex should compile");
    static ref MULTIPLE_SPACES_RE: Regex = Regex::new(r" +").expect("Regex should compile");
    static ref SPACE_BEFORE_STAR_RE: Regex = Regex::new(r"\s+\*").expect("Regex should compile");
    static ref FUNCTION_RE: Regex = Regex::new(
        r"(?<return_type>[a-zA-Z_][a-zA-Z0-9_\s\*]*?[\s\*])\s*(?<name>[a-zA-Z_][a-zA-Z0-9_]*)\s*\((?<args>[^\)]*)\)\s*\{"
    )
    .expect("Regex should compile");
}

/// The signature of a function found in the source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Function {
    /// The normalized return type
    pub return_type: String,
    /// The normalized argument types without the argument names
    pub arg_types: Vec<String>,
}

/// The result of checking the required functions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsingSummary {
    /// The parsed C source file
    pub source_file: PathBuf,
    /// All functions found in the source file in order of appearance
    pub functions: IndexMap<String, Function>,
    /// The missing or mismatching required functions
    pub errors: Vec<String>,
}

/// Remove comments and preprocessor directives, replace tabs with spaces and collapse multiple
/// spaces into a single one
pub fn clean_source(source: &str) -> String {
    let source = SINGLE_LINE_COMMENT_RE.replace_all(source, "");
    let source = MULTI_LINE_COMMENT_RE.replace_all(&source, "");
    let source = PREPROCESSOR_RE.replace_all(&source, "");
    let source = source.replace('\t', " ");
    MULTIPLE_SPACES_RE.replace_all(&source, " ").into_owned()
}

/// Normalize a type by collapsing whitespace and gluing stars to the type (`char *` -> `char*`)
fn normalize_type(value: &str) -> String {
    let value = value.split_whitespace().collect::<Vec<&str>>().join(" ");
    SPACE_BEFORE_STAR_RE.replace_all(&value, "*").into_owned()
}

/// Reduce a single function parameter to its type
///
/// `char *name` becomes `char*`, `int x` becomes `int`. A parameter consisting of a single word,
/// like `void`, is returned as is.
pub fn parse_argument(arg: &str) -> String {
    let arg = arg.trim();
    if let Some(last_star) = arg.rfind('*') {
        normalize_type(&arg[..=last_star])
    } else {
        arg.rsplit_once(' ')
            .map_or(arg, |(arg_type, _)| arg_type)
            .trim()
            .to_owned()
    }
}

/// Extract all function definitions of the (uncleaned) C `source`
///
/// If a function is defined multiple times, the last definition wins.
pub fn extract_functions(source: &str) -> IndexMap<String, Function> {
    let source = clean_source(source);
    let mut functions = IndexMap::new();

    for caps in FUNCTION_RE.captures_iter(&source) {
        let name = caps["name"].trim();
        if CONTROL_KEYWORDS.contains(&name) {
            continue;
        }

        let args = caps["args"].trim();
        let arg_types = if args.is_empty() {
            vec![]
        } else {
            args.split(',').map(parse_argument).collect()
        };

        functions.insert(
            name.to_owned(),
            Function {
                return_type: normalize_type(&caps["return_type"]),
                arg_types,
            },
        );
    }

    functions
}

/// Check the `required` functions against the `functions` found in a source file
pub fn check_functions(
    functions: &IndexMap<String, Function>,
    required: &[FunctionSpec],
) -> Vec<String> {
    let mut errors = vec![];

    for spec in required {
        let name = &spec.name;
        let Some(function) = functions.get(name) else {
            errors.push(format!("Function {name} not found"));
            continue;
        };

        if normalize_type(&spec.return_type) != function.return_type {
            errors.push(format!(
                "Function {name}: return type {} != {}",
                function.return_type, spec.return_type
            ));
        }

        let mut remaining = function.arg_types.clone();
        for required_arg in &spec.arg_types {
            let required_arg = normalize_type(required_arg);
            if let Some(index) = remaining.iter().position(|arg| *arg == required_arg) {
                remaining.remove(index);
            } else {
                errors.push(format!(
                    "Function {name}: missing argument of type {required_arg}"
                ));
            }
        }
    }

    errors
}

impl ParsingSummary {
    /// Read the `source_file` and check the `required` functions
    pub fn new(source_file: &Path, required: &[FunctionSpec]) -> Result<Self> {
        if !source_file.is_file() {
            return Err(Error::SourceNotFound(source_file.to_owned()).into());
        }
        let source = fs::read_to_string(source_file)
            .with_context(|| format!("Failed to read source file '{}'", source_file.display()))?;

        let functions = extract_functions(&source);
        debug!(
            "Functions found in '{}': {:?}",
            source_file.display(),
            functions.keys().collect::<Vec<_>>()
        );
        let errors = check_functions(&functions, required);

        Ok(Self {
            source_file: source_file.to_owned(),
            functions,
            errors,
        })
    }
}

impl Report for ParsingSummary {
    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn summary(&self) -> String {
        if self.errors.is_empty() {
            "Parsing: OK".to_owned()
        } else {
            format!("Parsing: FAILED ({} error(s))", self.errors.len())
        }
    }

    fn write_report(&self, writer: &mut dyn Write) -> std::io::Result<()> {
        for error in &self.errors {
            writeln!(writer, "{error}")?;
        }
        Ok(())
    }
}
