#[path = "../common/mod.rs"]
mod common;
mod test_cli;
mod test_grading;
