#[path = "../common/mod.rs"]
mod common;
mod test_memcheck_parser;
