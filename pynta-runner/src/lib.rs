//! The pynta-runner library
//!
//! Compiles a C source file, runs the resulting executable (optionally under valgrind memcheck),
//! checks its outputs and function signatures and writes one report per stage.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod error;
pub mod runner;
pub mod util;
