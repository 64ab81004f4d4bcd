#![forbid(unsafe_code)]
//! Filesystem, process, and program-lookup helpers shared by the cmext crates.

pub mod error;
pub mod fs;
pub mod process;
