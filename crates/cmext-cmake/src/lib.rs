#![forbid(unsafe_code)]
//! CMake and CTest invocation: tool detection, generator names, command
//! builders, CTest driver scripts, and result-file handling.

pub mod ctest;
pub mod detect;
pub mod error;
pub mod generator;
pub mod invoke;
pub mod results;

pub use error::CmakeError;
pub use generator::Generator;
