//! Error types for cmext-cmake.

/// Errors produced by CMake/CTest detection, invocation, and result handling.
#[derive(Debug, thiserror::Error)]
pub enum CmakeError {
    /// A required tool was not found on the system.
    #[error("{tool} not found — install it and add it to PATH")]
    NotFound { tool: String },

    /// A CMake step ran but exited unsuccessfully.
    #[error("cmake {step} failed{}", exit_suffix(.exit_code))]
    StepFailed {
        step: &'static str,
        exit_code: Option<i32>,
    },

    /// A CTest tag file did not name a usable results directory.
    #[error("malformed tag file {path}: {reason}")]
    MalformedTag { path: String, reason: String },

    /// A results XML file could not be parsed.
    #[error("malformed results file {path}: {message}")]
    MalformedResults { path: String, message: String },

    /// An error propagated from cmext-util.
    #[error("{0}")]
    Util(#[from] cmext_util::error::UtilError),
}

fn exit_suffix(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!(" with exit code {code}"),
        None => " (terminated by signal)".to_owned(),
    }
}
