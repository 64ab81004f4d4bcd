//! Error types for cmext-engine.

use crate::lifecycle::Phase;

/// Errors produced by engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A utility operation failed.
    #[error("{0}")]
    Util(#[from] cmext_util::error::UtilError),

    /// A CMake or CTest operation failed.
    #[error("{0}")]
    Cmake(#[from] cmext_cmake::CmakeError),

    /// A manifest operation failed.
    #[error("{0}")]
    Manifest(#[from] cmext_config::manifest::ManifestError),

    /// The build spec could not be resolved or queried.
    #[error("{0}")]
    Spec(#[from] cmext_config::spec::SpecError),

    /// `CTEST_TEST_PARALLEL_LEVEL` is set to something other than a positive integer.
    #[error("CTEST_TEST_PARALLEL_LEVEL must be a positive integer, got \"{value}\"")]
    InvalidParallelLevel { value: String },

    /// The stop-time ceiling does not fit in a date.
    #[error("stop-time ceiling of {secs}s is out of range")]
    StopTimeOutOfRange { secs: u64 },

    /// A registered hook failed.
    #[error("{phase} hook `{name}` failed: {source}")]
    Hook {
        phase: Phase,
        name: &'static str,
        source: Box<EngineError>,
    },
}
