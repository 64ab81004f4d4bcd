//! Error types for cmext-util.

/// Errors produced by utility functions.
#[derive(Debug, thiserror::Error)]
pub enum UtilError {
    /// An I/O operation failed.
    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// A glob pattern was invalid.
    #[error("invalid glob pattern `{pattern}`: {message}")]
    GlobPattern { pattern: String, message: String },

    /// A command failed to launch.
    #[error("cannot execute `{program}`: {source}")]
    CommandExec {
        program: String,
        source: std::io::Error,
    },

    /// A program could not be found on `PATH`.
    #[error("`{name}` not found on PATH — install it or add its directory to PATH")]
    ProgramNotFound { name: String },

    /// A file that must carry at least one line of content was empty.
    #[error("{path} is empty — expected at least one line")]
    EmptyFile { path: String },
}
