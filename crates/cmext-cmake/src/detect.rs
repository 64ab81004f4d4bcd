//! Locate the CMake toolchain on `PATH`.

use std::path::PathBuf;

use cmext_util::process::find_program;

use crate::error::CmakeError;

/// Absolute paths to the CMake programs a build needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub cmake: PathBuf,
    pub ctest: PathBuf,
}

/// Locate a single tool on `PATH`.
///
/// # Errors
/// Returns `CmakeError::NotFound` if the tool is not on `PATH`.
pub fn locate(tool: &str) -> Result<PathBuf, CmakeError> {
    let path = find_program(tool).map_err(|_| CmakeError::NotFound {
        tool: tool.to_owned(),
    })?;
    tracing::debug!(tool, path = %path.display(), "located");
    Ok(path)
}

/// Look up each of `tools`, reporting every result rather than stopping at
/// the first missing one.
pub fn check_tools<'a>(tools: &[&'a str]) -> Vec<(&'a str, Result<PathBuf, CmakeError>)> {
    tools.iter().map(|tool| (*tool, locate(tool))).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn locate_missing_tool() {
        let err = locate("nonexistent_cmake_xyz").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("nonexistent_cmake_xyz"), "error was: {msg}");
        assert!(msg.contains("PATH"), "error was: {msg}");
    }

    #[test]
    fn check_tools_reports_each() {
        let results = check_tools(&["sh", "nonexistent_cmake_xyz"]);
        assert_eq!(results.len(), 2);
        let (first, second) = (results.first().unwrap(), results.get(1).unwrap());
        assert_eq!(first.0, "sh");
        assert!(first.1.is_ok());
        assert_eq!(second.0, "nonexistent_cmake_xyz");
        assert!(second.1.is_err());
    }
}
