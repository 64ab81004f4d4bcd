//! Locate and read the results CTest leaves under `<build>/Testing`.

use std::path::{Path, PathBuf};

use cmext_util::fs::read_first_line;

use crate::error::CmakeError;

/// Directory CTest writes dashboard output into, under the build directory.
pub const TESTING_DIR: &str = "Testing";
/// Tag file naming the most recent results directory.
pub const TAG_FILE: &str = "TAG";
/// Results file inside each timestamped directory.
pub const RESULTS_FILE: &str = "Test.xml";

/// The newest results file of a dashboard run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestResults {
    /// Timestamp read from the tag file, e.g. `20240101-0100`.
    pub timestamp: String,
    /// `<build>/Testing/<timestamp>/Test.xml`.
    pub path: PathBuf,
}

/// Read `<build>/Testing/TAG` and resolve the results file it points at.
///
/// # Errors
/// Returns an error if the tag file is missing, empty, or names something
/// other than a single directory component, or if the results file does not
/// exist.
pub fn latest_results(build_dir: &Path) -> Result<LatestResults, CmakeError> {
    let testing = build_dir.join(TESTING_DIR);
    let tag_path = testing.join(TAG_FILE);
    let timestamp = read_first_line(&tag_path)?.trim().to_owned();

    let malformed = |reason: &str| CmakeError::MalformedTag {
        path: tag_path.display().to_string(),
        reason: reason.to_owned(),
    };
    if timestamp.is_empty() {
        return Err(malformed("first line is blank"));
    }
    if timestamp.contains(['/', '\\']) || timestamp == "." || timestamp == ".." {
        return Err(malformed("timestamp is not a plain directory name"));
    }

    let path = testing.join(&timestamp).join(RESULTS_FILE);
    if !path.is_file() {
        return Err(CmakeError::Util(cmext_util::error::UtilError::Io {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "results file not found"),
        }));
    }

    Ok(LatestResults { timestamp, path })
}

/// Pass/fail counts from a CTest `Test.xml`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestSummary {
    pub passed: usize,
    pub failed: usize,
    pub not_run: usize,
}

impl TestSummary {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.not_run
    }

    /// Parse the contents of a `Test.xml`.
    ///
    /// Only `<Test>` elements carrying a `Status` attribute are counted; the
    /// bare entries of `<TestList>` are ignored.
    ///
    /// # Errors
    /// Returns an error if the document is not well-formed XML or has no
    /// `<Testing>` element.
    pub fn parse(xml: &str, path: &Path) -> Result<Self, CmakeError> {
        let malformed = |message: String| CmakeError::MalformedResults {
            path: path.display().to_string(),
            message,
        };
        let doc = roxmltree::Document::parse(xml).map_err(|e| malformed(e.to_string()))?;

        let Some(testing) = doc.descendants().find(|n| n.has_tag_name("Testing")) else {
            return Err(malformed("no <Testing> element".to_owned()));
        };

        let mut summary = Self::default();
        for test in testing.children().filter(|n| n.has_tag_name("Test")) {
            match test.attribute("Status") {
                Some("passed") => summary.passed += 1,
                Some("failed") => summary.failed += 1,
                Some(_) => summary.not_run += 1,
                None => {}
            }
        }
        Ok(summary)
    }

    /// Read and parse a `Test.xml` from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is malformed.
    pub fn from_path(path: &Path) -> Result<Self, CmakeError> {
        let xml = std::fs::read_to_string(path).map_err(|source| {
            cmext_util::error::UtilError::Io {
                path: path.display().to_string(),
                source,
            }
        })?;
        Self::parse(&xml, path)
    }
}
