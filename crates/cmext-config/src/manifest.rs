use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// File name of the per-package manifest, looked up in the source directory.
pub const MANIFEST_FILE: &str = "cmext.toml";

/// The `cmext.toml` package manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub package: Package,
    /// Variant name to enabled flag. Undeclared variants are rejected later,
    /// when the manifest is resolved into a `BuildSpec`.
    #[serde(default)]
    pub variants: BTreeMap<String, bool>,
    /// Free-form `key = "value"` parameters, e.g. `dev_path`.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub stage: StageSection,
    #[serde(default)]
    pub config: ConfigSection,
    #[serde(default)]
    pub dashboard: DashboardSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Package {
    #[serde(default = "default_package_name")]
    pub name: String,
}

impl Default for Package {
    fn default() -> Self {
        Self {
            name: default_package_name(),
        }
    }
}

/// Where the build tree and result files live, and who owns the source tree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageSection {
    /// Build directory, relative to the source directory unless absolute.
    #[serde(default = "default_build_dir")]
    pub build_dir: String,
    /// Results directory, relative to the build directory unless absolute.
    #[serde(default = "default_results_dir")]
    pub results_dir: String,
    /// Whether the source tree is owned by the package manager's staging.
    #[serde(default)]
    pub managed: bool,
}

impl Default for StageSection {
    fn default() -> Self {
        Self {
            build_dir: default_build_dir(),
            results_dir: default_results_dir(),
            managed: false,
        }
    }
}

/// Global settings shared by every package build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    #[serde(default)]
    pub build_jobs: Option<u32>,
}

/// Dashboard identifiers and test-run limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardSection {
    #[serde(default = "default_site")]
    pub site: String,
    #[serde(default = "default_build_name")]
    pub build_name: String,
    #[serde(default = "default_track")]
    pub track: String,
    /// Per-test timeout written into the CTest script.
    #[serde(default = "default_test_timeout_secs")]
    pub test_timeout_secs: u64,
    /// Wall-clock ceiling for the whole ctest run, passed as `--stop-time`.
    #[serde(default = "default_stop_time_ceiling_secs")]
    pub stop_time_ceiling_secs: u64,
    /// Regex passed to `ctest -R`.
    #[serde(default = "default_test_filter")]
    pub test_filter: String,
}

impl Default for DashboardSection {
    fn default() -> Self {
        Self {
            site: default_site(),
            build_name: default_build_name(),
            track: default_track(),
            test_timeout_secs: default_test_timeout_secs(),
            stop_time_ceiling_secs: default_stop_time_ceiling_secs(),
            test_filter: default_test_filter(),
        }
    }
}

fn default_package_name() -> String {
    "cmake-extension".to_owned()
}

fn default_build_dir() -> String {
    "spack-build".to_owned()
}

fn default_results_dir() -> String {
    "spack-build-results".to_owned()
}

fn default_site() -> String {
    "darwin".to_owned()
}

fn default_build_name() -> String {
    "test".to_owned()
}

fn default_track() -> String {
    "track".to_owned()
}

fn default_test_timeout_secs() -> u64 {
    5 * 60
}

fn default_stop_time_ceiling_secs() -> u64 {
    4 * 60 * 60
}

fn default_test_filter() -> String {
    "unit".to_owned()
}

impl Manifest {
    /// Read and parse a `cmext.toml` from the given path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_str_at(&content, path)
    }

    /// Load `cmext.toml` from `source_dir`, or the defaults if there is none.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(source_dir: &Path) -> Result<Self, ManifestError> {
        let path = source_dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_path(&path)
    }

    fn from_str_at(content: &str, path: &Path) -> Result<Self, ManifestError> {
        toml::from_str(content).map_err(|e| ManifestError::Parse {
            path: path.display().to_string(),
            source: e,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid cmext.toml at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("{kind} directory {path} contains the source directory {source_dir} — removing it would delete the checkout")]
    StageOverlapsSource {
        kind: &'static str,
        path: String,
        source_dir: String,
    },
}
