//! Everything a hook needs to know about the build it runs in.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use cmext_cmake::detect::Toolchain;
use cmext_config::manifest::DashboardSection;
use cmext_config::{BuildSpec, Manifest, Settings, StageLayout};

use crate::error::EngineError;

/// A snapshot of environment variables, handed unchanged to child processes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestEnvironment {
    vars: Vec<(OsString, OsString)>,
}

impl TestEnvironment {
    /// Snapshot the current process environment.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars_os().collect(),
        }
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&OsStr> {
        self.vars
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }

    pub fn vars(&self) -> &[(OsString, OsString)] {
        &self.vars
    }
}

/// The resolved inputs of one package build, shared by every phase and hook.
#[derive(Debug, Clone)]
pub struct PackageContext {
    pub spec: BuildSpec,
    pub layout: StageLayout,
    pub settings: Settings,
    pub dashboard: DashboardSection,
    pub toolchain: Toolchain,
    pub env: TestEnvironment,
    pub build_type: String,
    pub install_prefix: Option<PathBuf>,
}

impl PackageContext {
    /// A context with default settings, bare `cmake`/`ctest` resolved through
    /// `PATH` at launch, and the current process environment.
    pub fn new(spec: BuildSpec, layout: StageLayout) -> Self {
        Self {
            spec,
            layout,
            settings: Settings::default(),
            dashboard: DashboardSection::default(),
            toolchain: Toolchain {
                cmake: PathBuf::from("cmake"),
                ctest: PathBuf::from("ctest"),
            },
            env: TestEnvironment::capture(),
            build_type: "Release".to_owned(),
            install_prefix: None,
        }
    }

    /// Resolve a manifest found in `source_dir` into a context.
    ///
    /// # Errors
    /// Returns an error if the manifest names a variant the package does not
    /// declare, or a build or results directory that contains the source tree.
    pub fn from_manifest(source_dir: &Path, manifest: &Manifest) -> Result<Self, EngineError> {
        let spec = BuildSpec::from_manifest(manifest)?;
        let layout = StageLayout::from_section(source_dir, &manifest.stage)?;
        let mut ctx = Self::new(spec, layout);
        ctx.settings = Settings::from_section(&manifest.config);
        ctx.dashboard = manifest.dashboard.clone();
        Ok(ctx)
    }
}
