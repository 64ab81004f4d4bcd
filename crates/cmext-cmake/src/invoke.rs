//! CMake configure, build, and install invocations.

use std::path::{Path, PathBuf};
use std::process::Command;

use cmext_util::process::run_status;

use crate::error::CmakeError;
use crate::generator::Generator;

/// Which CMake step a command runs.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Configure { source_dir: PathBuf },
    Build { jobs: Option<u32> },
    Install,
}

impl Step {
    fn label(&self) -> &'static str {
        match self {
            Step::Configure { .. } => "configure",
            Step::Build { .. } => "build",
            Step::Install => "install",
        }
    }
}

/// Builder for a single `cmake` invocation against a build directory.
#[derive(Debug, Clone)]
pub struct CmakeCommand {
    step: Step,
    build_dir: PathBuf,
    generator: Generator,
    build_type: Option<String>,
    install_prefix: Option<PathBuf>,
    defines: Vec<(String, String)>,
}

impl CmakeCommand {
    fn with_step(step: Step, build_dir: &Path) -> Self {
        Self {
            step,
            build_dir: build_dir.to_path_buf(),
            generator: Generator::default(),
            build_type: None,
            install_prefix: None,
            defines: Vec::new(),
        }
    }

    /// `cmake -S <source> -B <build> ...`; always exports `compile_commands.json`.
    pub fn configure(source_dir: &Path, build_dir: &Path) -> Self {
        Self::with_step(
            Step::Configure {
                source_dir: source_dir.to_path_buf(),
            },
            build_dir,
        )
    }

    /// `cmake --build <build> [--parallel <jobs>]`.
    pub fn build(build_dir: &Path, jobs: Option<u32>) -> Self {
        Self::with_step(Step::Build { jobs }, build_dir)
    }

    /// `cmake --install <build>`.
    pub fn install(build_dir: &Path) -> Self {
        Self::with_step(Step::Install, build_dir)
    }

    /// Set the generator (configure only).
    pub fn generator(mut self, generator: Generator) -> Self {
        self.generator = generator;
        self
    }

    /// Set `CMAKE_BUILD_TYPE` (configure only).
    pub fn build_type(mut self, build_type: &str) -> Self {
        self.build_type = Some(build_type.to_owned());
        self
    }

    /// Set `CMAKE_INSTALL_PREFIX` (configure only).
    pub fn install_prefix(mut self, prefix: &Path) -> Self {
        self.install_prefix = Some(prefix.to_path_buf());
        self
    }

    /// Add a `-D<key>=<value>` cache entry (configure only).
    pub fn define(mut self, key: &str, value: &str) -> Self {
        self.defines.push((key.to_owned(), value.to_owned()));
        self
    }

    /// Build the argument list without executing.
    pub fn build_args(&self) -> Vec<String> {
        let build_dir = self.build_dir.display().to_string();
        let mut args = Vec::new();

        match &self.step {
            Step::Configure { source_dir } => {
                args.push("-S".to_owned());
                args.push(source_dir.display().to_string());
                args.push("-B".to_owned());
                args.push(build_dir);
                args.push("-G".to_owned());
                args.push(self.generator.as_str().to_owned());
                args.push("-DCMAKE_EXPORT_COMPILE_COMMANDS=ON".to_owned());
                if let Some(build_type) = &self.build_type {
                    args.push(format!("-DCMAKE_BUILD_TYPE={build_type}"));
                }
                if let Some(prefix) = &self.install_prefix {
                    args.push(format!("-DCMAKE_INSTALL_PREFIX={}", prefix.display()));
                }
                for (key, value) in &self.defines {
                    args.push(format!("-D{key}={value}"));
                }
            }
            Step::Build { jobs } => {
                args.push("--build".to_owned());
                args.push(build_dir);
                if let Some(jobs) = jobs {
                    args.push("--parallel".to_owned());
                    args.push(jobs.to_string());
                }
            }
            Step::Install => {
                args.push("--install".to_owned());
                args.push(build_dir);
            }
        }

        args
    }

    /// Run the step with the given `cmake` binary.
    ///
    /// # Errors
    /// Returns an error if `cmake` cannot be launched or exits unsuccessfully.
    pub fn execute(&self, cmake: &Path) -> Result<(), CmakeError> {
        let args = self.build_args();
        tracing::debug!(step = self.step.label(), ?args, "running cmake");

        let outcome = run_status(Command::new(cmake).args(&args))?;
        if !outcome.success {
            return Err(CmakeError::StepFailed {
                step: self.step.label(),
                exit_code: outcome.exit_code,
            });
        }
        Ok(())
    }
}
