//! Runs lifecycle phases: each phase's own CMake work, wrapped by the hooks
//! registered before and after it.

use cmext_cmake::invoke::CmakeCommand;
use cmext_util::fs::ensure_dir;

use crate::context::PackageContext;
use crate::error::EngineError;
use crate::generator::select_generator;
use crate::housekeeping::base_clean;
use crate::lifecycle::{Hook, HookPoint, HookRegistry, Orchestrator, Phase};

#[derive(Debug, Default)]
pub struct Pipeline {
    registry: HookRegistry,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one phase: before-hooks, the phase itself, then after-hooks.
    ///
    /// # Errors
    /// Returns the first error from a hook or from the phase's CMake step.
    pub fn run_phase(&self, phase: Phase, ctx: &PackageContext) -> Result<(), EngineError> {
        self.registry.run(phase, HookPoint::Before, ctx)?;
        run_base_phase(phase, ctx)?;
        self.registry.run(phase, HookPoint::After, ctx)
    }

    /// Run the build phases in order, up to and including `last`.
    ///
    /// `Phase::Clean` is not part of the build sequence and runs on its own.
    ///
    /// # Errors
    /// Returns the first error from any phase; later phases do not run.
    pub fn run_through(&self, last: Phase, ctx: &PackageContext) -> Result<(), EngineError> {
        if last == Phase::Clean {
            return self.run_phase(Phase::Clean, ctx);
        }
        for phase in Phase::BUILD_SEQUENCE {
            self.run_phase(phase, ctx)?;
            if phase == last {
                break;
            }
        }
        Ok(())
    }
}

impl Orchestrator for Pipeline {
    fn register(&mut self, phase: Phase, point: HookPoint, hook: Hook) {
        self.registry.register(phase, point, hook);
    }
}

fn run_base_phase(phase: Phase, ctx: &PackageContext) -> Result<(), EngineError> {
    let build_dir = ctx.layout.build_dir();
    match phase {
        Phase::Cmake => {
            ensure_dir(build_dir)?;
            let mut cmd = CmakeCommand::configure(ctx.layout.source_dir(), build_dir)
                .generator(select_generator(&ctx.spec))
                .build_type(&ctx.build_type);
            if let Some(prefix) = &ctx.install_prefix {
                cmd = cmd.install_prefix(prefix);
            }
            cmd.execute(&ctx.toolchain.cmake)?;
        }
        Phase::Build => {
            CmakeCommand::build(build_dir, Some(ctx.settings.build_jobs))
                .execute(&ctx.toolchain.cmake)?;
        }
        Phase::Install => {
            CmakeCommand::install(build_dir).execute(&ctx.toolchain.cmake)?;
        }
        Phase::Clean => base_clean(&ctx.layout)?,
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use cmext_config::{BuildSpec, StageLayout};

    use super::*;
    use crate::context::TestEnvironment;
    use crate::extension::CmakeExtension;
    use crate::housekeeping::COMPILE_COMMANDS;

    const TEST_XML: &str = r#"<Site Name="darwin" BuildName="test">
  <Testing>
    <Test Status="failed"><Name>unit_mesh</Name></Test>
  </Testing>
</Site>
"#;

    fn install_ctx(root: &Path) -> PackageContext {
        let mut ctx = ctx(root, "true");
        ctx.toolchain.ctest = PathBuf::from("false");
        ctx.env = TestEnvironment::from_vars([("PATH", "/usr/bin:/bin")]);
        ctx
    }

    fn ctx(root: &Path, cmake: &str) -> PackageContext {
        let layout = StageLayout::new(root, &root.join("spack-build"));
        let spec = BuildSpec::new("p").with_parameter("dev_path", &root.display().to_string());
        let mut ctx = PackageContext::new(spec, layout);
        ctx.toolchain.cmake = PathBuf::from(cmake);
        ctx
    }

    fn marker_hook(ctx: &PackageContext) -> Result<(), EngineError> {
        let marker = ctx.layout.source_dir().join("markers");
        let mut seen = fs::read_to_string(&marker).unwrap_or_default();
        seen.push_str(&format!("{}\n", ctx.layout.build_dir().exists()));
        fs::write(&marker, seen).map_err(|source| {
            EngineError::Util(cmext_util::error::UtilError::Io {
                path: marker.display().to_string(),
                source,
            })
        })
    }

    #[test]
    fn configure_runs_hooks_after_cmake() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path(), "true");
        // Stand in for the database cmake would write.
        fs::create_dir_all(ctx.layout.build_dir()).unwrap();
        fs::write(ctx.layout.build_dir().join(COMPILE_COMMANDS), b"[]").unwrap();

        let mut pipeline = Pipeline::new();
        CmakeExtension::default().register(&mut pipeline);
        pipeline.run_phase(Phase::Cmake, &ctx).unwrap();

        assert!(tmp.path().join(COMPILE_COMMANDS).exists());
    }

    #[test]
    fn failing_cmake_skips_after_hooks() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path(), "false");

        let mut pipeline = Pipeline::new();
        pipeline.register(Phase::Cmake, HookPoint::After, Hook { name: "marker", run: marker_hook });
        let err = pipeline.run_phase(Phase::Cmake, &ctx).unwrap_err();

        assert!(err.to_string().contains("cmake configure failed"), "error was: {err}");
        assert!(!tmp.path().join("markers").exists());
    }

    #[test]
    fn before_hooks_run_before_the_phase() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path(), "true");

        let mut pipeline = Pipeline::new();
        pipeline.register(Phase::Cmake, HookPoint::Before, Hook { name: "marker", run: marker_hook });
        pipeline.register(Phase::Cmake, HookPoint::After, Hook { name: "marker", run: marker_hook });
        pipeline.run_phase(Phase::Cmake, &ctx).unwrap();

        // The configure step creates the build directory in between.
        assert_eq!(
            fs::read_to_string(tmp.path().join("markers")).unwrap(),
            "false\ntrue\n"
        );
    }

    #[test]
    fn run_through_stops_at_last_phase() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path(), "true");

        let mut pipeline = Pipeline::new();
        pipeline.register(Phase::Build, HookPoint::After, Hook { name: "marker", run: marker_hook });
        pipeline.register(Phase::Install, HookPoint::After, Hook { name: "marker", run: marker_hook });
        pipeline.run_through(Phase::Build, &ctx).unwrap();

        assert_eq!(fs::read_to_string(tmp.path().join("markers")).unwrap(), "true\n");
    }

    #[test]
    fn clean_phase_runs_base_then_source_cleanup() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path(), "true");
        fs::create_dir_all(ctx.layout.build_dir().join("CMakeFiles")).unwrap();
        fs::write(tmp.path().join("spack-build-out.txt"), b"log").unwrap();
        fs::write(tmp.path().join(COMPILE_COMMANDS), b"[]").unwrap();

        let mut pipeline = Pipeline::new();
        CmakeExtension::default().register(&mut pipeline);
        pipeline.run_through(Phase::Clean, &ctx).unwrap();

        assert!(!ctx.layout.build_dir().exists());
        assert!(!tmp.path().join("spack-build-out.txt").exists());
        assert!(!tmp.path().join(COMPILE_COMMANDS).exists());
    }

    #[test]
    fn install_with_failing_tests_still_publishes_results() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = install_ctx(tmp.path());
        let testing = ctx.layout.build_dir().join("Testing");
        fs::create_dir_all(testing.join("20240101-0100")).unwrap();
        fs::write(testing.join("TAG"), "20240101-0100\nExperimental\n").unwrap();
        fs::write(testing.join("20240101-0100").join("Test.xml"), TEST_XML).unwrap();

        let mut pipeline = Pipeline::new();
        CmakeExtension::default().register(&mut pipeline);
        pipeline.run_through(Phase::Install, &ctx).unwrap();

        let published = ctx.layout.results_dir().join("Test.xml");
        assert_eq!(fs::read_to_string(published).unwrap(), TEST_XML);
        assert!(ctx.layout.build_dir().join("spack_ctest.cmake").exists());
    }

    #[test]
    fn install_without_tag_fails_in_regression_hook() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = install_ctx(tmp.path());

        let mut pipeline = Pipeline::new();
        CmakeExtension::default().register(&mut pipeline);
        let err = pipeline.run_through(Phase::Install, &ctx).unwrap_err();

        assert!(
            matches!(
                err,
                EngineError::Hook {
                    phase: Phase::Install,
                    name: "regression_tests",
                    ..
                }
            ),
            "error was: {err}"
        );
        assert!(!ctx.layout.results_dir().join("Test.xml").exists());
    }

    #[test]
    fn install_skipping_tests_needs_no_results() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = install_ctx(tmp.path());

        let mut pipeline = Pipeline::new();
        CmakeExtension { run_tests: false }.register(&mut pipeline);
        pipeline.run_through(Phase::Install, &ctx).unwrap();
        assert!(!ctx.layout.build_dir().join("spack_ctest.cmake").exists());
    }
}
