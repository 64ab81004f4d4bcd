//! The CMake extension's hooks and their registration.

use crate::context::PackageContext;
use crate::error::EngineError;
use crate::housekeeping::{clean_source_tree, copy_compile_commands};
use crate::lifecycle::{Hook, HookPoint, Orchestrator, Phase};
use crate::regression::{run_regression_tests, TestRunOutcome};

/// Extends a plain CMake package with compile-database copying, source-tree
/// cleanup, and post-install regression tests.
#[derive(Debug, Clone, Copy)]
pub struct CmakeExtension {
    /// Whether to run the regression tests after install.
    pub run_tests: bool,
}

impl Default for CmakeExtension {
    fn default() -> Self {
        Self { run_tests: true }
    }
}

impl CmakeExtension {
    pub fn register<O: Orchestrator + ?Sized>(&self, orchestrator: &mut O) {
        orchestrator.register(
            Phase::Cmake,
            HookPoint::After,
            Hook {
                name: "copy_compile_commands",
                run: copy_compile_commands_hook,
            },
        );
        if self.run_tests {
            orchestrator.register(
                Phase::Install,
                HookPoint::After,
                Hook {
                    name: "regression_tests",
                    run: regression_tests_hook,
                },
            );
        }
        orchestrator.register(
            Phase::Clean,
            HookPoint::After,
            Hook {
                name: "clean_source_tree",
                run: clean_source_tree_hook,
            },
        );
    }
}

fn copy_compile_commands_hook(ctx: &PackageContext) -> Result<(), EngineError> {
    copy_compile_commands(&ctx.spec, &ctx.layout)?;
    Ok(())
}

fn regression_tests_hook(ctx: &PackageContext) -> Result<(), EngineError> {
    let outcome = run_regression_tests(ctx)?;
    report_test_run(ctx, &outcome);
    Ok(())
}

/// Print the status lines for a finished regression run.
pub fn report_test_run(ctx: &PackageContext, outcome: &TestRunOutcome) {
    if !outcome.exit.success {
        eprintln!("    ctest reported failures; results kept for the dashboard");
    }
    eprintln!(
        "    Tested {} ({} passed, {} failed, {} not run) \u{2192} {}",
        ctx.spec.name(),
        outcome.summary.passed,
        outcome.summary.failed,
        outcome.summary.not_run,
        outcome.copied_to.display()
    );
}

fn clean_source_tree_hook(ctx: &PackageContext) -> Result<(), EngineError> {
    let report = clean_source_tree(&ctx.layout)?;
    if report.skipped_managed {
        eprintln!("    Source tree is managed; left it untouched");
    }
    for path in &report.removed {
        eprintln!("    Removed {}", path.display());
    }
    Ok(())
}
