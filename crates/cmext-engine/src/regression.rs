//! Post-install regression tests: write a CTest dashboard script, run the
//! unit tests under a wall-clock ceiling, and keep the newest `Test.xml`.

use std::path::PathBuf;

use chrono::{DateTime, Local, TimeDelta, TimeZone};

use cmext_cmake::ctest::{stop_time, CtestCommand, CtestScript};
use cmext_cmake::results::{latest_results, LatestResults, TestSummary, RESULTS_FILE};
use cmext_config::manifest::DashboardSection;
use cmext_config::Settings;
use cmext_util::fs::copy_file;
use cmext_util::process::ExitOutcome;

use crate::context::{PackageContext, TestEnvironment};
use crate::error::EngineError;

/// Environment variable that overrides the ctest parallel level.
pub const PARALLEL_LEVEL_VAR: &str = "CTEST_TEST_PARALLEL_LEVEL";

/// Dashboard settings for one regression run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub site: String,
    pub build_name: String,
    pub track: String,
    pub test_timeout_secs: u64,
    /// Independent of `test_timeout_secs`; bounds the whole ctest run.
    pub stop_time_ceiling_secs: u64,
    pub parallel_level: u32,
    pub test_filter: String,
}

impl DashboardConfig {
    /// Combine dashboard settings with the parallel level resolved from `env`.
    ///
    /// # Errors
    /// Returns an error if `CTEST_TEST_PARALLEL_LEVEL` is set but invalid.
    pub fn resolve(
        dashboard: &DashboardSection,
        env: &TestEnvironment,
        settings: &Settings,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            site: dashboard.site.clone(),
            build_name: dashboard.build_name.clone(),
            track: dashboard.track.clone(),
            test_timeout_secs: dashboard.test_timeout_secs,
            stop_time_ceiling_secs: dashboard.stop_time_ceiling_secs,
            parallel_level: resolve_parallel_level(env, settings.build_jobs)?,
            test_filter: dashboard.test_filter.clone(),
        })
    }

    /// `now` plus the stop-time ceiling, as `HH:MM:SS`.
    ///
    /// # Errors
    /// Returns an error if the ceiling overflows the date range.
    pub fn stop_time_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<String, EngineError>
    where
        Tz::Offset: std::fmt::Display,
    {
        let out_of_range = || EngineError::StopTimeOutOfRange {
            secs: self.stop_time_ceiling_secs,
        };
        let secs = i64::try_from(self.stop_time_ceiling_secs).map_err(|_| out_of_range())?;
        let ceiling = TimeDelta::try_seconds(secs).ok_or_else(out_of_range)?;
        stop_time(now, ceiling).ok_or_else(out_of_range)
    }
}

/// `CTEST_TEST_PARALLEL_LEVEL` from `env` if set, otherwise `build_jobs`.
///
/// # Errors
/// Returns an error if the variable is set to anything but a positive integer.
pub fn resolve_parallel_level(env: &TestEnvironment, build_jobs: u32) -> Result<u32, EngineError> {
    let Some(raw) = env.get(PARALLEL_LEVEL_VAR) else {
        return Ok(build_jobs);
    };
    let value = raw.to_string_lossy();
    match value.trim().parse::<u32>() {
        Ok(level) if level > 0 => Ok(level),
        _ => Err(EngineError::InvalidParallelLevel {
            value: value.into_owned(),
        }),
    }
}

/// What a regression run produced.
#[derive(Debug, Clone)]
pub struct TestRunOutcome {
    /// Exit status of ctest; failing tests do not make the run an error.
    pub exit: ExitOutcome,
    pub script: PathBuf,
    pub latest: LatestResults,
    /// Where `Test.xml` was copied to.
    pub copied_to: PathBuf,
    pub summary: TestSummary,
}

/// Run the regression tests for an installed package, stopping at local now
/// plus the configured ceiling.
///
/// # Errors
/// See [`run_regression_tests_at`].
pub fn run_regression_tests(ctx: &PackageContext) -> Result<TestRunOutcome, EngineError> {
    run_regression_tests_at(ctx, &Local::now())
}

/// Run the regression tests with an explicit "now" for the stop time.
///
/// ctest exiting non-zero is logged and tolerated. Everything else (writing
/// the script, launching ctest, reading `Testing/TAG`, parsing and copying
/// `Test.xml`) is fatal.
///
/// # Errors
/// Returns an error if any of the fatal steps above fails.
pub fn run_regression_tests_at<Tz: TimeZone>(
    ctx: &PackageContext,
    now: &DateTime<Tz>,
) -> Result<TestRunOutcome, EngineError>
where
    Tz::Offset: std::fmt::Display,
{
    let name = ctx.spec.name();
    let build_dir = ctx.layout.build_dir();
    let config = DashboardConfig::resolve(&ctx.dashboard, &ctx.env, &ctx.settings)?;

    tracing::debug!("{name} creating CTest script");
    let script = CtestScript {
        source_dir: ctx.layout.source_dir().to_path_buf(),
        binary_dir: build_dir.to_path_buf(),
        site: config.site.clone(),
        build_name: config.build_name.clone(),
        test_timeout_secs: config.test_timeout_secs,
        track: config.track.clone(),
        parallel_level: config.parallel_level,
    }
    .write_to(build_dir)?;

    let stop = config.stop_time_after(now)?;
    let script_name = script.file_name().map(PathBuf::from).unwrap_or_else(|| script.clone());

    tracing::debug!("{name} running CTest script");
    let exit = CtestCommand::new(&script_name)
        .stop_time(&stop)
        .verbose(true)
        .filter(&config.test_filter)
        .working_dir(build_dir)
        .env(ctx.env.vars())
        .execute(&ctx.toolchain.ctest)?;

    if !exit.success {
        tracing::warn!(
            exit_code = ?exit.exit_code,
            "{name} ctest reported failures; continuing"
        );
    }

    let latest = latest_results(build_dir)?;
    let summary = TestSummary::from_path(&latest.path)?;
    let copied_to = ctx.layout.results_dir().join(RESULTS_FILE);
    copy_file(&latest.path, &copied_to)?;
    tracing::info!(
        passed = summary.passed,
        failed = summary.failed,
        not_run = summary.not_run,
        "{name} results copied to {}",
        copied_to.display()
    );

    Ok(TestRunOutcome {
        exit,
        script,
        latest,
        copied_to,
        summary,
    })
}
