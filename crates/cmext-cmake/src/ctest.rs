//! CTest dashboard scripts and `ctest -S` invocations.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, TimeDelta, TimeZone};

use cmext_util::process::{run_status, ExitOutcome};

use crate::error::CmakeError;

/// File name of the generated driver script, written into the build directory.
pub const SCRIPT_FILE: &str = "spack_ctest.cmake";

/// Variable the driver script stores the `ctest_test` result in.
pub const RETURN_VARIABLE: &str = "test_status";

/// A CTest driver script for one experimental dashboard run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtestScript {
    pub source_dir: PathBuf,
    pub binary_dir: PathBuf,
    pub site: String,
    pub build_name: String,
    pub test_timeout_secs: u64,
    pub track: String,
    pub parallel_level: u32,
}

impl CtestScript {
    /// Render the script in CMake syntax.
    pub fn render(&self) -> String {
        format!(
            "set(CTEST_SOURCE_DIRECTORY \"{source}\")\n\
             set(CTEST_BINARY_DIRECTORY \"{binary}\")\n\
             set(CTEST_SITE \"{site}\" )\n\
             set(CTEST_BUILD_NAME \"{build_name}\" )\n\
             set(CTEST_TEST_TIMEOUT \"{timeout}\" )\n\
             ctest_start ( \"Experimental\" TRACK \"{track}\" )\n\
             ctest_test ( PARALLEL_LEVEL {parallel} RETURN_VALUE {RETURN_VARIABLE} )\n",
            source = quote(&self.source_dir.display().to_string()),
            binary = quote(&self.binary_dir.display().to_string()),
            site = quote(&self.site),
            build_name = quote(&self.build_name),
            timeout = self.test_timeout_secs,
            track = quote(&self.track),
            parallel = self.parallel_level,
        )
    }

    /// Write the script to `dir/spack_ctest.cmake` and return its path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, CmakeError> {
        let path = dir.join(SCRIPT_FILE);
        std::fs::write(&path, self.render()).map_err(|source| {
            cmext_util::error::UtilError::Io {
                path: path.display().to_string(),
                source,
            }
        })?;
        Ok(path)
    }
}

/// Escape `value` for use inside a quoted CMake argument.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// The wall-clock time `ceiling` after `now`, as `HH:MM:SS` in `now`'s zone.
///
/// Returns `None` if the addition overflows the representable date range.
pub fn stop_time<Tz: TimeZone>(now: &DateTime<Tz>, ceiling: TimeDelta) -> Option<String>
where
    Tz::Offset: std::fmt::Display,
{
    let stop = now.clone().checked_add_signed(ceiling)?;
    Some(stop.format("%H:%M:%S").to_string())
}

/// Builder for a `ctest -S <script>` invocation.
#[derive(Debug, Clone, Default)]
pub struct CtestCommand {
    script: PathBuf,
    stop_time: Option<String>,
    verbose: bool,
    filter: Option<String>,
    working_dir: Option<PathBuf>,
    env: Option<Vec<(OsString, OsString)>>,
}

impl CtestCommand {
    pub fn new(script: &Path) -> Self {
        Self {
            script: script.to_path_buf(),
            ..Self::default()
        }
    }

    /// Pass `--stop-time <HH:MM:SS>`.
    pub fn stop_time(mut self, stop_time: &str) -> Self {
        self.stop_time = Some(stop_time.to_owned());
        self
    }

    /// Pass `-VV`.
    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    /// Pass `-R <regex>`.
    pub fn filter(mut self, regex: &str) -> Self {
        self.filter = Some(regex.to_owned());
        self
    }

    /// Run from `dir` instead of the current directory.
    pub fn working_dir(mut self, dir: &Path) -> Self {
        self.working_dir = Some(dir.to_path_buf());
        self
    }

    /// Replace the child environment with exactly `vars`.
    pub fn env(mut self, vars: &[(OsString, OsString)]) -> Self {
        self.env = Some(vars.to_vec());
        self
    }

    /// Build the argument list without executing.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-S".to_owned(), self.script.display().to_string()];
        if let Some(stop_time) = &self.stop_time {
            args.push("--stop-time".to_owned());
            args.push(stop_time.clone());
        }
        if self.verbose {
            args.push("-VV".to_owned());
        }
        if let Some(filter) = &self.filter {
            args.push("-R".to_owned());
            args.push(filter.clone());
        }
        args
    }

    /// Run ctest with the given binary.
    ///
    /// A non-zero exit status (failing tests) is returned, not raised.
    ///
    /// # Errors
    /// Returns an error only if ctest cannot be launched.
    pub fn execute(&self, ctest: &Path) -> Result<ExitOutcome, CmakeError> {
        let args = self.build_args();
        let mut cmd = Command::new(ctest);
        cmd.args(&args);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        if let Some(vars) = &self.env {
            cmd.env_clear();
            cmd.envs(vars.iter().map(|(k, v)| (k, v)));
        }
        tracing::debug!("running ctest {}", args.join(" "));
        Ok(run_status(&mut cmd)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, Utc};
    use proptest::prelude::*;

    fn script() -> CtestScript {
        CtestScript {
            source_dir: PathBuf::from("/src/nalu-wind"),
            binary_dir: PathBuf::from("/src/nalu-wind/spack-build"),
            site: "darwin".to_owned(),
            build_name: "test".to_owned(),
            test_timeout_secs: 300,
            track: "track".to_owned(),
            parallel_level: 4,
        }
    }

    #[test]
    fn render_matches_dashboard_layout() {
        let expected = "\
set(CTEST_SOURCE_DIRECTORY \"/src/nalu-wind\")
set(CTEST_BINARY_DIRECTORY \"/src/nalu-wind/spack-build\")
set(CTEST_SITE \"darwin\" )
set(CTEST_BUILD_NAME \"test\" )
set(CTEST_TEST_TIMEOUT \"300\" )
ctest_start ( \"Experimental\" TRACK \"track\" )
ctest_test ( PARALLEL_LEVEL 4 RETURN_VALUE test_status )
";
        assert_eq!(script().render(), expected);
    }

    #[test]
    fn render_escapes_quoted_arguments() {
        let mut script = script();
        script.source_dir = PathBuf::from(r#"/src/a "b"\c"#);
        script.site = "${HOME}".to_owned();
        let rendered = script.render();
        assert!(
            rendered.starts_with(r#"set(CTEST_SOURCE_DIRECTORY "/src/a \"b\"\\c")"#),
            "rendered: {rendered}"
        );
        assert!(
            rendered.contains(r#"set(CTEST_SITE "\${HOME}" )"#),
            "rendered: {rendered}"
        );
    }

    #[test]
    fn quote_leaves_plain_paths_alone() {
        assert_eq!(quote("/src/nalu-wind/spack-build"), "/src/nalu-wind/spack-build");
        assert_eq!(quote(r#"a"b"#), r#"a\"b"#);
        assert_eq!(quote(r"a\b"), r"a\\b");
    }

    #[test]
    fn write_to_places_script_in_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let path = script().write_to(tmp.path()).unwrap();
        assert_eq!(path, tmp.path().join(SCRIPT_FILE));
        assert_eq!(std::fs::read_to_string(path).unwrap(), script().render());
    }

    #[test]
    fn write_to_missing_dir_errors() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(script().write_to(&tmp.path().join("absent")).is_err());
    }

    #[test]
    fn stop_time_four_hours_later() {
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
            .and_utc();
        assert_eq!(
            stop_time(&now, TimeDelta::hours(4)).unwrap(),
            "14:00:00"
        );
    }

    #[test]
    fn stop_time_wraps_past_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 22, 30, 15).unwrap();
        assert_eq!(stop_time(&now, TimeDelta::hours(4)).unwrap(), "02:30:15");
    }

    #[test]
    fn stop_time_uses_the_given_zone() {
        let zone = FixedOffset::east_opt(-7 * 3600).unwrap();
        let now = zone.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(stop_time(&now, TimeDelta::hours(4)).unwrap(), "14:00:00");
    }

    #[test]
    fn ctest_args_full() {
        let args = CtestCommand::new(Path::new(SCRIPT_FILE))
            .stop_time("14:00:00")
            .verbose(true)
            .filter("unit")
            .build_args();
        assert_eq!(
            args,
            vec![
                "-S",
                "spack_ctest.cmake",
                "--stop-time",
                "14:00:00",
                "-VV",
                "-R",
                "unit"
            ]
        );
    }

    #[test]
    fn ctest_args_minimal() {
        let args = CtestCommand::new(Path::new("drive.cmake")).build_args();
        assert_eq!(args, vec!["-S", "drive.cmake"]);
    }

    #[test]
    fn execute_failing_tests_is_not_an_error() {
        let outcome = CtestCommand::new(Path::new(SCRIPT_FILE))
            .execute(Path::new("false"))
            .unwrap();
        assert!(!outcome.success);
    }

    #[test]
    fn execute_missing_binary_is_an_error() {
        assert!(CtestCommand::new(Path::new(SCRIPT_FILE))
            .execute(Path::new("nonexistent_ctest_xyz"))
            .is_err());
    }

    #[cfg(unix)]
    #[test]
    fn execute_passes_only_the_given_env() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let probe = tmp.path().join("fake-ctest");
        std::fs::write(
            &probe,
            "#!/bin/sh\n[ \"$CMEXT_PROBE\" = yes ] && [ -z \"$HOME\" ]\n",
        )
        .unwrap();
        std::fs::set_permissions(&probe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let vars = vec![(OsString::from("CMEXT_PROBE"), OsString::from("yes"))];
        let outcome = CtestCommand::new(Path::new(SCRIPT_FILE))
            .env(&vars)
            .working_dir(tmp.path())
            .execute(&probe)
            .unwrap();
        assert!(outcome.success);
    }

    proptest! {
        #[test]
        fn stop_time_is_ceiling_after_now_modulo_one_day(
            secs in 0i64..86_400,
            ceiling in 0i64..172_800,
        ) {
            let now = Utc.timestamp_opt(1_704_067_200 + secs, 0).unwrap();
            let rendered = stop_time(&now, TimeDelta::seconds(ceiling)).unwrap();
            let parts: Vec<i64> = rendered.split(':').map(|p| p.parse().unwrap()).collect();
            let [h, m, s] = parts.as_slice() else {
                return Err(TestCaseError::fail(format!("bad stop time {rendered}")));
            };
            prop_assert_eq!(h * 3600 + m * 60 + s, (secs + ceiling) % 86_400);
        }
    }
}
