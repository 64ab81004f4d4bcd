//! Process execution helpers for cmext.

use std::path::PathBuf;
use std::process::Command;

use crate::error::UtilError;

/// Exit information for a command whose output went straight to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// Whether the command exited successfully.
    pub success: bool,
    /// The exit code, if the process was not killed by a signal.
    pub exit_code: Option<i32>,
}

fn program_name(cmd: &Command) -> String {
    cmd.get_program().to_string_lossy().into_owned()
}

/// Execute a command with inherited stdio and wait for it to finish.
///
/// # Errors
/// Returns an error only if the command cannot be spawned. A non-zero exit
/// code is reported through `ExitOutcome`.
pub fn run_status(cmd: &mut Command) -> Result<ExitOutcome, UtilError> {
    tracing::debug!(command = ?cmd, "running");
    let status = cmd.status().map_err(|source| UtilError::CommandExec {
        program: program_name(cmd),
        source,
    })?;

    Ok(ExitOutcome {
        success: status.success(),
        exit_code: status.code(),
    })
}

/// Locate `name` on `PATH`.
///
/// # Errors
/// Returns `UtilError::ProgramNotFound` if no executable named `name` is found.
pub fn find_program(name: &str) -> Result<PathBuf, UtilError> {
    which::which(name).map_err(|_| UtilError::ProgramNotFound {
        name: name.to_owned(),
    })
}
