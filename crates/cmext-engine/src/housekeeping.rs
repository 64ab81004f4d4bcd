//! Source-tree housekeeping around the configure and clean phases.

use std::path::PathBuf;

use cmext_config::spec::DEV_PATH;
use cmext_config::{BuildSpec, StageLayout};
use cmext_util::fs::{copy_file, glob_entries, remove_dir_all_if_exists, remove_path};

use crate::error::EngineError;

/// Compiler-command database CMake writes into the build directory.
pub const COMPILE_COMMANDS: &str = "compile_commands.json";

/// Glob for scratch files the package manager leaves in a source tree.
pub const STRAY_ARTIFACTS: &str = "spack-*";

/// Copy `compile_commands.json` from the build tree into a developer checkout.
///
/// Does nothing unless the spec has a `dev_path` and the build tree has a
/// database to copy. Returns whether a copy was made.
///
/// # Errors
/// Returns an error if the copy fails.
pub fn copy_compile_commands(spec: &BuildSpec, layout: &StageLayout) -> Result<bool, EngineError> {
    if !spec.satisfies(&format!("{DEV_PATH}=*"))? {
        return Ok(false);
    }
    let source = layout.build_dir().join(COMPILE_COMMANDS);
    if !source.is_file() {
        tracing::debug!(path = %source.display(), "no compile database to copy");
        return Ok(false);
    }
    let target = layout.source_dir().join(COMPILE_COMMANDS);
    copy_file(&source, &target)?;
    tracing::debug!(to = %target.display(), "copied compile database");
    Ok(true)
}

/// What a clean removed from the source tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Whether source-tree removal was skipped because the tree is managed.
    pub skipped_managed: bool,
    pub removed: Vec<PathBuf>,
}

/// The clean every package gets: drop the build tree, and for a managed
/// stage the results directory as well.
///
/// Refuses to run when either directory is the source tree or an ancestor
/// of it.
///
/// # Errors
/// Returns an error if the layout overlaps the source tree, or if a directory
/// exists but cannot be removed.
pub fn base_clean(layout: &StageLayout) -> Result<(), EngineError> {
    layout.check_disjoint()?;
    remove_dir_all_if_exists(layout.build_dir())?;
    if layout.is_managed() {
        remove_dir_all_if_exists(layout.results_dir())?;
    }
    Ok(())
}

/// Remove `spack-*` entries and `compile_commands.json` from an unmanaged
/// source tree. A managed tree is left alone.
///
/// # Errors
/// Returns an error if an entry exists but cannot be removed.
pub fn clean_source_tree(layout: &StageLayout) -> Result<CleanReport, EngineError> {
    if layout.is_managed() {
        tracing::debug!("source tree is managed, leaving it alone");
        return Ok(CleanReport {
            skipped_managed: true,
            removed: Vec::new(),
        });
    }

    let mut targets = glob_entries(layout.source_dir(), STRAY_ARTIFACTS)?;
    targets.push(layout.source_dir().join(COMPILE_COMMANDS));

    let mut report = CleanReport::default();
    for target in targets {
        if remove_path(&target)? {
            report.removed.push(target);
        }
    }
    Ok(report)
}

/// Base clean followed by source-tree cleanup.
///
/// # Errors
/// Returns an error if any removal fails.
pub fn clean(layout: &StageLayout) -> Result<CleanReport, EngineError> {
    base_clean(layout)?;
    clean_source_tree(layout)
}
