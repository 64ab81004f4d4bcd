//! Filesystem utilities for cmext.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::error::UtilError;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> UtilError + '_ {
    move |source| UtilError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Create a directory and all parent directories if they do not exist.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<(), UtilError> {
    std::fs::create_dir_all(path).map_err(io_error(path))
}

/// Copy `src` to `dest`, overwriting any existing file at `dest`.
///
/// Parent directories of `dest` are created as needed.
///
/// # Errors
/// Returns an error if `src` cannot be read or `dest` cannot be written.
pub fn copy_file(src: &Path, dest: &Path) -> Result<(), UtilError> {
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }
    std::fs::copy(src, dest).map_err(io_error(src))?;
    Ok(())
}

/// Remove whatever lives at `path`: a directory is removed recursively,
/// anything else (regular file, symlink) is unlinked.
///
/// Returns `false` if nothing was there.
///
/// # Errors
/// Returns an error if the entry exists but cannot be removed.
pub fn remove_path(path: &Path) -> Result<bool, UtilError> {
    // symlink_metadata so a link to a directory is unlinked, not traversed.
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(source) => {
            return Err(UtilError::Io {
                path: path.display().to_string(),
                source,
            })
        }
    };

    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    match result {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(UtilError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Remove a directory and all its contents. No error if the directory is absent.
///
/// # Errors
/// Returns an error if the directory exists but cannot be removed.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<(), UtilError> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(UtilError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// List entries directly under `dir` whose names match `pattern`, sorted.
///
/// Only the pattern is interpreted as a glob; `dir` is matched literally.
/// Both files and directories are returned.
///
/// # Errors
/// Returns an error if the pattern is invalid.
pub fn glob_entries(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, UtilError> {
    let escaped_dir = glob::Pattern::escape(&dir.display().to_string());
    let full_pattern = Path::new(&escaped_dir).join(pattern).display().to_string();

    let mut paths: Vec<PathBuf> = glob::glob(&full_pattern)
        .map_err(|e| UtilError::GlobPattern {
            pattern: full_pattern.clone(),
            message: e.to_string(),
        })?
        .filter_map(Result::ok)
        .collect();

    paths.sort();
    Ok(paths)
}

/// Read the first line of a text file, without its line terminator.
///
/// # Errors
/// Returns an error if the file cannot be read or has no content.
pub fn read_first_line(path: &Path) -> Result<String, UtilError> {
    let file = std::fs::File::open(path).map_err(io_error(path))?;
    let mut line = String::new();
    let n = std::io::BufReader::new(file)
        .read_line(&mut line)
        .map_err(io_error(path))?;
    if n == 0 {
        return Err(UtilError::EmptyFile {
            path: path.display().to_string(),
        });
    }
    Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}
