//! Source, build, and results directories for one package build.

use std::path::{Component, Path, PathBuf};

use crate::manifest::{ManifestError, StageSection};

/// Paths owned by the staging subsystem. Hooks read from it, never mutate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageLayout {
    source_dir: PathBuf,
    build_dir: PathBuf,
    results_dir: PathBuf,
    managed: bool,
}

impl StageLayout {
    /// Layout with the default results directory under `build_dir`, unmanaged.
    pub fn new(source_dir: &Path, build_dir: &Path) -> Self {
        Self {
            source_dir: source_dir.to_path_buf(),
            build_dir: build_dir.to_path_buf(),
            results_dir: build_dir.join(StageSection::default().results_dir),
            managed: false,
        }
    }

    /// Resolve a `[stage]` section against `source_dir`.
    ///
    /// `build_dir` is relative to the source directory, `results_dir` to the
    /// build directory; absolute paths are taken as-is.
    ///
    /// # Errors
    /// Returns `ManifestError::StageOverlapsSource` if the build or results
    /// directory is the source directory or one of its ancestors.
    pub fn from_section(source_dir: &Path, section: &StageSection) -> Result<Self, ManifestError> {
        let build_dir = source_dir.join(&section.build_dir);
        let results_dir = build_dir.join(&section.results_dir);
        let layout = Self {
            source_dir: source_dir.to_path_buf(),
            build_dir,
            results_dir,
            managed: section.managed,
        };
        layout.check_disjoint()?;
        Ok(layout)
    }

    /// Check that removing the build or results directory cannot take the
    /// source tree with it. Paths are compared lexically.
    ///
    /// # Errors
    /// Returns `ManifestError::StageOverlapsSource` naming the offending
    /// directory.
    pub fn check_disjoint(&self) -> Result<(), ManifestError> {
        let source = lexical_absolute(&self.source_dir)?;
        for (kind, dir) in [("build", &self.build_dir), ("results", &self.results_dir)] {
            if source.starts_with(lexical_absolute(dir)?) {
                return Err(ManifestError::StageOverlapsSource {
                    kind,
                    path: dir.display().to_string(),
                    source_dir: self.source_dir.display().to_string(),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn with_managed(mut self, managed: bool) -> Self {
        self.managed = managed;
        self
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Whether the package manager owns the source tree.
    pub fn is_managed(&self) -> bool {
        self.managed
    }
}

/// `path` made absolute against the working directory, with `.` and `..`
/// folded away. Symlinks are not resolved.
fn lexical_absolute(path: &Path) -> Result<PathBuf, ManifestError> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir().map_err(|source| ManifestError::Read {
            path: "current directory".to_owned(),
            source,
        })?;
        cwd.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn new_places_results_under_build() {
        let layout = StageLayout::new(Path::new("/src"), Path::new("/src/spack-build"));
        assert_eq!(
            layout.results_dir(),
            Path::new("/src/spack-build/spack-build-results")
        );
        assert!(!layout.is_managed());
    }

    #[test]
    fn from_section_resolves_relative_paths() {
        let layout =
            StageLayout::from_section(Path::new("/src"), &StageSection::default()).unwrap();
        assert_eq!(layout.build_dir(), Path::new("/src/spack-build"));
        assert_eq!(
            layout.results_dir(),
            Path::new("/src/spack-build/spack-build-results")
        );
    }

    #[test]
    fn from_section_keeps_absolute_paths() {
        let section = StageSection {
            build_dir: "/scratch/build".to_owned(),
            results_dir: "/scratch/results".to_owned(),
            managed: true,
        };
        let layout = StageLayout::from_section(Path::new("/src"), &section).unwrap();
        assert_eq!(layout.build_dir(), Path::new("/scratch/build"));
        assert_eq!(layout.results_dir(), Path::new("/scratch/results"));
        assert!(layout.is_managed());
    }

    fn stage(build_dir: &str) -> StageSection {
        StageSection {
            build_dir: build_dir.to_owned(),
            ..StageSection::default()
        }
    }

    fn assert_overlaps(build_dir: &str) {
        let err = StageLayout::from_section(Path::new("/home/me/src/nalu-wind"), &stage(build_dir))
            .unwrap_err();
        assert!(
            matches!(err, ManifestError::StageOverlapsSource { kind: "build", .. }),
            "build_dir {build_dir:?} gave: {err}"
        );
    }

    #[test]
    fn build_dir_equal_to_source_is_rejected() {
        assert_overlaps(".");
        assert_overlaps("");
        assert_overlaps("./");
        assert_overlaps("spack-build/..");
        assert_overlaps("/home/me/src/nalu-wind");
    }

    #[test]
    fn build_dir_above_source_is_rejected() {
        assert_overlaps("..");
        assert_overlaps("../..");
        assert_overlaps("/");
    }

    #[test]
    fn results_dir_above_source_is_rejected() {
        let section = StageSection {
            results_dir: "..".to_owned(),
            ..StageSection::default()
        };
        let err = StageLayout::from_section(Path::new("/src"), &section).unwrap_err();
        assert!(
            matches!(err, ManifestError::StageOverlapsSource { kind: "results", .. }),
            "error was: {err}"
        );
    }

    #[test]
    fn sibling_and_nested_build_dirs_are_allowed() {
        let root = Path::new("/home/me/src/nalu-wind");
        for build_dir in ["spack-build", "../nalu-wind-build", "/scratch/build", "./out/../build"] {
            assert!(
                StageLayout::from_section(root, &stage(build_dir)).is_ok(),
                "build_dir {build_dir:?} was rejected"
            );
        }
    }

    #[test]
    fn relative_source_dir_is_resolved_against_cwd() {
        let layout = StageLayout::new(Path::new("."), Path::new(".."));
        assert!(layout.check_disjoint().is_err());
        let layout = StageLayout::new(Path::new("."), Path::new("spack-build"));
        assert!(layout.check_disjoint().is_ok());
    }
}
