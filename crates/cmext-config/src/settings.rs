//! Global build settings that apply to every package.

use crate::manifest::ConfigSection;

/// Upper bound on the default job count, matching common package-manager defaults.
const MAX_DEFAULT_JOBS: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Parallel jobs for builds, and the fallback ctest parallel level.
    pub build_jobs: u32,
}

impl Settings {
    pub fn from_section(section: &ConfigSection) -> Self {
        Self {
            build_jobs: section
                .build_jobs
                .filter(|jobs| *jobs > 0)
                .unwrap_or_else(default_build_jobs),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_section(&ConfigSection::default())
    }
}

/// `min(16, available cores)`, or 1 if the core count is unknown.
pub fn default_build_jobs() -> u32 {
    let cores = std::thread::available_parallelism()
        .map(|n| u32::try_from(n.get()).unwrap_or(u32::MAX))
        .unwrap_or(1);
    cores.min(MAX_DEFAULT_JOBS)
}
