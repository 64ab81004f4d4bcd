//! Named lifecycle phases and the hooks registered against them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::context::PackageContext;
use crate::error::EngineError;

/// A phase of the package lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Configure the build tree with CMake.
    Cmake,
    Build,
    Install,
    Clean,
}

impl Phase {
    /// The phases of a full build, in execution order.
    pub const BUILD_SEQUENCE: [Phase; 3] = [Phase::Cmake, Phase::Build, Phase::Install];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Cmake => "cmake",
            Phase::Build => "build",
            Phase::Install => "install",
            Phase::Clean => "clean",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cmake" | "configure" => Ok(Phase::Cmake),
            "build" => Ok(Phase::Build),
            "install" => Ok(Phase::Install),
            "clean" => Ok(Phase::Clean),
            other => Err(format!(
                "unknown phase `{other}` — expected cmake, build, install, or clean"
            )),
        }
    }
}

/// Whether a hook runs before or after the phase's own work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HookPoint {
    Before,
    After,
}

pub type HookFn = fn(&PackageContext) -> Result<(), EngineError>;

/// A named callback attached to a phase.
#[derive(Clone, Copy)]
pub struct Hook {
    pub name: &'static str,
    pub run: HookFn,
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Anything that accepts hook registrations keyed by phase.
pub trait Orchestrator {
    fn register(&mut self, phase: Phase, point: HookPoint, hook: Hook);
}

/// Hooks grouped by phase and point, kept in registration order.
#[derive(Debug, Default)]
pub struct HookRegistry {
    hooks: BTreeMap<(Phase, HookPoint), Vec<Hook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hooks(&self, phase: Phase, point: HookPoint) -> &[Hook] {
        self.hooks
            .get(&(phase, point))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Run every hook for `phase`/`point` in order, stopping at the first failure.
    ///
    /// # Errors
    /// Returns `EngineError::Hook` wrapping the first hook error.
    pub fn run(
        &self,
        phase: Phase,
        point: HookPoint,
        ctx: &PackageContext,
    ) -> Result<(), EngineError> {
        for hook in self.hooks(phase, point) {
            tracing::debug!(%phase, ?point, hook = hook.name, "running hook");
            (hook.run)(ctx).map_err(|source| EngineError::Hook {
                phase,
                name: hook.name,
                source: Box::new(source),
            })?;
        }
        Ok(())
    }
}

impl Orchestrator for HookRegistry {
    fn register(&mut self, phase: Phase, point: HookPoint, hook: Hook) {
        self.hooks.entry((phase, point)).or_default().push(hook);
    }
}
