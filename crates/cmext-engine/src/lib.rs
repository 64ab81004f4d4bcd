//! CMake package lifecycle for cmext: generator selection, source-tree
//! housekeeping, the CTest regression runner, and the hook pipeline that
//! ties them to the configure/build/install/clean phases.

pub mod context;
pub mod error;
pub mod extension;
pub mod generator;
pub mod housekeeping;
pub mod lifecycle;
pub mod pipeline;
pub mod regression;

pub use context::{PackageContext, TestEnvironment};
pub use error::EngineError;
pub use extension::CmakeExtension;
pub use generator::select_generator;
pub use lifecycle::{Hook, HookPoint, Orchestrator, Phase};
pub use pipeline::Pipeline;
pub use regression::{DashboardConfig, TestRunOutcome};
