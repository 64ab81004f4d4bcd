//! Parse `cmext.toml` and model the resolved build spec, stage layout, and
//! global settings for one build invocation.

pub mod layout;
pub mod manifest;
pub mod settings;
pub mod spec;

pub use layout::StageLayout;
pub use manifest::Manifest;
pub use settings::Settings;
pub use spec::BuildSpec;
