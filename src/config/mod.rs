// src/config/mod.rs

//! TOML workflow definitions.
//!
//! - `model.rs`: the serde data model.
//! - `loader.rs`: reading files from disk.
//! - `validate.rs`: raw → validated conversion.
//! - `build.rs`: turning a validated config into a [`crate::dag::Workflow`].

pub mod build;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, parse_str};
pub use model::{ConfigFile, DefaultSection, RawConfigFile, TaskConfig, WorkflowSection};
