// src/config/mod.rs

//! Project configuration: runtime flags from the CLI plus an optional
//! `Assetpipe.toml` in the project root that overrides the project name
//! and directory layout.

pub mod loader;
pub mod model;

pub use loader::load_project_config;
pub use model::{Flags, Layout, Paths, ProjectConfig};
