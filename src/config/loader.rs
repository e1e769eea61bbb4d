// src/config/loader.rs

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::config::model::ProjectConfig;

/// Name of the optional project config file in the project root.
pub const CONFIG_FILENAME: &str = "Assetpipe.toml";

/// Load `Assetpipe.toml` from the project root, falling back to defaults
/// when the file does not exist. A file that exists but fails to parse is
/// an error: silently ignoring a broken config would mask layout typos.
pub fn load_project_config(root: &Path) -> Result<ProjectConfig> {
    let path = root.join(CONFIG_FILENAME);
    if !path.exists() {
        debug!("no {CONFIG_FILENAME} in {:?}, using defaults", root);
        return Ok(ProjectConfig::default());
    }

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config file {path:?}"))?;
    let cfg: ProjectConfig =
        toml::from_str(&raw).with_context(|| format!("parsing config file {path:?}"))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_project_config(dir.path()).unwrap();
        assert!(cfg.name.is_none());
        assert_eq!(cfg.layout.build, "build");
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "name = [").unwrap();
        assert!(load_project_config(dir.path()).is_err());
    }
}
