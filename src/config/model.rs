// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Runtime toggles, resolved once from the CLI at startup.
#[derive(Debug, Clone, Copy)]
pub struct Flags {
    /// Newer-file skip for batch tasks and incremental template compile.
    pub cache: bool,
    /// Debug stripping, compact sprite output.
    pub production: bool,
    /// Escalate task-level errors to hard failures.
    pub throw_errors: bool,
    /// When false, the dev server resolves `/about` to `about.html`.
    pub html_ext: bool,
    /// Dev server port.
    pub port: u16,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            cache: true,
            production: false,
            throw_errors: false,
            html_ext: true,
            port: 3000,
        }
    }
}

/// Top-level project configuration as read from `Assetpipe.toml`.
///
/// ```toml
/// name = "my-site"
///
/// [layout]
/// build = "dist"
/// ```
///
/// All fields are optional; defaults mirror the conventional tree.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProjectConfig {
    /// Project name, used for the archive filename. Defaults to the root
    /// directory name.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub layout: Layout,
}

/// Directory layout, as forward-slash paths relative to the project root.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub resources: String,
    pub images: String,
    pub png_sprites: String,
    pub svg_sprites: String,
    pub scripts: String,
    /// Directory holding the top-level templates (`*.tera` directly inside).
    pub templates: String,
    /// Directory holding layouts/partials referenced by the top-level ones.
    pub template_partials: String,
    pub styles: String,
    pub build: String,
    pub build_images: String,
    pub build_scripts: String,
    pub build_styles: String,
    pub archive: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            resources: "src/resources".into(),
            images: "src/images".into(),
            png_sprites: "src/images/sprites/png".into(),
            svg_sprites: "src/images/sprites/svg".into(),
            scripts: "src/js".into(),
            templates: "src".into(),
            template_partials: "src/tera".into(),
            styles: "src/scss".into(),
            build: "build".into(),
            build_images: "build/images".into(),
            build_scripts: "build/js".into(),
            build_styles: "build/css".into(),
            archive: "zip".into(),
        }
    }
}

/// The layout resolved against a concrete project root.
#[derive(Debug, Clone)]
pub struct Paths {
    pub root: PathBuf,
    pub resources: PathBuf,
    pub images: PathBuf,
    pub png_sprites: PathBuf,
    pub svg_sprites: PathBuf,
    pub scripts: PathBuf,
    pub templates: PathBuf,
    pub template_partials: PathBuf,
    pub styles: PathBuf,
    pub build: PathBuf,
    pub build_images: PathBuf,
    pub build_scripts: PathBuf,
    pub build_styles: PathBuf,
    pub archive: PathBuf,
}

impl Paths {
    pub fn resolve(root: &Path, layout: &Layout) -> Self {
        Self {
            root: root.to_path_buf(),
            resources: root.join(&layout.resources),
            images: root.join(&layout.images),
            png_sprites: root.join(&layout.png_sprites),
            svg_sprites: root.join(&layout.svg_sprites),
            scripts: root.join(&layout.scripts),
            templates: root.join(&layout.templates),
            template_partials: root.join(&layout.template_partials),
            styles: root.join(&layout.styles),
            build: root.join(&layout.build),
            build_images: root.join(&layout.build_images),
            build_scripts: root.join(&layout.build_scripts),
            build_styles: root.join(&layout.build_styles),
            archive: root.join(&layout.archive),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_mirrors_conventional_tree() {
        let layout = Layout::default();
        assert_eq!(layout.resources, "src/resources");
        assert_eq!(layout.build_styles, "build/css");

        let paths = Paths::resolve(Path::new("/proj"), &layout);
        assert_eq!(paths.png_sprites, Path::new("/proj/src/images/sprites/png"));
    }

    #[test]
    fn layout_overrides_parse() {
        let cfg: ProjectConfig = toml::from_str(
            r#"
            name = "my-site"

            [layout]
            build = "dist"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.name.as_deref(), Some("my-site"));
        assert_eq!(cfg.layout.build, "dist");
        // untouched fields keep their defaults
        assert_eq!(cfg.layout.styles, "src/scss");
    }
}
