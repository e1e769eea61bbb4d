// src/pipeline.rs

//! Shared task context and orchestration.
//!
//! [`Pipeline`] carries everything a task needs: resolved paths, runtime
//! flags and the error policy. Composition rules: `build` runs its eight
//! tasks concurrently (their destinations are disjoint), `lint` runs
//! sequentially and fail-fast, and the default series is build, then
//! watch + serve until the process dies.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::model::Paths;
use crate::config::{Flags, load_project_config};
use crate::errors::ErrorPolicy;
use crate::tasks::{self, TaskKind};

/// The eight independent transformation tasks behind `build`.
pub const BUILD_TASKS: [TaskKind; 8] = [
    TaskKind::Copy,
    TaskKind::Images,
    TaskKind::SvgSprites,
    TaskKind::PngSprites,
    TaskKind::JsMain,
    TaskKind::JsVendor,
    TaskKind::Templates,
    TaskKind::Styles,
];

/// The lint series, in reporting order.
pub const LINT_TASKS: [TaskKind; 3] =
    [TaskKind::LintJs, TaskKind::LintTemplates, TaskKind::LintStyles];

pub struct Pipeline {
    pub flags: Flags,
    pub policy: ErrorPolicy,
    pub paths: Paths,
    /// Project name, used for the archive filename.
    pub name: String,
}

impl Pipeline {
    pub fn new(root: impl AsRef<Path>, flags: Flags) -> Result<Self> {
        let root = root.as_ref();
        // Canonicalize so watcher-reported paths relativize cleanly.
        let root: PathBuf = root
            .canonicalize()
            .with_context(|| format!("project root {root:?} not found"))?;

        let config = load_project_config(&root)?;
        let name = config.name.clone().unwrap_or_else(|| {
            root.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "site".to_string())
        });
        let paths = Paths::resolve(&root, &config.layout);

        Ok(Self {
            flags,
            policy: ErrorPolicy::from_throw_errors(flags.throw_errors),
            paths,
            name,
        })
    }

    /// Run one leaf task synchronously, routing its outcome through the
    /// error policy. `changed` is only meaningful for the template task.
    pub fn run_leaf_blocking(&self, kind: TaskKind, changed: Option<&Path>) -> Result<()> {
        debug_assert!(kind.is_leaf(), "{kind} is not a leaf task");
        let started = Instant::now();

        let result = match kind {
            TaskKind::Copy => tasks::copy::run(self),
            TaskKind::Images => tasks::images::run(self),
            TaskKind::PngSprites => tasks::sprites::png::run(self),
            TaskKind::SvgSprites => tasks::sprites::svg::run(self),
            TaskKind::JsMain => tasks::scripts::main(self),
            TaskKind::JsVendor => tasks::scripts::vendor(self),
            TaskKind::Templates => tasks::templates::run(self, changed),
            TaskKind::Styles => tasks::styles::run(self),
            TaskKind::LintJs => tasks::lint::js(self),
            TaskKind::LintTemplates => tasks::lint::templates(self),
            TaskKind::LintStyles => tasks::lint::styles(self),
            TaskKind::Zip => tasks::archive::run(self),
            TaskKind::Lint
            | TaskKind::Build
            | TaskKind::Watch
            | TaskKind::Serve
            | TaskKind::Default => unreachable!("composite task {kind} dispatched as leaf"),
        };

        let result = match result {
            Ok(()) => Ok(()),
            Err(err) => self.policy.apply(err.context(format!("task {kind}"))),
        };
        info!(task = %kind, elapsed = ?started.elapsed(), "task finished");
        result
    }

    /// Run one leaf task as a unit the async orchestrator can await.
    pub async fn run_task(
        self: &Arc<Self>,
        kind: TaskKind,
        changed: Option<PathBuf>,
    ) -> Result<()> {
        let pipeline = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            pipeline.run_leaf_blocking(kind, changed.as_deref())
        })
        .await?
    }

    /// The `build` composite: all eight tasks concurrently.
    pub async fn build(self: &Arc<Self>) -> Result<()> {
        info!("build started");
        let handles: Vec<_> = BUILD_TASKS
            .into_iter()
            .map(|kind| {
                let pipeline = Arc::clone(self);
                tokio::spawn(async move { pipeline.run_task(kind, None).await })
            })
            .collect();

        let mut first_error = None;
        for handle in handles {
            if let Err(err) = handle.await? {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            None => {
                info!("build finished");
                Ok(())
            }
            Some(err) => Err(err),
        }
    }

    /// The `lint` composite: strictly sequential, fail-fast.
    pub async fn lint(self: &Arc<Self>) -> Result<()> {
        for kind in LINT_TASKS {
            self.run_task(kind, None).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsx;

    fn sample_project(root: &Path) {
        fsx::write(&root.join("src/resources/robots.txt"), "User-agent: *\n").unwrap();
        fsx::write(&root.join("src/js/main.js"), "run();\n").unwrap();
        fsx::write(&root.join("src/js/vendor.js"), "window.lib = {};\n").unwrap();
        fsx::write(&root.join("src/index.tera"), "<h1>hello</h1>").unwrap();
        fsx::write(&root.join("src/scss/style.scss"), "body { margin: 0; }\n").unwrap();
    }

    #[tokio::test]
    async fn build_produces_the_full_output_tree() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        sample_project(root);

        let pipeline = Arc::new(Pipeline::new(root, Flags::default()).unwrap());
        pipeline.build().await.unwrap();

        assert!(root.join("build/robots.txt").is_file());
        assert!(root.join("build/js/main.js").is_file());
        assert!(root.join("build/js/vendor.js").is_file());
        assert!(root.join("build/index.html").is_file());
        assert!(root.join("build/css/style.css").is_file());
    }

    #[tokio::test]
    async fn build_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        sample_project(root);

        let pipeline = Arc::new(Pipeline::new(root, Flags::default()).unwrap());
        pipeline.build().await.unwrap();
        let first = std::fs::read_to_string(root.join("build/css/style.css")).unwrap();
        pipeline.build().await.unwrap();
        let second = std::fs::read_to_string(root.join("build/css/style.css")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn project_name_defaults_to_directory_name() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("my-site");
        std::fs::create_dir_all(&root).unwrap();
        let pipeline = Pipeline::new(&root, Flags::default()).unwrap();
        assert_eq!(pipeline.name, "my-site");
    }

    #[test]
    fn config_file_overrides_name() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("Assetpipe.toml"), "name = \"portfolio\"\n").unwrap();
        let pipeline = Pipeline::new(root, Flags::default()).unwrap();
        assert_eq!(pipeline.name, "portfolio");
    }
}
