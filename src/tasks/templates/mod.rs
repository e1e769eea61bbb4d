// src/tasks/templates/mod.rs

//! Template compiler.
//!
//! Renders every top-level `src/*.tera` to `build/<stem>.html` with tera.
//! With caching on the task runs incrementally: it takes the changed file
//! as an explicit argument (`Some(path)` from a watch edit, `None` on the
//! first run or after a delete), rescans the dependency graph, and renders
//! only the top-level templates affected by the change. `None` triggers a
//! full rebuild, as does any change the graph does not know about, so a
//! deleted partial always forces every page out again.

pub mod graph;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tera::Tera;
use tracing::debug;

use crate::errors::PipelineError;
use crate::fsx;
use crate::pipeline::Pipeline;

pub use graph::DependencyGraph;

const TEMPLATE_EXT: &str = "tera";

/// A template source file: its engine name (root-relative, forward
/// slashes), its path, and whether it is a top-level page.
struct TemplateFile {
    name: String,
    content: String,
    top_level: bool,
}

pub fn run(ctx: &Pipeline, changed: Option<&Path>) -> Result<()> {
    let files = collect_templates(ctx)?;
    if files.is_empty() {
        debug!("templates: no inputs, nothing to do");
        return Ok(());
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(
        files
            .iter()
            .map(|f| (f.name.as_str(), f.content.as_str()))
            .collect::<Vec<_>>(),
    )
    .map_err(|e| PipelineError::TemplateRender {
        name: "<environment>".into(),
        message: e.to_string(),
    })?;

    let dependency_graph =
        DependencyGraph::scan(files.iter().map(|f| (f.name.as_str(), f.content.as_str())));
    let targets = select_targets(ctx, &dependency_graph, &files, changed);
    debug!(
        total = files.iter().filter(|f| f.top_level).count(),
        rendering = targets.len(),
        "templates: target set selected"
    );

    for name in &targets {
        match tera.render(name, &tera::Context::new()) {
            Ok(html) => {
                let dest = ctx.paths.build.join(output_name(name));
                fsx::write(&dest, html)?;
                debug!(template = %name, "templates: rendered");
            }
            Err(err) => {
                // Lenient mode keeps rendering the remaining pages.
                ctx.policy.apply(
                    PipelineError::TemplateRender {
                        name: name.clone(),
                        message: err.to_string(),
                    }
                    .into(),
                )?;
            }
        }
    }

    Ok(())
}

/// Top-level templates live directly in the templates root; partials and
/// layouts live in the partials tree.
fn collect_templates(ctx: &Pipeline) -> Result<Vec<TemplateFile>> {
    let mut files = Vec::new();

    for (dir, top_level) in [
        (&ctx.paths.templates, true),
        (&ctx.paths.template_partials, false),
    ] {
        let paths: Vec<PathBuf> = if top_level {
            // Non-recursive: subdirectories of the templates root (partials,
            // scripts, styles) are other tasks' territory.
            match std::fs::read_dir(dir) {
                Ok(entries) => {
                    let mut v: Vec<PathBuf> = entries
                        .filter_map(|e| e.ok())
                        .map(|e| e.path())
                        .filter(|p| p.is_file())
                        .collect();
                    v.sort();
                    v
                }
                Err(_) => Vec::new(),
            }
        } else {
            fsx::walk_files(dir)
        };

        for path in paths {
            if !path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case(TEMPLATE_EXT))
            {
                continue;
            }
            let name = template_name(ctx, &path);
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("reading template {path:?}"))?;
            files.push(TemplateFile {
                name,
                content,
                top_level,
            });
        }
    }

    Ok(files)
}

/// Engine-facing template name for a source path.
fn template_name(ctx: &Pipeline, path: &Path) -> String {
    fsx::relative_str(&ctx.paths.templates, path)
        .or_else(|| fsx::relative_str(&ctx.paths.root, path))
        .unwrap_or_else(|| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
}

/// The incremental-compile decision.
fn select_targets(
    ctx: &Pipeline,
    graph: &DependencyGraph,
    files: &[TemplateFile],
    changed: Option<&Path>,
) -> Vec<String> {
    let all: Vec<String> = files
        .iter()
        .filter(|f| f.top_level)
        .map(|f| f.name.clone())
        .collect();

    if !ctx.flags.cache {
        return all;
    }
    let Some(changed) = changed else {
        // First run, or a delete cleared the changed-file record:
        // full rebuild.
        return all;
    };

    let name = template_name(ctx, changed);
    match graph.affected(&name) {
        Some(affected) => all.into_iter().filter(|n| affected.contains(n)).collect(),
        // A change the graph has never seen: stay safe, rebuild everything.
        None => all,
    }
}

/// `index.tera` renders to `index.html`.
fn output_name(template: &str) -> String {
    let stem = template
        .rsplit('/')
        .next()
        .unwrap_or(template)
        .strip_suffix(&format!(".{TEMPLATE_EXT}"))
        .unwrap_or(template);
    format!("{stem}.html")
}
