// src/tasks/archive.rs

//! Archiver: bundles the build output, the full source tree and the
//! root-level project metadata into `zip/<name>_<YYYY>-<MM>-<DD>_<HH>-<mm>.zip`.
//! The archive directory itself is excluded so prior archives are never
//! swallowed into new ones.

use std::fs::File;
use std::io;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{debug, info};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::config::model::Paths;
use crate::fsx;
use crate::pipeline::Pipeline;

pub fn run(ctx: &Pipeline) -> Result<()> {
    let name = archive_name(&ctx.name, &Local::now().format("%Y-%m-%d_%H-%M").to_string());
    let dest = ctx.paths.archive.join(&name);

    let patterns = include_patterns(&ctx.paths)?;
    let include = fsx::build_globset(&as_strs(&patterns))?;
    let exclude_pattern = format!("{}/**", layout_rel(&ctx.paths, &ctx.paths.archive)?);
    let exclude = fsx::build_globset(&[exclude_pattern.as_str()])?;
    let files = fsx::collect(&ctx.paths.root, &include, Some(&exclude));

    std::fs::create_dir_all(&ctx.paths.archive)
        .with_context(|| format!("creating {:?}", ctx.paths.archive))?;
    let mut writer = ZipWriter::new(
        File::create(&dest).with_context(|| format!("creating {dest:?}"))?,
    );
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut count = 0usize;
    for file in &files {
        let Some(rel) = fsx::relative_str(&ctx.paths.root, file) else {
            continue;
        };
        writer
            .start_file(rel.clone(), options)
            .with_context(|| format!("adding {rel} to the archive"))?;
        let mut input =
            File::open(file).with_context(|| format!("reading {file:?}"))?;
        io::copy(&mut input, &mut writer)
            .with_context(|| format!("compressing {rel}"))?;
        debug!(file = %rel, "zip");
        count += 1;
    }

    writer.finish().context("finalizing the archive")?;
    info!(archive = %dest.display(), files = count, "zip: archive written");
    Ok(())
}

fn archive_name(project: &str, timestamp: &str) -> String {
    format!("{project}_{timestamp}.zip")
}

/// Root-relative glob patterns for everything the archive carries: the
/// build output, every source directory from the resolved layout, and the
/// root-level project metadata. Derived from `Paths` so custom layouts
/// archive the right trees; the archive directory itself is excluded by
/// the caller.
fn include_patterns(paths: &Paths) -> Result<Vec<String>> {
    let mut patterns = Vec::new();
    for dir in [
        &paths.build,
        &paths.resources,
        &paths.images,
        &paths.scripts,
        &paths.templates,
        &paths.template_partials,
        &paths.styles,
    ] {
        patterns.push(format!("{}/**", layout_rel(paths, dir)?));
    }
    for meta in [".gitignore", "*.toml", "*.md", "*.yml"] {
        patterns.push(meta.to_string());
    }
    Ok(patterns)
}

fn layout_rel(paths: &Paths, dir: &std::path::Path) -> Result<String> {
    fsx::relative_str(&paths.root, dir)
        .with_context(|| format!("layout directory {dir:?} lies outside the project root"))
}

fn as_strs(patterns: &[String]) -> Vec<&str> {
    patterns.iter().map(String::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Flags;

    #[test]
    fn name_carries_project_and_timestamp() {
        assert_eq!(
            archive_name("my-site", "2026-08-29_14-05"),
            "my-site_2026-08-29_14-05.zip"
        );
    }

    #[test]
    fn archive_includes_sources_and_skips_prior_archives() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fsx::write(&root.join("build/index.html"), "<html>").unwrap();
        fsx::write(&root.join("src/js/main.js"), "run();\n").unwrap();
        fsx::write(&root.join("src/resources/.htaccess"), "deny").unwrap();
        fsx::write(&root.join("README.md"), "# site").unwrap();
        fsx::write(&root.join("zip/old.zip"), "stale").unwrap();

        let ctx = Pipeline::new(root, Flags::default()).unwrap();
        run(&ctx).unwrap();

        let mut archives: Vec<_> = std::fs::read_dir(root.join("zip"))
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n != "old.zip")
            .collect();
        assert_eq!(archives.len(), 1);
        let archive_file = archives.pop().unwrap();
        assert!(archive_file.ends_with(".zip"));

        let file = File::open(root.join("zip").join(&archive_file)).unwrap();
        let archive = zip::ZipArchive::new(file).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"build/index.html"));
        assert!(names.contains(&"src/js/main.js"));
        assert!(names.contains(&"src/resources/.htaccess"));
        assert!(names.contains(&"README.md"));
        assert!(!names.iter().any(|n| n.contains("old.zip")));
    }

    #[test]
    fn custom_layout_drives_the_include_and_exclude_globs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(
            root.join("Assetpipe.toml"),
            "[layout]\nbuild = \"dist\"\narchive = \"packages\"\n",
        )
        .unwrap();
        fsx::write(&root.join("dist/index.html"), "<html>").unwrap();
        fsx::write(&root.join("src/js/main.js"), "run();\n").unwrap();
        fsx::write(&root.join("packages/old.zip"), "stale").unwrap();

        let ctx = Pipeline::new(root, Flags::default()).unwrap();
        run(&ctx).unwrap();

        let archive_file = std::fs::read_dir(root.join("packages"))
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .find(|p| p.file_name().is_some_and(|n| n != "old.zip"))
            .unwrap();
        let archive = zip::ZipArchive::new(File::open(archive_file).unwrap()).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"dist/index.html"));
        assert!(names.contains(&"src/js/main.js"));
        // prior archives in the renamed archive dir stay out
        assert!(!names.iter().any(|n| n.contains("old.zip")));
    }
}
