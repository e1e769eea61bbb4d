// src/tasks/styles.rs

//! Style compiler: every top-level `src/scss/*.scss` (partials excluded by
//! the underscore convention) is compiled with grass, then minified and
//! autoprefixed with lightningcss against a broad browser range, and
//! written to `build/css/<stem>.css` with a source map. Compile errors go
//! through the error policy so a watch session survives a bad edit.

use std::path::{Path, PathBuf};

use anyhow::Result;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use tracing::debug;

use crate::errors::PipelineError;
use crate::fsx;
use crate::pipeline::Pipeline;
use crate::sourcemap::{self, SourceMapBuilder};

pub fn run(ctx: &Pipeline) -> Result<()> {
    let files = top_level_sheets(&ctx.paths.styles);
    if files.is_empty() {
        debug!("styles: no inputs, nothing to do");
        return Ok(());
    }

    for file in &files {
        match compile_one(ctx, file) {
            Ok(()) => debug!(file = %file.display(), "styles"),
            Err(err) => ctx.policy.apply(err)?,
        }
    }
    Ok(())
}

/// `*.scss` directly in the styles directory, minus `_*` partials.
pub fn top_level_sheets(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension().is_some_and(|e| e.eq_ignore_ascii_case("scss"))
                && !p
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with('_'))
        })
        .collect();
    files.sort();
    files
}

fn compile_one(ctx: &Pipeline, file: &Path) -> Result<()> {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let css_name = format!("{stem}.css");
    let map_name = format!("{css_name}.map");

    let css = grass::from_path(file, &grass::Options::default()).map_err(|e| {
        PipelineError::StyleCompile {
            file: file.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    let minified = minify_css(&css).map_err(|message| PipelineError::StyleCompile {
        file: file.to_path_buf(),
        message,
    })?;

    // Minified output is a single line; the map points it at the top of
    // its top-level source. grass has already inlined any partials.
    let mut map = SourceMapBuilder::new();
    let source = map.add_source(&sourcemap::source_name(&ctx.paths.root, file));
    map.push_mapped(source, 0);

    let mut code = minified;
    code.push('\n');
    code.push_str(&sourcemap::css_footer(&map_name));
    fsx::write(&ctx.paths.build_styles.join(&css_name), code)?;
    fsx::write(&ctx.paths.build_styles.join(&map_name), map.build(&css_name))?;
    Ok(())
}

/// Minify and autoprefix. The browser range is deliberately broad (the
/// "support everything" stance of the original pipeline); lightningcss
/// folds numeric `calc()` expressions and never renumbers z-index.
fn minify_css(css: &str) -> Result<String, String> {
    let browsers = Browsers {
        android: Some(4 << 16),
        chrome: Some(30 << 16),
        edge: Some(12 << 16),
        firefox: Some(30 << 16),
        ie: Some(10 << 16),
        ios_saf: Some(8 << 16),
        opera: Some(20 << 16),
        safari: Some(8 << 16),
        ..Browsers::default()
    };
    let targets = Targets::from(browsers);

    let mut sheet =
        StyleSheet::parse(css, ParserOptions::default()).map_err(|e| e.to_string())?;
    sheet
        .minify(MinifyOptions {
            targets: targets.clone(),
            ..MinifyOptions::default()
        })
        .map_err(|e| e.to_string())?;
    let out = sheet
        .to_css(PrinterOptions {
            minify: true,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;
    Ok(out.code)
}
