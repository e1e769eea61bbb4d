// src/tasks/sprites/svg.rs

//! SVG sprite builder.
//!
//! Concatenates `src/images/sprites/svg/*.svg` into one inline-symbol
//! document: each input's root `<svg>` becomes a `<symbol>` identified by
//! the file stem, editor-generated element IDs are stripped, and in
//! non-production mode line breaks are inserted after key tag boundaries
//! so the output stays readable. Written to `build/images/sprites.svg`.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::fsx;
use crate::pipeline::Pipeline;

const OUTPUT_NAME: &str = "sprites.svg";

const DOC_HEADER: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    r#"<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">"#,
    r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">"#,
);

pub fn run(ctx: &Pipeline) -> Result<()> {
    let inputs: Vec<PathBuf> = fsx::walk_files(&ctx.paths.svg_sprites)
        .into_iter()
        .filter(|p| {
            p.extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
        })
        .collect();
    if inputs.is_empty() {
        debug!("svg-sprites: no inputs, nothing to do");
        return Ok(());
    }

    let mut doc = String::from(DOC_HEADER);
    for path in &inputs {
        let text =
            std::fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
        let symbol = to_symbol(path, &text)
            .with_context(|| format!("converting {path:?} to a symbol"))?;
        doc.push_str(&symbol);
    }
    doc.push_str("</svg>");

    if !ctx.flags.production {
        doc = pretty_breaks(&doc);
    }

    fsx::write(&ctx.paths.build_images.join(OUTPUT_NAME), doc)?;
    debug!(symbols = inputs.len(), "svg-sprites: wrote {OUTPUT_NAME}");
    Ok(())
}

/// Rewrap one SVG document as a `<symbol>` named after the file stem.
fn to_symbol(path: &Path, text: &str) -> Result<String> {
    static ROOT_TAG: OnceLock<Regex> = OnceLock::new();
    static VIEW_BOX: OnceLock<Regex> = OnceLock::new();
    let root_tag = ROOT_TAG
        .get_or_init(|| Regex::new(r"(?s)<svg\b([^>]*)>(.*)</svg\s*>").unwrap());
    let view_box =
        VIEW_BOX.get_or_init(|| Regex::new(r#"viewBox\s*=\s*"([^"]*)""#).unwrap());

    let captures = root_tag
        .captures(text)
        .context("no <svg> root element found")?;
    let attrs = captures.get(1).map_or("", |m| m.as_str());
    let inner = captures.get(2).map_or("", |m| m.as_str());

    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .context("input file has no stem")?;

    let mut symbol = format!("<symbol id=\"{id}\"");
    if let Some(vb) = view_box.captures(attrs).and_then(|c| c.get(1)) {
        symbol.push_str(&format!(" viewBox=\"{}\"", vb.as_str()));
    }
    symbol.push('>');
    symbol.push_str(&strip_generated_ids(crate::tasks::images::minify_svg(inner).as_str()));
    symbol.push_str("</symbol>");
    Ok(symbol)
}

/// Drop element IDs that follow editor export patterns (Illustrator,
/// Inkscape, svg exporters). Hand-authored IDs are kept.
fn strip_generated_ids(text: &str) -> String {
    static GENERATED_ID: OnceLock<Regex> = OnceLock::new();
    let re = GENERATED_ID.get_or_init(|| {
        Regex::new(
            r#"\s+id="(?:svg\d+|XMLID_[0-9_]+|Layer_\d+|(?:path|rect|circle|ellipse|polygon|g|use)\d+)""#,
        )
        .unwrap()
    });
    re.replace_all(text, "").into_owned()
}

/// Insert line breaks after the tag boundaries that delimit the document
/// structure: prologue, root, symbols, and the closing root tag.
fn pretty_breaks(doc: &str) -> String {
    doc.replace("?><!", "?>\n<!")
        .replace("><svg", ">\n<svg")
        .replace("><symbol", ">\n<symbol")
        .replace("></svg", ">\n</svg")
}
