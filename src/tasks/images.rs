// src/tasks/images.rs

//! Image optimizer: re-encodes raster images and minifies SVG text under
//! `src/images/**`, mirroring results into `build/images`. Unknown formats
//! are copied verbatim. Honors the mtime cache and never aborts the batch
//! on a single bad file.

use std::io::Cursor;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use regex::Regex;
use tracing::{debug, warn};

use crate::fsx;
use crate::pipeline::Pipeline;

/// JPEG re-encode quality.
const JPEG_QUALITY: u8 = 85;

pub fn run(ctx: &Pipeline) -> Result<()> {
    // Sprite sources are raw material for the sheet tasks, not outputs.
    let mut files = fsx::walk_files(&ctx.paths.images);
    files.retain(|f| {
        !f.starts_with(&ctx.paths.png_sprites) && !f.starts_with(&ctx.paths.svg_sprites)
    });
    let total = files.len();
    let mut failed = 0usize;

    for file in &files {
        let dest = fsx::mirror(&ctx.paths.images, file, &ctx.paths.build_images)?;
        if ctx.flags.cache && fsx::dest_is_current(file, &dest) {
            debug!(file = %file.display(), "images: destination current, skipping");
            continue;
        }
        if let Err(err) = optimize_one(file, &dest) {
            warn!(file = %file.display(), "image optimization failed: {err:#}");
            failed += 1;
            continue;
        }
        debug!(file = %file.display(), "images");
    }

    debug!(total, failed, "images finished");
    if failed > 0 && ctx.policy.is_strict() {
        return Err(crate::errors::PipelineError::BatchFailures {
            task: "images",
            failed,
            total,
        }
        .into());
    }
    Ok(())
}

fn optimize_one(file: &Path, dest: &Path) -> Result<()> {
    let ext = file
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => {
            let img = image::open(file).with_context(|| format!("decoding {file:?}"))?;
            fsx::write(dest, encode_png(&img)?)
        }
        "jpg" | "jpeg" => {
            let img = image::open(file).with_context(|| format!("decoding {file:?}"))?;
            let mut out = Vec::new();
            let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
            img.write_with_encoder(encoder)
                .with_context(|| format!("encoding {file:?} as jpeg"))?;
            fsx::write(dest, out)
        }
        "gif" => {
            let img = image::open(file).with_context(|| format!("decoding {file:?}"))?;
            let mut out = Cursor::new(Vec::new());
            img.write_to(&mut out, image::ImageFormat::Gif)
                .with_context(|| format!("encoding {file:?} as gif"))?;
            fsx::write(dest, out.into_inner())
        }
        "svg" => {
            let text = std::fs::read_to_string(file)
                .with_context(|| format!("reading {file:?}"))?;
            fsx::write(dest, minify_svg(&text))
        }
        _ => fsx::copy(file, dest),
    }
}

/// Shared lossless PNG encode, also used for sprite sheets.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder).context("encoding png")?;
    Ok(out)
}

/// Textual SVG minification: drop comments, collapse whitespace between
/// tags, trim the ends. Markup-safe because it only touches inter-tag
/// whitespace.
pub fn minify_svg(text: &str) -> String {
    static COMMENT: OnceLock<Regex> = OnceLock::new();
    static BETWEEN_TAGS: OnceLock<Regex> = OnceLock::new();
    let comment = COMMENT.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
    let between = BETWEEN_TAGS.get_or_init(|| Regex::new(r">\s+<").unwrap());

    let text = comment.replace_all(text, "");
    let text = between.replace_all(&text, "><");
    text.trim().to_string()
}
