// src/tasks/sprites/png.rs

//! PNG sprite builder.
//!
//! Partitions `src/images/sprites/png/*.png` into a standard set and a
//! retina set (stem suffix `@2x`), stacks each set vertically into a single
//! sheet with fixed padding, and emits:
//!
//! - `build/images/sprites.png` (and `sprites@2x.png` when retina inputs
//!   exist)
//! - `src/scss/_sprites.scss`: offsets for every sprite, written back into
//!   the stylesheet *source* tree so the style task can consume it. The
//!   fragment renders through `src/scss/_sprites.tera` when the project
//!   provides one, else through a built-in template.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, RgbaImage, imageops};
use serde::Serialize;
use tracing::debug;

use crate::fsx;
use crate::pipeline::Pipeline;
use crate::tasks::images::encode_png;

/// Vertical padding between sprites on the standard sheet, in pixels.
/// The retina sheet doubles it so halved CSS offsets stay aligned.
const PADDING: u32 = 2;

const SHEET_NAME: &str = "sprites.png";
const RETINA_SHEET_NAME: &str = "sprites@2x.png";
const FRAGMENT_NAME: &str = "_sprites.scss";
const FRAGMENT_TEMPLATE_NAME: &str = "_sprites.tera";

#[derive(Debug, Clone, Serialize)]
struct Sprite {
    name: String,
    /// Offset and size in sheet pixels.
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    /// Offset and size in CSS pixels (halved for retina sprites).
    css_x: u32,
    css_y: u32,
    css_width: u32,
    css_height: u32,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
struct SheetInfo {
    width: u32,
    height: u32,
    css_width: u32,
    css_height: u32,
}

pub fn run(ctx: &Pipeline) -> Result<()> {
    let inputs = sprite_inputs(&ctx.paths.png_sprites);
    if inputs.is_empty() {
        debug!("png-sprites: no inputs, nothing to do");
        return Ok(());
    }

    let (standard, retina): (Vec<_>, Vec<_>) =
        inputs.into_iter().partition(|p| !is_retina(p));

    let (sheet, sprites) = pack(&standard, 1)?;
    if let Some(sheet) = &sheet {
        fsx::write(&ctx.paths.build_images.join(SHEET_NAME), encode_png(sheet)?)?;
        debug!(sprites = sprites.len(), "png-sprites: wrote {SHEET_NAME}");
    }

    let (retina_sheet, retina_sprites) = pack(&retina, 2)?;
    if let Some(sheet) = &retina_sheet {
        fsx::write(
            &ctx.paths.build_images.join(RETINA_SHEET_NAME),
            encode_png(sheet)?,
        )?;
        debug!(
            sprites = retina_sprites.len(),
            "png-sprites: wrote {RETINA_SHEET_NAME}"
        );
    }

    let fragment = render_fragment(
        ctx,
        &sprites,
        sheet_info(&sheet, 1),
        &retina_sprites,
        sheet_info(&retina_sheet, 2),
    )?;
    fsx::write(&ctx.paths.styles.join(FRAGMENT_NAME), fragment)?;
    Ok(())
}

fn sprite_inputs(dir: &Path) -> Vec<PathBuf> {
    fsx::walk_files(dir)
        .into_iter()
        .filter(|p| {
            p.extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("png"))
        })
        .collect()
}

fn is_retina(path: &Path) -> bool {
    stem(path).ends_with("@2x")
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Sprite name as referenced from the stylesheet: the file stem, minus the
/// retina suffix.
fn sprite_name(path: &Path) -> String {
    let stem = stem(path);
    stem.strip_suffix("@2x").map(str::to_owned).unwrap_or(stem)
}

/// Stack the given images top to bottom. `scale` is 1 for the standard
/// sheet and 2 for the retina sheet (doubling the padding, halving the CSS
/// coordinates).
fn pack(paths: &[PathBuf], scale: u32) -> Result<(Option<DynamicImage>, Vec<Sprite>)> {
    if paths.is_empty() {
        return Ok((None, Vec::new()));
    }

    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let img = image::open(path)
            .with_context(|| format!("decoding sprite {path:?}"))?
            .to_rgba8();
        images.push((sprite_name(path), img));
    }

    let padding = PADDING * scale;
    let sheet_w = images.iter().map(|(_, i)| i.width()).max().unwrap_or(0);
    let sheet_h = images.iter().map(|(_, i)| i.height()).sum::<u32>()
        + padding * (images.len() as u32 - 1);

    let mut sheet = RgbaImage::new(sheet_w, sheet_h);
    let mut sprites = Vec::with_capacity(images.len());
    let mut y = 0u32;
    for (name, img) in &images {
        imageops::overlay(&mut sheet, img, 0, i64::from(y));
        sprites.push(Sprite {
            name: name.clone(),
            x: 0,
            y,
            width: img.width(),
            height: img.height(),
            css_x: 0,
            css_y: y / scale,
            css_width: img.width() / scale,
            css_height: img.height() / scale,
        });
        y += img.height() + padding;
    }

    Ok((Some(DynamicImage::ImageRgba8(sheet)), sprites))
}

fn sheet_info(sheet: &Option<DynamicImage>, scale: u32) -> SheetInfo {
    match sheet {
        Some(s) => SheetInfo {
            width: s.width(),
            height: s.height(),
            css_width: s.width() / scale,
            css_height: s.height() / scale,
        },
        None => SheetInfo::default(),
    }
}

/// Built-in offsets template, used when the project does not provide
/// `src/scss/_sprites.tera`.
const DEFAULT_TEMPLATE: &str = r#"// Generated by assetpipe from {{ sheet_url }}. Do not edit.
{% for s in sprites %}
.sprite-{{ s.name }} {
	background-image: url({{ sheet_url }});
	background-position: -{{ s.css_x }}px -{{ s.css_y }}px;
	width: {{ s.css_width }}px;
	height: {{ s.css_height }}px;
}
{% endfor %}
{% if retina_sprites %}
@media (-webkit-min-device-pixel-ratio: 2), (min-resolution: 192dpi) {
{% for s in retina_sprites %}
	.sprite-{{ s.name }} {
		background-image: url({{ retina_sheet_url }});
		background-position: -{{ s.css_x }}px -{{ s.css_y }}px;
		background-size: {{ retina_sheet.css_width }}px {{ retina_sheet.css_height }}px;
		width: {{ s.css_width }}px;
		height: {{ s.css_height }}px;
	}
{% endfor %}
}
{% endif %}
"#;

fn render_fragment(
    ctx: &Pipeline,
    sprites: &[Sprite],
    sheet: SheetInfo,
    retina_sprites: &[Sprite],
    retina_sheet: SheetInfo,
) -> Result<String> {
    let template_path = ctx.paths.styles.join(FRAGMENT_TEMPLATE_NAME);
    let template = if template_path.is_file() {
        std::fs::read_to_string(&template_path)
            .with_context(|| format!("reading {template_path:?}"))?
    } else {
        DEFAULT_TEMPLATE.to_string()
    };

    let mut context = tera::Context::new();
    context.insert("sprites", sprites);
    context.insert("sheet", &sheet);
    context.insert("retina_sprites", retina_sprites);
    context.insert("retina_sheet", &retina_sheet);
    context.insert("sheet_url", &format!("../images/{SHEET_NAME}"));
    context.insert("retina_sheet_url", &format!("../images/{RETINA_SHEET_NAME}"));

    tera::Tera::one_off(&template, &context, false)
        .context("rendering the sprite offsets fragment")
}
