// src/watch/rules.rs

//! The watch table: which source paths re-run which task.
//!
//! One rule per leaf task, compiled from the resolved layout so custom
//! directory layouts keep working. Paths are matched as root-relative
//! strings with forward slashes.

use std::fmt;

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::model::Paths;
use crate::fsx;
use crate::tasks::TaskKind;

pub struct WatchRule {
    pub task: TaskKind,
    /// Only the template task cares which file changed; everything else
    /// reprocesses its whole input set.
    pub forward_changed: bool,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for WatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRule")
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}

impl WatchRule {
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Compile the full rule table for a resolved layout.
pub fn build_rules(paths: &Paths) -> Result<Vec<WatchRule>> {
    let rel = |dir| {
        fsx::relative_str(&paths.root, dir)
            .with_context(|| format!("watch directory {dir:?} lies outside the project root"))
    };
    let resources = rel(&paths.resources)?;
    let images = rel(&paths.images)?;
    let png_sprites = rel(&paths.png_sprites)?;
    let svg_sprites = rel(&paths.svg_sprites)?;
    let scripts = rel(&paths.scripts)?;
    let templates = rel(&paths.templates)?;
    let partials = rel(&paths.template_partials)?;
    let styles = rel(&paths.styles)?;

    let rules = vec![
        rule(
            TaskKind::Copy,
            false,
            &[format!("{resources}/**")],
            &[],
        )?,
        rule(
            TaskKind::Images,
            false,
            &[format!("{images}/**")],
            &[
                format!("{png_sprites}/**"),
                format!("{svg_sprites}/**"),
            ],
        )?,
        rule(
            TaskKind::SvgSprites,
            false,
            &[format!("{svg_sprites}/**/*.svg")],
            &[],
        )?,
        rule(
            TaskKind::PngSprites,
            false,
            &[
                format!("{png_sprites}/**/*.png"),
                // the sprite stylesheet template feeds the same task
                format!("{styles}/_sprites.tera"),
            ],
            &[],
        )?,
        rule(
            TaskKind::JsMain,
            false,
            &[format!("{scripts}/**/*.js")],
            &[format!("{scripts}/vendor.js")],
        )?,
        rule(
            TaskKind::JsVendor,
            false,
            &[format!("{scripts}/vendor.js")],
            &[],
        )?,
        rule(
            TaskKind::Templates,
            true,
            &[
                format!("{templates}/*.tera"),
                format!("{partials}/**/*.tera"),
            ],
            &[],
        )?,
        rule(
            TaskKind::Styles,
            false,
            &[format!("{styles}/**/*.scss")],
            &[],
        )?,
    ];
    Ok(rules)
}

fn rule(
    task: TaskKind,
    forward_changed: bool,
    watch: &[String],
    exclude: &[String],
) -> Result<WatchRule> {
    let watch_set =
        globset(watch).with_context(|| format!("building watch globs for task {task}"))?;
    let exclude_set = if exclude.is_empty() {
        None
    } else {
        Some(globset(exclude).with_context(|| format!("building exclude globs for task {task}"))?)
    };
    Ok(WatchRule {
        task,
        forward_changed,
        watch_set,
        exclude_set,
    })
}

fn globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        // `*` must stop at `/` so `src/*.tera` stays non-recursive.
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::Layout;
    use std::path::Path;

    fn rules() -> Vec<WatchRule> {
        let paths = Paths::resolve(Path::new("/proj"), &Layout::default());
        build_rules(&paths).unwrap()
    }

    fn tasks_for(path: &str) -> Vec<TaskKind> {
        rules()
            .iter()
            .filter(|r| r.matches(path))
            .map(|r| r.task)
            .collect()
    }

    #[test]
    fn each_source_area_maps_to_its_task() {
        assert_eq!(tasks_for("src/resources/fonts/a.woff2"), [TaskKind::Copy]);
        assert_eq!(tasks_for("src/images/photo.jpg"), [TaskKind::Images]);
        assert_eq!(tasks_for("src/scss/style.scss"), [TaskKind::Styles]);
        assert_eq!(tasks_for("src/index.tera"), [TaskKind::Templates]);
        assert_eq!(tasks_for("src/tera/base.tera"), [TaskKind::Templates]);
    }

    #[test]
    fn sprite_sources_do_not_trigger_the_plain_image_task() {
        assert_eq!(
            tasks_for("src/images/sprites/svg/icon.svg"),
            [TaskKind::SvgSprites]
        );
        assert_eq!(
            tasks_for("src/images/sprites/png/star.png"),
            [TaskKind::PngSprites]
        );
    }

    #[test]
    fn vendor_bundle_is_split_from_main() {
        assert_eq!(tasks_for("src/js/vendor.js"), [TaskKind::JsVendor]);
        assert_eq!(tasks_for("src/js/main.js"), [TaskKind::JsMain]);
        assert_eq!(tasks_for("src/js/modules/nav.js"), [TaskKind::JsMain]);
    }

    #[test]
    fn sprite_template_rebuilds_the_png_sheet() {
        assert_eq!(tasks_for("src/scss/_sprites.tera"), [TaskKind::PngSprites]);
    }

    #[test]
    fn outputs_and_strangers_match_nothing() {
        assert!(tasks_for("build/index.html").is_empty());
        assert!(tasks_for("zip/site_2026-01-01_00-00.zip").is_empty());
        assert!(tasks_for("README.md").is_empty());
        // a deep .tera outside the partials tree is not a page
        assert!(tasks_for("src/js/odd.tera").is_empty());
    }

    #[test]
    fn only_templates_forward_the_changed_path() {
        for rule in rules() {
            assert_eq!(rule.forward_changed, rule.task == TaskKind::Templates);
        }
    }
}
