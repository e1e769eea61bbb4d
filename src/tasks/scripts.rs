// src/tasks/scripts.rs

//! Script pipeline: two entry points sharing a marker-comment include
//! mechanism (`// @include('relative/path.js')`, textual inclusion rather
//! than a module system).
//!
//! - `main.js`: include resolution, a conservative compatibility pass
//!   (`const`/`let` → `var`, interpolation-free template literals → plain
//!   strings), debug stripping in production mode, then tab-indent
//!   reformatting.
//! - `vendor.js`: include resolution, then textual minification.
//!
//! Both emit `build/js/<name>` plus a line-based source map; every stage
//! keeps per-line provenance so dropped or rewritten lines still map back
//! to their origin file and line.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::errors::PipelineError;
use crate::fsx;
use crate::pipeline::Pipeline;
use crate::sourcemap::{self, SourceMapBuilder};

/// At most one empty line survives reformatting.
const MAX_BLANK_RUN: usize = 1;

/// One output line and where it came from.
#[derive(Debug, Clone)]
struct SourceLine {
    text: String,
    /// Index into the bundle's source file list.
    source: usize,
    /// Zero-based line in that source file.
    line: u32,
}

pub fn main(ctx: &Pipeline) -> Result<()> {
    let entry = ctx.paths.scripts.join("main.js");
    if !entry.is_file() {
        debug!("js-main: no {entry:?}, nothing to do");
        return Ok(());
    }

    let mut sources = Vec::new();
    let mut lines = resolve_includes(&entry, &ctx.paths.root, &mut sources, &mut Vec::new())?;
    compat_pass(&mut lines);
    if ctx.flags.production {
        strip_debug(&mut lines);
    }
    beautify(&mut lines);
    emit(ctx, "main.js", &lines, &sources)
}

pub fn vendor(ctx: &Pipeline) -> Result<()> {
    let entry = ctx.paths.scripts.join("vendor.js");
    if !entry.is_file() {
        debug!("js-vendor: no {entry:?}, nothing to do");
        return Ok(());
    }

    let mut sources = Vec::new();
    let mut lines = resolve_includes(&entry, &ctx.paths.root, &mut sources, &mut Vec::new())?;
    minify(&mut lines);
    emit(ctx, "vendor.js", &lines, &sources)
}

fn include_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*//\s*@include\(\s*['"]([^'"]+)['"]\s*\)\s*;?\s*$"#).unwrap()
    })
}

/// Read `file` and splice in every `// @include('…')` target, recursively.
/// Include paths are relative to the including file; cycles are an error.
fn resolve_includes(
    file: &Path,
    project_root: &Path,
    sources: &mut Vec<String>,
    stack: &mut Vec<PathBuf>,
) -> Result<Vec<SourceLine>> {
    let canonical = file
        .canonicalize()
        .with_context(|| format!("resolving {file:?}"))?;
    if stack.contains(&canonical) {
        return Err(PipelineError::IncludeCycle {
            file: file.to_path_buf(),
        }
        .into());
    }
    stack.push(canonical);

    let text =
        std::fs::read_to_string(file).with_context(|| format!("reading {file:?}"))?;
    let source = {
        let name = sourcemap::source_name(project_root, file);
        match sources.iter().position(|s| *s == name) {
            Some(idx) => idx,
            None => {
                sources.push(name);
                sources.len() - 1
            }
        }
    };

    let mut lines = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        if let Some(captures) = include_re().captures(raw) {
            let target = &captures[1];
            let target_path = file
                .parent()
                .map(|p| p.join(target))
                .filter(|p| p.is_file())
                .ok_or_else(|| PipelineError::IncludeMissing {
                    file: file.to_path_buf(),
                    target: target.to_string(),
                })?;
            let mut included =
                resolve_includes(&target_path, project_root, sources, stack)?;
            lines.append(&mut included);
        } else {
            lines.push(SourceLine {
                text: raw.to_string(),
                source,
                line: i as u32,
            });
        }
    }

    stack.pop();
    Ok(lines)
}

/// Conservative syntax down-leveling: statement-leading `const`/`let`
/// become `var`; template literals without interpolation become plain
/// double-quoted strings.
fn compat_pass(lines: &mut [SourceLine]) {
    static DECL: OnceLock<Regex> = OnceLock::new();
    static TEMPLATE: OnceLock<Regex> = OnceLock::new();
    let decl = DECL.get_or_init(|| Regex::new(r"^(\s*)(?:const|let)\b").unwrap());
    let template = TEMPLATE.get_or_init(|| Regex::new(r"`([^`$\\]*)`").unwrap());

    for line in lines.iter_mut() {
        let replaced = decl.replace(&line.text, "${1}var");
        let replaced = template.replace_all(&replaced, |caps: &regex::Captures<'_>| {
            format!("\"{}\"", caps[1].replace('"', "\\\""))
        });
        if replaced != line.text {
            line.text = replaced.into_owned();
        }
    }
}

/// Drop debug-only statements: `console.*(…)`, `alert(…)`, `debugger`.
fn strip_debug(lines: &mut Vec<SourceLine>) {
    static DEBUG: OnceLock<Regex> = OnceLock::new();
    let debug_stmt = DEBUG.get_or_init(|| {
        Regex::new(r"^\s*(?:console\.[A-Za-z]+\s*\(|alert\s*\(|debugger\b)").unwrap()
    });
    lines.retain(|l| !debug_stmt.is_match(&l.text));
}

/// Fixed formatting rules: leading 4-space groups become tabs, trailing
/// whitespace goes, blank runs collapse to [`MAX_BLANK_RUN`].
fn beautify(lines: &mut Vec<SourceLine>) {
    for line in lines.iter_mut() {
        let mut rest = line.text.trim_end();
        let mut tabs = 0usize;
        while let Some(stripped) = rest.strip_prefix("    ") {
            tabs += 1;
            rest = stripped;
        }
        line.text = format!("{}{}", "\t".repeat(tabs), rest);
    }
    collapse_blank_runs(lines, MAX_BLANK_RUN);
}

/// Textual minification for vendor bundles: whole-line `//` comments,
/// block comments, blank lines and trailing whitespace are removed. Code
/// lines are otherwise untouched, so the result stays correct without a
/// JS parser.
fn minify(lines: &mut Vec<SourceLine>) {
    let mut in_block_comment = false;
    lines.retain_mut(|l| {
        let trimmed = l.text.trim();
        if in_block_comment {
            if trimmed.ends_with("*/") {
                in_block_comment = false;
            }
            return false;
        }
        if trimmed.starts_with("/*") && !trimmed.contains("*/") {
            in_block_comment = true;
            return false;
        }
        if trimmed.is_empty()
            || trimmed.starts_with("//")
            || (trimmed.starts_with("/*") && trimmed.ends_with("*/"))
        {
            return false;
        }
        l.text = l.text.trim_end().to_string();
        true
    });
}

fn collapse_blank_runs(lines: &mut Vec<SourceLine>, max_run: usize) {
    let mut run = 0usize;
    lines.retain(|l| {
        if l.text.trim().is_empty() {
            run += 1;
            run <= max_run
        } else {
            run = 0;
            true
        }
    });
}

fn emit(ctx: &Pipeline, name: &str, lines: &[SourceLine], sources: &[String]) -> Result<()> {
    let map_name = format!("{name}.map");

    let mut builder = SourceMapBuilder::new();
    for source in sources {
        builder.add_source(source);
    }

    let mut code = String::new();
    for line in lines {
        code.push_str(&line.text);
        code.push('\n');
        builder.push_mapped(line.source, line.line);
    }
    code.push_str(&sourcemap::js_footer(&map_name));

    let dest = ctx.paths.build_scripts.join(name);
    fsx::write(&dest, code)?;
    fsx::write(
        &ctx.paths.build_scripts.join(&map_name),
        builder.build(name),
    )?;
    debug!(lines = lines.len(), "scripts: wrote {}", dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Flags;

    fn ctx(root: &Path, production: bool) -> Pipeline {
        Pipeline::new(
            root,
            Flags {
                production,
                ..Flags::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn includes_resolve_relative_to_including_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fsx::write(
            &root.join("src/js/main.js"),
            "// @include('lib/util.js')\nrun();\n",
        )
        .unwrap();
        fsx::write(&root.join("src/js/lib/util.js"), "function run() {}\n").unwrap();

        main(&ctx(root, false)).unwrap();

        let out = std::fs::read_to_string(root.join("build/js/main.js")).unwrap();
        assert!(out.starts_with("function run() {}\nrun();\n"));
        assert!(out.contains("sourceMappingURL=main.js.map"));

        let map = std::fs::read_to_string(root.join("build/js/main.js.map")).unwrap();
        let v: serde_json::Value = serde_json::from_str(&map).unwrap();
        let sources: Vec<&str> = v["sources"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s.as_str().unwrap())
            .collect();
        assert_eq!(sources, vec!["src/js/main.js", "src/js/lib/util.js"]);
    }

    #[test]
    fn include_cycle_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fsx::write(&root.join("src/js/a.js"), "// @include('b.js')\n").unwrap();
        fsx::write(&root.join("src/js/b.js"), "// @include('a.js')\n").unwrap();

        let mut sources = Vec::new();
        let err = resolve_includes(
            &root.join("src/js/a.js"),
            root,
            &mut sources,
            &mut Vec::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("include cycle"));
    }

    #[test]
    fn production_strips_debug_statements() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fsx::write(
            &root.join("src/js/main.js"),
            "let x = 1;\nconsole.log('dbg');\ndebugger;\nuse(x);\n",
        )
        .unwrap();

        main(&ctx(root, true)).unwrap();
        let out = std::fs::read_to_string(root.join("build/js/main.js")).unwrap();
        assert!(!out.contains("console.log"));
        assert!(!out.contains("debugger"));
        assert!(out.contains("var x = 1;"));

        main(&ctx(root, false)).unwrap();
        let out = std::fs::read_to_string(root.join("build/js/main.js")).unwrap();
        assert!(out.contains("console.log('dbg');"));
    }

    #[test]
    fn compat_pass_rewrites_decls_and_plain_template_literals() {
        let mut lines = vec![
            SourceLine {
                text: "const a = `hi`;".into(),
                source: 0,
                line: 0,
            },
            SourceLine {
                text: "let b = `x ${a}`;".into(),
                source: 0,
                line: 1,
            },
            SourceLine {
                text: "lettuce = 1;".into(),
                source: 0,
                line: 2,
            },
        ];
        compat_pass(&mut lines);
        assert_eq!(lines[0].text, "var a = \"hi\";");
        // interpolation is left alone
        assert_eq!(lines[1].text, "var b = `x ${a}`;");
        // no false positive on identifiers starting with `let`
        assert_eq!(lines[2].text, "lettuce = 1;");
    }

    #[test]
    fn vendor_minifies_comments_and_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fsx::write(
            &root.join("src/js/vendor.js"),
            "/*!\n * big banner\n */\n// note\n\nwindow.lib = {};   \n",
        )
        .unwrap();

        vendor(&ctx(root, false)).unwrap();
        let out = std::fs::read_to_string(root.join("build/js/vendor.js")).unwrap();
        assert_eq!(out, "window.lib = {};\n//# sourceMappingURL=vendor.js.map\n");
    }

    #[test]
    fn beautify_tabs_and_blank_collapse() {
        let mut lines = ["if (a) {", "        b();", "", "", "", "}"]
            .into_iter()
            .enumerate()
            .map(|(i, text)| SourceLine {
                text: text.into(),
                source: 0,
                line: i as u32,
            })
            .collect::<Vec<_>>();
        beautify(&mut lines);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["if (a) {", "\t\tb();", "", "}"]);
    }
}
