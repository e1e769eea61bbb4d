// src/tasks/lint.rs

//! Linters for the three source categories. Violations go to standard
//! output as `file:line rule message`; the error policy decides whether a
//! non-empty report fails the task or is merely informational.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::Result;
use regex::Regex;
use tracing::debug;

use crate::errors::PipelineError;
use crate::fsx;
use crate::pipeline::Pipeline;

#[derive(Debug)]
struct Violation {
    file: String,
    /// 1-based; 0 means the whole file.
    line: usize,
    rule: &'static str,
    message: String,
}

pub fn js(ctx: &Pipeline) -> Result<()> {
    static EQEQ: OnceLock<Regex> = OnceLock::new();
    static DEBUGGER: OnceLock<Regex> = OnceLock::new();
    let eqeq =
        EQEQ.get_or_init(|| Regex::new(r"(?:^|[^=!<>&|+\-*/%^])(==|!=)(?:[^=]|$)").unwrap());
    let debugger = DEBUGGER.get_or_init(|| Regex::new(r"^\s*debugger\b").unwrap());

    let include = fsx::build_globset(&["**/*.js"])?;
    let files = fsx::collect(&ctx.paths.scripts, &include, None);

    let mut violations = Vec::new();
    for file in &files {
        let name = display_name(ctx, file);
        let Ok(text) = std::fs::read_to_string(file) else {
            continue;
        };
        for (i, line) in text.lines().enumerate() {
            if eqeq.is_match(line) {
                violations.push(Violation {
                    file: name.clone(),
                    line: i + 1,
                    rule: "eqeqeq",
                    message: "expected === or !== instead of loose equality".into(),
                });
            }
            if debugger.is_match(line) {
                violations.push(Violation {
                    file: name.clone(),
                    line: i + 1,
                    rule: "no-debugger",
                    message: "debugger statement".into(),
                });
            }
            if line.ends_with(' ') || line.ends_with('\t') {
                violations.push(Violation {
                    file: name.clone(),
                    line: i + 1,
                    rule: "no-trailing-whitespace",
                    message: "trailing whitespace".into(),
                });
            }
        }
        if !text.is_empty() && !text.ends_with('\n') {
            violations.push(Violation {
                file: name,
                line: 0,
                rule: "eol-last",
                message: "missing newline at end of file".into(),
            });
        }
    }

    finish(ctx, "script", &violations)
}

pub fn templates(ctx: &Pipeline) -> Result<()> {
    let mut violations = Vec::new();
    let mut registered = Vec::new();

    for file in template_files(ctx) {
        let name = display_name(ctx, &file);
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        // Per-file syntax check in a throwaway environment.
        let mut probe = tera::Tera::default();
        if let Err(err) = probe.add_raw_template(&name, &content) {
            violations.push(Violation {
                file: name.clone(),
                line: 0,
                rule: "syntax",
                message: flatten_tera_error(&err),
            });
        }
        registered.push((template_engine_name(ctx, &file), content));
    }

    // Cross-file check: unresolved extends/include chains only surface
    // when the whole set is registered together.
    let mut env = tera::Tera::default();
    if let Err(err) = env.add_raw_templates(registered) {
        violations.push(Violation {
            file: "<templates>".into(),
            line: 0,
            rule: "inheritance",
            message: flatten_tera_error(&err),
        });
    }

    finish(ctx, "template", &violations)
}

pub fn styles(ctx: &Pipeline) -> Result<()> {
    static UPPER_HEX: OnceLock<Regex> = OnceLock::new();
    let upper_hex =
        UPPER_HEX.get_or_init(|| Regex::new(r"#[0-9a-fA-F]*[A-F][0-9a-fA-F]*\b").unwrap());

    let include = fsx::build_globset(&["**/*.scss"])?;
    let files = fsx::collect(&ctx.paths.styles, &include, None);

    let mut violations = Vec::new();
    for file in &files {
        let name = display_name(ctx, file);
        let Ok(text) = std::fs::read_to_string(file) else {
            continue;
        };
        for (i, line) in text.lines().enumerate() {
            if upper_hex.is_match(line) {
                violations.push(Violation {
                    file: name.clone(),
                    line: i + 1,
                    rule: "color-hex-case",
                    message: "hex colors should be lowercase".into(),
                });
            }
            if line.ends_with(' ') || line.ends_with('\t') {
                violations.push(Violation {
                    file: name.clone(),
                    line: i + 1,
                    rule: "no-trailing-whitespace",
                    message: "trailing whitespace".into(),
                });
            }
        }
    }

    // Parse check on the top-level sheets (partials are checked through
    // whichever sheet pulls them in).
    for file in crate::tasks::styles::top_level_sheets(&ctx.paths.styles) {
        if let Err(err) = grass::from_path(&file, &grass::Options::default()) {
            violations.push(Violation {
                file: display_name(ctx, &file),
                line: 0,
                rule: "scss",
                message: err.to_string(),
            });
        }
    }

    finish(ctx, "style", &violations)
}

fn template_files(ctx: &Pipeline) -> Vec<std::path::PathBuf> {
    let mut files: Vec<std::path::PathBuf> = std::fs::read_dir(&ctx.paths.templates)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect()
        })
        .unwrap_or_default();
    files.extend(fsx::walk_files(&ctx.paths.template_partials));
    files.retain(|p| p.extension().is_some_and(|e| e.eq_ignore_ascii_case("tera")));
    files.sort();
    files.dedup();
    files
}

fn template_engine_name(ctx: &Pipeline, path: &Path) -> String {
    fsx::relative_str(&ctx.paths.templates, path)
        .unwrap_or_else(|| display_name(ctx, path))
}

fn display_name(ctx: &Pipeline, path: &Path) -> String {
    fsx::relative_str(&ctx.paths.root, path)
        .unwrap_or_else(|| path.display().to_string())
}

/// Tera error messages bury the cause in `source()`; pull the chain up
/// into one line.
fn flatten_tera_error(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn finish(ctx: &Pipeline, category: &'static str, violations: &[Violation]) -> Result<()> {
    for v in violations {
        if v.line > 0 {
            println!("{}:{} {} {}", v.file, v.line, v.rule, v.message);
        } else {
            println!("{} {} {}", v.file, v.rule, v.message);
        }
    }
    if violations.is_empty() {
        debug!(category, "lint: clean");
        return Ok(());
    }
    println!("{} {category} lint violation(s)", violations.len());

    ctx.policy.apply(
        PipelineError::LintViolations {
            category,
            count: violations.len(),
        }
        .into(),
    )
}
