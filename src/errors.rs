// src/errors.rs

//! Structured task-level errors and the global error policy.
//!
//! Batch tasks (copy, images) handle per-file failures internally and never
//! abort sibling files. Whole-task failures (template render, style compile,
//! lint violations) are routed through [`ErrorPolicy`], which either logs and
//! resolves the task (lenient, the default) or propagates the failure
//! (`--throw-errors`).

use std::path::PathBuf;

use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("template `{name}` failed to render: {message}")]
    TemplateRender { name: String, message: String },

    #[error("stylesheet {file:?} failed to compile: {message}")]
    StyleCompile { file: PathBuf, message: String },

    #[error("include cycle detected while resolving {file:?}")]
    IncludeCycle { file: PathBuf },

    #[error("include target not found: {target} (from {file:?})")]
    IncludeMissing { file: PathBuf, target: String },

    #[error("{count} lint violation(s) in {category} sources")]
    LintViolations { category: &'static str, count: usize },

    #[error("{failed} of {total} files failed in the {task} task")]
    BatchFailures {
        task: &'static str,
        failed: usize,
        total: usize,
    },
}

/// How whole-task failures are treated, selected once at startup from
/// `--throw-errors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Log and keep going. Keeps long-running watch/serve sessions alive
    /// across compile errors.
    Lenient,
    /// Propagate as a hard failure; the CLI exits non-zero.
    Strict,
}

impl ErrorPolicy {
    pub fn from_throw_errors(throw_errors: bool) -> Self {
        if throw_errors { Self::Strict } else { Self::Lenient }
    }

    /// Route a task-level failure through the policy.
    pub fn apply(self, err: anyhow::Error) -> anyhow::Result<()> {
        match self {
            Self::Lenient => {
                error!("{err:#}");
                Ok(())
            }
            Self::Strict => Err(err),
        }
    }

    pub fn is_strict(self) -> bool {
        matches!(self, Self::Strict)
    }
}
