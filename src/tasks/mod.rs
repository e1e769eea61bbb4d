// src/tasks/mod.rs

//! The pipeline's tasks. Each leaf task is a synchronous batch function
//! `fn(&Pipeline) -> Result<()>` (the template task additionally takes the
//! changed file); composition (parallel build, sequential lint, the default
//! series) lives in [`crate::pipeline`].

pub mod archive;
pub mod copy;
pub mod images;
pub mod lint;
pub mod scripts;
pub mod sprites;
pub mod styles;
pub mod templates;

use std::fmt;

use clap::ValueEnum;

/// Every task name the CLI accepts, leaf and composite alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum TaskKind {
    Copy,
    Images,
    PngSprites,
    SvgSprites,
    JsMain,
    JsVendor,
    Templates,
    Styles,
    LintJs,
    LintTemplates,
    LintStyles,
    Lint,
    Build,
    Watch,
    Serve,
    Zip,
    Default,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Images => "images",
            Self::PngSprites => "png-sprites",
            Self::SvgSprites => "svg-sprites",
            Self::JsMain => "js-main",
            Self::JsVendor => "js-vendor",
            Self::Templates => "templates",
            Self::Styles => "styles",
            Self::LintJs => "lint-js",
            Self::LintTemplates => "lint-templates",
            Self::LintStyles => "lint-styles",
            Self::Lint => "lint",
            Self::Build => "build",
            Self::Watch => "watch",
            Self::Serve => "serve",
            Self::Zip => "zip",
            Self::Default => "default",
        }
    }

    /// Leaf tasks run as one blocking unit; composites are orchestrated
    /// in the pipeline layer.
    pub fn is_leaf(self) -> bool {
        !matches!(
            self,
            Self::Lint | Self::Build | Self::Watch | Self::Serve | Self::Default
        )
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
