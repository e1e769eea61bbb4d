// src/lib.rs

//! assetpipe: build, watch, serve and package a static front-end.
//!
//! The crate is a task runner over a conventional source tree: `src/`
//! holds resources, images, sprites, scripts, templates and styles; leaf
//! tasks transform each area into `build/`; composites wire the leaves
//! into `build`, `lint`, `watch`, `serve` and the timestamped `zip`
//! archive. [`run`] is the entry point used by `main.rs`.

pub mod cli;
pub mod config;
pub mod errors;
pub mod fsx;
pub mod logging;
pub mod pipeline;
pub mod serve;
pub mod sourcemap;
pub mod tasks;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::cli::CliArgs;
use crate::config::Flags;
use crate::pipeline::Pipeline;
use crate::tasks::TaskKind;

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    let flags = Flags {
        cache: !args.no_cache,
        production: args.production,
        throw_errors: args.throw_errors,
        html_ext: !args.no_html_ext,
        port: args.port,
    };
    debug!(?flags, task = %args.task, "starting");

    let pipeline = Arc::new(Pipeline::new(&args.root, flags)?);

    match args.task {
        TaskKind::Build => pipeline.build().await,
        TaskKind::Lint => pipeline.lint().await,
        TaskKind::Watch => watch::run(pipeline).await,
        TaskKind::Serve => serve::run(pipeline).await,
        TaskKind::Default => {
            pipeline.build().await?;
            // Watch and serve both run until the process is killed.
            let watcher = watch::run(Arc::clone(&pipeline));
            let server = serve::run(pipeline);
            tokio::try_join!(watcher, server)?;
            Ok(())
        }
        leaf => pipeline.run_task(leaf, None).await,
    }
}
