// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use notify::event::EventKind;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, info, warn};

use crate::pipeline::Pipeline;
use crate::tasks::TaskKind;
use crate::watch::rules::build_rules;

/// Watch the project source tree and re-run tasks as files change.
///
/// Events are applied without debouncing; every task is cheap enough with
/// caching on, and an editor's write burst just produces a couple of
/// redundant incremental runs. Task failures are logged and the loop keeps
/// going, so a session survives any number of bad edits.
///
/// Runs until the notify backend shuts down, which in practice means
/// forever.
pub async fn run(pipeline: Arc<Pipeline>) -> Result<()> {
    let rules = build_rules(&pipeline.paths)?;
    let root = pipeline.paths.root.clone();

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    // tracing is not safe from the notify thread.
                    eprintln!("assetpipe: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("assetpipe: file watch error: {err}");
            }
        },
        Config::default(),
    )?;
    watcher.watch(&root, RecursiveMode::Recursive)?;
    info!("watching {:?}", root);

    while let Some(event) = event_rx.recv().await {
        if matches!(event.kind, EventKind::Access(_)) {
            continue;
        }
        debug!("notify event: {:?}", event);
        let removed = matches!(event.kind, EventKind::Remove(_));

        for path in &event.paths {
            let Some(rel) = crate::fsx::relative_str(&root, path) else {
                warn!("ignoring path outside project root: {:?}", path);
                continue;
            };
            for rule in &rules {
                if !rule.matches(&rel) {
                    continue;
                }
                debug!(task = %rule.task, path = %rel, "watch match");
                // A removal leaves no file to compile incrementally
                // against, so the template task gets no changed path and
                // rebuilds everything.
                let changed: Option<PathBuf> = (rule.forward_changed && !removed)
                    .then(|| path.clone());
                run_triggered(&pipeline, rule.task, changed).await;
            }
        }
    }

    debug!("watch loop ended");
    Ok(())
}

/// Run one triggered task; a failure must never take the loop down.
async fn run_triggered(pipeline: &Arc<Pipeline>, task: TaskKind, changed: Option<PathBuf>) {
    if let Err(err) = pipeline.run_task(task, changed).await {
        error!(task = %task, "watch-triggered task failed: {err:#}");
    }
}
