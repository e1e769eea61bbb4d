// src/tasks/copy.rs

//! Resource copier: mirrors `src/resources/**` (dotfiles included) into the
//! build root verbatim, skipping files whose destination is already current
//! when caching is on.

use anyhow::Result;
use tracing::{debug, warn};

use crate::fsx;
use crate::pipeline::Pipeline;

pub fn run(ctx: &Pipeline) -> Result<()> {
    let files = fsx::walk_files(&ctx.paths.resources);
    let total = files.len();
    let mut copied = 0usize;
    let mut failed = 0usize;

    for file in &files {
        let dest = fsx::mirror(&ctx.paths.resources, file, &ctx.paths.build)?;
        if ctx.flags.cache && fsx::dest_is_current(file, &dest) {
            debug!(file = %file.display(), "copy: destination current, skipping");
            continue;
        }
        match fsx::copy(file, &dest) {
            Ok(()) => {
                debug!(file = %file.display(), "copy");
                copied += 1;
            }
            Err(err) => {
                // Per-file failures never abort the batch.
                warn!(file = %file.display(), "copy failed: {err:#}");
                failed += 1;
            }
        }
    }

    debug!(total, copied, failed, "copy finished");
    if failed > 0 && ctx.policy.is_strict() {
        return Err(crate::errors::PipelineError::BatchFailures {
            task: "copy",
            failed,
            total,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Flags;

    fn pipeline(root: &std::path::Path, cache: bool) -> Pipeline {
        Pipeline::new(
            root,
            Flags {
                cache,
                ..Flags::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn copies_dotfiles_and_mirrors_tree() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fsx::write(&root.join("src/resources/.htaccess"), "deny").unwrap();
        fsx::write(&root.join("src/resources/fonts/a.woff2"), "f").unwrap();

        run(&pipeline(root, true)).unwrap();

        assert_eq!(
            std::fs::read_to_string(root.join("build/.htaccess")).unwrap(),
            "deny"
        );
        assert!(root.join("build/fonts/a.woff2").is_file());
    }

    #[test]
    fn cache_skips_current_destination() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fsx::write(&root.join("src/resources/a.txt"), "v1").unwrap();

        run(&pipeline(root, true)).unwrap();
        // Plant a sentinel in the destination; its mtime is now newer than
        // the source, so a cached rerun must leave it alone.
        std::fs::write(root.join("build/a.txt"), "sentinel").unwrap();
        run(&pipeline(root, true)).unwrap();
        assert_eq!(
            std::fs::read_to_string(root.join("build/a.txt")).unwrap(),
            "sentinel"
        );

        // With caching off the sentinel is overwritten.
        run(&pipeline(root, false)).unwrap();
        assert_eq!(
            std::fs::read_to_string(root.join("build/a.txt")).unwrap(),
            "v1"
        );
    }
}
