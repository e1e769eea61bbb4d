// src/fsx.rs

//! Filesystem plumbing shared by the tasks: glob compilation, tree
//! collection, destination mirroring, the mtime freshness check behind the
//! `cache` flag, and parent-creating writes.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob =
            Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Returns `None` if the path is not under `root` and cannot be relativized.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let s = rel.to_string_lossy().replace('\\', "/");
    Some(s)
}

/// Collect every regular file under `dir`, sorted for deterministic batch
/// order. Dotfiles are included; missing directories yield an empty list
/// (a project without resources is not an error).
pub fn walk_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Collect files under `root` whose root-relative path matches `include`
/// and does not match `exclude`.
pub fn collect(root: &Path, include: &GlobSet, exclude: Option<&GlobSet>) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let Some(rel) = relative_str(root, e.path()) else {
                return false;
            };
            include.is_match(&rel) && !exclude.is_some_and(|x| x.is_match(&rel))
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Map `file` (which lives under `src_root`) to its mirrored path under
/// `dest_root`.
pub fn mirror(src_root: &Path, file: &Path, dest_root: &Path) -> Result<PathBuf> {
    let rel = file
        .strip_prefix(src_root)
        .with_context(|| format!("{file:?} is not under {src_root:?}"))?;
    Ok(dest_root.join(rel))
}

/// The cache contract: the destination counts as current when its
/// modification time is not older than the source's. Mtime only; a
/// touched-but-unchanged file is treated as changed.
pub fn dest_is_current(src: &Path, dest: &Path) -> bool {
    let src_mtime = match fs::metadata(src).and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(_) => return false,
    };
    let dest_mtime = match fs::metadata(dest).and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(_) => return false,
    };
    dest_mtime >= src_mtime
}

/// Write `bytes` to `path`, creating parent directories as needed.
pub fn write(path: &Path, bytes: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {parent:?}"))?;
    }
    fs::write(path, bytes).with_context(|| format!("writing {path:?}"))
}

/// Copy `src` to `dest`, creating parent directories as needed.
pub fn copy(src: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {parent:?}"))?;
    }
    fs::copy(src, dest).with_context(|| format!("copying {src:?} to {dest:?}"))?;
    Ok(())
}
