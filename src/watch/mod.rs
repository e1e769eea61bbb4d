// src/watch/mod.rs

//! Filesystem watching: a static rule table mapping source globs to tasks,
//! and the notify-driven loop that applies it.

pub mod rules;
pub mod watcher;

pub use rules::{WatchRule, build_rules};
pub use watcher::run;
