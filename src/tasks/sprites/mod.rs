// src/tasks/sprites/mod.rs

//! Sprite builders: many small images merged into one asset plus the
//! metadata a stylesheet needs to address each piece.

pub mod png;
pub mod svg;
