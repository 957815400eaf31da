//! The per-routine rewrite pass and its collaborators.
//!
//! [`RewritePass`] is built once over read-only rule snapshots and then run
//! once per routine (or over many routines in parallel). [`TypeHierarchy`]
//! supplies ancestor types for owner-set expansion; [`DependencySet`]
//! accumulates which third-party rule sources actually fired.

mod deps;
mod hierarchy;
mod rewrite;

pub use deps::{DependencySet, PLATFORM_SOURCE};
pub use hierarchy::{EmptyHierarchy, MapHierarchy, TypeHierarchy};
pub use rewrite::RewritePass;
