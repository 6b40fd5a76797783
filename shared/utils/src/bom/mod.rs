//! BOM Processing Module
//!
//! Derives the assembly hierarchy from flat BOM relationship rows.

pub mod tree;

pub use tree::build_tree;
