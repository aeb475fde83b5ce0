//! Merges a directory of XMind workbooks into one master workbook.
//!
//! The core is the tree-merge and consolidation engine in [`merge`],
//! [`consolidate`], and [`transform`]; the surrounding modules are archive,
//! resource, and orchestration plumbing.

pub mod annotate;
pub mod archive;
pub mod consolidate;
pub mod identity;
pub mod merge;
pub mod model;
pub mod resources;
pub mod run;
pub mod template;
pub mod transform;
