//! Identifier detection and rename planning for deity.
//!
//! This crate locates a sensitive identifier inside a filename and computes
//! the name the file will carry once the identifier is replaced by its short
//! digest. Nothing here touches the filesystem.

pub mod patterns;
pub mod planner;

pub use patterns::{IdentifierMatch, IdentifierPatterns};
pub use planner::{plan_many, plan_one, EncodePlan, PlanEntry, RenameOp};
