//! Shared data models for the ReelQueue pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Queue rows and their status
//! - Claimed rows with the header used to write them back
//! - Row identifiers used to name artifacts
//! - The on-disk artifact layout shared by every stage

pub mod layout;
pub mod queue;
pub mod row;
pub mod status;

pub use layout::{ArtifactKind, ArtifactLayout};
pub use queue::{HeaderIndex, PendingRow};
pub use row::{columns, QueueRow, RowId, RowIdError};
pub use status::RowStatus;
