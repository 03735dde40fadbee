//! Google Sheets work queue.
//!
//! This crate provides:
//! - A REST client for the Sheets API v4 (service account auth via gcp_auth)
//! - The `QueueBackend` seam with an in-memory implementation
//! - `SheetQueue`: find the next pending row and mark it done

pub mod a1;
pub mod auth;
pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod queue;

pub use auth::{AccessTokenSource, ServiceAccountToken, StaticToken, SHEETS_SCOPE};
pub use backend::{CellUpdate, MemoryQueue, QueueBackend};
pub use client::SheetsClient;
pub use config::SheetsConfig;
pub use error::{SheetsError, SheetsResult};
pub use queue::SheetQueue;
