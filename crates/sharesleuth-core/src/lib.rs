/// ShareSleuth Core — scanning, checkpointing, and department classification.
///
/// This crate contains all business logic with zero CLI dependencies.
/// It is designed to be reusable across different frontends.
///
/// # Modules
///
/// - [`model`] — Canonical records, permission entries, keyword map, classification results.
/// - [`flags`] — Migration-blocker flag evaluation.
/// - [`permissions`] — Access-right sets and the explicit-permission differ.
/// - [`platform`] — ACL sources (Windows DACL reader) and elevation checks.
/// - [`normalize`] — Record construction, disk-usage extract reader, permission back-fill.
/// - [`output`] — Canonical CSV readers/writers and atomic file replacement.
/// - [`checkpoint`] — Scan progress persistence and freshness decisions.
/// - [`scanner`] — Background filesystem scanning with progress reporting.
/// - [`classify`] — Bottom-up keyword consensus classification.
/// - [`analysis`] — Issue inventory and run summary.
/// - [`pipeline`] — Stage sequencing for a complete run.
pub mod analysis;
pub mod checkpoint;
pub mod classify;
pub mod config;
pub mod error;
pub mod flags;
pub mod model;
pub mod normalize;
pub mod output;
pub mod permissions;
pub mod pipeline;
pub mod platform;
pub mod scanner;
pub mod stats;

pub use config::ScanConfig;
pub use error::{Error, Result};
pub use stats::RunStats;
