//! Sweep Executor
//!
//! Drives a planned sweep through the process runner and writes one row per
//! repetition.
//!
//! ## Pipeline Overview
//!
//! ```text
//! SweepPlan (fanout outer, clients inner)
//!       │
//!       ▼
//! ┌─────────────┐
//! │    reset    │  Schema + data load, once per fanout value (fanout sweep)
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │  execution  │  Run each repetition, extract metrics
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │    sink     │  Append + flush one CSV row
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ formatting  │  Progress lines, dry-run plan, aggregate tables
//! └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`execution`] - Sweep driver and its error type
//! - [`formatting`] - Human-readable output formatting

mod execution;
mod formatting;

// Re-export public API
pub use execution::{ResetStep, SweepDriver, SweepError, SweepSummary};
pub use formatting::{format_aggregate_human, format_plan, format_progress_line, format_summary};
