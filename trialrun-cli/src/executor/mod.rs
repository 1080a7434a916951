//! Experiment Execution
//!
//! Drives a validated configuration through the experiment lifecycle and
//! aggregates per-run results.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ExperimentConfig (loaded by the host environment)
//!       │
//!       ▼
//! ┌─────────────┐
//! │  validate   │  Pure gate; aborts before any run on failure
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   prepare   │  Output registry set, run table built
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ controller  │  Sequential runs, seven phases each, failures contained
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   summary   │  Aggregated outcome, terminal + JSON output
//! └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`controller`] - Experiment state machine and per-run lifecycle driver
//! - [`summary`] - Human summary formatting and JSON persistence

mod controller;
mod summary;

pub use controller::{ControllerState, ExperimentController};
pub use summary::{format_summary, write_summary_json};
