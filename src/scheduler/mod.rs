//! Snapshot pacing between the upstream link and the panel UI.
//!
//! The simulator publishes machine-state snapshots as fast as it steps, which
//! at high clock speeds is far more often than the panel can usefully repaint.
//! This module bounds repaint pressure to one frame per configured interval
//! while guaranteeing the newest snapshot always reaches the screen:
//!
//! ```text
//! link task ──mpsc──► SchedulerHandle task ──mpsc──► panel UI
//!                      │
//!                      ├── FramePacer (pure decision core)
//!                      └── single trailing-flush timer
//! ```
//!
//! `FramePacer` is synchronous and owns all pacing state; the task in
//! `scheduler_handle` only translates its decisions into channel sends and
//! one armed `sleep_until`. Keeping the decisions pure makes the single-timer
//! invariant and the coalescing behavior testable without a runtime.

pub mod frame_pacer;
pub mod scheduler_handle;

pub use frame_pacer::{FramePacer, PaceDecision};
pub use scheduler_handle::{SchedulerError, SchedulerHandle, SchedulerSettings};
