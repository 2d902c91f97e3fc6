//! Batch runtime: the pool driver, its builder, and cancellation.
//!
//! [`BatchOrchestrator`] is the core of the crate — it owns the pending
//! queue and the active/completed counters for one batch and enforces the
//! concurrency limit structurally, admitting one queued job per consumed
//! terminal outcome.

mod builder;
mod cancel;
mod driver;

pub use builder::BatchOrchestratorBuilder;
pub use cancel::CancelToken;
pub use driver::BatchOrchestrator;
