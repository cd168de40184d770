//! Pure policy evaluation (no IO).
//!
//! Input: two normalized invocation records plus a resolved config.
//! Output: one decision (status + reasons + codes + metrics + details).
//!
//! The five policy evaluators are stateless functions over in-memory data;
//! the aggregator and the waiver applier are the only synchronization
//! points. Nothing here reads files, touches the clock, or retries.

#![forbid(unsafe_code)]

pub mod policy;
pub mod record;

mod aggregate;
mod engine;
pub mod policies;
mod similarity;

#[cfg(test)]
mod proptest;

pub use engine::{evaluate_records, AcceptedRisk, EvalOptions};
pub use record::{EvalMetadata, InvocationRecord, RecordInput};
