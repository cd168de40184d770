//! Deterministic text rendering for decisions.
//!
//! Everything here is a pure `Decision -> String` function: same decision,
//! same bytes. Display order is fixed and independent of the evaluation
//! order so reports stay diffable across runs.

#![forbid(unsafe_code)]

mod text;

pub use text::render_text;
