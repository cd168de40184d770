//! Stable DTOs and reason codes used across the promptgate workspace.
//!
//! This crate is intentionally boring:
//! - data types for the emitted decision
//! - stable internal/public reason-code tables
//! - the error taxonomy shared by every layer
//!
//! Anything that evaluates, merges, or renders lives elsewhere.

#![forbid(unsafe_code)]

pub mod codes;
pub mod decision;
pub mod error;

pub use decision::{
    AppliedWaiver, Decision, DecisionMetadata, EvalMode, PolicyName, PolicyResult, Status,
    POLICY_ORDER, SCHEMA_VERSION,
};
pub use error::{ConfigValidationError, EvalError, InputValidationError};
