//! Use case orchestration for promptgate.
//!
//! This crate owns the file I/O the core deliberately avoids: reading
//! baseline/candidate documents, locating the config file, and mapping
//! decision statuses to CI exit codes. The CLI crate depends on this; it
//! only handles argument parsing and printing.

#![forbid(unsafe_code)]

mod evaluate;
mod input;

pub use evaluate::{
    decision_exit_code, evaluate, is_ci_environment, load_config, EvaluateRequest, FailOn,
};
pub use input::{read_record_input, record_from_value, split_combined_input, StdinCache};
