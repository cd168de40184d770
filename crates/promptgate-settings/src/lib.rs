//! Config parsing, merging, and preset resolution.
//!
//! This crate is intentionally IO-free: it merges and validates
//! configuration provided as JSON values. Reading config files (and the
//! `PROMPTGATE_CONFIG`/`PROMPTGATE_ENV` environment variables) is the app
//! layer's job.

#![forbid(unsafe_code)]

mod defaults;
mod merge;
mod presets;
mod resolve;

pub use merge::deep_merge;
pub use presets::available_presets;
pub use resolve::{resolve_config, ResolvedConfig};

use promptgate_types::ConfigValidationError;
use serde_json::Value as JsonValue;

/// Parse a raw config document. Malformed JSON is a config error, reported
/// with the parser's own position message.
pub fn parse_config_json(input: &str) -> Result<JsonValue, ConfigValidationError> {
    let value: JsonValue = serde_json::from_str(input)
        .map_err(|err| ConfigValidationError::new(format!("Config is not valid JSON: {err}.")))?;
    if !value.is_object() {
        return Err(ConfigValidationError::new(
            "Config document must be a JSON object.",
        ));
    }
    Ok(value)
}
