use promptgate_types::InputValidationError;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

const DATE_ONLY: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");
const NAIVE_DATETIME: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const NAIVE_DATETIME_SUBSECOND: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");

/// Parse an ISO-8601 timestamp into UTC.
///
/// Accepted forms:
/// - RFC 3339 with an offset (`2026-02-15T00:00:00Z`, `...+01:00`),
///   normalized to UTC;
/// - a naive datetime (`2026-02-15T00:00:00`), treated as UTC;
/// - a bare date (`2026-02-15`), treated as end-of-day UTC (23:59:59) so a
///   waiver expiring "on" a date covers the whole day.
pub fn parse_utc_timestamp(value: &str) -> Option<OffsetDateTime> {
    let raw = value.trim();

    if raw.len() == 10 {
        if let Ok(date) = Date::parse(raw, DATE_ONLY) {
            return date.with_hms(23, 59, 59).ok().map(|dt| dt.assume_utc());
        }
        return None;
    }

    if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(parsed.to_offset(UtcOffset::UTC));
    }

    PrimitiveDateTime::parse(raw, NAIVE_DATETIME)
        .or_else(|_| PrimitiveDateTime::parse(raw, NAIVE_DATETIME_SUBSECOND))
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

/// Parse the caller-supplied evaluation time used for waiver expiry checks.
pub fn parse_evaluation_time(value: &str) -> Result<OffsetDateTime, InputValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InputValidationError::new(
            "metadata.evaluation_time must be a non-empty ISO-8601 string.",
        ));
    }
    parse_utc_timestamp(trimmed).ok_or_else(|| {
        InputValidationError::new(format!(
            "metadata.evaluation_time is not a valid ISO-8601 timestamp: '{trimmed}'."
        ))
    })
}
