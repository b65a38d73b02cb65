use time::OffsetDateTime;
use time::macros::format_description;

/// Watermark used when every available event is requested.
pub const EPOCH_START: &str = "1970-01-01T00:00:00Z";

/// Formats `at` the same way event dates are formatted, so that the result
/// compares lexicographically against them (millisecond precision, UTC).
pub fn format_event_date(at: OffsetDateTime) -> String {
    let at = at.to_offset(time::UtcOffset::UTC);
    at.format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    ))
    .unwrap_or_else(|_| EPOCH_START.to_owned())
}

/// The current time as an event date.
pub fn now_event_date() -> String {
    format_event_date(OffsetDateTime::now_utc())
}
