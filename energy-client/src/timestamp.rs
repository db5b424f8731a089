//! Permissive ISO-8601 parsing for timestamps supplied by sensors and
//! query strings.
//!
//! Accepted forms, tried in order:
//! - RFC 3339 with an explicit offset (`2024-01-01T10:00:00+02:00`, `...Z`)
//! - a naive date-time with `T` or space separator, optional fraction,
//!   interpreted as UTC (`2024-01-01T10:00:00.123456`)
//! - a bare date, meaning midnight UTC (`2024-01-01`)

use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    Date, OffsetDateTime, PrimitiveDateTime, Time,
};

const NAIVE_T: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const NAIVE_T_FRACTION: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
const NAIVE_SPACE: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const NAIVE_SPACE_FRACTION: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");
const NAIVE_MINUTES: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");
const DATE_ONLY: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parse `input`, returning `None` when no accepted form matches.
pub fn parse_timestamp(input: &str) -> Option<OffsetDateTime> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(ts);
    }

    for fmt in [
        NAIVE_T_FRACTION,
        NAIVE_T,
        NAIVE_SPACE_FRACTION,
        NAIVE_SPACE,
        NAIVE_MINUTES,
    ] {
        if let Ok(naive) = PrimitiveDateTime::parse(s, fmt) {
            return Some(naive.assume_utc());
        }
    }

    Date::parse(s, DATE_ONLY)
        .ok()
        .map(|d| PrimitiveDateTime::new(d, Time::MIDNIGHT).assume_utc())
}

/// Parse `input`, falling back to `fallback` when it is absent or unparsable.
pub fn parse_or(input: Option<&str>, fallback: OffsetDateTime) -> OffsetDateTime {
    match input {
        Some(s) => match parse_timestamp(s) {
            Some(ts) => ts,
            None => {
                tracing::debug!(input = s, "unparsable timestamp, using fallback");
                fallback
            }
        },
        None => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parses_rfc3339_with_offset() {
        assert_eq!(
            parse_timestamp("2024-01-01T10:00:00+02:00"),
            Some(datetime!(2024-01-01 08:00:00 UTC))
        );
        assert_eq!(
            parse_timestamp("2024-01-01T10:00:00Z"),
            Some(datetime!(2024-01-01 10:00:00 UTC))
        );
    }

    #[test]
    fn naive_forms_are_utc() {
        let expected = datetime!(2024-06-30 23:59:58 UTC);
        assert_eq!(parse_timestamp("2024-06-30T23:59:58"), Some(expected));
        assert_eq!(parse_timestamp("2024-06-30 23:59:58"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-06-30T23:59:58.250000"),
            Some(datetime!(2024-06-30 23:59:58.25 UTC))
        );
    }

    #[test]
    fn bare_date_is_midnight() {
        assert_eq!(
            parse_timestamp("2024-02-29"),
            Some(datetime!(2024-02-29 00:00:00 UTC))
        );
    }

    #[test]
    fn garbage_is_rejected_and_falls_back() {
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("2024-13-01"), None);

        let fallback = datetime!(2030-01-01 00:00:00 UTC);
        assert_eq!(parse_or(Some("not-a-date"), fallback), fallback);
        assert_eq!(parse_or(None, fallback), fallback);
    }
}
