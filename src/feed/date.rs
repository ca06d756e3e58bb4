use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

/// An entry timestamp that no known layout could read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized timestamp {value:?}")]
pub struct TimeParseError {
    pub value: String,
}

/// Turns a feed timestamp string into an absolute instant.
pub trait DateParser {
    fn parse(&self, value: &str) -> Result<DateTime<Utc>, TimeParseError>;
}

/// Layouts tried after RFC 3339 and RFC 2822, read as UTC.
const NAIVE_DATETIME_LAYOUTS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Default parser covering the layouts feeds use in practice.
///
/// Atom requires RFC 3339, but RFC 2822 and zone-less ISO timestamps show up
/// often enough that rejecting them would discard whole feeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedDateParser;

impl DateParser for FeedDateParser {
    fn parse(&self, value: &str) -> Result<DateTime<Utc>, TimeParseError> {
        let trimmed = value.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
            return Ok(dt.with_timezone(&Utc));
        }
        for layout in NAIVE_DATETIME_LAYOUTS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, layout) {
                return Ok(naive.and_utc());
            }
        }
        if let Some(naive) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(naive.and_utc());
        }

        Err(TimeParseError {
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rfc3339() {
        let dt = FeedDateParser.parse("2024-03-05T10:20:30Z").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 3, 5, 10, 20, 30).unwrap());
    }

    #[test]
    fn test_rfc3339_with_offset_normalized_to_utc() {
        let dt = FeedDateParser.parse("2024-03-05T12:20:30+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 3, 5, 10, 20, 30).unwrap());
    }

    #[test]
    fn test_rfc2822() {
        let dt = FeedDateParser.parse("Tue, 05 Mar 2024 10:20:30 GMT").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 3, 5, 10, 20, 30).unwrap());
    }

    #[test]
    fn test_naive_layouts_read_as_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 10, 20, 30).unwrap();
        assert_eq!(FeedDateParser.parse("2024-03-05T10:20:30").unwrap(), expected);
        assert_eq!(FeedDateParser.parse("2024-03-05 10:20:30").unwrap(), expected);
        assert_eq!(
            FeedDateParser.parse(" 2024-03-05 ").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_garbage_rejected() {
        let err = FeedDateParser.parse("last tuesday").unwrap_err();
        assert_eq!(err.value, "last tuesday");
        assert!(err.to_string().contains("last tuesday"));
    }
}
