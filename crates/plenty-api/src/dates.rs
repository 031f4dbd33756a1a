//! Date parsing for query parameters.
//!
//! The REST API expects W3C timestamps (`2020-09-16T08:00:00+02:00`).
//! Callers may pass any of:
//!
//! - `YYYY-MM-DD`
//! - `YYYY-MM-DDTHH:MM`
//! - `YYYY-MM-DDTHH:MM:SS`
//!
//! each optionally followed by `Z` or a `±HH:MM` offset. Dates without an
//! offset are interpreted in the local timezone.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::Error;

const W3C_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// A validated start/end pair in W3C format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

/// The order date an order query filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDateType {
    #[default]
    Creation,
    Change,
    Payment,
    Delivery,
}

impl OrderDateType {
    /// Query parameter stem (`createdAt` → `createdAtFrom` / `createdAtTo`).
    pub fn query_stem(self) -> &'static str {
        match self {
            Self::Creation => "createdAt",
            Self::Change => "updatedAt",
            Self::Payment => "paidAt",
            Self::Delivery => "outgoingItemsBookedAt",
        }
    }
}

impl std::str::FromStr for OrderDateType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "creation" | "create" | "created" => Ok(Self::Creation),
            "change" | "updated" => Ok(Self::Change),
            "payment" | "paid" => Ok(Self::Payment),
            "delivery" => Ok(Self::Delivery),
            other => Err(Error::InvalidArgument(format!("unknown date type '{other}'"))),
        }
    }
}

/// Parse a user supplied date into a timezone-aware timestamp.
pub fn parse(raw: &str) -> Result<DateTime<FixedOffset>, Error> {
    let raw = raw.trim();
    let invalid = || Error::InvalidDate(raw.to_owned());

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed);
    }
    for format in ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M%z"] {
        if let Ok(parsed) = DateTime::parse_from_str(raw, format) {
            return Ok(parsed);
        }
    }
    if let Some(naive) = raw.strip_suffix('Z').and_then(parse_naive) {
        return Ok(Utc.from_utc_datetime(&naive).fixed_offset());
    }

    let naive = parse_naive(raw).ok_or_else(invalid)?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.fixed_offset())
        .ok_or_else(invalid)
}

fn parse_naive(raw: &str) -> Option<NaiveDateTime> {
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Render a user supplied date in the W3C format the API expects.
pub fn parse_date(raw: &str) -> Result<String, Error> {
    parse(raw).map(|date| date.format(W3C_FORMAT).to_string())
}

/// Format a timestamp for request bodies (`dates[].date`).
pub fn to_w3c(date: &DateTime<FixedOffset>) -> String {
    date.format(W3C_FORMAT).to_string()
}

/// The current local time in W3C format.
pub fn now_w3c() -> String {
    Local::now().fixed_offset().format(W3C_FORMAT).to_string()
}

/// Parse both ends of a range.
pub fn build_date_range(start: &str, end: &str) -> Result<DateRange, Error> {
    Ok(DateRange {
        start: parse_date(start)?,
        end: parse_date(end)?,
    })
}

/// Check that a range is ordered, not empty and lies entirely in the past.
pub fn check_date_range(range: &DateRange) -> Result<(), Error> {
    let start = parse(&range.start)?;
    let end = parse(&range.end)?;
    let now = Utc::now().fixed_offset();

    if start > end {
        return Err(Error::InvalidDate(format!(
            "end {} is before start {}",
            range.end, range.start
        )));
    }
    if start == end {
        return Err(Error::InvalidDate(format!(
            "start is equal to end ({})",
            range.start
        )));
    }
    if start > now || end > now {
        return Err(Error::InvalidDate(format!(
            "range {} -> {} ends in the future",
            range.start, range.end
        )));
    }
    Ok(())
}

/// Unix timestamp of a user supplied date.
///
/// Dates must start with a four digit year of 2000 or later; day-first
/// notations such as `16-09-2020` are rejected.
pub fn date_to_timestamp(raw: &str) -> Result<i64, Error> {
    let leading: String = raw.trim().chars().take_while(char::is_ascii_digit).collect();
    match leading.parse::<u32>() {
        Ok(year) if leading.len() >= 4 && year >= 2000 => {}
        _ => return Err(Error::InvalidDate(raw.to_owned())),
    }
    parse(raw).map(|date| date.timestamp())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn explicit_offsets_are_kept() {
        assert_eq!(
            parse_date("2020-09-16T08:00:00+02:00").unwrap(),
            "2020-09-16T08:00:00+02:00"
        );
        assert_eq!(
            parse_date("2020-09-16T08:00+05:30").unwrap(),
            "2020-09-16T08:00:00+05:30"
        );
        assert_eq!(parse_date("2020-09-16T08:00Z").unwrap(), "2020-09-16T08:00:00+00:00");
    }

    #[test]
    fn naive_dates_get_the_local_offset() {
        let parsed = parse_date("2020-09-16").unwrap();
        assert!(parsed.starts_with("2020-09-16T00:00:00"));
        assert_eq!(parsed.len(), "2020-09-16T00:00:00+00:00".len());

        let parsed = parse_date("2020-09-16T08:15").unwrap();
        assert!(parsed.starts_with("2020-09-16T08:15:00"));
    }

    #[test]
    fn garbage_is_rejected() {
        for raw in ["", "yesterday", "2020-13-01", "16.09.2020"] {
            assert!(
                matches!(parse_date(raw), Err(Error::InvalidDate(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn date_range_checks() {
        let ok = build_date_range("2020-01-01T00:00Z", "2020-02-01T00:00Z").unwrap();
        assert!(check_date_range(&ok).is_ok());

        let reversed = build_date_range("2020-02-01T00:00Z", "2020-01-01T00:00Z").unwrap();
        assert!(check_date_range(&reversed).is_err());

        let empty = build_date_range("2020-01-01T00:00Z", "2020-01-01T00:00Z").unwrap();
        assert!(check_date_range(&empty).is_err());

        let future = build_date_range("2020-01-01T00:00Z", "2999-01-01T00:00Z").unwrap();
        assert!(check_date_range(&future).is_err());
    }

    #[test]
    fn timestamps_require_a_leading_year() {
        assert_eq!(
            date_to_timestamp("2020-09-16T08:00:00+00:00").unwrap(),
            1_600_243_200
        );
        assert!(date_to_timestamp("16-09-2020").is_err());
        assert!(date_to_timestamp("1999-09-16").is_err());
    }

    #[test]
    fn date_types_map_to_query_stems() {
        assert_eq!("Creation".parse::<OrderDateType>().unwrap().query_stem(), "createdAt");
        assert_eq!(
            "delivery".parse::<OrderDateType>().unwrap().query_stem(),
            "outgoingItemsBookedAt"
        );
        assert!("shipping".parse::<OrderDateType>().is_err());
    }
}
