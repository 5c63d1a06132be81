//! Calendar-date codecs for feed and store interchange.
//!
//! The feed transmits days as compact `yyyyMMdd` strings; the store and
//! config files use ISO `yyyy-MM-dd`. Both formats are fixed, so the
//! format descriptions are compiled once here.

use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::error::{ParseError, ParseResult};

const COMPACT: &[BorrowedFormatItem<'static>] = format_description!("[year][month][day]");
const ISO_DAY: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parse a compact `yyyyMMdd` feed date.
pub fn parse_compact(value: &str) -> ParseResult<Date> {
    Date::parse(value, COMPACT).map_err(|source| ParseError::InvalidDate {
        value: value.to_string(),
        source,
    })
}

/// Format a date in the compact `yyyyMMdd` feed form.
pub fn format_compact(date: Date) -> String {
    date.format(COMPACT).unwrap()
}

/// Parse an ISO `yyyy-MM-dd` day.
pub fn parse_iso(value: &str) -> ParseResult<Date> {
    Date::parse(value, ISO_DAY).map_err(|source| ParseError::InvalidDate {
        value: value.to_string(),
        source,
    })
}

/// Format a date as ISO `yyyy-MM-dd`.
pub fn format_iso(date: Date) -> String {
    date.format(ISO_DAY).unwrap()
}

/// Serde adapter serializing a [`Date`] as an ISO `yyyy-MM-dd` string.
///
/// Use as `#[serde(with = "mural_types::dates::serde_iso")]`.
pub mod serde_iso {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_iso(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let value = String::deserialize(deserializer)?;
        super::parse_iso(&value).map_err(serde::de::Error::custom)
    }

    /// Variant for `Option<Date>` fields.
    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use time::Date;

        pub fn serialize<S: Serializer>(
            date: &Option<Date>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => serializer.serialize_some(&super::super::format_iso(*date)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Date>, D::Error> {
            let value = Option::<String>::deserialize(deserializer)?;
            value
                .map(|v| super::super::parse_iso(&v).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    #[test]
    fn test_compact_round_trip() {
        let date = Date::from_calendar_date(2021, Month::February, 7).unwrap();
        assert_eq!(format_compact(date), "20210207");
        assert_eq!(parse_compact("20210207").unwrap(), date);
    }

    #[test]
    fn test_iso_round_trip() {
        let date = Date::from_calendar_date(2021, Month::December, 31).unwrap();
        assert_eq!(format_iso(date), "2021-12-31");
        assert_eq!(parse_iso("2021-12-31").unwrap(), date);
    }

    #[test]
    fn test_parse_compact_rejects_garbage() {
        assert!(parse_compact("not-a-date").is_err());
        assert!(parse_compact("2021027").is_err());
    }

    #[test]
    fn test_parse_error_carries_input() {
        let err = parse_iso("20210207").unwrap_err();
        assert!(err.to_string().contains("20210207"));
    }
}
