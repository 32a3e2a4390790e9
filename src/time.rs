//! Parsing of the API's assorted timestamp encodings.

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::{Result, TradierError};

const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DATE_TIME_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Parses `text` as, in order: `YYYY-MM-DDThh:mm:ss` with optional fractional
/// seconds, RFC 3339, `YYYY-MM-DD`, `hh:mm` or epoch milliseconds. All naive
/// values are read as UTC. Surrounding whitespace is rejected.
///
/// A bare time of day is anchored to January 1 of year 0, so only its offset
/// from midnight is meaningful.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    if let Ok(value) = NaiveDateTime::parse_from_str(text, DATE_TIME_PARSE_FORMAT) {
        return Ok(value.and_utc());
    }
    if let Ok(value) = DateTime::parse_from_rfc3339(text) {
        return Ok(value.with_timezone(&Utc));
    }
    if let Ok(value) = NaiveDate::parse_from_str(text, DATE_FORMAT) {
        return Ok(value.and_time(NaiveTime::MIN).and_utc());
    }
    if let Ok(value) = NaiveTime::parse_from_str(text, TIME_FORMAT) {
        if let Some(anchor) = NaiveDate::from_ymd_opt(0, 1, 1) {
            return Ok(anchor.and_time(value).and_utc());
        }
    }
    parse_time_ms(text)
}

/// Parses an integer count of milliseconds since the Unix epoch.
pub fn parse_time_ms(text: &str) -> Result<DateTime<Utc>> {
    text.parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| TradierError::InvalidTimestamp(text.to_owned()))
}

/// An instant decoded from any encoding accepted by [`parse_timestamp`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }

    /// Decodes a raw JSON token, quoted or not.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| TradierError::InvalidTimestamp(String::from_utf8_lossy(bytes).into()))?;
        let text = text.trim();
        let unquoted = text
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .unwrap_or(text);
        unquoted.parse()
    }
}

impl Deref for Timestamp {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl FromStr for Timestamp {
    type Err = TradierError;

    fn from_str(s: &str) -> Result<Self> {
        parse_timestamp(s).map(Self)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_TIME_FORMAT))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(TimestampVisitor)
    }
}

struct TimestampVisitor;

impl Visitor<'_> for TimestampVisitor {
    type Value = Timestamp;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a date, date-time, time of day or epoch milliseconds")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Timestamp, E> {
        value.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> std::result::Result<Timestamp, E> {
        DateTime::from_timestamp_millis(value)
            .map(Timestamp)
            .ok_or_else(|| E::custom(format!("epoch milliseconds out of range: {value}")))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> std::result::Result<Timestamp, E> {
        let value = i64::try_from(value)
            .map_err(|_| E::custom(format!("epoch milliseconds out of range: {value}")))?;
        self.visit_i64(value)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Timelike, Utc};

    use super::{parse_time_ms, parse_timestamp, Timestamp};
    use crate::TradierError;

    #[test]
    fn parses_date_time() {
        let parsed = parse_timestamp("2006-01-02T15:04:05").expect("must parse");
        assert_eq!(parsed.timestamp(), 1_136_214_245);
    }

    #[test]
    fn parses_date_time_with_fractional_seconds() {
        let parsed = parse_timestamp("2006-01-02T15:04:05.405").expect("must parse");
        assert_eq!(parsed.timestamp(), 1_136_214_245);
        assert_eq!(parsed.nanosecond(), 405_000_000);
    }

    #[test]
    fn parses_rfc3339_with_zone() {
        let expected = Utc.with_ymd_and_hms(2018, 8, 8, 14, 41, 11).unwrap()
            + TimeDelta::milliseconds(405);

        assert_eq!(parse_timestamp("2018-08-08T14:41:11.405Z").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2018-08-08T10:41:11.405-04:00").unwrap(),
            expected
        );
    }

    #[test]
    fn rejects_surrounding_whitespace() {
        assert!(parse_timestamp(" 2006-01-02").is_err());
        assert!(parse_timestamp("15:04 ").is_err());
        assert!(parse_time_ms(" 123456").is_err());
    }

    #[test]
    fn parses_date_as_midnight_utc() {
        let parsed = parse_timestamp("2006-01-02").expect("must parse");
        assert_eq!(parsed.timestamp(), 1_136_160_000);
    }

    #[test]
    fn parses_time_of_day_on_zero_date() {
        let parsed = parse_timestamp("15:04").expect("must parse");
        assert_eq!(parsed.timestamp(), -62_167_164_960);
    }

    #[test]
    fn parses_epoch_millis() {
        let now = Utc::now();
        let parsed = parse_timestamp(&now.timestamp_millis().to_string()).expect("must parse");
        assert_eq!(parsed.timestamp(), now.timestamp());
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_timestamp("not a time").expect_err("must fail");
        assert!(matches!(err, TradierError::InvalidTimestamp(_)));
    }

    #[test]
    fn time_ms_keeps_sub_second_precision() {
        let parsed = parse_time_ms("123456").expect("must parse");
        assert_eq!(parsed.nanosecond(), 456_000_000);
        assert!(parse_time_ms("not a number").is_err());
    }

    #[test]
    fn deserializes_strings_and_numbers() {
        let from_str: Timestamp = serde_json::from_str("\"2006-01-02\"").expect("must decode");
        assert_eq!(from_str.timestamp(), 1_136_160_000);

        let from_number: Timestamp =
            serde_json::from_str("1136214245000").expect("must decode");
        assert_eq!(
            from_number.into_inner(),
            Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap()
        );

        assert!(serde_json::from_str::<Timestamp>("\"not a time\"").is_err());
    }

    #[test]
    fn raw_tokens_decode_quoted_or_bare() {
        let bare = Timestamp::from_json_bytes(b"2006-01-02T15:04:05").expect("must decode");
        let quoted = Timestamp::from_json_bytes(b"\"2006-01-02T15:04:05\"").expect("must decode");
        assert_eq!(bare, quoted);

        let now = Utc::now();
        let millis = format!("{}000", now.timestamp());
        let parsed = Timestamp::from_json_bytes(millis.as_bytes()).expect("must decode");
        assert_eq!(parsed.timestamp(), now.timestamp());
    }

    #[test]
    fn from_str_supports_cli_input() {
        let parsed: Timestamp = "2006-01-02".parse().expect("must parse");
        assert_eq!(parsed.to_string(), "2006-01-02T00:00:00");
    }
}
