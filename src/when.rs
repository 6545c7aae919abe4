//! Event time shapes and IANA time zones
//!
//! The `when` field of an event is discriminated by which keys are present
//! rather than by a tag, so it is decoded by hand from the raw JSON object:
//!
//! | keys                                                    | shape                     |
//! |---------------------------------------------------------|---------------------------|
//! | `time`, `timezone`                                      | [`EventTime::Instant`]    |
//! | `start_time`, `end_time`, `start_timezone`, `end_timezone` | [`EventTime::Interval`] |
//! | `date`                                                  | [`EventTime::Date`]       |
//! | `start_date`, `end_date`                                | [`EventTime::DateRange`]  |
//!
//! Keys are checked in that order and the first one present wins. A key
//! holding `null` counts as absent.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{NylasError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// An IANA time zone, resolved against the bundled zone database when decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeZone(Tz);

impl TimeZone {
    /// Resolve an IANA identifier such as `America/New_York`.
    ///
    /// Unknown identifiers (including the empty string) are rejected; there is
    /// no fallback zone.
    pub fn parse(name: &str) -> Result<Self> {
        name.parse::<Tz>()
            .map(TimeZone)
            .map_err(|_| NylasError::EventTime(format!("unknown time zone {:?}", name)))
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// The underlying zone, for date arithmetic with chrono
    pub fn tz(&self) -> Tz {
        self.0
    }
}

impl fmt::Display for TimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Tz> for TimeZone {
    fn from(tz: Tz) -> Self {
        TimeZone(tz)
    }
}

impl<'de> Deserialize<'de> for TimeZone {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        TimeZone::parse(&name).map_err(de::Error::custom)
    }
}

impl Serialize for TimeZone {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

/// Deserialize an optional zone where `null` or `""` mean "not set"
pub(crate) fn optional_time_zone<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<TimeZone>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt.as_deref() {
        None | Some("") => Ok(None),
        Some(name) => TimeZone::parse(name).map(Some).map_err(de::Error::custom),
    }
}

/// When an event happens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTime {
    /// A single moment with no duration, e.g. a reminder
    Instant {
        time: DateTime<Utc>,
        timezone: Option<TimeZone>,
    },
    /// A span between two moments, e.g. an hour-long meeting.
    /// The zones are either both set or both unset.
    Interval {
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        start_timezone: Option<TimeZone>,
        end_timezone: Option<TimeZone>,
    },
    /// A whole day without clock times, e.g. a birthday
    Date { date: NaiveDate },
    /// A span of whole days, e.g. a holiday week
    DateRange {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
}

impl EventTime {
    /// Decode a raw `when` object.
    ///
    /// Returns `Ok(None)` when none of the discriminating keys is present.
    pub fn from_object(when: &Map<String, Value>) -> Result<Option<Self>> {
        if present(when, "time") {
            let time = unix_time(when, "time", "invalid time for event time")?;
            let timezone = zone(when, "timezone", "invalid timezone for event time")?;
            return Ok(Some(EventTime::Instant { time, timezone }));
        }

        if present(when, "start_time") {
            let start_time =
                unix_time(when, "start_time", "invalid start time for event timespan")?;
            let end_time = unix_time(when, "end_time", "invalid end time for event timespan")?;
            let start_timezone = zone(
                when,
                "start_timezone",
                "invalid start timezone for event timespan",
            )?;
            let end_timezone = zone(
                when,
                "end_timezone",
                "invalid end timezone for event timespan",
            )?;
            if start_timezone.is_some() != end_timezone.is_some() {
                return Err(NylasError::EventTime(
                    "start_timezone and end_timezone must be given together for event timespan"
                        .to_string(),
                ));
            }
            return Ok(Some(EventTime::Interval {
                start_time,
                end_time,
                start_timezone,
                end_timezone,
            }));
        }

        if present(when, "date") {
            let date = calendar_date(when, "date", "invalid date for event date")?;
            return Ok(Some(EventTime::Date { date }));
        }

        if present(when, "start_date") {
            let start_date =
                calendar_date(when, "start_date", "invalid start date for event datespan")?;
            let end_date = calendar_date(when, "end_date", "invalid end date for event datespan")?;
            return Ok(Some(EventTime::DateRange {
                start_date,
                end_date,
            }));
        }

        Ok(None)
    }

    /// Decode any JSON value found under `when`. `null` is treated as unset.
    pub fn from_value(when: &Value) -> Result<Option<Self>> {
        match when {
            Value::Null => Ok(None),
            Value::Object(map) => Self::from_object(map),
            _ => Err(NylasError::EventTime(
                "invalid when for event: expected an object".to_string(),
            )),
        }
    }

    /// Name of the wire shape, as the API documentation calls it
    pub fn kind(&self) -> &'static str {
        match self {
            EventTime::Instant { .. } => "time",
            EventTime::Interval { .. } => "timespan",
            EventTime::Date { .. } => "date",
            EventTime::DateRange { .. } => "datespan",
        }
    }
}

fn present(when: &Map<String, Value>, key: &str) -> bool {
    !matches!(when.get(key), None | Some(Value::Null))
}

fn unix_time(when: &Map<String, Value>, key: &str, message: &str) -> Result<DateTime<Utc>> {
    let secs = match when.get(key) {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    };
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
        .ok_or_else(|| NylasError::EventTime(message.to_string()))
}

fn zone(when: &Map<String, Value>, key: &str, message: &str) -> Result<Option<TimeZone>> {
    match when.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(name)) => TimeZone::parse(name)
            .map(Some)
            .map_err(|_| NylasError::EventTime(message.to_string())),
        Some(_) => Err(NylasError::EventTime(message.to_string())),
    }
}

fn calendar_date(when: &Map<String, Value>, key: &str, message: &str) -> Result<NaiveDate> {
    match when.get(key) {
        Some(Value::String(s)) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map_err(|_| NylasError::EventTime(message.to_string())),
        _ => Err(NylasError::EventTime(message.to_string())),
    }
}
