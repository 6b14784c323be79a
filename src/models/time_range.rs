use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{QueryError, Result};
use crate::models::{Duration, Timezone};

/// Inclusive/exclusive flags for the two edges of a [`TimeRange`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub start_inclusive: bool,
    pub end_inclusive: bool,
}

impl Bounds {
    /// `[)`, the default half-open range
    pub const CLOSED_OPEN: Bounds = Bounds { start_inclusive: true, end_inclusive: false };
    /// `(]`
    pub const OPEN_CLOSED: Bounds = Bounds { start_inclusive: false, end_inclusive: true };
    /// `[]`
    pub const CLOSED: Bounds = Bounds { start_inclusive: true, end_inclusive: true };
    /// `()`
    pub const OPEN: Bounds = Bounds { start_inclusive: false, end_inclusive: false };

    pub fn as_str(&self) -> &'static str {
        match (self.start_inclusive, self.end_inclusive) {
            (true, false) => "[)",
            (false, true) => "(]",
            (true, true) => "[]",
            (false, false) => "()",
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Bounds::default()
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds::CLOSED_OPEN
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bounds {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "[)" => Ok(Bounds::CLOSED_OPEN),
            "(]" => Ok(Bounds::OPEN_CLOSED),
            "[]" => Ok(Bounds::CLOSED),
            "()" => Ok(Bounds::OPEN),
            _ => Err(QueryError::InvalidTimeRange(format!("invalid bounds '{}'", s))),
        }
    }
}

/// Immutable time interval, half-open (`[start, end)`) unless other bounds are given.
///
/// Instants are kept at millisecond precision, the resolution of the interval
/// text and JSON forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    bounds: Bounds,
}

/// One edge of a range: the instant and whether it is included.
type Edge = (DateTime<Utc>, bool);

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        Self::with_bounds(start, end, Bounds::default())
    }

    pub fn with_bounds(start: DateTime<Utc>, end: DateTime<Utc>, bounds: Bounds) -> Result<Self> {
        let start = start.trunc_subsecs(3);
        let end = end.trunc_subsecs(3);
        if start > end {
            return Err(QueryError::InvalidTimeRange(format!(
                "start {} is after end {}",
                format_instant(start),
                format_instant(end)
            )));
        }
        Ok(Self { start, end, bounds })
    }

    /// Build a range from a JSON object carrying `start`, `end` and optionally `bounds`.
    ///
    /// `start` and `end` may be ISO-8601 strings or epoch milliseconds. Any
    /// other key on the object is ignored.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            QueryError::InvalidTimeRange("expected an object with start and end".to_string())
        })?;

        let start = instant_field(object, "start")?;
        let end = instant_field(object, "end")?;
        let bounds = match object.get("bounds") {
            None | Some(Value::Null) => Bounds::default(),
            Some(Value::String(text)) => text.parse()?,
            Some(other) => {
                return Err(QueryError::InvalidTimeRange(format!("invalid bounds {}", other)));
            }
        };

        Self::with_bounds(start, end, bounds)
    }

    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("start".to_string(), Value::String(format_instant(self.start)));
        object.insert("end".to_string(), Value::String(format_instant(self.end)));
        if !self.bounds.is_default() {
            object.insert("bounds".to_string(), Value::String(self.bounds.to_string()));
        }
        Value::Object(object)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Zero-width range (`start == end`)
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        let after_start = if self.bounds.start_inclusive {
            self.start <= instant
        } else {
            self.start < instant
        };
        let before_end = if self.bounds.end_inclusive {
            instant <= self.end
        } else {
            instant < self.end
        };
        after_start && before_end
    }

    /// Smallest range covering both, or `None` when a gap separates them.
    ///
    /// Ranges that only touch merge when at least one of the touching edges is
    /// inclusive, so `[a, b)` and `[b, c)` merge to `[a, c)`.
    pub fn union(&self, other: &TimeRange) -> Option<TimeRange> {
        let (inner_start, inner_start_inclusive) = later_edge(self.start_edge(), other.start_edge(), false);
        let (inner_end, inner_end_inclusive) = earlier_edge(self.end_edge(), other.end_edge(), false);
        if inner_start > inner_end {
            return None;
        }
        if inner_start == inner_end && !inner_start_inclusive && !inner_end_inclusive {
            return None;
        }

        let (start, start_inclusive) = earlier_edge(self.start_edge(), other.start_edge(), true);
        let (end, end_inclusive) = later_edge(self.end_edge(), other.end_edge(), true);
        Some(TimeRange {
            start,
            end,
            bounds: Bounds { start_inclusive, end_inclusive },
        })
    }

    /// Overlap of both ranges, or `None` when it would end before it starts.
    ///
    /// Ranges sharing only a boundary instant intersect in a zero-width range
    /// at that instant rather than `None`.
    pub fn intersect(&self, other: &TimeRange) -> Option<TimeRange> {
        let (start, start_inclusive) = later_edge(self.start_edge(), other.start_edge(), false);
        let (end, end_inclusive) = earlier_edge(self.end_edge(), other.end_edge(), false);
        if start > end {
            return None;
        }
        Some(TimeRange {
            start,
            end,
            bounds: Bounds { start_inclusive, end_inclusive },
        })
    }

    /// Move both edges by `duration` applied `step` times in `timezone`.
    pub fn shift(&self, duration: &Duration, timezone: &Timezone, step: i32) -> Result<TimeRange> {
        let start = duration.shift(self.start, timezone, step)?;
        let end = duration.shift(self.end, timezone, step)?;
        Self::with_bounds(start, end, self.bounds)
    }

    /// ISO-8601 interval text `start/end`.
    ///
    /// The text form has no bound notation, so an exclusive start or an
    /// inclusive end is moved forward by one millisecond to express the same
    /// range as `[start, end)`.
    pub fn to_interval_text(&self) -> String {
        let one_milli = TimeDelta::milliseconds(1);
        let start = if self.bounds.start_inclusive {
            self.start
        } else {
            self.start.checked_add_signed(one_milli).unwrap_or(self.start)
        };
        let end = if self.bounds.end_inclusive {
            self.end.checked_add_signed(one_milli).unwrap_or(self.end)
        } else {
            self.end
        };
        format!("{}/{}", interval_part(start), interval_part(end))
    }

    fn start_edge(&self) -> Edge {
        (self.start, self.bounds.start_inclusive)
    }

    fn end_edge(&self) -> Edge {
        (self.end, self.bounds.end_inclusive)
    }
}

/// Pick the earlier edge; on a tie the edge is inclusive if `any` is set and
/// either side is inclusive, or if both sides are inclusive otherwise.
fn earlier_edge(a: Edge, b: Edge, any: bool) -> Edge {
    if a.0 == b.0 {
        (a.0, if any { a.1 || b.1 } else { a.1 && b.1 })
    } else if a.0 < b.0 {
        a
    } else {
        b
    }
}

fn later_edge(a: Edge, b: Edge, any: bool) -> Edge {
    if a.0 == b.0 {
        (a.0, if any { a.1 || b.1 } else { a.1 && b.1 })
    } else if a.0 > b.0 {
        a
    } else {
        b
    }
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Coarsest exact rendering: drop zero milliseconds, then zero seconds and
/// minutes, stopping at hour precision (`2015-01-26T00Z`).
fn interval_part(instant: DateTime<Utc>) -> String {
    format_instant(instant)
        .replacen(".000Z", "Z", 1)
        .replacen(":00Z", "Z", 1)
        .replacen(":00Z", "Z", 1)
}

fn instant_field(object: &Map<String, Value>, key: &str) -> Result<DateTime<Utc>> {
    let invalid = |detail: String| QueryError::InvalidTimeRange(format!("{}: {}", key, detail));
    match object.get(key) {
        Some(Value::String(text)) => {
            parse_instant(text).ok_or_else(|| invalid(format!("'{}' is not an ISO-8601 instant", text)))
        }
        Some(Value::Number(number)) => number
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(|| invalid(format!("{} is not an epoch millisecond value", number))),
        Some(other) => Err(invalid(format!("unexpected value {}", other))),
        None => Err(invalid("missing".to_string())),
    }
}

/// Parse an ISO-8601 instant. Values without an offset are taken as UTC and
/// reduced precision (`2015-01-26`, `2015-01-26T05`, `2015-01-26T05:30`) is accepted.
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }

    let naive = text.strip_suffix('Z').unwrap_or(text).replacen(' ', "T", 1);
    match naive.split_once('T') {
        None => NaiveDate::parse_from_str(&naive, "%Y-%m-%d")
            .ok()
            .map(|date| date.and_time(NaiveTime::MIN).and_utc()),
        Some((date, time)) => {
            let time = match time.matches(':').count() {
                0 => format!("{}:00:00", time),
                1 => format!("{}:00", time),
                _ => time.to_string(),
            };
            NaiveDateTime::parse_from_str(&format!("{}T{}", date, time), "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_interval_text())
    }
}

impl FromStr for TimeRange {
    type Err = QueryError;

    /// Parse interval text `start/end` into a `[)` range.
    fn from_str(text: &str) -> Result<Self> {
        let (start, end) = text
            .split_once('/')
            .ok_or_else(|| QueryError::InvalidTimeRange(format!("'{}' is not an interval", text)))?;
        let parse = |part: &str| {
            parse_instant(part)
                .ok_or_else(|| QueryError::InvalidTimeRange(format!("'{}' is not an ISO-8601 instant", part)))
        };
        TimeRange::new(parse(start)?, parse(end)?)
    }
}

impl Serialize for TimeRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        TimeRange::from_json(&value).map_err(serde::de::Error::custom)
    }
}
