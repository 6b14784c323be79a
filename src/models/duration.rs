use chrono::{DateTime, Days, Months, Offset, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{QueryError, Result};
use crate::models::Timezone;

/// Calendar field magnitudes of a duration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DurationSpans {
    pub year: u32,
    pub month: u32,
    pub week: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl DurationSpans {
    pub fn is_zero(&self) -> bool {
        *self == DurationSpans::default()
    }

    fn time_seconds(&self) -> i64 {
        (self.hour as i64 * 60 + self.minute as i64) * 60 + self.second as i64
    }
}

/// Calendar-aware span such as `P1D` or `PT15M`.
///
/// The canonical string form is the lookup key for bucket tables, so two
/// durations with the same spans always print identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Duration {
    spans: DurationSpans,
}

impl Duration {
    pub fn from_spans(spans: DurationSpans) -> Result<Self> {
        if spans.is_zero() {
            return Err(QueryError::InvalidDuration(
                "duration must have at least one non-zero span".to_string(),
            ));
        }
        Ok(Self { spans })
    }

    pub fn spans(&self) -> DurationSpans {
        self.spans
    }

    /// Move `instant` by this duration `step` times (negative steps go back).
    ///
    /// Year, month, week and day fields move the wall clock of `timezone`;
    /// hour, minute and second fields are elapsed time.
    pub fn shift(
        &self,
        instant: DateTime<Utc>,
        timezone: &Timezone,
        step: i32,
    ) -> Result<DateTime<Utc>> {
        let overflow = || QueryError::InvalidDuration(format!("shift of {} by {} overflows", self, step));
        let spans = self.spans;
        let tz = timezone.tz();
        let local = instant.with_timezone(&tz);
        let offset_seconds = local.offset().fix().local_minus_utc() as i64;
        let mut wall = local.naive_local();

        let months = (spans.year as i64 * 12 + spans.month as i64)
            .checked_mul(step as i64)
            .ok_or_else(overflow)?;
        if months != 0 {
            let count = Months::new(u32::try_from(months.unsigned_abs()).map_err(|_| overflow())?);
            wall = if months > 0 {
                wall.checked_add_months(count)
            } else {
                wall.checked_sub_months(count)
            }
            .ok_or_else(overflow)?;
        }

        let days = (spans.week as i64 * 7 + spans.day as i64)
            .checked_mul(step as i64)
            .ok_or_else(overflow)?;
        if days != 0 {
            let count = Days::new(days.unsigned_abs());
            wall = if days > 0 {
                wall.checked_add_days(count)
            } else {
                wall.checked_sub_days(count)
            }
            .ok_or_else(overflow)?;
        }

        // A wall time inside a DST gap keeps the offset the instant started with.
        let calendar_shifted = match tz.from_local_datetime(&wall).earliest() {
            Some(resolved) => resolved.with_timezone(&Utc),
            None => {
                let offset = TimeDelta::try_seconds(offset_seconds).ok_or_else(overflow)?;
                Utc.from_utc_datetime(&(wall - offset))
            }
        };

        let elapsed = spans
            .time_seconds()
            .checked_mul(step as i64)
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(overflow)?;
        calendar_shifted.checked_add_signed(elapsed).ok_or_else(overflow)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.spans;
        f.write_str("P")?;
        for (value, designator) in [(s.year, 'Y'), (s.month, 'M'), (s.week, 'W'), (s.day, 'D')] {
            if value > 0 {
                write!(f, "{}{}", value, designator)?;
            }
        }
        if s.hour > 0 || s.minute > 0 || s.second > 0 {
            f.write_str("T")?;
            for (value, designator) in [(s.hour, 'H'), (s.minute, 'M'), (s.second, 'S')] {
                if value > 0 {
                    write!(f, "{}{}", value, designator)?;
                }
            }
        }
        Ok(())
    }
}

impl FromStr for Duration {
    type Err = QueryError;

    fn from_str(text: &str) -> Result<Self> {
        let invalid = || QueryError::InvalidDuration(format!("'{}' is not an ISO-8601 period", text));
        let rest = text.strip_prefix('P').ok_or_else(invalid)?;
        let (date_part, time_part) = match rest.split_once('T') {
            Some((_, "")) => return Err(invalid()),
            Some((date, time)) => (date, time),
            None => (rest, ""),
        };

        let mut spans = DurationSpans::default();
        for (designator, value) in parse_fields(date_part, &['Y', 'M', 'W', 'D']).ok_or_else(invalid)? {
            match designator {
                'Y' => spans.year = value,
                'M' => spans.month = value,
                'W' => spans.week = value,
                _ => spans.day = value,
            }
        }
        for (designator, value) in parse_fields(time_part, &['H', 'M', 'S']).ok_or_else(invalid)? {
            match designator {
                'H' => spans.hour = value,
                'M' => spans.minute = value,
                _ => spans.second = value,
            }
        }

        Duration::from_spans(spans).map_err(|_| invalid())
    }
}

/// Parse `<digits><designator>` pairs; designators must follow `order`.
fn parse_fields(text: &str, order: &[char]) -> Option<Vec<(char, u32)>> {
    let mut fields = Vec::new();
    let mut digits = String::new();
    let mut next = 0;

    for ch in text.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let position = order[next..].iter().position(|d| *d == ch)?;
        if digits.is_empty() {
            return None;
        }
        fields.push((ch, digits.parse().ok()?));
        digits.clear();
        next += position + 1;
    }

    if digits.is_empty() {
        Some(fields)
    } else {
        None
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(text: &str) -> DateTime<Utc> {
        text.parse().unwrap()
    }

    #[test]
    fn test_canonical_keys() {
        for key in ["PT1S", "PT1M", "PT1H", "P1D", "P1W", "P1M", "P3M", "P1Y"] {
            assert_eq!(key.parse::<Duration>().unwrap().to_string(), key);
        }
        assert_eq!("P1Y2M3DT4H5M6S".parse::<Duration>().unwrap().to_string(), "P1Y2M3DT4H5M6S");
    }

    #[test]
    fn test_spans_decomposition() {
        let spans = "P1M3DT2H".parse::<Duration>().unwrap().spans();
        assert_eq!(spans.month, 1);
        assert_eq!(spans.day, 3);
        assert_eq!(spans.hour, 2);
        assert_eq!(spans.year, 0);
        assert_eq!(spans.week, 0);
    }

    #[test]
    fn test_rejects_malformed_periods() {
        for text in ["", "P", "1D", "PT", "P1", "PD", "P1D1Y", "P0D", "PT1X", "P1.5D"] {
            assert!(text.parse::<Duration>().is_err(), "{} should be rejected", text);
        }
    }

    #[test]
    fn test_shift_by_month_in_utc() {
        let duration: Duration = "P1M".parse().unwrap();
        let shifted = duration.shift(utc("2015-01-31T10:00:00Z"), &Timezone::utc(), 1).unwrap();
        assert_eq!(shifted, utc("2015-02-28T10:00:00Z"));
    }

    #[test]
    fn test_shift_backwards() {
        let duration: Duration = "P1DT1H".parse().unwrap();
        let shifted = duration.shift(utc("2015-03-02T01:00:00Z"), &Timezone::utc(), -2).unwrap();
        assert_eq!(shifted, utc("2015-02-27T23:00:00Z"));
    }

    #[test]
    fn test_shift_day_keeps_local_midnight_across_dst() {
        let tz: Timezone = "America/Los_Angeles".parse().unwrap();
        let duration: Duration = "P1D".parse().unwrap();
        // 2015-03-08 is the spring-forward day in Los Angeles.
        let shifted = duration.shift(utc("2015-03-08T08:00:00Z"), &tz, 1).unwrap();
        assert_eq!(shifted, utc("2015-03-09T07:00:00Z"));
    }

    #[test]
    fn test_shift_overflow_is_an_error() {
        let start = utc("2015-01-26T00:00:00Z");
        for text in ["PT4000000000H", "P4000000000Y", "P4000000000W"] {
            let duration: Duration = text.parse().unwrap();
            let err = duration.shift(start, &Timezone::utc(), i32::MAX).unwrap_err();
            assert!(matches!(err, QueryError::InvalidDuration(_)), "{} gave {:?}", text, err);
        }
    }

    #[test]
    fn test_serde_as_string() {
        let duration: Duration = "PT15M".parse().unwrap();
        assert_eq!(serde_json::to_string(&duration).unwrap(), "\"PT15M\"");
        let back: Duration = serde_json::from_str("\"PT15M\"").unwrap();
        assert_eq!(back, duration);
    }
}
