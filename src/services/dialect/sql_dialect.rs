// SQL dialect trait
//
// Renders engine-agnostic temporal and string operations into the SQL syntax
// of one engine. Operands are SQL text that has already been rendered; every
// method returns SQL text and performs no I/O.

use chrono::{DateTime, Utc};

use super::{Engine, TimePart};
use crate::error::{QueryError, Result};
use crate::models::{Bounds, Duration, TimeRange, Timezone};

/// SQL rendering capabilities of one query engine
///
/// Lookup tables (bucket units, time-part formulas) are per engine; a missing
/// entry is reported as an unsupported capability rather than approximated.
pub trait SqlDialect: Send + Sync {
    /// Engine this dialect renders for
    fn engine(&self) -> Engine;

    /// Quote an identifier
    fn escape_name(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Quote a string literal
    fn escape_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn null_constant(&self) -> &'static str {
        "NULL"
    }

    fn boolean_to_sql(&self, value: bool) -> String {
        let literal = if value { "TRUE" } else { "FALSE" };
        literal.to_string()
    }

    fn number_to_sql(&self, value: f64) -> String {
        if value.is_finite() {
            value.to_string()
        } else {
            self.null_constant().to_string()
        }
    }

    /// `YYYY-MM-DD HH:MM:SS[.fff]`, with zero milliseconds and a midnight
    /// time of day left off
    fn date_to_sql_date_string(&self, instant: DateTime<Utc>) -> String {
        let text = instant.format("%Y-%m-%d %H:%M:%S%.3f").to_string();
        let text = text.strip_suffix(".000").unwrap_or(&text);
        let text = text.strip_suffix(" 00:00:00").unwrap_or(text);
        text.to_string()
    }

    /// Render an instant as a timestamp literal; `None` renders as NULL
    fn time_to_sql(&self, instant: Option<DateTime<Utc>>) -> String;

    fn concat_expression(&self, a: &str, b: &str) -> String;

    /// True when `needle` occurs in `haystack`
    fn contains_expression(&self, needle: &str, haystack: &str) -> String;

    fn length_expression(&self, a: &str) -> String;

    /// Regular expression match. `pattern` is interpolated as-is.
    fn regexp_expression(&self, expression: &str, pattern: &str) -> String;

    /// First match of `pattern` in `expression`. `pattern` is interpolated as-is.
    fn extract_expression(&self, expression: &str, pattern: &str) -> String;

    /// `start <= operand < end` with the comparison operators picked by
    /// `bounds`. A NULL edge leaves that side unconstrained.
    fn in_expression(&self, operand: &str, start: &str, end: &str, bounds: Bounds) -> String {
        if start == end && bounds == Bounds::CLOSED {
            return format!("{}={}", operand, start);
        }

        let null = self.null_constant();
        let start_sql = (start != null).then(|| {
            let op = if bounds.start_inclusive { "<=" } else { "<" };
            format!("{}{}{}", start, op, operand)
        });
        let end_sql = (end != null).then(|| {
            let op = if bounds.end_inclusive { "<=" } else { "<" };
            format!("{}{}{}", operand, op, end)
        });

        match (start_sql, end_sql) {
            (Some(start_sql), Some(end_sql)) => format!("({} AND {})", start_sql, end_sql),
            (Some(start_sql), None) => start_sql,
            (None, Some(end_sql)) => end_sql,
            (None, None) => self.boolean_to_sql(true),
        }
    }

    /// True when the time-valued `operand` falls inside `range`
    fn in_time_range_expression(&self, operand: &str, range: &TimeRange) -> String {
        self.in_expression(
            operand,
            &self.time_to_sql(Some(range.start())),
            &self.time_to_sql(Some(range.end())),
            range.bounds(),
        )
    }

    fn is_not_distinct_from_expression(&self, a: &str, b: &str) -> String {
        if b == self.null_constant() {
            format!("{} IS NULL", a)
        } else {
            format!("({} IS NOT DISTINCT FROM {})", a, b)
        }
    }

    /// GROUP BY clause for aggregating without a grouping key
    fn constant_group_by(&self) -> String;

    /// Convert a UTC timestamp to wall-clock time in `timezone`. Identity for UTC.
    fn utc_to_walltime(&self, operand: &str, timezone: &Timezone) -> String;

    /// Convert a wall-clock timestamp in `timezone` back to UTC. Identity for UTC.
    fn walltime_to_utc(&self, operand: &str, timezone: &Timezone) -> String;

    /// Engine bucket unit for a duration, keyed by its canonical string
    fn time_bucket_unit(&self, duration: &Duration) -> Option<&'static str>;

    /// Truncate a UTC timestamp to the engine bucket unit
    fn truncate_expression(&self, operand: &str, unit: &str) -> String;

    /// Start of the `duration` bucket containing `operand`.
    ///
    /// Truncation happens in wall-clock time so that a day bucket starts at
    /// local midnight, then the result is converted back to UTC.
    fn time_floor_expression(&self, operand: &str, duration: &Duration, timezone: &Timezone) -> Result<String> {
        let unit = self
            .time_bucket_unit(duration)
            .ok_or_else(|| QueryError::UnsupportedDuration {
                engine: self.engine(),
                duration: duration.to_string(),
            })?;
        let truncated = self.truncate_expression(&self.utc_to_walltime(operand, timezone), unit);
        Ok(self.walltime_to_utc(&truncated, timezone))
    }

    fn time_bucket_expression(&self, operand: &str, duration: &Duration, timezone: &Timezone) -> Result<String> {
        self.time_floor_expression(operand, duration, timezone)
    }

    /// Formula template for `part` with `$$` placeholders, `None` when unsupported
    fn time_part_function(&self, part: TimePart) -> Option<String>;

    /// Extract `part` from `operand`, evaluated in wall-clock time of `timezone`
    fn time_part_expression(&self, operand: &str, part: TimePart, timezone: &Timezone) -> Result<String> {
        let template = self
            .time_part_function(part)
            .ok_or_else(|| QueryError::UnsupportedTimePart {
                engine: self.engine(),
                part: part.to_string(),
            })?;
        Ok(template.replace("$$", &self.utc_to_walltime(operand, timezone)))
    }

    /// Add `duration` to `operand`.
    ///
    /// A duration with a week field renders as a single week shift; its other
    /// fields are not applied.
    fn time_shift_expression(&self, operand: &str, duration: &Duration, timezone: &Timezone) -> String;
}
