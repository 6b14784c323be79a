// Presto dialect
//
// Bucket units map onto DATE_TRUNC, time parts onto Presto's calendar field
// functions, and shifts onto nested DATE_ADD calls.

use chrono::{DateTime, Utc};

use super::{Engine, PartPrimitives, SqlDialect, TimePart};
use crate::models::{Duration, Timezone};

const PART_PRIMITIVES: PartPrimitives = PartPrimitives {
    second: "SECOND($$)",
    minute: "MINUTE($$)",
    hour: "HOUR($$)",
    weekday: "(DAY_OF_WEEK($$)-1)",
    day_of_week: "(DAY_OF_WEEK($$)+1)",
    day_of_month: "DAY_OF_MONTH($$)",
    day_of_year: "DAY_OF_YEAR($$)",
    // No single function gives the week of the month
    week_of_month: None,
    week_of_year: "WEEK($$)",
    month_of_year: "MONTH($$)",
    year: "YEAR($$)",
};

/// Presto SQL dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct PrestoDialect;

impl PrestoDialect {
    pub fn new() -> Self {
        Self
    }
}

impl SqlDialect for PrestoDialect {
    fn engine(&self) -> Engine {
        Engine::Presto
    }

    fn time_to_sql(&self, instant: Option<DateTime<Utc>>) -> String {
        match instant {
            Some(instant) => format!("TIMESTAMP '{}'", self.date_to_sql_date_string(instant)),
            None => self.null_constant().to_string(),
        }
    }

    fn concat_expression(&self, a: &str, b: &str) -> String {
        format!("CONCAT({},{})", a, b)
    }

    fn contains_expression(&self, needle: &str, haystack: &str) -> String {
        format!("POSITION({} IN {})>0", needle, haystack)
    }

    fn length_expression(&self, a: &str) -> String {
        format!("LENGTH({})", a)
    }

    // TODO: escape the pattern once callers stop passing pre-quoted regex text
    fn regexp_expression(&self, expression: &str, pattern: &str) -> String {
        format!("REGEXP_LIKE({}, '{}')", expression, pattern)
    }

    fn extract_expression(&self, expression: &str, pattern: &str) -> String {
        format!("REGEXP_EXTRACT({}, '{}')", expression, pattern)
    }

    fn constant_group_by(&self) -> String {
        "GROUP BY ''".to_string()
    }

    fn utc_to_walltime(&self, operand: &str, timezone: &Timezone) -> String {
        if timezone.is_utc() {
            return operand.to_string();
        }
        format!("({} AT TIME ZONE 'UTC' AT TIME ZONE '{}')", operand, timezone)
    }

    fn walltime_to_utc(&self, operand: &str, timezone: &Timezone) -> String {
        if timezone.is_utc() {
            return operand.to_string();
        }
        format!("({} AT TIME ZONE '{}' AT TIME ZONE 'UTC')", operand, timezone)
    }

    fn time_bucket_unit(&self, duration: &Duration) -> Option<&'static str> {
        match duration.to_string().as_str() {
            "PT1S" => Some("second"),
            "PT1M" => Some("minute"),
            "PT1H" => Some("hour"),
            "P1D" => Some("day"),
            "P1W" => Some("week"),
            "P1M" => Some("month"),
            "P3M" => Some("quarter"),
            "P1Y" => Some("year"),
            _ => None,
        }
    }

    fn truncate_expression(&self, operand: &str, unit: &str) -> String {
        format!("DATE_TRUNC('{}',{})", unit, operand)
    }

    fn time_part_function(&self, part: TimePart) -> Option<String> {
        PART_PRIMITIVES.template(part)
    }

    fn time_shift_expression(&self, operand: &str, duration: &Duration, _timezone: &Timezone) -> String {
        let spans = duration.spans();
        if spans.week > 0 {
            return format!("DATE_ADD('week', {}, {})", spans.week, operand);
        }

        let fields = [
            (spans.year, "year"),
            (spans.month, "month"),
            (spans.day, "day"),
            (spans.hour, "hour"),
            (spans.minute, "minute"),
            (spans.second, "second"),
        ];
        fields
            .iter()
            .filter(|(value, _)| *value > 0)
            .fold(operand.to_string(), |shifted, (value, unit)| {
                format!("DATE_ADD('{}', {}, {})", unit, value, shifted)
            })
    }
}
