// MySQL dialect
//
// MySQL has no DATE_TRUNC, so buckets are floored by reformatting the
// timestamp with DATE_FORMAT. Zone conversion uses CONVERT_TZ, which needs the
// server's timezone tables to be loaded.

use chrono::{DateTime, Utc};

use super::{Engine, PartPrimitives, SqlDialect, TimePart};
use crate::models::{Duration, Timezone};

const PART_PRIMITIVES: PartPrimitives = PartPrimitives {
    second: "SECOND($$)",
    minute: "MINUTE($$)",
    hour: "HOUR($$)",
    weekday: "WEEKDAY($$)",
    day_of_week: "(WEEKDAY($$)+1)",
    day_of_month: "DAYOFMONTH($$)",
    day_of_year: "DAYOFYEAR($$)",
    week_of_month: None,
    week_of_year: "WEEK($$)",
    month_of_year: "MONTH($$)",
    year: "YEAR($$)",
};

/// MySQL SQL dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    pub fn new() -> Self {
        Self
    }
}

impl SqlDialect for MySqlDialect {
    fn engine(&self) -> Engine {
        Engine::Mysql
    }

    fn escape_name(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn time_to_sql(&self, instant: Option<DateTime<Utc>>) -> String {
        match instant {
            Some(instant) => format!("TIMESTAMP('{}')", self.date_to_sql_date_string(instant)),
            None => self.null_constant().to_string(),
        }
    }

    fn concat_expression(&self, a: &str, b: &str) -> String {
        format!("CONCAT({},{})", a, b)
    }

    fn contains_expression(&self, needle: &str, haystack: &str) -> String {
        format!("LOCATE({},{})>0", needle, haystack)
    }

    fn length_expression(&self, a: &str) -> String {
        format!("CHAR_LENGTH({})", a)
    }

    fn regexp_expression(&self, expression: &str, pattern: &str) -> String {
        format!("({} REGEXP '{}')", expression, pattern)
    }

    fn extract_expression(&self, expression: &str, pattern: &str) -> String {
        format!("REGEXP_SUBSTR({}, '{}')", expression, pattern)
    }

    fn constant_group_by(&self) -> String {
        "GROUP BY ''".to_string()
    }

    fn utc_to_walltime(&self, operand: &str, timezone: &Timezone) -> String {
        if timezone.is_utc() {
            return operand.to_string();
        }
        format!("CONVERT_TZ({},'+0:00','{}')", operand, timezone)
    }

    fn walltime_to_utc(&self, operand: &str, timezone: &Timezone) -> String {
        if timezone.is_utc() {
            return operand.to_string();
        }
        format!("CONVERT_TZ({},'{}','+0:00')", operand, timezone)
    }

    fn time_bucket_unit(&self, duration: &Duration) -> Option<&'static str> {
        match duration.to_string().as_str() {
            "PT1S" => Some("%Y-%m-%d %H:%i:%S"),
            "PT1M" => Some("%Y-%m-%d %H:%i:00"),
            "PT1H" => Some("%Y-%m-%d %H:00:00"),
            "P1D" => Some("%Y-%m-%d 00:00:00"),
            "P1M" => Some("%Y-%m-01 00:00:00"),
            "P1Y" => Some("%Y-01-01 00:00:00"),
            _ => None,
        }
    }

    fn truncate_expression(&self, operand: &str, unit: &str) -> String {
        format!("DATE_FORMAT({},'{}')", operand, unit)
    }

    fn time_part_function(&self, part: TimePart) -> Option<String> {
        PART_PRIMITIVES.template(part)
    }

    fn time_shift_expression(&self, operand: &str, duration: &Duration, _timezone: &Timezone) -> String {
        let spans = duration.spans();
        if spans.week > 0 {
            return format!("DATE_ADD({}, INTERVAL {} WEEK)", operand, spans.week);
        }

        let mut shifted = operand.to_string();
        if spans.year > 0 || spans.month > 0 {
            shifted = format!(
                "DATE_ADD({}, INTERVAL '{}-{}' YEAR_MONTH)",
                shifted, spans.year, spans.month
            );
        }
        if spans.day > 0 || spans.hour > 0 || spans.minute > 0 || spans.second > 0 {
            shifted = format!(
                "DATE_ADD({}, INTERVAL '{} {}:{}:{}' DAY_SECOND)",
                shifted, spans.day, spans.hour, spans.minute, spans.second
            );
        }
        shifted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;

    fn duration(text: &str) -> Duration {
        text.parse().unwrap()
    }

    #[test]
    fn test_escaping_uses_backticks() {
        let dialect = MySqlDialect::new();
        assert_eq!(dialect.escape_name("orders"), "`orders`");
        assert_eq!(dialect.escape_literal("o'brien"), "'o''brien'");
    }

    #[test]
    fn test_time_to_sql() {
        let dialect = MySqlDialect::new();
        let instant: DateTime<Utc> = "2015-01-26T00:00:00Z".parse().unwrap();
        assert_eq!(dialect.time_to_sql(Some(instant)), "TIMESTAMP('2015-01-26')");
        assert_eq!(dialect.time_to_sql(None), "NULL");
    }

    #[test]
    fn test_string_expressions() {
        let dialect = MySqlDialect::new();
        assert_eq!(dialect.contains_expression("'x'", "name"), "LOCATE('x',name)>0");
        assert_eq!(dialect.length_expression("name"), "CHAR_LENGTH(name)");
        assert_eq!(dialect.regexp_expression("name", "^a"), "(name REGEXP '^a')");
        assert_eq!(dialect.extract_expression("name", "[0-9]+"), "REGEXP_SUBSTR(name, '[0-9]+')");
    }

    #[test]
    fn test_time_floor() {
        let dialect = MySqlDialect::new();
        let utc = dialect.time_floor_expression("t", &duration("P1D"), &Timezone::utc()).unwrap();
        assert_eq!(utc, "DATE_FORMAT(t,'%Y-%m-%d 00:00:00')");

        let tz: Timezone = "Europe/Paris".parse().unwrap();
        let local = dialect.time_floor_expression("t", &duration("PT1H"), &tz).unwrap();
        assert_eq!(
            local,
            "CONVERT_TZ(DATE_FORMAT(CONVERT_TZ(t,'+0:00','Europe/Paris'),'%Y-%m-%d %H:00:00'),'Europe/Paris','+0:00')"
        );
    }

    #[test]
    fn test_week_and_quarter_buckets_are_unsupported() {
        let dialect = MySqlDialect::new();
        for key in ["P1W", "P3M"] {
            let err = dialect.time_floor_expression("t", &duration(key), &Timezone::utc()).unwrap_err();
            assert!(matches!(err, QueryError::UnsupportedDuration { engine: Engine::Mysql, .. }));
        }
    }

    #[test]
    fn test_time_part_expression() {
        let dialect = MySqlDialect::new();
        let utc = Timezone::utc();
        assert_eq!(dialect.time_part_expression("t", TimePart::DayOfWeek, &utc).unwrap(), "(WEEKDAY(t)+1)");
        assert_eq!(
            dialect.time_part_expression("t", TimePart::HourOfWeek, &utc).unwrap(),
            "(WEEKDAY(t)*24+HOUR(t))"
        );
        assert!(dialect.time_part_expression("t", TimePart::WeekOfMonth, &utc).is_err());
    }

    #[test]
    fn test_time_shift() {
        let dialect = MySqlDialect::new();
        let utc = Timezone::utc();
        assert_eq!(
            dialect.time_shift_expression("t", &duration("P1W"), &utc),
            "DATE_ADD(t, INTERVAL 1 WEEK)"
        );
        assert_eq!(
            dialect.time_shift_expression("t", &duration("P1Y2MT3H"), &utc),
            "DATE_ADD(DATE_ADD(t, INTERVAL '1-2' YEAR_MONTH), INTERVAL '0 3:0:0' DAY_SECOND)"
        );
    }
}
