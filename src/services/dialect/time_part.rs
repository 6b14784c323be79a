use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;

/// Calendar field that can be extracted from an instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimePart {
    SecondOfMinute,
    SecondOfHour,
    SecondOfDay,
    SecondOfWeek,
    SecondOfMonth,
    SecondOfYear,
    MinuteOfHour,
    MinuteOfDay,
    MinuteOfWeek,
    MinuteOfMonth,
    MinuteOfYear,
    HourOfDay,
    HourOfWeek,
    HourOfMonth,
    HourOfYear,
    DayOfWeek,
    DayOfMonth,
    DayOfYear,
    WeekOfMonth,
    WeekOfYear,
    MonthOfYear,
    Year,
}

impl TimePart {
    pub const ALL: [TimePart; 22] = [
        TimePart::SecondOfMinute,
        TimePart::SecondOfHour,
        TimePart::SecondOfDay,
        TimePart::SecondOfWeek,
        TimePart::SecondOfMonth,
        TimePart::SecondOfYear,
        TimePart::MinuteOfHour,
        TimePart::MinuteOfDay,
        TimePart::MinuteOfWeek,
        TimePart::MinuteOfMonth,
        TimePart::MinuteOfYear,
        TimePart::HourOfDay,
        TimePart::HourOfWeek,
        TimePart::HourOfMonth,
        TimePart::HourOfYear,
        TimePart::DayOfWeek,
        TimePart::DayOfMonth,
        TimePart::DayOfYear,
        TimePart::WeekOfMonth,
        TimePart::WeekOfYear,
        TimePart::MonthOfYear,
        TimePart::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimePart::SecondOfMinute => "SECOND_OF_MINUTE",
            TimePart::SecondOfHour => "SECOND_OF_HOUR",
            TimePart::SecondOfDay => "SECOND_OF_DAY",
            TimePart::SecondOfWeek => "SECOND_OF_WEEK",
            TimePart::SecondOfMonth => "SECOND_OF_MONTH",
            TimePart::SecondOfYear => "SECOND_OF_YEAR",
            TimePart::MinuteOfHour => "MINUTE_OF_HOUR",
            TimePart::MinuteOfDay => "MINUTE_OF_DAY",
            TimePart::MinuteOfWeek => "MINUTE_OF_WEEK",
            TimePart::MinuteOfMonth => "MINUTE_OF_MONTH",
            TimePart::MinuteOfYear => "MINUTE_OF_YEAR",
            TimePart::HourOfDay => "HOUR_OF_DAY",
            TimePart::HourOfWeek => "HOUR_OF_WEEK",
            TimePart::HourOfMonth => "HOUR_OF_MONTH",
            TimePart::HourOfYear => "HOUR_OF_YEAR",
            TimePart::DayOfWeek => "DAY_OF_WEEK",
            TimePart::DayOfMonth => "DAY_OF_MONTH",
            TimePart::DayOfYear => "DAY_OF_YEAR",
            TimePart::WeekOfMonth => "WEEK_OF_MONTH",
            TimePart::WeekOfYear => "WEEK_OF_YEAR",
            TimePart::MonthOfYear => "MONTH_OF_YEAR",
            TimePart::Year => "YEAR",
        }
    }
}

impl fmt::Display for TimePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimePart {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimePart::ALL
            .iter()
            .copied()
            .find(|part| part.as_str() == s)
            .ok_or_else(|| QueryError::UnknownTimePart(s.to_string()))
    }
}

/// Engine functions for the finest calendar fields. Every other part is
/// composed from these, so e.g. `SECOND_OF_DAY` always equals
/// `MINUTE_OF_DAY * 60 + SECOND_OF_MINUTE` on the same engine.
///
/// Fragments use `$$` as the operand placeholder.
#[derive(Debug, Clone, Copy)]
pub struct PartPrimitives {
    pub second: &'static str,
    pub minute: &'static str,
    pub hour: &'static str,
    /// Zero-based day within the week, Monday = 0
    pub weekday: &'static str,
    /// Value exposed as `DAY_OF_WEEK`
    pub day_of_week: &'static str,
    pub day_of_month: &'static str,
    pub day_of_year: &'static str,
    /// `None` when the engine has no reliable equivalent
    pub week_of_month: Option<&'static str>,
    pub week_of_year: &'static str,
    pub month_of_year: &'static str,
    pub year: &'static str,
}

impl PartPrimitives {
    /// Formula template for `part`, or `None` when unsupported.
    pub fn template(&self, part: TimePart) -> Option<String> {
        let hours_from = |days: &str| format!("({}*24+{})", days, self.hour);
        let minutes_from = |hours: &str| format!("({}*60+{})", hours, self.minute);
        let seconds_from = |minutes: &str| format!("({}*60+{})", minutes, self.second);
        let days_into_month = format!("({}-1)", self.day_of_month);
        let days_into_year = format!("({}-1)", self.day_of_year);

        let template = match part {
            TimePart::SecondOfMinute => self.second.to_string(),
            TimePart::SecondOfHour => seconds_from(self.minute),
            TimePart::SecondOfDay => seconds_from(&minutes_from(self.hour)),
            TimePart::SecondOfWeek => seconds_from(&minutes_from(&hours_from(self.weekday))),
            TimePart::SecondOfMonth => seconds_from(&minutes_from(&hours_from(&days_into_month))),
            TimePart::SecondOfYear => seconds_from(&minutes_from(&hours_from(&days_into_year))),

            TimePart::MinuteOfHour => self.minute.to_string(),
            TimePart::MinuteOfDay => minutes_from(self.hour),
            TimePart::MinuteOfWeek => minutes_from(&hours_from(self.weekday)),
            TimePart::MinuteOfMonth => minutes_from(&hours_from(&days_into_month)),
            TimePart::MinuteOfYear => minutes_from(&hours_from(&days_into_year)),

            TimePart::HourOfDay => self.hour.to_string(),
            TimePart::HourOfWeek => hours_from(self.weekday),
            TimePart::HourOfMonth => hours_from(&days_into_month),
            TimePart::HourOfYear => hours_from(&days_into_year),

            TimePart::DayOfWeek => self.day_of_week.to_string(),
            TimePart::DayOfMonth => self.day_of_month.to_string(),
            TimePart::DayOfYear => self.day_of_year.to_string(),

            TimePart::WeekOfMonth => return self.week_of_month.map(str::to_string),
            TimePart::WeekOfYear => self.week_of_year.to_string(),
            TimePart::MonthOfYear => self.month_of_year.to_string(),
            TimePart::Year => self.year.to_string(),
        };
        Some(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMITIVES: PartPrimitives = PartPrimitives {
        second: "S($$)",
        minute: "M($$)",
        hour: "H($$)",
        weekday: "WD($$)",
        day_of_week: "DOW($$)",
        day_of_month: "DOM($$)",
        day_of_year: "DOY($$)",
        week_of_month: None,
        week_of_year: "W($$)",
        month_of_year: "MO($$)",
        year: "Y($$)",
    };

    #[test]
    fn test_part_names_round_trip() {
        for part in TimePart::ALL {
            assert_eq!(part.as_str().parse::<TimePart>().unwrap(), part);
        }
        assert!(matches!("FORTNIGHT".parse::<TimePart>(), Err(QueryError::UnknownTimePart(_))));
    }

    #[test]
    fn test_composite_parts_nest_finer_parts() {
        let template = |part| PRIMITIVES.template(part).unwrap();
        assert_eq!(template(TimePart::MinuteOfDay), "(H($$)*60+M($$))");
        assert_eq!(template(TimePart::SecondOfDay), "((H($$)*60+M($$))*60+S($$))");
        assert_eq!(
            template(TimePart::SecondOfDay),
            format!("({}*60+{})", template(TimePart::MinuteOfDay), template(TimePart::SecondOfMinute))
        );
        assert_eq!(
            template(TimePart::SecondOfWeek),
            format!("({}*60+{})", template(TimePart::MinuteOfWeek), template(TimePart::SecondOfMinute))
        );
        assert_eq!(
            template(TimePart::MinuteOfMonth),
            format!("({}*60+{})", template(TimePart::HourOfMonth), template(TimePart::MinuteOfHour))
        );
        assert_eq!(template(TimePart::HourOfYear), "((DOY($$)-1)*24+H($$))");
    }

    #[test]
    fn test_missing_primitive_is_unsupported() {
        assert_eq!(PRIMITIVES.template(TimePart::WeekOfMonth), None);
    }
}
