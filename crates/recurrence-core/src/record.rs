//! Validating constructor from a stored rule record.
//!
//! The CMS persists a rule as a flat key/value record whose values are mostly
//! strings (`"interval": "2"`, `"start_date": "20240131"`). Every present value
//! is parsed strictly; a value of the wrong shape rejects the whole record.
//! `null` and `""` count as absent. Fields that only apply to another
//! frequency or monthly mode are parsed but not forwarded, since the authoring
//! form keeps hidden fields around. End fields are the exception: they must
//! agree with `end_type`.

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde_json::{Map, Value};

use crate::calendar::{self, WEEK};
use crate::error::{RecurrenceError, Result};
use crate::rule::{EndType, Frequency, MonthlyBy, RecurrenceRule};

impl RecurrenceRule {
    /// Build a rule from a raw record.
    ///
    /// # Errors
    /// Returns `RecurrenceError::InvalidRule` for missing required fields,
    /// malformed values, or contradictory end fields.
    pub fn from_record(record: &Map<String, Value>) -> Result<Self> {
        let start_date = date_field(record, "start_date")?
            .ok_or_else(|| RecurrenceError::invalid("start_date is required"))?;
        let start_time = time_field(record, "start_time")?;
        let frequency: Frequency = text_field(record, "frequency")?
            .ok_or_else(|| RecurrenceError::invalid("frequency is required"))?
            .parse()?;
        let interval = match int_field(record, "interval")? {
            Some(n) => u32::try_from(n)
                .map_err(|_| RecurrenceError::invalid(format!("interval {n} is out of range")))?,
            None => 1,
        };

        let weekdays = weekday_list(record, "weekdays")?;
        let monthdays = int_list(record, "monthdays")?;
        let months = int_list(record, "months")?
            .into_iter()
            .map(|m| {
                u32::try_from(m)
                    .map_err(|_| RecurrenceError::invalid(format!("month {m} is outside 1..=12")))
            })
            .collect::<Result<Vec<u32>>>()?;
        let monthly_by = match text_field(record, "monthly_by")? {
            Some(value) => parse_monthly_by(value)?,
            None => MonthlyBy::DayOfMonth,
        };
        let setpos = int_field(record, "setpos")?
            .map(|n| {
                i32::try_from(n)
                    .map_err(|_| RecurrenceError::invalid(format!("setpos {n} is out of range")))
            })
            .transpose()?;
        let setpos_option = weekday_group_field(record, "setpos_option")?;

        let end_date = date_field(record, "end_date")?;
        let occurrence_count = match int_field(record, "occurrence_count")? {
            Some(n) => Some(n),
            None => int_field(record, "occurence_count")?,
        }
        .map(|n| {
            u32::try_from(n).map_err(|_| {
                RecurrenceError::invalid(format!("occurrence_count {n} is out of range"))
            })
        })
        .transpose()?;
        let end_type = match text_field(record, "end_type")? {
            Some(value) => parse_end_type(value)?,
            None => EndType::Never,
        };

        let mut builder = RecurrenceRule::builder(start_date, frequency)
            .interval(interval)
            .months(months)
            .end_type(end_type);
        if let Some(time) = start_time {
            builder = builder.start_time(time);
        }
        if let Some(date) = end_date {
            builder = builder.end_date(date);
        }
        if let Some(count) = occurrence_count {
            builder = builder.occurrence_count(count);
        }

        builder = match frequency {
            Frequency::Daily | Frequency::Weekly => builder.weekdays(weekdays),
            Frequency::Monthly | Frequency::Yearly => match monthly_by {
                MonthlyBy::DayOfMonth => builder.monthdays(monthdays),
                MonthlyBy::WeekdayPosition => {
                    let mut builder = builder
                        .monthly_by(MonthlyBy::WeekdayPosition)
                        .weekdays(weekdays)
                        .setpos_option(setpos_option);
                    if let Some(position) = setpos {
                        builder = builder.setpos(position);
                    }
                    builder
                }
            },
        };

        builder.build()
    }

    /// Parse a JSON object and build a rule from it.
    ///
    /// # Errors
    /// Returns `RecurrenceError::InvalidRule` if the text is not a JSON object
    /// or the record is invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| RecurrenceError::invalid(format!("record is not valid JSON: {e}")))?;
        Self::try_from(&value)
    }
}

impl TryFrom<&Value> for RecurrenceRule {
    type Error = RecurrenceError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Object(record) => Self::from_record(record),
            other => Err(RecurrenceError::invalid(format!(
                "record must be a JSON object, got {}",
                kind(other)
            ))),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A present value: not missing, not `null`, not a blank string.
fn field<'a>(record: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    match record.get(name) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(value) => Some(value),
    }
}

fn text_field<'a>(record: &'a Map<String, Value>, name: &str) -> Result<Option<&'a str>> {
    match field(record, name) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim())),
        Some(other) => Err(RecurrenceError::invalid(format!(
            "{name} must be a string, got {}",
            kind(other)
        ))),
    }
}

fn int_value(name: &str, value: &Value) -> Result<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        RecurrenceError::invalid(format!("{name} must be an integer, got {value}"))
    })
}

fn int_field(record: &Map<String, Value>, name: &str) -> Result<Option<i64>> {
    field(record, name).map(|v| int_value(name, v)).transpose()
}

/// List values: a JSON array, or a comma-separated string.
fn list_items(record: &Map<String, Value>, name: &str) -> Result<Vec<Value>> {
    match field(record, name) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items
            .iter()
            .filter(|v| !matches!(v, Value::Null))
            .cloned()
            .collect()),
        Some(Value::String(s)) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| Value::String(part.to_string()))
            .collect()),
        Some(Value::Number(n)) => Ok(vec![Value::Number(n.clone())]),
        Some(other) => Err(RecurrenceError::invalid(format!(
            "{name} must be a list, got {}",
            kind(other)
        ))),
    }
}

fn int_list(record: &Map<String, Value>, name: &str) -> Result<Vec<i32>> {
    list_items(record, name)?
        .iter()
        .map(|item| {
            let n = int_value(name, item)?;
            i32::try_from(n).map_err(|_| {
                RecurrenceError::invalid(format!("{name} value {n} is out of range"))
            })
        })
        .collect()
}

fn weekday_list(record: &Map<String, Value>, name: &str) -> Result<Vec<Weekday>> {
    list_items(record, name)?
        .iter()
        .map(|item| match item {
            Value::String(token) => calendar::parse_weekday(token).ok_or_else(|| {
                RecurrenceError::invalid(format!("{name}: unknown weekday '{token}'"))
            }),
            other => Err(RecurrenceError::invalid(format!(
                "{name}: weekday must be a string, got {}",
                kind(other)
            ))),
        })
        .collect()
}

/// Weekday set for positional rules. Besides weekday tokens this accepts the
/// groups `day` (any day), `weekday` (Monday to Friday) and `weekend_day`.
fn weekday_group_field(record: &Map<String, Value>, name: &str) -> Result<Vec<Weekday>> {
    if let Some(Value::String(group)) = field(record, name) {
        match group.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "day" => return Ok(WEEK.to_vec()),
            "weekday" => return Ok(WEEK[..5].to_vec()),
            "weekend_day" | "weekendday" | "weekend" => return Ok(WEEK[5..].to_vec()),
            _ => {}
        }
    }
    weekday_list(record, name)
}

fn date_field(record: &Map<String, Value>, name: &str) -> Result<Option<NaiveDate>> {
    let Some(text) = text_field(record, name)? else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(text, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
        .map(Some)
        .map_err(|_| {
            RecurrenceError::invalid(format!(
                "{name} '{text}' is not a YYYYMMDD or YYYY-MM-DD date"
            ))
        })
}

fn time_field(record: &Map<String, Value>, name: &str) -> Result<Option<NaiveTime>> {
    let Some(text) = text_field(record, name)? else {
        return Ok(None);
    };
    NaiveTime::parse_from_str(text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .map(Some)
        .map_err(|_| RecurrenceError::invalid(format!("{name} '{text}' is not an HH:MM[:SS] time")))
}

fn parse_monthly_by(value: &str) -> Result<MonthlyBy> {
    match value.to_ascii_lowercase().as_str() {
        "monthdays" | "monthday" | "day_of_month" | "bymonthday" => Ok(MonthlyBy::DayOfMonth),
        "setpos" | "weekday_position" | "byday" => Ok(MonthlyBy::WeekdayPosition),
        other => Err(RecurrenceError::invalid(format!("unknown monthly_by '{other}'"))),
    }
}

fn parse_end_type(value: &str) -> Result<EndType> {
    match value.to_ascii_lowercase().as_str() {
        "never" | "none" => Ok(EndType::Never),
        "date" | "until" | "until_date" => Ok(EndType::UntilDate),
        "count" | "after_count" => Ok(EndType::AfterCount),
        other => Err(RecurrenceError::invalid(format!("unknown end_type '{other}'"))),
    }
}
