//! Strongly typed recurrence rules.
//!
//! A [`RecurrenceRule`] can only be obtained through [`RuleBuilder::build`] (or
//! [`RecurrenceRule::from_record`], which feeds the builder). Both validate every
//! invariant once; the resulting value is immutable.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::error::{RecurrenceError, Result};

/// Recurrence granularity stepped by the rule's interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(RecurrenceError::invalid(format!("unknown frequency '{other}'"))),
        }
    }
}

/// How MONTHLY and YEARLY rules pick days inside a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonthlyBy {
    /// Fixed days of the month (`monthdays`, or the start's day).
    #[default]
    DayOfMonth,
    /// The Nth matching weekday (`setpos` + `setpos_option`).
    WeekdayPosition,
}

/// Which end-condition field a rule carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndType {
    #[default]
    Never,
    UntilDate,
    AfterCount,
}

/// The validated end condition of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndCondition {
    Never,
    /// Inclusive last date.
    Until(NaiveDate),
    /// Total number of occurrences, at least 1.
    Count(u32),
}

impl EndCondition {
    pub fn end_type(&self) -> EndType {
        match self {
            EndCondition::Never => EndType::Never,
            EndCondition::Until(_) => EndType::UntilDate,
            EndCondition::Count(_) => EndType::AfterCount,
        }
    }
}

/// An immutable, validated recurrence rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecurrenceRule {
    start_date: NaiveDate,
    start_time: Option<NaiveTime>,
    frequency: Frequency,
    interval: u32,
    weekdays: Vec<Weekday>,
    monthdays: Vec<i8>,
    months: Vec<u32>,
    monthly_by: MonthlyBy,
    setpos: Option<i32>,
    setpos_option: Vec<Weekday>,
    end: EndCondition,
}

impl RecurrenceRule {
    /// Start building a rule anchored at `start_date`.
    pub fn builder(start_date: NaiveDate, frequency: Frequency) -> RuleBuilder {
        RuleBuilder::new(start_date, frequency)
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn start_time(&self) -> Option<NaiveTime> {
        self.start_time
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// Weekdays, Monday first. Empty means "no restriction".
    pub fn weekdays(&self) -> &[Weekday] {
        &self.weekdays
    }

    /// Month days, ascending. Negative values count from the month end.
    pub fn monthdays(&self) -> &[i8] {
        &self.monthdays
    }

    /// Months `1..=12`, ascending.
    pub fn months(&self) -> &[u32] {
        &self.months
    }

    pub fn monthly_by(&self) -> MonthlyBy {
        self.monthly_by
    }

    pub fn setpos(&self) -> Option<i32> {
        self.setpos
    }

    /// Weekdays the position applies to, as given. Empty means "not set".
    pub fn setpos_option(&self) -> &[Weekday] {
        &self.setpos_option
    }

    pub fn end(&self) -> EndCondition {
        self.end
    }

    /// Weekdays a positional rule selects from: `setpos_option`, else
    /// `weekdays`, else the start's weekday.
    pub fn position_weekdays(&self) -> Vec<Weekday> {
        if !self.setpos_option.is_empty() {
            self.setpos_option.clone()
        } else if !self.weekdays.is_empty() {
            self.weekdays.clone()
        } else {
            vec![self.start_date.weekday()]
        }
    }

    /// Re-check every invariant. Cheap; called again when an expansion starts.
    pub fn validate(&self) -> Result<()> {
        if self.interval < 1 {
            return Err(RecurrenceError::invalid("interval must be at least 1"));
        }
        if let EndCondition::Count(0) = self.end {
            return Err(RecurrenceError::invalid("occurrence_count must be at least 1"));
        }
        if let Some(d) = self.monthdays.iter().find(|d| **d == 0 || !(-31..=31).contains(*d)) {
            return Err(RecurrenceError::invalid(format!(
                "monthday {d} is outside -31..=31 or zero"
            )));
        }
        if let Some(m) = self.months.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(RecurrenceError::invalid(format!("month {m} is outside 1..=12")));
        }
        if self.setpos == Some(0) {
            return Err(RecurrenceError::invalid("setpos must not be 0"));
        }

        let monthly_like = matches!(self.frequency, Frequency::Monthly | Frequency::Yearly);
        if !monthly_like && self.monthly_by == MonthlyBy::WeekdayPosition {
            return Err(RecurrenceError::invalid(format!(
                "weekday position only applies to MONTHLY or YEARLY rules, not {}",
                self.frequency
            )));
        }
        if !monthly_like && !self.monthdays.is_empty() {
            return Err(RecurrenceError::invalid(format!(
                "monthdays do not apply to {} rules",
                self.frequency
            )));
        }
        if self.monthly_by == MonthlyBy::WeekdayPosition && !self.monthdays.is_empty() {
            return Err(RecurrenceError::invalid(
                "monthdays conflict with weekday position",
            ));
        }
        if self.monthly_by == MonthlyBy::DayOfMonth {
            if self.setpos.is_some() || !self.setpos_option.is_empty() {
                return Err(RecurrenceError::invalid(
                    "setpos requires monthly_by = WEEKDAY_POSITION",
                ));
            }
            if monthly_like && !self.weekdays.is_empty() {
                return Err(RecurrenceError::invalid(
                    "weekdays require monthly_by = WEEKDAY_POSITION on MONTHLY or YEARLY rules",
                ));
            }
        }
        Ok(())
    }
}

/// Collects raw rule fields and validates them in [`RuleBuilder::build`].
///
/// The end condition is captured exactly as stored (`end_type`, `end_date`,
/// `occurrence_count`) so that contradictory combinations are rejected rather
/// than resolved by precedence.
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    start_date: NaiveDate,
    start_time: Option<NaiveTime>,
    frequency: Frequency,
    interval: u32,
    weekdays: Vec<Weekday>,
    monthdays: Vec<i32>,
    months: Vec<u32>,
    monthly_by: MonthlyBy,
    setpos: Option<i32>,
    setpos_option: Vec<Weekday>,
    end_type: EndType,
    end_date: Option<NaiveDate>,
    occurrence_count: Option<u32>,
}

impl RuleBuilder {
    pub fn new(start_date: NaiveDate, frequency: Frequency) -> Self {
        Self {
            start_date,
            start_time: None,
            frequency,
            interval: 1,
            weekdays: Vec::new(),
            monthdays: Vec::new(),
            months: Vec::new(),
            monthly_by: MonthlyBy::DayOfMonth,
            setpos: None,
            setpos_option: Vec::new(),
            end_type: EndType::Never,
            end_date: None,
            occurrence_count: None,
        }
    }

    pub fn start_time(mut self, time: NaiveTime) -> Self {
        self.start_time = Some(time);
        self
    }

    pub fn interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn weekdays(mut self, weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        self.weekdays = weekdays.into_iter().collect();
        self
    }

    pub fn monthdays(mut self, monthdays: impl IntoIterator<Item = i32>) -> Self {
        self.monthdays = monthdays.into_iter().collect();
        self
    }

    pub fn months(mut self, months: impl IntoIterator<Item = u32>) -> Self {
        self.months = months.into_iter().collect();
        self
    }

    pub fn monthly_by(mut self, monthly_by: MonthlyBy) -> Self {
        self.monthly_by = monthly_by;
        self
    }

    pub fn setpos(mut self, setpos: i32) -> Self {
        self.setpos = Some(setpos);
        self
    }

    pub fn setpos_option(mut self, weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        self.setpos_option = weekdays.into_iter().collect();
        self
    }

    pub fn end_type(mut self, end_type: EndType) -> Self {
        self.end_type = end_type;
        self
    }

    pub fn end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn occurrence_count(mut self, count: u32) -> Self {
        self.occurrence_count = Some(count);
        self
    }

    /// Shorthand for `end_type(UntilDate).end_date(date)`.
    pub fn until(self, date: NaiveDate) -> Self {
        self.end_type(EndType::UntilDate).end_date(date)
    }

    /// Shorthand for `end_type(AfterCount).occurrence_count(count)`.
    pub fn count(self, count: u32) -> Self {
        self.end_type(EndType::AfterCount).occurrence_count(count)
    }

    pub fn build(self) -> Result<RecurrenceRule> {
        let end = match (self.end_type, self.end_date, self.occurrence_count) {
            (EndType::Never, None, None) => EndCondition::Never,
            (EndType::UntilDate, Some(date), None) => EndCondition::Until(date),
            (EndType::AfterCount, None, Some(count)) => EndCondition::Count(count),
            (end_type, end_date, count) => {
                return Err(RecurrenceError::invalid(format!(
                    "end_type {end_type:?} does not match the populated end fields \
                     (end_date: {}, occurrence_count: {})",
                    if end_date.is_some() { "set" } else { "unset" },
                    if count.is_some() { "set" } else { "unset" },
                )));
            }
        };

        let mut monthdays = Vec::with_capacity(self.monthdays.len());
        for day in self.monthdays {
            let day = i8::try_from(day)
                .ok()
                .filter(|d| *d != 0 && (-31..=31).contains(d))
                .ok_or_else(|| {
                    RecurrenceError::invalid(format!("monthday {day} is outside -31..=31 or zero"))
                })?;
            monthdays.push(day);
        }
        monthdays.sort_unstable();
        monthdays.dedup();

        let mut months = self.months;
        months.sort_unstable();
        months.dedup();

        let mut weekdays = self.weekdays;
        calendar::normalize_weekdays(&mut weekdays);
        let mut setpos_option = self.setpos_option;
        calendar::normalize_weekdays(&mut setpos_option);

        let rule = RecurrenceRule {
            start_date: self.start_date,
            start_time: self.start_time,
            frequency: self.frequency,
            interval: self.interval,
            weekdays,
            monthdays,
            months,
            monthly_by: self.monthly_by,
            setpos: self.setpos,
            setpos_option,
            end,
        };
        rule.validate()?;
        Ok(rule)
    }
}
