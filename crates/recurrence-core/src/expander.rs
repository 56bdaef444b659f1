//! Recurrence expansion -- turns a [`RecurrenceRule`] into concrete occurrences.
//!
//! Expansion walks the rule one frequency unit at a time (day, Monday-started
//! week, month, year), generates the candidate dates inside that unit, filters
//! them, and hands them out in ascending order. Nothing is computed ahead of
//! what the caller pulls, so taking the first few occurrences of an endless
//! rule is cheap.

use std::collections::VecDeque;
use std::fmt;
use std::iter::FusedIterator;

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::calendar;
use crate::error::{RecurrenceError, Result};
use crate::rule::{EndCondition, Frequency, MonthlyBy, RecurrenceRule};

/// Expansion stops once the cursor moves past this year, even for rules whose
/// constraints can never match (e.g. February 30th).
pub const MAX_YEAR: i32 = 9999;

/// Caller-side bounds on an expansion. Both apply on top of the rule's own end
/// condition; the earliest bound wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionLimit {
    /// Hard cap on the number of occurrences returned.
    pub max_count: Option<usize>,
    /// Inclusive last date an occurrence may fall on.
    pub max_horizon: Option<NaiveDate>,
}

impl ExpansionLimit {
    /// No caller-side bounds. Only valid for rules that end on their own.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn count(max_count: usize) -> Self {
        Self {
            max_count: Some(max_count),
            max_horizon: None,
        }
    }

    pub fn horizon(max_horizon: NaiveDate) -> Self {
        Self {
            max_count: None,
            max_horizon: Some(max_horizon),
        }
    }

    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = Some(max_count);
        self
    }

    pub fn with_max_horizon(mut self, max_horizon: NaiveDate) -> Self {
        self.max_horizon = Some(max_horizon);
        self
    }

    fn is_unbounded(&self) -> bool {
        self.max_count.is_none() && self.max_horizon.is_none()
    }
}

/// One produced occurrence. Carries a time only when the rule's start does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Occurrence {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
}

impl Occurrence {
    /// Local date-time of the occurrence; date-only occurrences map to midnight.
    pub fn naive(&self) -> NaiveDateTime {
        self.date.and_time(self.time.unwrap_or(NaiveTime::MIN))
    }
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.time {
            Some(time) => write!(f, "{}T{}", self.date.format("%Y-%m-%d"), time.format("%H:%M:%S")),
            None => write!(f, "{}", self.date.format("%Y-%m-%d")),
        }
    }
}

/// Expand a rule into a lazy, ordered, finite sequence of occurrences.
///
/// # Errors
/// Returns `RecurrenceError::InvalidRule` if the rule fails re-validation.
/// Returns `RecurrenceError::UnboundedExpansion` if the rule never ends and
/// `limit` sets neither `max_count` nor `max_horizon`.
pub fn expand(rule: &RecurrenceRule, limit: ExpansionLimit) -> Result<Occurrences<'_>> {
    rule.validate()?;

    let (rule_count, rule_until) = match rule.end() {
        EndCondition::Never if limit.is_unbounded() => {
            return Err(RecurrenceError::UnboundedExpansion);
        }
        EndCondition::Never => (None, None),
        EndCondition::Until(date) => (None, Some(date)),
        EndCondition::Count(count) => (Some(count as usize), None),
    };

    let remaining = earliest(rule_count, limit.max_count);
    let stop_after = earliest(rule_until, limit.max_horizon);

    debug!(
        frequency = %rule.frequency(),
        interval = rule.interval(),
        start = %rule.start_date(),
        ?remaining,
        ?stop_after,
        "starting recurrence expansion"
    );

    Ok(Occurrences {
        rule,
        remaining,
        stop_after,
        cursor: Some(first_unit(rule)),
        pending: VecDeque::new(),
        done: false,
    })
}

impl RecurrenceRule {
    /// Method form of [`expand`].
    pub fn occurrences(&self, limit: ExpansionLimit) -> Result<Occurrences<'_>> {
        expand(self, limit)
    }
}

fn earliest<T: Ord>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Pull-based iterator over a rule's occurrences, returned by [`expand`].
#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    rule: &'a RecurrenceRule,
    /// Occurrences still allowed by the count bounds.
    remaining: Option<usize>,
    /// Inclusive date bound from `end_date` / `max_horizon`.
    stop_after: Option<NaiveDate>,
    /// First day of the next unit to generate.
    cursor: Option<NaiveDate>,
    /// Generated, filtered, sorted candidates of the current unit.
    pending: VecDeque<NaiveDate>,
    done: bool,
}

impl Occurrences<'_> {
    fn finish(&mut self, reason: &'static str) {
        debug!(reason, "recurrence expansion finished");
        self.done = true;
        self.cursor = None;
        self.pending.clear();
    }
}

impl Iterator for Occurrences<'_> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        while !self.done {
            if self.remaining == Some(0) {
                self.finish("count reached");
                break;
            }

            if let Some(date) = self.pending.pop_front() {
                if self.stop_after.is_some_and(|last| date > last) {
                    self.finish("end date reached");
                    break;
                }
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                return Some(Occurrence {
                    date,
                    time: self.rule.start_time(),
                });
            }

            let Some(unit) = self.cursor else {
                self.finish("calendar exhausted");
                break;
            };
            if self.stop_after.is_some_and(|last| unit > last) {
                self.finish("end date reached");
                break;
            }

            let candidates = unit_candidates(self.rule, unit);
            trace!(%unit, candidates = candidates.len(), "generated unit");
            self.pending.extend(candidates);
            self.cursor = next_unit(self.rule, unit);
        }
        None
    }
}

impl FusedIterator for Occurrences<'_> {}

/// First day of the unit that contains the rule's start.
fn first_unit(rule: &RecurrenceRule) -> NaiveDate {
    let start = rule.start_date();
    match rule.frequency() {
        Frequency::Daily => start,
        Frequency::Weekly => calendar::week_start(start),
        Frequency::Monthly => start.with_day(1).unwrap_or(start),
        Frequency::Yearly => start.with_ordinal(1).unwrap_or(start),
    }
}

/// First day of the unit `interval` units after `unit`, or `None` past [`MAX_YEAR`].
fn next_unit(rule: &RecurrenceRule, unit: NaiveDate) -> Option<NaiveDate> {
    let interval = rule.interval();
    let next = match rule.frequency() {
        Frequency::Daily => unit.checked_add_days(Days::new(u64::from(interval))),
        Frequency::Weekly => unit.checked_add_days(Days::new(7 * u64::from(interval))),
        Frequency::Monthly => unit.checked_add_months(Months::new(interval)),
        Frequency::Yearly => interval
            .checked_mul(12)
            .and_then(|months| unit.checked_add_months(Months::new(months))),
    }?;
    (next.year() <= MAX_YEAR).then_some(next)
}

/// Candidates of one unit, filtered and sorted, none before the rule's start.
fn unit_candidates(rule: &RecurrenceRule, unit: NaiveDate) -> Vec<NaiveDate> {
    let mut candidates = match rule.frequency() {
        Frequency::Daily => {
            let weekdays = rule.weekdays();
            if weekdays.is_empty() || weekdays.contains(&unit.weekday()) {
                vec![unit]
            } else {
                Vec::new()
            }
        }
        Frequency::Weekly => {
            let start_weekday = [rule.start_date().weekday()];
            let weekdays = if rule.weekdays().is_empty() {
                &start_weekday[..]
            } else {
                rule.weekdays()
            };
            weekdays
                .iter()
                .filter_map(|w| {
                    unit.checked_add_days(Days::new(u64::from(w.num_days_from_monday())))
                })
                .collect()
        }
        Frequency::Monthly => month_candidates(rule, unit.year(), unit.month()),
        Frequency::Yearly => year_candidates(rule, unit.year()),
    };

    let months = rule.months();
    if !months.is_empty() {
        candidates.retain(|d| months.contains(&d.month()));
    }
    candidates.sort_unstable();
    candidates.dedup();
    candidates.retain(|d| *d >= rule.start_date());
    candidates
}

/// Month days to use for a DAY_OF_MONTH rule: explicit, or the start's day.
fn day_values(rule: &RecurrenceRule) -> Vec<i8> {
    if rule.monthdays().is_empty() {
        // Day of month is 1..=31, always fits.
        vec![rule.start_date().day() as i8]
    } else {
        rule.monthdays().to_vec()
    }
}

fn month_candidates(rule: &RecurrenceRule, year: i32, month: u32) -> Vec<NaiveDate> {
    match rule.monthly_by() {
        MonthlyBy::DayOfMonth => day_values(rule)
            .into_iter()
            .filter_map(|day| calendar::resolve_monthday(year, month, day))
            .collect(),
        MonthlyBy::WeekdayPosition => calendar::month_bounds(year, month)
            .map(|(first, last)| positional(rule, first, last))
            .unwrap_or_default(),
    }
}

fn year_candidates(rule: &RecurrenceRule, year: i32) -> Vec<NaiveDate> {
    let months = rule.months();
    match rule.monthly_by() {
        // No day constraints at all: the anniversary of the start.
        MonthlyBy::DayOfMonth if months.is_empty() && rule.monthdays().is_empty() => {
            let start = rule.start_date();
            calendar::resolve_monthday(year, start.month(), start.day() as i8)
                .into_iter()
                .collect()
        }
        MonthlyBy::DayOfMonth => {
            let all_months: Vec<u32> = (1..=12).collect();
            let months = if months.is_empty() { &all_months[..] } else { months };
            months
                .iter()
                .flat_map(|m| month_candidates(rule, year, *m))
                .collect()
        }
        // Without months the position counts across the whole year.
        MonthlyBy::WeekdayPosition if months.is_empty() => calendar::year_bounds(year)
            .map(|(first, last)| positional(rule, first, last))
            .unwrap_or_default(),
        MonthlyBy::WeekdayPosition => months
            .iter()
            .flat_map(|m| month_candidates(rule, year, *m))
            .collect(),
    }
}

/// Dates in `first..=last` matching the rule's position weekdays, narrowed to
/// `setpos` when set. An unsatisfiable position contributes nothing.
fn positional(rule: &RecurrenceRule, first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let matches = calendar::matching_days(first, last, &rule.position_weekdays());
    match rule.setpos() {
        Some(position) => calendar::select_position(&matches, position).into_iter().collect(),
        None => matches,
    }
}
