//! Rule rendering: RFC 5545 RRULE text and an English summary.

use chrono::{Datelike, Month, NaiveDate, NaiveTime, Weekday};

use crate::calendar::{self, WEEK};
use crate::rule::{EndCondition, Frequency, MonthlyBy, RecurrenceRule};

impl RecurrenceRule {
    /// The rule as an RFC 5545 `RRULE` value, e.g. `FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE;COUNT=4`.
    ///
    /// `UNTIL` is always written as the last second of the end date in UTC, to
    /// pair with the UTC `DTSTART` produced by [`RecurrenceRule::to_ical`].
    pub fn to_rrule(&self) -> String {
        let mut parts = vec![format!("FREQ={}", self.frequency())];
        if self.interval() > 1 {
            parts.push(format!("INTERVAL={}", self.interval()));
        }

        match (self.frequency(), self.monthly_by()) {
            (Frequency::Daily | Frequency::Weekly, _) => {
                if !self.weekdays().is_empty() {
                    parts.push(format!("BYDAY={}", codes(self.weekdays())));
                }
            }
            (_, MonthlyBy::DayOfMonth) => {
                if !self.monthdays().is_empty() {
                    let days: Vec<String> = self.monthdays().iter().map(i8::to_string).collect();
                    parts.push(format!("BYMONTHDAY={}", days.join(",")));
                }
            }
            (Frequency::Yearly, MonthlyBy::WeekdayPosition)
                if !self.months().is_empty() && self.position_weekdays().len() == 1 =>
            {
                // Inside BYMONTH a numeric BYDAY prefix counts within each month.
                let code = codes(&self.position_weekdays());
                match self.setpos() {
                    Some(position) => parts.push(format!("BYDAY={position}{code}")),
                    None => parts.push(format!("BYDAY={code}")),
                }
            }
            (_, MonthlyBy::WeekdayPosition) => {
                parts.push(format!("BYDAY={}", codes(&self.position_weekdays())));
                if let Some(position) = self.setpos() {
                    parts.push(format!("BYSETPOS={position}"));
                }
            }
        }

        if !self.months().is_empty() {
            let months: Vec<String> = self.months().iter().map(u32::to_string).collect();
            parts.push(format!("BYMONTH={}", months.join(",")));
        }

        match self.end() {
            EndCondition::Never => {}
            EndCondition::Until(date) => {
                parts.push(format!("UNTIL={}T235959Z", date.format("%Y%m%d")));
            }
            EndCondition::Count(count) => parts.push(format!("COUNT={count}")),
        }

        parts.join(";")
    }

    /// `DTSTART` and `RRULE` lines, with the start read as UTC wall time.
    pub fn to_ical(&self) -> String {
        let start = self
            .start_date()
            .and_time(self.start_time().unwrap_or(NaiveTime::MIN));
        format!(
            "DTSTART:{}\nRRULE:{}",
            start.format("%Y%m%dT%H%M%SZ"),
            self.to_rrule()
        )
    }

    /// English summary, e.g. `every 2 weeks on Monday and Wednesday, starting
    /// January 1, 2024, 4 times`.
    pub fn describe(&self) -> String {
        let mut text = cadence(self.frequency(), self.interval());

        if let Some(days) = day_phrase(self) {
            text.push(' ');
            text.push_str(&days);
        }
        if self.frequency() != Frequency::Yearly && !self.months().is_empty() {
            text.push_str(" in ");
            text.push_str(&month_list(self.months()));
        }
        if let Some(time) = self.start_time() {
            text.push_str(&format!(" at {}", time.format("%H:%M")));
        }
        text.push_str(&format!(", starting {}", long_date(self.start_date())));

        match self.end() {
            EndCondition::Never => {}
            EndCondition::Until(date) => text.push_str(&format!(", until {}", long_date(date))),
            EndCondition::Count(1) => text.push_str(", once"),
            EndCondition::Count(count) => text.push_str(&format!(", {count} times")),
        }
        text
    }
}

fn codes(weekdays: &[Weekday]) -> String {
    weekdays
        .iter()
        .map(|w| calendar::weekday_code(*w))
        .collect::<Vec<_>>()
        .join(",")
}

fn cadence(frequency: Frequency, interval: u32) -> String {
    let (adverb, unit) = match frequency {
        Frequency::Daily => ("daily", "days"),
        Frequency::Weekly => ("weekly", "weeks"),
        Frequency::Monthly => ("monthly", "months"),
        Frequency::Yearly => ("yearly", "years"),
    };
    if interval == 1 {
        adverb.to_string()
    } else {
        format!("every {interval} {unit}")
    }
}

fn day_phrase(rule: &RecurrenceRule) -> Option<String> {
    match (rule.frequency(), rule.monthly_by()) {
        (Frequency::Daily, _) if rule.weekdays().is_empty() => None,
        (Frequency::Daily, _) => Some(format!("on {}", weekday_list(rule.weekdays(), "and"))),
        (Frequency::Weekly, _) => {
            let weekdays = if rule.weekdays().is_empty() {
                vec![rule.start_date().weekday()]
            } else {
                rule.weekdays().to_vec()
            };
            Some(format!("on {}", weekday_list(&weekdays, "and")))
        }
        (Frequency::Monthly, MonthlyBy::DayOfMonth) => {
            Some(format!("on the {}", monthday_list(rule)))
        }
        (Frequency::Monthly, MonthlyBy::WeekdayPosition) => {
            Some(format!("on {}", position_phrase(rule)))
        }
        (Frequency::Yearly, MonthlyBy::DayOfMonth) => {
            if rule.months().is_empty() && rule.monthdays().is_empty() {
                Some(format!("on {}", rule.start_date().format("%B %-d")))
            } else if rule.months().is_empty() {
                Some(format!("on the {} of every month", monthday_list(rule)))
            } else {
                Some(format!(
                    "on the {} of {}",
                    monthday_list(rule),
                    month_list(rule.months())
                ))
            }
        }
        (Frequency::Yearly, MonthlyBy::WeekdayPosition) => {
            let scope = if rule.months().is_empty() {
                "the year".to_string()
            } else {
                month_list(rule.months())
            };
            Some(format!("on {} of {}", position_phrase(rule), scope))
        }
    }
}

fn monthday_list(rule: &RecurrenceRule) -> String {
    let days: Vec<String> = if rule.monthdays().is_empty() {
        vec![ordinal(rule.start_date().day() as i64)]
    } else {
        rule.monthdays()
            .iter()
            .map(|d| match *d {
                -1 => "last day".to_string(),
                d if d < 0 => format!("{} to last day", ordinal(-i64::from(d))),
                d => ordinal(i64::from(d)),
            })
            .collect()
    };
    join_words(&days, "and")
}

fn position_phrase(rule: &RecurrenceRule) -> String {
    let weekdays = weekday_group(&rule.position_weekdays());
    match rule.setpos() {
        None => format!("every {weekdays}"),
        Some(-1) => format!("the last {weekdays}"),
        Some(position) if position < 0 => {
            format!("the {} to last {weekdays}", ordinal(-i64::from(position)))
        }
        Some(position) => format!("the {} {weekdays}", ordinal(i64::from(position))),
    }
}

/// Name a weekday set, using the group names for the common sets.
fn weekday_group(weekdays: &[Weekday]) -> String {
    if weekdays == WEEK {
        "day".to_string()
    } else if weekdays == &WEEK[..5] {
        "weekday".to_string()
    } else if weekdays == &WEEK[5..] {
        "weekend day".to_string()
    } else {
        weekday_list(weekdays, "or")
    }
}

fn weekday_list(weekdays: &[Weekday], conjunction: &str) -> String {
    let names: Vec<String> = weekdays
        .iter()
        .map(|w| calendar::weekday_name(*w).to_string())
        .collect();
    join_words(&names, conjunction)
}

fn month_list(months: &[u32]) -> String {
    let names: Vec<String> = months
        .iter()
        .filter_map(|m| u8::try_from(*m).ok())
        .filter_map(|m| Month::try_from(m).ok())
        .map(|m| m.name().to_string())
        .collect();
    join_words(&names, "and")
}

fn long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn ordinal(n: i64) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

fn join_words(words: &[String], conjunction: &str) -> String {
    match words {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} {conjunction} {last}", init.join(", ")),
    }
}
