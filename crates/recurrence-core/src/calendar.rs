//! Calendar arithmetic shared by the expander and the renderers.
//!
//! Everything here works on civil dates with Monday as the first day of the
//! week. Nothing rolls over: a day that does not exist in a month is `None`.

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// All seven weekdays, Monday first.
pub(crate) const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub(crate) fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Resolve a month-day value (`1..=31` from the start, `-1..=-31` from the end)
/// to a concrete date. Returns `None` when the month is too short.
pub(crate) fn resolve_monthday(year: i32, month: u32, day: i8) -> Option<NaiveDate> {
    let len = days_in_month(year, month);
    let magnitude = u32::from(day.unsigned_abs());
    if day == 0 || magnitude > len {
        return None;
    }
    let day_of_month = if day > 0 { magnitude } else { len - magnitude + 1 };
    NaiveDate::from_ymd_opt(year, month, day_of_month)
}

/// First and last day of a month.
pub(crate) fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = NaiveDate::from_ymd_opt(year, month, days_in_month(year, month))?;
    Some((first, last))
}

/// First and last day of a year.
pub(crate) fn year_bounds(year: i32) -> Option<(NaiveDate, NaiveDate)> {
    Some((
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}

/// Monday of the week containing `date`.
pub(crate) fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// Every date in `first..=last` whose weekday is in `weekdays`, ascending.
pub(crate) fn matching_days(
    first: NaiveDate,
    last: NaiveDate,
    weekdays: &[Weekday],
) -> Vec<NaiveDate> {
    first
        .iter_days()
        .take_while(|d| *d <= last)
        .filter(|d| weekdays.contains(&d.weekday()))
        .collect()
}

/// Pick the element at a 1-based position, counting from the end when negative.
/// Positions beyond the slice select nothing.
pub(crate) fn select_position(matches: &[NaiveDate], position: i32) -> Option<NaiveDate> {
    let magnitude = usize::try_from(position.unsigned_abs()).ok()?;
    if magnitude == 0 || magnitude > matches.len() {
        return None;
    }
    if position > 0 {
        matches.get(magnitude - 1).copied()
    } else {
        matches.get(matches.len() - magnitude).copied()
    }
}

/// Sort weekdays Monday-first and drop duplicates.
pub(crate) fn normalize_weekdays(weekdays: &mut Vec<Weekday>) {
    weekdays.sort_by_key(|w| w.num_days_from_monday());
    weekdays.dedup();
}

/// Two-letter RFC 5545 weekday code.
pub(crate) fn weekday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

pub(crate) fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Parse a single weekday token: `MO`, `Mon`, `monday`, any case.
pub(crate) fn parse_weekday(token: &str) -> Option<Weekday> {
    match token.trim().to_ascii_lowercase().as_str() {
        "mo" | "mon" | "monday" => Some(Weekday::Mon),
        "tu" | "tue" | "tuesday" => Some(Weekday::Tue),
        "we" | "wed" | "wednesday" => Some(Weekday::Wed),
        "th" | "thu" | "thursday" => Some(Weekday::Thu),
        "fr" | "fri" | "friday" => Some(Weekday::Fri),
        "sa" | "sat" | "saturday" => Some(Weekday::Sat),
        "su" | "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_lengths_follow_leap_years() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
    }

    #[test]
    fn monthday_never_rolls_over() {
        assert_eq!(resolve_monthday(2024, 2, 31), None);
        assert_eq!(resolve_monthday(2024, 2, 29), Some(date(2024, 2, 29)));
        assert_eq!(resolve_monthday(2024, 2, -1), Some(date(2024, 2, 29)));
        assert_eq!(resolve_monthday(2023, 2, -28), Some(date(2023, 2, 1)));
        assert_eq!(resolve_monthday(2023, 2, -29), None);
    }

    #[test]
    fn position_counts_from_either_end() {
        let fridays = matching_days(date(2024, 3, 1), date(2024, 3, 31), &[Weekday::Fri]);
        assert_eq!(fridays.len(), 5);
        assert_eq!(select_position(&fridays, 1), Some(date(2024, 3, 1)));
        assert_eq!(select_position(&fridays, -1), Some(date(2024, 3, 29)));
        assert_eq!(select_position(&fridays, 6), None);
        assert_eq!(select_position(&fridays, -6), None);
    }

    #[test]
    fn week_starts_on_monday() {
        assert_eq!(week_start(date(2024, 1, 7)), date(2024, 1, 1));
        assert_eq!(week_start(date(2024, 1, 1)), date(2024, 1, 1));
        assert_eq!(week_start(date(2024, 1, 3)), date(2024, 1, 1));
    }
}
