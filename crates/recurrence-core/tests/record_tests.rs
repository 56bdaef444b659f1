//! Tests for rule construction: the typed builder and the stored-record parser.

use chrono::{NaiveDate, NaiveTime, Weekday};
use recurrence_core::{
    expand, EndCondition, EndType, ExpansionLimit, Frequency, MonthlyBy, RecurrenceError,
    RecurrenceRule,
};
use serde_json::{json, Value};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn from_json(value: Value) -> Result<RecurrenceRule, RecurrenceError> {
    RecurrenceRule::try_from(&value)
}

fn assert_invalid(result: Result<RecurrenceRule, RecurrenceError>) {
    assert!(
        matches!(result, Err(RecurrenceError::InvalidRule(_))),
        "expected InvalidRule, got {result:?}"
    );
}

// ---------------------------------------------------------------------------
// Builder invariants
// ---------------------------------------------------------------------------

#[test]
fn builder_defaults() {
    let rule = RecurrenceRule::builder(date(2024, 1, 1), Frequency::Daily)
        .build()
        .unwrap();

    assert_eq!(rule.interval(), 1);
    assert_eq!(rule.end(), EndCondition::Never);
    assert_eq!(rule.monthly_by(), MonthlyBy::DayOfMonth);
    assert!(rule.weekdays().is_empty());
    assert!(rule.start_time().is_none());
}

#[test]
fn builder_normalizes_sets() {
    let rule = RecurrenceRule::builder(date(2024, 1, 1), Frequency::Weekly)
        .weekdays([Weekday::Fri, Weekday::Mon, Weekday::Fri])
        .months([12, 3, 3])
        .build()
        .unwrap();

    assert_eq!(rule.weekdays(), [Weekday::Mon, Weekday::Fri]);
    assert_eq!(rule.months(), [3, 12]);
}

#[test]
fn zero_interval_is_rejected() {
    assert_invalid(
        RecurrenceRule::builder(date(2024, 1, 1), Frequency::Daily)
            .interval(0)
            .build(),
    );
}

#[test]
fn zero_count_is_rejected() {
    assert_invalid(
        RecurrenceRule::builder(date(2024, 1, 1), Frequency::Daily)
            .count(0)
            .build(),
    );
}

#[test]
fn out_of_range_monthdays_and_months_are_rejected() {
    for day in [0, 32, -32] {
        assert_invalid(
            RecurrenceRule::builder(date(2024, 1, 1), Frequency::Monthly)
                .monthdays([day])
                .build(),
        );
    }
    for month in [0, 13] {
        assert_invalid(
            RecurrenceRule::builder(date(2024, 1, 1), Frequency::Yearly)
                .months([month])
                .build(),
        );
    }
}

#[test]
fn zero_setpos_is_rejected() {
    assert_invalid(
        RecurrenceRule::builder(date(2024, 1, 1), Frequency::Monthly)
            .monthly_by(MonthlyBy::WeekdayPosition)
            .setpos_option([Weekday::Fri])
            .setpos(0)
            .build(),
    );
}

#[test]
fn never_with_both_end_fields_is_rejected() {
    assert_invalid(
        RecurrenceRule::builder(date(2024, 1, 1), Frequency::Daily)
            .end_type(EndType::Never)
            .end_date(date(2024, 2, 1))
            .occurrence_count(3)
            .build(),
    );
}

#[test]
fn end_type_without_its_field_is_rejected() {
    assert_invalid(
        RecurrenceRule::builder(date(2024, 1, 1), Frequency::Daily)
            .end_type(EndType::UntilDate)
            .build(),
    );
    assert_invalid(
        RecurrenceRule::builder(date(2024, 1, 1), Frequency::Daily)
            .end_type(EndType::AfterCount)
            .build(),
    );
    assert_invalid(
        RecurrenceRule::builder(date(2024, 1, 1), Frequency::Daily)
            .until(date(2024, 2, 1))
            .occurrence_count(3)
            .build(),
    );
}

#[test]
fn contradictory_monthly_fields_are_rejected() {
    // setpos without weekday position
    assert_invalid(
        RecurrenceRule::builder(date(2024, 1, 1), Frequency::Monthly)
            .setpos(2)
            .build(),
    );
    // weekday position on a weekly rule
    assert_invalid(
        RecurrenceRule::builder(date(2024, 1, 1), Frequency::Weekly)
            .monthly_by(MonthlyBy::WeekdayPosition)
            .build(),
    );
    // monthdays on a daily rule
    assert_invalid(
        RecurrenceRule::builder(date(2024, 1, 1), Frequency::Daily)
            .monthdays([3])
            .build(),
    );
    // monthdays alongside weekday position
    assert_invalid(
        RecurrenceRule::builder(date(2024, 1, 1), Frequency::Monthly)
            .monthly_by(MonthlyBy::WeekdayPosition)
            .monthdays([3])
            .build(),
    );
}

// ---------------------------------------------------------------------------
// Stored records
// ---------------------------------------------------------------------------

#[test]
fn record_with_string_values() {
    let rule = from_json(json!({
        "start_date": "20240131",
        "start_time": "09:00",
        "frequency": "MONTHLY",
        "interval": "1",
        "monthly_by": "monthdays",
        "monthdays": ["31"],
        "end_type": "count",
        "occurrence_count": "3"
    }))
    .unwrap();

    assert_eq!(rule.start_date(), date(2024, 1, 31));
    assert_eq!(rule.start_time(), NaiveTime::from_hms_opt(9, 0, 0));
    assert_eq!(rule.frequency(), Frequency::Monthly);
    assert_eq!(rule.monthdays(), [31]);
    assert_eq!(rule.end(), EndCondition::Count(3));

    let dates: Vec<NaiveDate> = expand(&rule, ExpansionLimit::unbounded())
        .unwrap()
        .map(|o| o.date)
        .collect();
    assert_eq!(dates, [date(2024, 1, 31), date(2024, 3, 31), date(2024, 5, 31)]);
}

#[test]
fn record_with_native_json_values() {
    let rule = from_json(json!({
        "start_date": "2024-01-01",
        "frequency": "weekly",
        "interval": 2,
        "weekdays": ["MO", "WE"],
        "end_type": "AFTER_COUNT",
        "occurrence_count": 4
    }))
    .unwrap();

    assert_eq!(rule.interval(), 2);
    assert_eq!(rule.weekdays(), [Weekday::Mon, Weekday::Wed]);
    assert_eq!(rule.end(), EndCondition::Count(4));
}

#[test]
fn record_positional_with_weekday_group() {
    let rule = from_json(json!({
        "start_date": "20240301",
        "frequency": "MONTHLY",
        "monthly_by": "setpos",
        "setpos": "-1",
        "setpos_option": "weekday",
        "end_type": "date",
        "end_date": "20240630"
    }))
    .unwrap();

    assert_eq!(rule.monthly_by(), MonthlyBy::WeekdayPosition);
    assert_eq!(rule.setpos(), Some(-1));
    assert_eq!(rule.setpos_option().len(), 5);
    assert_eq!(rule.end(), EndCondition::Until(date(2024, 6, 30)));
}

#[test]
fn record_setpos_option_as_single_weekday() {
    let rule = from_json(json!({
        "start_date": "20240301",
        "frequency": "MONTHLY",
        "monthly_by": "setpos",
        "setpos": 2,
        "setpos_option": "TU",
        "end_type": "count",
        "occurrence_count": 1
    }))
    .unwrap();

    assert_eq!(rule.setpos_option(), [Weekday::Tue]);
}

#[test]
fn record_accepts_misspelled_count_field() {
    let rule = from_json(json!({
        "start_date": "20240101",
        "frequency": "DAILY",
        "end_type": "count",
        "occurence_count": "7"
    }))
    .unwrap();

    assert_eq!(rule.end(), EndCondition::Count(7));
}

#[test]
fn record_blank_and_null_values_count_as_absent() {
    let rule = from_json(json!({
        "start_date": "20240101",
        "start_time": "",
        "frequency": "DAILY",
        "interval": null,
        "weekdays": [],
        "end_type": "never",
        "end_date": "",
        "occurrence_count": null
    }))
    .unwrap();

    assert!(rule.start_time().is_none());
    assert_eq!(rule.interval(), 1);
    assert_eq!(rule.end(), EndCondition::Never);
}

#[test]
fn record_ignores_fields_of_other_modes() {
    // The authoring form keeps hidden values: monthdays on a positional rule
    // and weekdays on a day-of-month rule.
    let positional = from_json(json!({
        "start_date": "20240101",
        "frequency": "MONTHLY",
        "monthly_by": "setpos",
        "setpos": "1",
        "setpos_option": "MO",
        "monthdays": ["15"],
        "end_type": "count",
        "occurrence_count": "2"
    }))
    .unwrap();
    assert!(positional.monthdays().is_empty());

    let by_day = from_json(json!({
        "start_date": "20240101",
        "frequency": "MONTHLY",
        "monthly_by": "monthdays",
        "monthdays": ["15"],
        "setpos": "1",
        "setpos_option": "MO",
        "weekdays": ["FR"],
        "end_type": "count",
        "occurrence_count": "2"
    }))
    .unwrap();
    assert!(by_day.setpos().is_none());
    assert!(by_day.weekdays().is_empty());
}

#[test]
fn record_never_with_stale_end_fields_is_rejected() {
    assert_invalid(from_json(json!({
        "start_date": "20240101",
        "frequency": "DAILY",
        "end_type": "never",
        "end_date": "20240201",
        "occurrence_count": "3"
    })));
}

#[test]
fn record_missing_required_fields_is_rejected() {
    assert_invalid(from_json(json!({ "frequency": "DAILY" })));
    assert_invalid(from_json(json!({ "start_date": "20240101" })));
}

#[test]
fn record_malformed_values_are_rejected() {
    let base = json!({
        "start_date": "20240101",
        "frequency": "DAILY",
        "end_type": "count",
        "occurrence_count": "3"
    });

    let cases = [
        ("start_date", json!("2024/01/01")),
        ("start_date", json!("20240231")),
        ("start_time", json!("25:00")),
        ("frequency", json!("HOURLY")),
        ("interval", json!("two")),
        ("interval", json!(-1)),
        ("interval", json!(1.5)),
        ("weekdays", json!(["XX"])),
        ("weekdays", json!([1])),
        ("months", json!(["13"])),
        ("end_type", json!("sometimes")),
        ("occurrence_count", json!("many")),
        ("frequency", json!(true)),
    ];

    for (name, value) in cases {
        let mut record = base.clone();
        record[name] = value.clone();
        let result = from_json(record);
        assert!(
            matches!(result, Err(RecurrenceError::InvalidRule(_))),
            "{name} = {value} should be rejected, got {result:?}"
        );
    }
}

#[test]
fn non_object_record_is_rejected() {
    assert_invalid(from_json(json!(["start_date", "20240101"])));
    assert_invalid(RecurrenceRule::from_json("not json"));
}

#[test]
fn from_json_text() {
    let rule = RecurrenceRule::from_json(
        r#"{"start_date":"20240101","frequency":"YEARLY","months":"3,6","monthdays":"1","end_type":"count","occurrence_count":"2"}"#,
    )
    .unwrap();

    assert_eq!(rule.months(), [3, 6]);
    assert_eq!(rule.monthdays(), [1]);
}
