use chrono::{NaiveDate, Weekday};
use criterion::{criterion_group, criterion_main, Criterion};
use recurrence_core::{expand, ExpansionLimit, Frequency, MonthlyBy, RecurrenceRule};
use std::hint::black_box;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn bench_expansion(c: &mut Criterion) {
    let weekly = RecurrenceRule::builder(start(), Frequency::Weekly)
        .weekdays([Weekday::Mon, Weekday::Wed, Weekday::Fri])
        .build()
        .unwrap();
    let last_friday = RecurrenceRule::builder(start(), Frequency::Monthly)
        .monthly_by(MonthlyBy::WeekdayPosition)
        .setpos_option([Weekday::Fri])
        .setpos(-1)
        .build()
        .unwrap();
    let month_end = RecurrenceRule::builder(start(), Frequency::Monthly)
        .monthdays([31])
        .build()
        .unwrap();

    let mut group = c.benchmark_group("expand");
    group.bench_function("weekly_mwf_500", |b| {
        b.iter(|| expand(black_box(&weekly), ExpansionLimit::count(500)).unwrap().count())
    });
    group.bench_function("monthly_last_friday_500", |b| {
        b.iter(|| expand(black_box(&last_friday), ExpansionLimit::count(500)).unwrap().count())
    });
    group.bench_function("monthly_31st_500", |b| {
        b.iter(|| expand(black_box(&month_end), ExpansionLimit::count(500)).unwrap().count())
    });
    group.bench_function("weekly_mwf_first_5", |b| {
        b.iter(|| {
            expand(black_box(&weekly), ExpansionLimit::count(usize::MAX))
                .unwrap()
                .take(5)
                .count()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_expansion);
criterion_main!(benches);
