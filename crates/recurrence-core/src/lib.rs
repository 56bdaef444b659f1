//! # recurrence-core
//!
//! Typed recurrence rules and deterministic occurrence expansion.
//!
//! A [`RecurrenceRule`] describes a repeating schedule: a start, a frequency
//! stepped by an interval, optional weekday/month-day/month constraints, and
//! an end condition. [`expand`] turns it into the ordered occurrences it
//! denotes, lazily, one frequency unit at a time.
//!
//! ```rust
//! use chrono::{NaiveDate, Weekday};
//! use recurrence_core::{expand, ExpansionLimit, Frequency, RecurrenceRule};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let rule = RecurrenceRule::builder(start, Frequency::Weekly)
//!     .interval(2)
//!     .weekdays([Weekday::Mon, Weekday::Wed])
//!     .count(4)
//!     .build()
//!     .unwrap();
//!
//! let dates: Vec<String> = expand(&rule, ExpansionLimit::unbounded())
//!     .unwrap()
//!     .map(|o| o.to_string())
//!     .collect();
//! assert_eq!(dates, ["2024-01-01", "2024-01-03", "2024-01-15", "2024-01-17"]);
//! ```
//!
//! ## Modules
//!
//! - [`rule`] — `RecurrenceRule`, its builder and invariants
//! - [`record`] — validating constructor from a stored key/value record
//! - [`expander`] — lazy expansion into `Occurrence`s
//! - [`dst`] — timezone offset application and DST gap policy
//! - [`text`] — RRULE text and English summaries
//! - [`field`] — resolver for a schema layer (record in, field value out)
//! - [`error`] — Error types

mod calendar;
pub mod dst;
pub mod error;
pub mod expander;
pub mod field;
pub mod record;
pub mod rule;
pub mod text;

pub use dst::{parse_timezone, DstPolicy};
pub use error::RecurrenceError;
pub use expander::{expand, ExpansionLimit, Occurrence, Occurrences};
pub use field::{resolve_batch, resolve_field, FieldResolver, ResolveOptions, RruleField};
pub use rule::{EndCondition, EndType, Frequency, MonthlyBy, RecurrenceRule, RuleBuilder};
