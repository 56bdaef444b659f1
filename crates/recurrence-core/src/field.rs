//! Field resolution for a schema layer.
//!
//! A schema layer exposes one recurrence field per content record. It hands
//! the raw stored record to [`FieldResolver::resolve`] and gets back a
//! serializable [`RruleField`], or `None` when the record is unusable. Errors
//! never escape a single record, so one broken rule cannot fail a whole batch.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::calendar;
use crate::dst::{self, DstPolicy};
use crate::error::Result;
use crate::expander::{expand, ExpansionLimit};
use crate::rule::{EndCondition, EndType, Frequency, MonthlyBy, RecurrenceRule};

/// Occurrence cap applied when no other bound is configured.
pub const DEFAULT_MAX_OCCURRENCES: usize = 500;

/// Resolver configuration, deserializable from any serde source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    pub limit: ExpansionLimit,
    /// IANA timezone the occurrences are rendered in.
    pub timezone: String,
    pub dst_policy: DstPolicy,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            limit: ExpansionLimit::count(DEFAULT_MAX_OCCURRENCES),
            timezone: "UTC".to_string(),
            dst_policy: DstPolicy::default(),
        }
    }
}

/// The resolved value of a recurrence field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RruleField {
    /// RFC 5545 RRULE value.
    pub rrule: String,
    pub start_date: String,
    pub start_time: Option<String>,
    pub frequency: Frequency,
    pub interval: u32,
    pub weekdays: Vec<String>,
    pub monthdays: Vec<i8>,
    pub months: Vec<u32>,
    pub monthly_by: MonthlyBy,
    pub setpos: Option<i32>,
    pub setpos_option: Vec<String>,
    pub end_type: EndType,
    pub end_date: Option<String>,
    /// Serialized under the stored field name `occurence_count`.
    #[serde(rename = "occurence_count")]
    pub occurrence_count: Option<u32>,
    /// Every occurrence within the configured limit, ISO-8601 with offset.
    pub dates_collection: Vec<String>,
    /// Human-readable summary.
    pub text: String,
}

/// Resolves stored records into [`RruleField`] values.
#[derive(Debug, Clone)]
pub struct FieldResolver {
    limit: ExpansionLimit,
    timezone: Tz,
    dst_policy: DstPolicy,
}

impl FieldResolver {
    /// # Errors
    /// Returns `RecurrenceError::InvalidTimezone` if `options.timezone` is unknown.
    pub fn new(options: &ResolveOptions) -> Result<Self> {
        Ok(Self {
            limit: options.limit,
            timezone: dst::parse_timezone(&options.timezone)?,
            dst_policy: options.dst_policy,
        })
    }

    /// Resolve one record, surfacing the error.
    ///
    /// A rule that never ends is capped at [`DEFAULT_MAX_OCCURRENCES`] when the
    /// configured limit leaves it unbounded.
    pub fn try_resolve(&self, record: &Map<String, Value>) -> Result<RruleField> {
        let rule = RecurrenceRule::from_record(record)?;
        self.render(&rule)
    }

    /// Resolve one record; `None` if the record or its rule is invalid.
    pub fn resolve(&self, record: &Map<String, Value>) -> Option<RruleField> {
        match self.try_resolve(record) {
            Ok(field) => Some(field),
            Err(error) => {
                warn!(%error, "dropping unusable recurrence record");
                None
            }
        }
    }

    /// Resolve many records independently. Non-object entries resolve to `None`.
    pub fn resolve_batch(&self, records: &[Value]) -> Vec<Option<RruleField>> {
        records
            .iter()
            .map(|value| match value {
                Value::Object(record) => self.resolve(record),
                _ => {
                    warn!("dropping recurrence record that is not a JSON object");
                    None
                }
            })
            .collect()
    }

    /// Render an already validated rule.
    pub fn render(&self, rule: &RecurrenceRule) -> Result<RruleField> {
        let limit = if rule.end() == EndCondition::Never
            && self.limit.max_count.is_none()
            && self.limit.max_horizon.is_none()
        {
            ExpansionLimit::count(DEFAULT_MAX_OCCURRENCES)
        } else {
            self.limit
        };

        let dates_collection = expand(rule, limit)?
            .filter_map(|o| o.to_iso8601(&self.timezone, self.dst_policy))
            .collect();

        let (end_date, occurrence_count) = match rule.end() {
            EndCondition::Never => (None, None),
            EndCondition::Until(date) => (Some(date.format("%Y-%m-%d").to_string()), None),
            EndCondition::Count(count) => (None, Some(count)),
        };

        Ok(RruleField {
            rrule: rule.to_rrule(),
            start_date: rule.start_date().format("%Y-%m-%d").to_string(),
            start_time: rule.start_time().map(|t| t.format("%H:%M:%S").to_string()),
            frequency: rule.frequency(),
            interval: rule.interval(),
            weekdays: weekday_codes(rule.weekdays()),
            monthdays: rule.monthdays().to_vec(),
            months: rule.months().to_vec(),
            monthly_by: rule.monthly_by(),
            setpos: rule.setpos(),
            setpos_option: weekday_codes(rule.setpos_option()),
            end_type: rule.end().end_type(),
            end_date,
            occurrence_count,
            dates_collection,
            text: rule.describe(),
        })
    }
}

fn weekday_codes(weekdays: &[chrono::Weekday]) -> Vec<String> {
    weekdays
        .iter()
        .map(|w| calendar::weekday_code(*w).to_string())
        .collect()
}

/// Resolve one record with `options`. `None` for bad records or options.
pub fn resolve_field(record: &Map<String, Value>, options: &ResolveOptions) -> Option<RruleField> {
    match FieldResolver::new(options) {
        Ok(resolver) => resolver.resolve(record),
        Err(error) => {
            warn!(%error, "invalid resolver options");
            None
        }
    }
}

/// Resolve many records with `options`; each entry fails independently.
pub fn resolve_batch(records: &[Value], options: &ResolveOptions) -> Vec<Option<RruleField>> {
    match FieldResolver::new(options) {
        Ok(resolver) => resolver.resolve_batch(records),
        Err(error) => {
            warn!(%error, "invalid resolver options");
            vec![None; records.len()]
        }
    }
}
