//! Timezone offset application for occurrences.
//!
//! Occurrences are civil (wall-clock) values. Attaching a zone happens only at
//! the output boundary, one occurrence at a time, so a 09:00 rule stays at
//! 09:00 local on both sides of a DST transition.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{RecurrenceError, Result};
use crate::expander::Occurrence;

/// ISO-8601 with a numeric UTC offset, e.g. `2024-03-15T00:00:00+00:00`.
pub const ISO8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Policy for occurrences whose local time falls in a DST gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DstPolicy {
    /// Drop instances that fall in the DST gap (e.g., 2:30 AM during spring forward)
    Skip,
    /// Interpret the local time with the offset in effect before the gap, which
    /// lands the same distance past the transition (2:30 AM becomes 3:30 AM).
    #[default]
    ShiftForward,
}

/// Parse an IANA timezone name.
///
/// # Errors
/// Returns `RecurrenceError::InvalidTimezone` if the name is unknown.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse()
        .map_err(|_| RecurrenceError::InvalidTimezone(name.to_string()))
}

impl Occurrence {
    /// Attach `tz` to this occurrence's wall-clock value.
    ///
    /// Ambiguous local times (the repeated hour when clocks fall back) resolve
    /// to the earlier instant. Returns `None` only when the local time does not
    /// exist and `policy` is [`DstPolicy::Skip`]. A date-only occurrence has no
    /// wall-clock time to skip: when its local midnight falls in a gap it
    /// resolves to the first instant of that day.
    pub fn in_timezone<Z: TimeZone>(&self, tz: &Z, policy: DstPolicy) -> Option<DateTime<Z>> {
        let local = self.naive();
        match tz.from_local_datetime(&local) {
            LocalResult::Single(dt) => Some(dt),
            LocalResult::Ambiguous(earliest, _) => Some(earliest),
            LocalResult::None if self.time.is_some() && policy == DstPolicy::Skip => None,
            LocalResult::None => shift_forward(tz, local),
        }
    }

    /// Render as ISO-8601 with the zone's UTC offset, or `None` when skipped.
    pub fn to_iso8601<Z: TimeZone>(&self, tz: &Z, policy: DstPolicy) -> Option<String> {
        self.in_timezone(tz, policy)
            .map(|dt| dt.fixed_offset().format(ISO8601_FORMAT).to_string())
    }
}

/// Read a nonexistent local time with the offset in effect a day earlier,
/// which lands the same distance past the transition.
fn shift_forward<Z: TimeZone>(tz: &Z, local: NaiveDateTime) -> Option<DateTime<Z>> {
    let before = local.checked_sub_signed(Duration::days(1))?;
    let offset = tz.offset_from_local_datetime(&before).earliest()?;
    let utc = local.checked_sub_signed(Duration::seconds(i64::from(
        offset.fix().local_minus_utc(),
    )))?;
    Some(tz.from_utc_datetime(&utc))
}
