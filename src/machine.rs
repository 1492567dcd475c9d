//! Pure check-in/check-out transition logic shared by the HTTP service and
//! the realtime gateway. No IO here; the store is the final arbiter of races
//! (uniqueness constraint on (user, date), conditional updates for claims).

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::error::AttendanceError;
use crate::model::attendance::AttendanceRecord;

/// Calendar day keying one attendance record per user, anchored at midnight
/// of the configured offset. The stores key rows by this date alone.
pub fn local_day(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

/// Minutes between check-in and check-out, rounded half-up to the nearest
/// minute.
pub fn working_minutes(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> i64 {
    let millis = (check_out - check_in).num_milliseconds();
    (millis as f64 / 60_000.0).round() as i64
}

/// What a check-in should do with the day's row, given what the advisory
/// read found.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckInPlan {
    /// No row for the day: insert one with check-in already filled.
    Create,
    /// A placeholder row exists with no check-in time: claim it in place.
    ClaimExisting(u64),
}

pub fn plan_check_in(existing: Option<&AttendanceRecord>) -> Result<CheckInPlan, AttendanceError> {
    match existing {
        None => Ok(CheckInPlan::Create),
        Some(record) if record.check_in_time.is_some() => {
            Err(AttendanceError::AlreadyCheckedIn(Box::new(record.clone())))
        }
        Some(record) => Ok(CheckInPlan::ClaimExisting(record.id)),
    }
}

/// Validates the NONE -> CHECKED_IN -> CHECKED_OUT ordering and returns the
/// check-in timestamp the working-hours computation needs.
pub fn validate_check_out(record: &AttendanceRecord) -> Result<DateTime<Utc>, AttendanceError> {
    let check_in = record.check_in_time.ok_or(AttendanceError::NotCheckedIn)?;
    if record.check_out_time.is_some() {
        return Err(AttendanceError::AlreadyCheckedOut);
    }
    Ok(check_in)
}
