use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::model::user::UserSummary;

/// Coordinates captured verbatim from the caller; no range validation is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoLocation {
    #[schema(example = 23.8103)]
    pub latitude: f64,
    #[schema(example = 90.4125)]
    pub longitude: f64,
    #[schema(example = "Dhaka, Bangladesh", nullable = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Early,
    HalfDay,
}

/// One attendance record per (user, calendar day). Created on the first
/// check-in of the day and mutated in place until checked out.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(example = 1, nullable = true)]
    pub organization_id: Option<u64>,
    /// Day key, normalized to midnight of the configured time zone.
    #[schema(example = "2026-08-27", value_type = String, format = "date")]
    pub date: NaiveDate,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub check_in_location: Option<GeoLocation>,
    pub check_out_location: Option<GeoLocation>,
    #[schema(example = "present")]
    pub status: AttendanceStatus,
    /// Externally supplied flag; nothing in this service computes lateness.
    pub is_late: bool,
    /// Minutes between check-in and check-out, 0 until checked out.
    #[schema(example = 510)]
    pub working_hours: i64,
}

/// Record plus the owning user's summary, the shape both delivery
/// surfaces return to callers.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PopulatedAttendance {
    #[serde(flatten)]
    pub record: AttendanceRecord,
    pub user: Option<UserSummary>,
}
