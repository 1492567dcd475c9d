pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::StoreError;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, GeoLocation};

/// Fields for a freshly created day row. The id is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub user_id: u64,
    pub organization_id: Option<u64>,
    pub date: NaiveDate,
    pub check_in_time: DateTime<Utc>,
    pub check_in_location: Option<GeoLocation>,
    pub status: AttendanceStatus,
}

/// History/stats filter; `user_id` is always present (caller identity or an
/// explicit override), dates are inclusive bounds on the day key.
#[derive(Debug, Clone)]
pub struct HistoryFilter {
    pub user_id: u64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    #[schema(example = 20)]
    pub total_days: i64,
    #[schema(example = 9600)]
    pub total_working_hours: i64,
    #[schema(example = 18)]
    pub present_days: i64,
    #[schema(example = 2)]
    pub late_days: i64,
}

/// Durable storage of one attendance row per (user, day).
///
/// The uniqueness constraint on (user_id, date) and the conditional claim
/// updates are the correctness mechanism for concurrent callers; the
/// read-then-write done by the service above this trait is advisory only.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Inserts the day row. Fails with [`StoreError::Duplicate`] when a row
    /// for (user_id, date) already exists.
    async fn insert(&self, new: NewAttendance) -> Result<AttendanceRecord, StoreError>;

    /// Fills check-in fields iff the row still has no check-in time.
    /// Returns false when another writer won the race.
    async fn claim_check_in(
        &self,
        id: u64,
        at: DateTime<Utc>,
        location: Option<GeoLocation>,
    ) -> Result<bool, StoreError>;

    /// Fills check-out fields and working minutes iff the row is checked in
    /// and not yet checked out. Returns false when another writer won.
    async fn claim_check_out(
        &self,
        id: u64,
        at: DateTime<Utc>,
        location: Option<GeoLocation>,
        working_minutes: i64,
    ) -> Result<bool, StoreError>;

    async fn find_by_id(&self, id: u64) -> Result<Option<AttendanceRecord>, StoreError>;

    async fn find_by_user_and_day(
        &self,
        user_id: u64,
        day: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Filtered page sorted by date descending, plus the unpaginated total.
    async fn list(
        &self,
        filter: &HistoryFilter,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<AttendanceRecord>, i64), StoreError>;

    /// Aggregates over the filtered set; all-zero when nothing matches.
    async fn aggregate(&self, filter: &HistoryFilter) -> Result<AttendanceStats, StoreError>;
}
