use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::StoreError;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, GeoLocation};
use crate::store::{AttendanceStats, AttendanceStore, HistoryFilter, NewAttendance};

/// In-process store with the same (user, date) uniqueness and claim
/// semantics as the MySQL implementation. Backs the integration tests and
/// local development without a database.
#[derive(Default)]
pub struct MemoryAttendanceStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    records: BTreeMap<u64, AttendanceRecord>,
    by_user_day: HashMap<(u64, NaiveDate), u64>,
}

impl MemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test seeding helper: inserts a fully formed record, bypassing the
    /// check-in path but still honoring the uniqueness constraint.
    pub fn seed(&self, mut record: AttendanceRecord) -> Result<AttendanceRecord, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let key = (record.user_id, record.date);
        if inner.by_user_day.contains_key(&key) {
            return Err(StoreError::Duplicate);
        }
        inner.next_id += 1;
        record.id = inner.next_id;
        inner.by_user_day.insert(key, record.id);
        inner.records.insert(record.id, record.clone());
        Ok(record)
    }
}

#[async_trait]
impl AttendanceStore for MemoryAttendanceStore {
    async fn insert(&self, new: NewAttendance) -> Result<AttendanceRecord, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let key = (new.user_id, new.date);
        if inner.by_user_day.contains_key(&key) {
            return Err(StoreError::Duplicate);
        }
        inner.next_id += 1;
        let record = AttendanceRecord {
            id: inner.next_id,
            user_id: new.user_id,
            organization_id: new.organization_id,
            date: new.date,
            check_in_time: Some(new.check_in_time),
            check_out_time: None,
            check_in_location: new.check_in_location,
            check_out_location: None,
            status: new.status,
            is_late: false,
            working_hours: 0,
        };
        inner.by_user_day.insert(key, record.id);
        inner.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn claim_check_in(
        &self,
        id: u64,
        at: DateTime<Utc>,
        location: Option<GeoLocation>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.records.get_mut(&id) {
            Some(record) if record.check_in_time.is_none() => {
                record.check_in_time = Some(at);
                record.check_in_location = location;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn claim_check_out(
        &self,
        id: u64,
        at: DateTime<Utc>,
        location: Option<GeoLocation>,
        working_minutes: i64,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.records.get_mut(&id) {
            Some(record)
                if record.check_in_time.is_some() && record.check_out_time.is_none() =>
            {
                record.check_out_time = Some(at);
                record.check_out_location = location;
                record.working_hours = working_minutes;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self.inner.lock().unwrap().records.get(&id).cloned())
    }

    async fn find_by_user_and_day(
        &self,
        user_id: u64,
        day: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .by_user_day
            .get(&(user_id, day))
            .and_then(|id| inner.records.get(id))
            .cloned())
    }

    async fn list(
        &self,
        filter: &HistoryFilter,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<AttendanceRecord>, i64), StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut matching: Vec<AttendanceRecord> = inner
            .records
            .values()
            .filter(|r| matches_filter(r, filter))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn aggregate(&self, filter: &HistoryFilter) -> Result<AttendanceStats, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut stats = AttendanceStats::default();
        for record in inner.records.values().filter(|r| matches_filter(r, filter)) {
            stats.total_days += 1;
            stats.total_working_hours += record.working_hours;
            if record.status == AttendanceStatus::Present {
                stats.present_days += 1;
            }
            if record.is_late {
                stats.late_days += 1;
            }
        }
        Ok(stats)
    }
}

fn matches_filter(record: &AttendanceRecord, filter: &HistoryFilter) -> bool {
    if record.user_id != filter.user_id {
        return false;
    }
    if let Some(start) = filter.start_date {
        if record.date < start {
            return false;
        }
    }
    if let Some(end) = filter.end_date {
        if record.date > end {
            return false;
        }
    }
    true
}
