use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use sqlx::{FromRow, MySqlPool};

use crate::error::StoreError;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, GeoLocation};
use crate::store::{AttendanceStats, AttendanceStore, HistoryFilter, NewAttendance};

/// MySQL-backed store. Schema in `migrations/001_create_attendance.sql`;
/// the UNIQUE KEY on (user_id, date) backs the one-row-per-day invariant.
pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// Flat row shape; locations are stored as nullable scalar columns and
/// folded back into [`GeoLocation`] on read.
#[derive(FromRow)]
struct AttendanceRow {
    id: u64,
    user_id: u64,
    organization_id: Option<u64>,
    date: NaiveDate,
    check_in_time: Option<NaiveDateTime>,
    check_out_time: Option<NaiveDateTime>,
    check_in_lat: Option<f64>,
    check_in_lng: Option<f64>,
    check_in_address: Option<String>,
    check_out_lat: Option<f64>,
    check_out_lng: Option<f64>,
    check_out_address: Option<String>,
    status: String,
    is_late: bool,
    working_hours: i64,
}

fn location(lat: Option<f64>, lng: Option<f64>, address: Option<String>) -> Option<GeoLocation> {
    match (lat, lng) {
        (Some(latitude), Some(longitude)) => Some(GeoLocation {
            latitude,
            longitude,
            address,
        }),
        _ => None,
    }
}

impl AttendanceRow {
    fn into_record(self) -> Result<AttendanceRecord, StoreError> {
        let status = AttendanceStatus::from_str(&self.status).map_err(|_| {
            StoreError::Backend(anyhow::anyhow!(
                "invalid status '{}' on attendance row {}",
                self.status,
                self.id
            ))
        })?;
        Ok(AttendanceRecord {
            id: self.id,
            user_id: self.user_id,
            organization_id: self.organization_id,
            date: self.date,
            check_in_time: self.check_in_time.map(|t| Utc.from_utc_datetime(&t)),
            check_out_time: self.check_out_time.map(|t| Utc.from_utc_datetime(&t)),
            check_in_location: location(self.check_in_lat, self.check_in_lng, self.check_in_address),
            check_out_location: location(
                self.check_out_lat,
                self.check_out_lng,
                self.check_out_address,
            ),
            status,
            is_late: self.is_late,
            working_hours: self.working_hours,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, user_id, organization_id, date, \
     check_in_time, check_out_time, \
     check_in_lat, check_in_lng, check_in_address, \
     check_out_lat, check_out_lng, check_out_address, \
     status, is_late, working_hours \
     FROM attendance";

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    async fn insert(&self, new: NewAttendance) -> Result<AttendanceRecord, StoreError> {
        let loc = new.check_in_location.clone();
        let result = sqlx::query(
            r#"
            INSERT INTO attendance
            (user_id, organization_id, date, check_in_time,
             check_in_lat, check_in_lng, check_in_address, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.user_id)
        .bind(new.organization_id)
        .bind(new.date)
        .bind(new.check_in_time.naive_utc())
        .bind(loc.as_ref().map(|l| l.latitude))
        .bind(loc.as_ref().map(|l| l.longitude))
        .bind(loc.as_ref().and_then(|l| l.address.clone()))
        .bind(new.status.to_string())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_id();
        self.find_by_id(id).await?.ok_or_else(|| {
            StoreError::Backend(anyhow::anyhow!("attendance row {} vanished after insert", id))
        })
    }

    async fn claim_check_in(
        &self,
        id: u64,
        at: DateTime<Utc>,
        location: Option<GeoLocation>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_in_time = ?, check_in_lat = ?, check_in_lng = ?, check_in_address = ?
            WHERE id = ? AND check_in_time IS NULL
            "#,
        )
        .bind(at.naive_utc())
        .bind(location.as_ref().map(|l| l.latitude))
        .bind(location.as_ref().map(|l| l.longitude))
        .bind(location.as_ref().and_then(|l| l.address.clone()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn claim_check_out(
        &self,
        id: u64,
        at: DateTime<Utc>,
        location: Option<GeoLocation>,
        working_minutes: i64,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out_time = ?, check_out_lat = ?, check_out_lng = ?,
                check_out_address = ?, working_hours = ?
            WHERE id = ? AND check_in_time IS NOT NULL AND check_out_time IS NULL
            "#,
        )
        .bind(at.naive_utc())
        .bind(location.as_ref().map(|l| l.latitude))
        .bind(location.as_ref().map(|l| l.longitude))
        .bind(location.as_ref().and_then(|l| l.address.clone()))
        .bind(working_minutes)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(AttendanceRow::into_record).transpose()
    }

    async fn find_by_user_and_day(
        &self,
        user_id: u64,
        day: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!("{} WHERE user_id = ? AND date = ?", SELECT_COLUMNS);
        let row = sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(user_id)
            .bind(day)
            .fetch_optional(&self.pool)
            .await?;
        row.map(AttendanceRow::into_record).transpose()
    }

    async fn list(
        &self,
        filter: &HistoryFilter,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<AttendanceRecord>, i64), StoreError> {
        let mut where_clause = String::from("WHERE user_id = ?");
        if filter.start_date.is_some() {
            where_clause.push_str(" AND date >= ?");
        }
        if filter.end_date.is_some() {
            where_clause.push_str(" AND date <= ?");
        }

        let count_sql = format!("SELECT COUNT(*) FROM attendance {}", where_clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(filter.user_id);
        if let Some(start) = filter.start_date {
            count_query = count_query.bind(start);
        }
        if let Some(end) = filter.end_date {
            count_query = count_query.bind(end);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let data_sql = format!(
            "{} {} ORDER BY date DESC, id DESC LIMIT ? OFFSET ?",
            SELECT_COLUMNS, where_clause
        );
        let mut data_query = sqlx::query_as::<_, AttendanceRow>(&data_sql).bind(filter.user_id);
        if let Some(start) = filter.start_date {
            data_query = data_query.bind(start);
        }
        if let Some(end) = filter.end_date {
            data_query = data_query.bind(end);
        }
        let rows = data_query
            .bind(limit as i64)
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        let records = rows
            .into_iter()
            .map(AttendanceRow::into_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((records, total))
    }

    async fn aggregate(&self, filter: &HistoryFilter) -> Result<AttendanceStats, StoreError> {
        let mut where_clause = String::from("WHERE user_id = ?");
        if filter.start_date.is_some() {
            where_clause.push_str(" AND date >= ?");
        }
        if filter.end_date.is_some() {
            where_clause.push_str(" AND date <= ?");
        }

        let sql = format!(
            r#"
            SELECT
                COUNT(*) AS total_days,
                CAST(COALESCE(SUM(working_hours), 0) AS SIGNED) AS total_working_hours,
                CAST(COALESCE(SUM(status = 'present'), 0) AS SIGNED) AS present_days,
                CAST(COALESCE(SUM(is_late), 0) AS SIGNED) AS late_days
            FROM attendance {}
            "#,
            where_clause
        );

        let mut query = sqlx::query_as::<_, (i64, i64, i64, i64)>(&sql).bind(filter.user_id);
        if let Some(start) = filter.start_date {
            query = query.bind(start);
        }
        if let Some(end) = filter.end_date {
            query = query.bind(end);
        }
        let (total_days, total_working_hours, present_days, late_days) =
            query.fetch_one(&self.pool).await?;

        Ok(AttendanceStats {
            total_days,
            total_working_hours,
            present_days,
            late_days,
        })
    }
}
