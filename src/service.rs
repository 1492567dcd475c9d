use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::directory::UserDirectory;
use crate::error::{AttendanceError, StoreError};
use crate::machine::{self, CheckInPlan};
use crate::model::attendance::{AttendanceStatus, GeoLocation, PopulatedAttendance};
use crate::store::{AttendanceStats, AttendanceStore, HistoryFilter, NewAttendance};

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[schema(example = 25)]
    pub total: i64,
    #[schema(example = 2)]
    pub page: u32,
    #[schema(example = 10)]
    pub limit: u32,
    #[schema(example = 3)]
    pub pages: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryPage {
    pub records: Vec<PopulatedAttendance>,
    pub pagination: Pagination,
}

/// Shared orchestration over the state machine. Both the HTTP handlers and
/// the realtime gateway call through here, so the two surfaces cannot drift
/// on day-window or transition semantics.
#[derive(Clone)]
pub struct AttendanceService {
    store: Arc<dyn AttendanceStore>,
    directory: Arc<dyn UserDirectory>,
    tz_offset: FixedOffset,
}

impl AttendanceService {
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        directory: Arc<dyn UserDirectory>,
        tz_offset: FixedOffset,
    ) -> Self {
        Self {
            store,
            directory,
            tz_offset,
        }
    }

    pub async fn check_in(
        &self,
        user_id: u64,
        organization_id: Option<u64>,
        location: Option<GeoLocation>,
    ) -> Result<PopulatedAttendance, AttendanceError> {
        self.check_in_at(user_id, organization_id, location, Utc::now())
            .await
    }

    pub async fn check_in_at(
        &self,
        user_id: u64,
        organization_id: Option<u64>,
        location: Option<GeoLocation>,
        now: DateTime<Utc>,
    ) -> Result<PopulatedAttendance, AttendanceError> {
        let day = machine::local_day(now, self.tz_offset);
        let existing = self.store.find_by_user_and_day(user_id, day).await?;

        let record = match machine::plan_check_in(existing.as_ref())? {
            CheckInPlan::Create => {
                let new = NewAttendance {
                    user_id,
                    organization_id,
                    date: day,
                    check_in_time: now,
                    check_in_location: location.clone(),
                    status: AttendanceStatus::Present,
                };
                match self.store.insert(new).await {
                    Ok(record) => record,
                    // Lost the first-check-in race; the row that beat us is
                    // the conflict to report (or to claim, if still empty).
                    Err(StoreError::Duplicate) => {
                        self.claim_day_row(user_id, day, now, location).await?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            CheckInPlan::ClaimExisting(id) => {
                if self.store.claim_check_in(id, now, location).await? {
                    self.reload(id).await?
                } else {
                    let current = self.reload(id).await?;
                    return Err(AttendanceError::AlreadyCheckedIn(Box::new(current)));
                }
            }
        };

        Ok(self.populate(record).await?)
    }

    pub async fn check_out(
        &self,
        user_id: u64,
        record_id: Option<u64>,
        location: Option<GeoLocation>,
    ) -> Result<PopulatedAttendance, AttendanceError> {
        self.check_out_at(user_id, record_id, location, Utc::now())
            .await
    }

    pub async fn check_out_at(
        &self,
        user_id: u64,
        record_id: Option<u64>,
        location: Option<GeoLocation>,
        now: DateTime<Utc>,
    ) -> Result<PopulatedAttendance, AttendanceError> {
        let record = match record_id {
            Some(id) => self
                .store
                .find_by_id(id)
                .await?
                .ok_or(AttendanceError::NotFound)?,
            None => {
                let day = machine::local_day(now, self.tz_offset);
                self.store
                    .find_by_user_and_day(user_id, day)
                    .await?
                    .ok_or(AttendanceError::NotCheckedIn)?
            }
        };

        let check_in = machine::validate_check_out(&record)?;
        let minutes = machine::working_minutes(check_in, now);

        if !self
            .store
            .claim_check_out(record.id, now, location, minutes)
            .await?
        {
            // Another writer finished the day between our read and the claim.
            return Err(AttendanceError::AlreadyCheckedOut);
        }

        let record = self.reload(record.id).await?;
        Ok(self.populate(record).await?)
    }

    pub async fn today(
        &self,
        user_id: u64,
    ) -> Result<Option<PopulatedAttendance>, AttendanceError> {
        self.today_at(user_id, Utc::now()).await
    }

    pub async fn today_at(
        &self,
        user_id: u64,
        now: DateTime<Utc>,
    ) -> Result<Option<PopulatedAttendance>, AttendanceError> {
        let day = machine::local_day(now, self.tz_offset);
        match self.store.find_by_user_and_day(user_id, day).await? {
            Some(record) => Ok(Some(self.populate(record).await?)),
            None => Ok(None),
        }
    }

    pub async fn history(
        &self,
        filter: HistoryFilter,
        page: u32,
        limit: u32,
    ) -> Result<HistoryPage, AttendanceError> {
        let page = page.max(1);
        // Widened so page * limit cannot overflow on hostile query input.
        let offset = (page as u64 - 1) * limit as u64;
        let (records, total) = self.store.list(&filter, limit, offset).await?;

        let mut populated = Vec::with_capacity(records.len());
        for record in records {
            populated.push(self.populate(record).await?);
        }

        let pages = (total + limit as i64 - 1) / limit as i64;
        Ok(HistoryPage {
            records: populated,
            pagination: Pagination {
                total,
                page,
                limit,
                pages,
            },
        })
    }

    pub async fn stats(&self, filter: HistoryFilter) -> Result<AttendanceStats, AttendanceError> {
        Ok(self.store.aggregate(&filter).await?)
    }

    async fn claim_day_row(
        &self,
        user_id: u64,
        day: chrono::NaiveDate,
        now: DateTime<Utc>,
        location: Option<GeoLocation>,
    ) -> Result<crate::model::attendance::AttendanceRecord, AttendanceError> {
        let current = self
            .store
            .find_by_user_and_day(user_id, day)
            .await?
            .ok_or_else(|| {
                AttendanceError::Upstream(anyhow::anyhow!(
                    "duplicate reported but no row found for user {} on {}",
                    user_id,
                    day
                ))
            })?;
        match machine::plan_check_in(Some(&current))? {
            CheckInPlan::ClaimExisting(id) => {
                if self.store.claim_check_in(id, now, location).await? {
                    self.reload(id).await
                } else {
                    let current = self.reload(id).await?;
                    Err(AttendanceError::AlreadyCheckedIn(Box::new(current)))
                }
            }
            CheckInPlan::Create => Err(AttendanceError::Upstream(anyhow::anyhow!(
                "inconsistent store state for user {} on {}",
                user_id,
                day
            ))),
        }
    }

    async fn reload(
        &self,
        id: u64,
    ) -> Result<crate::model::attendance::AttendanceRecord, AttendanceError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AttendanceError::Upstream(anyhow::anyhow!("attendance row {} vanished", id)))
    }

    async fn populate(
        &self,
        record: crate::model::attendance::AttendanceRecord,
    ) -> Result<PopulatedAttendance, AttendanceError> {
        let user = self.directory.summarize(record.user_id).await?;
        Ok(PopulatedAttendance { record, user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryUserDirectory;
    use crate::model::user::UserSummary;
    use crate::store::memory::MemoryAttendanceStore;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn service() -> AttendanceService {
        let directory = MemoryUserDirectory::new();
        directory.add(UserSummary {
            id: 7,
            name: "John Doe".into(),
            email: "john.doe@company.com".into(),
        });
        AttendanceService::new(
            Arc::new(MemoryAttendanceStore::new()),
            Arc::new(directory),
            FixedOffset::east_opt(0).unwrap(),
        )
    }

    #[tokio::test]
    async fn check_in_creates_and_populates_the_day_row() {
        let svc = service();
        let populated = svc
            .check_in_at(7, Some(1), None, utc("2026-08-27T09:00:00Z"))
            .await
            .unwrap();
        assert_eq!(populated.record.user_id, 7);
        assert_eq!(populated.record.organization_id, Some(1));
        assert_eq!(populated.record.status, AttendanceStatus::Present);
        assert_eq!(populated.record.working_hours, 0);
        assert_eq!(populated.user.as_ref().map(|u| u.name.as_str()), Some("John Doe"));
    }

    #[tokio::test]
    async fn second_check_in_fails_and_returns_prior_record_unchanged() {
        let svc = service();
        let first = svc
            .check_in_at(7, None, None, utc("2026-08-27T09:00:00Z"))
            .await
            .unwrap();
        let err = svc
            .check_in_at(7, None, None, utc("2026-08-27T10:00:00Z"))
            .await
            .unwrap_err();
        match err {
            AttendanceError::AlreadyCheckedIn(prior) => {
                assert_eq!(prior.id, first.record.id);
                assert_eq!(prior.check_in_time, first.record.check_in_time);
            }
            other => panic!("expected AlreadyCheckedIn, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn next_day_is_a_fresh_state_machine() {
        let svc = service();
        svc.check_in_at(7, None, None, utc("2026-08-27T09:00:00Z"))
            .await
            .unwrap();
        let next = svc
            .check_in_at(7, None, None, utc("2026-08-28T09:00:00Z"))
            .await
            .unwrap();
        assert_eq!(next.record.date, "2026-08-28".parse::<chrono::NaiveDate>().unwrap());
    }

    #[tokio::test]
    async fn check_out_computes_working_minutes() {
        let svc = service();
        let rec = svc
            .check_in_at(7, None, None, utc("2026-08-27T09:00:00Z"))
            .await
            .unwrap();
        let done = svc
            .check_out_at(7, None, None, utc("2026-08-27T17:30:00Z"))
            .await
            .unwrap();
        assert_eq!(done.record.id, rec.record.id);
        assert_eq!(done.record.working_hours, 510);
        assert!(done.record.check_out_time.is_some());
    }

    #[tokio::test]
    async fn check_out_before_check_in_fails() {
        let svc = service();
        let err = svc
            .check_out_at(7, None, None, utc("2026-08-27T17:30:00Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::NotCheckedIn));
    }

    #[tokio::test]
    async fn check_out_twice_fails() {
        let svc = service();
        svc.check_in_at(7, None, None, utc("2026-08-27T09:00:00Z"))
            .await
            .unwrap();
        svc.check_out_at(7, None, None, utc("2026-08-27T17:00:00Z"))
            .await
            .unwrap();
        let err = svc
            .check_out_at(7, None, None, utc("2026-08-27T18:00:00Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::AlreadyCheckedOut));
    }

    #[tokio::test]
    async fn check_out_by_unknown_id_is_not_found() {
        let svc = service();
        let err = svc
            .check_out_at(7, Some(999), None, utc("2026-08-27T17:30:00Z"))
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::NotFound));
    }

    #[tokio::test]
    async fn today_is_none_without_a_record() {
        let svc = service();
        let today = svc.today_at(7, utc("2026-08-27T09:00:00Z")).await.unwrap();
        assert!(today.is_none());
    }

    #[tokio::test]
    async fn today_returns_the_checked_in_record() {
        let svc = service();
        let rec = svc
            .check_in_at(7, None, None, utc("2026-08-27T09:00:00Z"))
            .await
            .unwrap();
        let today = svc
            .today_at(7, utc("2026-08-27T15:00:00Z"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(today.record.id, rec.record.id);
    }

    #[tokio::test]
    async fn history_survives_extreme_page_numbers() {
        let svc = service();
        svc.check_in_at(7, None, None, utc("2026-08-27T09:00:00Z"))
            .await
            .unwrap();
        let page = svc
            .history(
                HistoryFilter {
                    user_id: 7,
                    start_date: None,
                    end_date: None,
                },
                u32::MAX,
                100,
            )
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 1);
        assert!(page.records.is_empty());
    }

    #[tokio::test]
    async fn history_pagination_shape() {
        let svc = service();
        for day in 1..=25 {
            svc.check_in_at(7, None, None, utc(&format!("2026-08-{:02}T09:00:00Z", day)))
                .await
                .unwrap();
        }
        let page = svc
            .history(
                HistoryFilter {
                    user_id: 7,
                    start_date: None,
                    end_date: None,
                },
                2,
                10,
            )
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 25);
        assert_eq!(page.pagination.pages, 3);
        assert_eq!(page.records.len(), 10);
        assert_eq!(
            page.records[0].record.date,
            "2026-08-15".parse::<chrono::NaiveDate>().unwrap()
        );
    }
}
