use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::error::AttendanceError;
use crate::model::attendance::GeoLocation;
use crate::service::AttendanceService;
use crate::store::HistoryFilter;

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    /// Overrides the acting user; defaults to the authenticated caller.
    #[schema(example = 7, nullable = true)]
    pub user_id: Option<u64>,
    pub location: Option<GeoLocation>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    pub user_id: Option<u64>,
    #[param(example = "2026-08-01", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[param(example = "2026-08-31", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TodayQuery {
    pub user_id: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StatsQuery {
    pub user_id: Option<u64>,
    #[param(example = "2026-08-01", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[param(example = "2026-08-31", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    request_body = CheckRequest,
    responses(
        (status = 201, description = "Checked in successfully", body = Object, example = json!({
            "message": "Checked in successfully"
        })),
        (status = 400, description = "Already checked in today; the conflicting record is attached", body = Object, example = json!({
            "error": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    payload: Option<web::Json<CheckRequest>>,
) -> Result<HttpResponse, AttendanceError> {
    let body = payload.map(web::Json::into_inner).unwrap_or_default();
    let user_id = body.user_id.unwrap_or(auth.user_id);

    let record = service
        .check_in(user_id, auth.organization_id, body.location)
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Checked in successfully",
        "record": record
    })))
}

/// Check-out endpoint (today's record)
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-out",
    request_body = CheckRequest,
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "message": "Checked out successfully"
        })),
        (status = 400, description = "Not checked in, or already checked out"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    payload: Option<web::Json<CheckRequest>>,
) -> Result<HttpResponse, AttendanceError> {
    let body = payload.map(web::Json::into_inner).unwrap_or_default();
    let user_id = body.user_id.unwrap_or(auth.user_id);

    let record = service.check_out(user_id, None, body.location).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked out successfully",
        "record": record
    })))
}

/// Check-out endpoint (explicit record id)
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-out/{id}",
    params(
        ("id", Path, description = "Attendance record id")
    ),
    request_body = CheckRequest,
    responses(
        (status = 200, description = "Checked out successfully"),
        (status = 400, description = "Not checked in, or already checked out"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Attendance record not found"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out_by_id(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    path: web::Path<u64>,
    payload: Option<web::Json<CheckRequest>>,
) -> Result<HttpResponse, AttendanceError> {
    let record_id = path.into_inner();
    let body = payload.map(web::Json::into_inner).unwrap_or_default();
    let user_id = body.user_id.unwrap_or(auth.user_id);

    let record = service
        .check_out(user_id, Some(record_id), body.location)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Checked out successfully",
        "record": record
    })))
}

/// Attendance history, paginated and sorted by date descending
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Paginated attendance history", body = crate::service::HistoryPage),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AttendanceError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(50).clamp(1, 100);
    let filter = HistoryFilter {
        user_id: query.user_id.unwrap_or(auth.user_id),
        start_date: query.start_date,
        end_date: query.end_date,
    };

    let history = service.history(filter, page, limit).await?;
    Ok(HttpResponse::Ok().json(history))
}

/// Today's attendance record, if any
#[utoipa::path(
    get,
    path = "/api/v1/attendance/today",
    params(TodayQuery),
    responses(
        (status = 200, description = "Today's record, or an explicit null when none exists", body = Object, example = json!({
            "record": null,
            "message": "No attendance record for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    query: web::Query<TodayQuery>,
) -> Result<HttpResponse, AttendanceError> {
    let user_id = query.user_id.unwrap_or(auth.user_id);

    match service.today(user_id).await? {
        Some(record) => Ok(HttpResponse::Ok().json(json!({ "record": record }))),
        None => Ok(HttpResponse::Ok().json(json!({
            "record": null,
            "message": "No attendance record for today"
        }))),
    }
}

/// Aggregate attendance statistics over the filtered range
#[utoipa::path(
    get,
    path = "/api/v1/attendance/stats",
    params(StatsQuery),
    responses(
        (status = 200, description = "Aggregate stats; all zero when nothing matches", body = Object, example = json!({
            "stats": { "totalDays": 0, "totalWorkingHours": 0, "presentDays": 0, "lateDays": 0 }
        })),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn stats(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    query: web::Query<StatsQuery>,
) -> Result<HttpResponse, AttendanceError> {
    let filter = HistoryFilter {
        user_id: query.user_id.unwrap_or(auth.user_id),
        start_date: query.start_date,
        end_date: query.end_date,
    };

    let stats = service.stats(filter).await?;
    Ok(HttpResponse::Ok().json(json!({ "stats": stats })))
}
