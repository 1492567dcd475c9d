use crate::api::attendance::CheckRequest;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, GeoLocation, PopulatedAttendance};
use crate::model::user::UserSummary;
use crate::service::{HistoryPage, Pagination};
use crate::store::AttendanceStats;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Service API",
        version = "1.0.0",
        description = r#"
## Attendance Tracking Service

This API powers the attendance backend: authenticated users check in and out
of their working day, optionally with a geolocation snapshot, and review
their history and aggregate statistics.

### 🔹 Key Features
- **Check-in / Check-out**
  - One attendance record per user per calendar day
  - Working minutes derived on check-out
- **History**
  - Paginated, date-filtered, sorted by day descending
- **Statistics**
  - Total days, working minutes, present and late day counts
- **Realtime**
  - `GET /ws` upgrades to a live channel; check-ins and check-outs fan out
    to everyone in the caller's organization

### 🔐 Security
All endpoints require a **JWT Bearer** identity token issued by the external
identity provider. Registration, login, and user management live there, not
here.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::check_out_by_id,
        crate::api::attendance::history,
        crate::api::attendance::today,
        crate::api::attendance::stats,
    ),
    components(
        schemas(
            AttendanceRecord,
            AttendanceStatus,
            GeoLocation,
            PopulatedAttendance,
            UserSummary,
            CheckRequest,
            HistoryPage,
            Pagination,
            AttendanceStats,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Attendance management APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
