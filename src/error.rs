use actix_web::{HttpResponse, http::StatusCode};
use derive_more::Display;
use serde_json::json;
use tracing::error;

use crate::model::attendance::AttendanceRecord;

/// Error taxonomy shared by both delivery surfaces. State conflicts are
/// recoverable and carry a human-readable message; `Upstream` is logged in
/// full server-side and surfaced as a generic body.
#[derive(Debug, Display)]
pub enum AttendanceError {
    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "Attendance record not found")]
    NotFound,

    #[display(fmt = "Already checked in today")]
    AlreadyCheckedIn(Box<AttendanceRecord>),

    #[display(fmt = "Must check in before checking out")]
    NotCheckedIn,

    #[display(fmt = "Already checked out today")]
    AlreadyCheckedOut,

    #[display(fmt = "{}", _0)]
    Auth(String),

    #[display(fmt = "Internal Server Error")]
    Upstream(anyhow::Error),
}

impl actix_web::ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::Validation(_)
            | AttendanceError::AlreadyCheckedIn(_)
            | AttendanceError::NotCheckedIn
            | AttendanceError::AlreadyCheckedOut => StatusCode::BAD_REQUEST,
            AttendanceError::NotFound => StatusCode::NOT_FOUND,
            AttendanceError::Auth(_) => StatusCode::UNAUTHORIZED,
            AttendanceError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            // Conflicting record attached so clients can reconcile.
            AttendanceError::AlreadyCheckedIn(record) => HttpResponse::BadRequest().json(json!({
                "error": self.to_string(),
                "record": record,
            })),
            AttendanceError::Upstream(cause) => {
                error!(error = %cause, "attendance operation failed");
                HttpResponse::InternalServerError().json(json!({
                    "message": "Internal Server Error"
                }))
            }
            other => HttpResponse::build(other.status_code()).json(json!({
                "error": other.to_string()
            })),
        }
    }
}

/// Storage-layer failures. `Duplicate` is the (user, date) uniqueness
/// constraint firing; everything else is opaque backend trouble.
#[derive(Debug, Display)]
pub enum StoreError {
    #[display(fmt = "duplicate attendance row for user and day")]
    Duplicate,
    #[display(fmt = "{}", _0)]
    Backend(anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            // MySQL integrity-constraint violation (duplicate key)
            if db_err.code().as_deref() == Some("23000") {
                return StoreError::Duplicate;
            }
        }
        StoreError::Backend(e.into())
    }
}

impl From<StoreError> for AttendanceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => {
                AttendanceError::Upstream(anyhow::anyhow!("unhandled duplicate attendance row"))
            }
            StoreError::Backend(cause) => AttendanceError::Upstream(cause),
        }
    }
}
