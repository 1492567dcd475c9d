use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use crate::auth::identity::Identity;
use crate::error::AttendanceError;
use crate::model::attendance::GeoLocation;
use crate::service::AttendanceService;
use crate::ws::gateway::RealtimeGateway;

/// Client-to-server events. The wire shape is a JSON envelope
/// `{"event": <name>, "data": <payload>}` in both directions.
#[derive(Debug, PartialEq)]
pub enum ClientEvent {
    CheckIn(CheckInData),
    CheckOut(CheckOutData),
    Ping,
}

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckInData {
    pub location: Option<GeoLocation>,
}

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckOutData {
    pub attendance_id: Option<u64>,
    pub location: Option<GeoLocation>,
}

/// Server-to-client frame, already shaped for the envelope.
#[derive(Debug)]
pub struct Outbound {
    pub event: &'static str,
    pub data: Value,
}

impl Outbound {
    pub fn new(event: &'static str, data: Value) -> Self {
        Self { event, data }
    }

    pub fn to_frame(&self) -> String {
        json!({ "event": self.event, "data": self.data }).to_string()
    }
}

pub fn parse_client_event(text: &str) -> Result<ClientEvent, AttendanceError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|_| AttendanceError::Validation("Malformed event frame".into()))?;
    let event = value
        .get("event")
        .and_then(Value::as_str)
        .ok_or_else(|| AttendanceError::Validation("Missing event name".into()))?;
    let data = value.get("data").cloned().unwrap_or(Value::Null);

    match event {
        "checkin" => Ok(ClientEvent::CheckIn(parse_data(data)?)),
        "checkout" => Ok(ClientEvent::CheckOut(parse_data(data)?)),
        "ping" => Ok(ClientEvent::Ping),
        other => Err(AttendanceError::Validation(format!(
            "Unknown event: {}",
            other
        ))),
    }
}

fn parse_data<T: Default + for<'de> Deserialize<'de>>(
    data: Value,
) -> Result<T, AttendanceError> {
    if data.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(data)
        .map_err(|_| AttendanceError::Validation("Malformed event payload".into()))
}

/// Runs one client event against the shared service and returns the reply
/// for the caller. Success outcomes additionally fan out to the caller's
/// organization group; errors stay scoped to the triggering event.
pub async fn dispatch(
    service: &AttendanceService,
    gateway: &RealtimeGateway,
    identity: &Identity,
    event: ClientEvent,
) -> Outbound {
    match event {
        ClientEvent::Ping => Outbound::new(
            "pong",
            json!({
                "message": "Server is alive!",
                "timestamp": Utc::now().to_rfc3339(),
                "userId": identity.user_id,
            }),
        ),
        ClientEvent::CheckIn(data) => {
            match service
                .check_in(identity.user_id, identity.organization_id, data.location)
                .await
            {
                Ok(populated) => {
                    if let Some(org) = identity.organization_id {
                        let announce = Outbound::new(
                            "attendance:new",
                            json!({
                                "recordId": populated.record.id,
                                "userId": populated.record.user_id,
                                "userName": populated
                                    .user
                                    .as_ref()
                                    .map(|u| u.name.clone())
                                    .unwrap_or_default(),
                                "checkInTime": populated.record.check_in_time,
                                "status": populated.record.status,
                            }),
                        );
                        gateway.broadcast(org, &announce.to_frame());
                    }
                    Outbound::new("checkin:success", json!({ "record": populated }))
                }
                Err(e) => Outbound::new("checkin:error", error_payload(e)),
            }
        }
        ClientEvent::CheckOut(data) => {
            match service
                .check_out(identity.user_id, data.attendance_id, data.location)
                .await
            {
                Ok(populated) => {
                    if let Some(org) = identity.organization_id {
                        let announce = Outbound::new(
                            "attendance:update",
                            json!({
                                "recordId": populated.record.id,
                                "userId": populated.record.user_id,
                                "checkOutTime": populated.record.check_out_time,
                                "workingHours": populated.record.working_hours,
                            }),
                        );
                        gateway.broadcast(org, &announce.to_frame());
                    }
                    Outbound::new("checkout:success", json!({ "record": populated }))
                }
                Err(e) => Outbound::new("checkout:error", error_payload(e)),
            }
        }
    }
}

fn error_payload(e: AttendanceError) -> Value {
    if let AttendanceError::Upstream(cause) = &e {
        error!(error = %cause, "realtime attendance operation failed");
    }
    json!({ "message": e.to_string() })
}
