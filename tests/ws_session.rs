use std::sync::Arc;

use actix_http::ws::{Frame, Message};
use actix_web::web::Data;
use actix_web::App;
use chrono::FixedOffset;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;

use rollcall::auth::identity::{IdentityProvider, JwtIdentityProvider, issue_token};
use rollcall::config::Config;
use rollcall::directory::MemoryUserDirectory;
use rollcall::model::user::UserSummary;
use rollcall::service::AttendanceService;
use rollcall::store::memory::MemoryAttendanceStore;
use rollcall::ws::gateway::RealtimeGateway;

const SECRET: &str = "test-secret";

fn server() -> actix_test::TestServer {
    let directory = Arc::new(MemoryUserDirectory::new());
    directory.add(UserSummary {
        id: 7,
        name: "John Doe".into(),
        email: "john.doe@company.com".into(),
    });
    directory.add(UserSummary {
        id: 8,
        name: "Jane Roe".into(),
        email: "jane.roe@company.com".into(),
    });

    let service = AttendanceService::new(
        Arc::new(MemoryAttendanceStore::new()),
        directory,
        FixedOffset::east_opt(0).unwrap(),
    );
    let gateway = Arc::new(RealtimeGateway::new());
    let provider: Arc<dyn IdentityProvider> = Arc::new(JwtIdentityProvider::new(SECRET));
    let config = Config {
        database_url: "mysql://unused".into(),
        jwt_secret: SECRET.into(),
        server_addr: "127.0.0.1:0".into(),
        tz_offset_hours: 0,
        rate_protected_per_min: 6_000,
        api_prefix: "/api/v1".into(),
    };

    actix_test::start(move || {
        App::new()
            .app_data(Data::new(service.clone()))
            .app_data(Data::from(gateway.clone()))
            .app_data(Data::from(provider.clone()))
            .configure(|cfg| rollcall::routes::configure(cfg, config.clone()))
    })
}

fn text(frame: &str) -> Message {
    Message::Text(frame.to_string().into())
}

macro_rules! recv_json {
    ($conn:expr) => {{
        match $conn.next().await {
            Some(Ok(Frame::Text(bytes))) => serde_json::from_slice::<Value>(&bytes).unwrap(),
            other => panic!("expected a text frame, got {:?}", other),
        }
    }};
}

#[actix_web::test]
async fn ping_answers_without_an_organization() {
    let mut srv = server();
    let token = issue_token(SECRET, 7, None, true, 3600);
    let mut conn = srv.ws_at(&format!("/ws?token={}", token)).await.unwrap();

    // a tenant-less identity keeps its session; the group join is a no-op
    conn.send(text(r#"{"event":"ping"}"#)).await.unwrap();
    let frame = recv_json!(conn);
    assert_eq!(frame["event"], "pong");
    assert_eq!(frame["data"]["userId"], 7);
    assert_eq!(frame["data"]["message"], "Server is alive!");
}

#[actix_web::test]
async fn check_in_succeeds_without_an_organization() {
    let mut srv = server();
    let token = issue_token(SECRET, 7, None, true, 3600);
    let mut conn = srv.ws_at(&format!("/ws?token={}", token)).await.unwrap();

    conn.send(text(r#"{"event":"checkin"}"#)).await.unwrap();
    let frame = recv_json!(conn);
    assert_eq!(frame["event"], "checkin:success");
    assert_eq!(frame["data"]["record"]["userId"], 7);
}

#[actix_web::test]
async fn check_ins_fan_out_to_organization_members() {
    let mut srv = server();
    let observer_token = issue_token(SECRET, 8, Some(1), true, 3600);
    let actor_token = issue_token(SECRET, 7, Some(1), true, 3600);

    let mut observer = srv
        .ws_at(&format!("/ws?token={}", observer_token))
        .await
        .unwrap();
    // pong round-trip proves the observer's group membership is in place
    observer.send(text(r#"{"event":"ping"}"#)).await.unwrap();
    assert_eq!(recv_json!(observer)["event"], "pong");

    let mut actor = srv
        .ws_at(&format!("/ws?token={}", actor_token))
        .await
        .unwrap();
    actor.send(text(r#"{"event":"checkin"}"#)).await.unwrap();
    assert_eq!(recv_json!(actor)["event"], "checkin:success");

    let announce = recv_json!(observer);
    assert_eq!(announce["event"], "attendance:new");
    assert_eq!(announce["data"]["userId"], 7);
    assert_eq!(announce["data"]["userName"], "John Doe");
}

#[actix_web::test]
async fn malformed_frames_answer_an_error_without_closing() {
    let mut srv = server();
    let token = issue_token(SECRET, 7, None, true, 3600);
    let mut conn = srv.ws_at(&format!("/ws?token={}", token)).await.unwrap();

    conn.send(text("not json")).await.unwrap();
    assert_eq!(recv_json!(conn)["event"], "error");

    // the session is still serving events
    conn.send(text(r#"{"event":"ping"}"#)).await.unwrap();
    assert_eq!(recv_json!(conn)["event"], "pong");
}

#[actix_web::test]
async fn connections_without_a_valid_token_are_rejected() {
    let mut srv = server();
    assert!(srv.ws_at("/ws").await.is_err());
    assert!(srv.ws_at("/ws?token=garbage").await.is_err());
}
