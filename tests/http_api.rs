use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::web::Data;
use actix_web::{App, test};
use chrono::Utc;
use serde_json::{Value, json};

use rollcall::auth::identity::{Identity, IdentityProvider, JwtIdentityProvider, issue_token};
use rollcall::config::Config;
use rollcall::directory::MemoryUserDirectory;
use rollcall::model::attendance::{AttendanceRecord, AttendanceStatus};
use rollcall::model::user::UserSummary;
use rollcall::service::AttendanceService;
use rollcall::store::AttendanceStore;
use rollcall::store::memory::MemoryAttendanceStore;
use rollcall::ws::events::{CheckInData, ClientEvent, dispatch};
use rollcall::ws::gateway::RealtimeGateway;

const SECRET: &str = "test-secret";

struct TestCtx {
    service: AttendanceService,
    store: Arc<MemoryAttendanceStore>,
    gateway: Arc<RealtimeGateway>,
    provider: Arc<dyn IdentityProvider>,
    config: Config,
    token: String,
}

fn ctx() -> TestCtx {
    let store = Arc::new(MemoryAttendanceStore::new());
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

    TestCtx {
        service: AttendanceService::new(
            store.clone(),
            directory,
            chrono::FixedOffset::east_opt(0).unwrap(),
        ),
        store,
        gateway: Arc::new(RealtimeGateway::new()),
        provider: Arc::new(JwtIdentityProvider::new(SECRET)),
        config: Config {
            database_url: "mysql://unused".into(),
            jwt_secret: SECRET.into(),
            server_addr: "127.0.0.1:0".into(),
            tz_offset_hours: 0,
            rate_protected_per_min: 6_000,
            api_prefix: "/api/v1".into(),
        },
        token: issue_token(SECRET, 7, Some(1), true, 3600),
    }
}

macro_rules! test_app {
    ($ctx:expr) => {
        test::init_service(
            App::new()
                .app_data(Data::new($ctx.service.clone()))
                .app_data(Data::from($ctx.gateway.clone()))
                .app_data(Data::from($ctx.provider.clone()))
                .configure(|cfg| rollcall::routes::configure(cfg, $ctx.config.clone())),
        )
        .await
    };
}

fn peer() -> SocketAddr {
    "127.0.0.1:8080".parse().unwrap()
}

fn post(ctx: &TestCtx, uri: &str, body: Value) -> actix_http::Request {
    test::TestRequest::post()
        .uri(uri)
        .peer_addr(peer())
        .insert_header(("Authorization", format!("Bearer {}", ctx.token)))
        .set_json(body)
        .to_request()
}

fn get(ctx: &TestCtx, uri: &str) -> actix_http::Request {
    test::TestRequest::get()
        .uri(uri)
        .peer_addr(peer())
        .insert_header(("Authorization", format!("Bearer {}", ctx.token)))
        .to_request()
}

fn seed_record(store: &MemoryAttendanceStore, user_id: u64, date: &str, minutes: i64) {
    store
        .seed(AttendanceRecord {
            id: 0,
            user_id,
            organization_id: Some(1),
            date: date.parse().unwrap(),
            check_in_time: Some(format!("{}T09:00:00Z", date).parse().unwrap()),
            check_out_time: Some(format!("{}T17:00:00Z", date).parse().unwrap()),
            check_in_location: None,
            check_out_location: None,
            status: AttendanceStatus::Present,
            is_late: false,
            working_hours: minutes,
        })
        .unwrap();
}

#[actix_web::test]
async fn check_in_creates_the_day_record() {
    let ctx = ctx();
    let app = test_app!(ctx);

    let resp = test::call_service(&app, post(&ctx, "/api/v1/attendance/check-in", json!({}))).await;
    assert_eq!(resp.status(), 201);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Checked in successfully");
    assert_eq!(body["record"]["userId"], 7);
    assert_eq!(body["record"]["status"], "present");
    assert_eq!(body["record"]["workingHours"], 0);
    assert_eq!(body["record"]["user"]["name"], "John Doe");
    assert_eq!(body["record"]["user"]["email"], "john.doe@company.com");
}

#[actix_web::test]
async fn location_is_captured_verbatim() {
    let ctx = ctx();
    let app = test_app!(ctx);

    // out-of-range coordinates are stored as given; no validation in scope
    let body = json!({"location": {"latitude": 999.25, "longitude": -500.5, "address": "nowhere"}});
    let resp = test::call_service(&app, post(&ctx, "/api/v1/attendance/check-in", body)).await;
    assert_eq!(resp.status(), 201);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["record"]["checkInLocation"]["latitude"], 999.25);
    assert_eq!(body["record"]["checkInLocation"]["address"], "nowhere");
}

#[actix_web::test]
async fn second_check_in_conflicts_and_attaches_the_prior_record() {
    let ctx = ctx();
    let app = test_app!(ctx);

    let first: Value =
        test::call_and_read_body_json(&app, post(&ctx, "/api/v1/attendance/check-in", json!({})))
            .await;

    let resp = test::call_service(&app, post(&ctx, "/api/v1/attendance/check-in", json!({}))).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Already checked in today");
    assert_eq!(body["record"]["id"], first["record"]["id"]);
    assert_eq!(
        body["record"]["checkInTime"],
        first["record"]["checkInTime"],
        "prior record must be unchanged"
    );
}

#[actix_web::test]
async fn check_out_completes_the_day_exactly_once() {
    let ctx = ctx();
    let app = test_app!(ctx);

    test::call_service(&app, post(&ctx, "/api/v1/attendance/check-in", json!({}))).await;

    let resp = test::call_service(&app, post(&ctx, "/api/v1/attendance/check-out", json!({}))).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Checked out successfully");
    assert!(body["record"]["checkOutTime"].is_string());
    assert!(body["record"]["workingHours"].is_number());

    let resp = test::call_service(&app, post(&ctx, "/api/v1/attendance/check-out", json!({}))).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Already checked out today");
}

#[actix_web::test]
async fn check_out_without_check_in_is_a_state_error() {
    let ctx = ctx();
    let app = test_app!(ctx);

    let resp = test::call_service(&app, post(&ctx, "/api/v1/attendance/check-out", json!({}))).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Must check in before checking out");
}

#[actix_web::test]
async fn check_out_by_unknown_id_is_not_found() {
    let ctx = ctx();
    let app = test_app!(ctx);

    let resp =
        test::call_service(&app, post(&ctx, "/api/v1/attendance/check-out/999", json!({}))).await;
    assert_eq!(resp.status(), 404);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Attendance record not found");
}

#[actix_web::test]
async fn check_out_by_explicit_id_works() {
    let ctx = ctx();
    let app = test_app!(ctx);

    let created: Value =
        test::call_and_read_body_json(&app, post(&ctx, "/api/v1/attendance/check-in", json!({})))
            .await;
    let id = created["record"]["id"].as_u64().unwrap();

    let uri = format!("/api/v1/attendance/check-out/{}", id);
    let resp = test::call_service(&app, post(&ctx, &uri, json!({}))).await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn today_is_an_explicit_null_not_an_error() {
    let ctx = ctx();
    let app = test_app!(ctx);

    let body: Value =
        test::call_and_read_body_json(&app, get(&ctx, "/api/v1/attendance/today")).await;
    assert!(body["record"].is_null());
    assert_eq!(body["message"], "No attendance record for today");
}

#[actix_web::test]
async fn today_returns_the_record_after_check_in() {
    let ctx = ctx();
    let app = test_app!(ctx);

    let created: Value =
        test::call_and_read_body_json(&app, post(&ctx, "/api/v1/attendance/check-in", json!({})))
            .await;

    let body: Value =
        test::call_and_read_body_json(&app, get(&ctx, "/api/v1/attendance/today")).await;
    assert_eq!(body["record"]["id"], created["record"]["id"]);
}

#[actix_web::test]
async fn history_paginates_and_sorts_by_date_descending() {
    let ctx = ctx();
    for day in 1..=25 {
        seed_record(&ctx.store, 7, &format!("2026-07-{:02}", day), 480);
    }
    let app = test_app!(ctx);

    let body: Value = test::call_and_read_body_json(
        &app,
        get(&ctx, "/api/v1/attendance?limit=10&page=2"),
    )
    .await;

    assert_eq!(body["pagination"]["total"], 25);
    assert_eq!(body["pagination"]["page"], 2);
    assert_eq!(body["pagination"]["limit"], 10);
    assert_eq!(body["pagination"]["pages"], 3);

    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 10);
    // page 2 of the descending sort holds days 15 down to 6
    assert_eq!(records[0]["date"], "2026-07-15");
    assert_eq!(records[9]["date"], "2026-07-06");
}

#[actix_web::test]
async fn history_respects_date_filters() {
    let ctx = ctx();
    for day in 1..=10 {
        seed_record(&ctx.store, 7, &format!("2026-07-{:02}", day), 480);
    }
    let app = test_app!(ctx);

    let body: Value = test::call_and_read_body_json(
        &app,
        get(&ctx, "/api/v1/attendance?startDate=2026-07-03&endDate=2026-07-06"),
    )
    .await;
    assert_eq!(body["pagination"]["total"], 4);
}

#[actix_web::test]
async fn stats_over_an_empty_range_are_all_zero() {
    let ctx = ctx();
    let app = test_app!(ctx);

    let body: Value =
        test::call_and_read_body_json(&app, get(&ctx, "/api/v1/attendance/stats")).await;
    assert_eq!(
        body["stats"],
        json!({"totalDays": 0, "totalWorkingHours": 0, "presentDays": 0, "lateDays": 0})
    );
}

#[actix_web::test]
async fn stats_aggregate_the_filtered_set() {
    let ctx = ctx();
    seed_record(&ctx.store, 7, "2026-07-01", 480);
    seed_record(&ctx.store, 7, "2026-07-02", 510);
    seed_record(&ctx.store, 8, "2026-07-01", 300); // other user, excluded
    let app = test_app!(ctx);

    let body: Value =
        test::call_and_read_body_json(&app, get(&ctx, "/api/v1/attendance/stats")).await;
    assert_eq!(body["stats"]["totalDays"], 2);
    assert_eq!(body["stats"]["totalWorkingHours"], 990);
    assert_eq!(body["stats"]["presentDays"], 2);
    assert_eq!(body["stats"]["lateDays"], 0);
}

#[actix_web::test]
async fn requests_without_a_token_are_rejected() {
    let ctx = ctx();
    let app = test_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/api/v1/attendance/today")
        .peer_addr(peer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn inactive_accounts_are_rejected() {
    let mut ctx = ctx();
    ctx.token = issue_token(SECRET, 7, Some(1), false, 3600);
    let app = test_app!(ctx);

    let resp = test::call_service(&app, get(&ctx, "/api/v1/attendance/today")).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn check_in_accepts_a_user_override() {
    let ctx = ctx();
    let app = test_app!(ctx);

    let resp = test::call_service(
        &app,
        post(&ctx, "/api/v1/attendance/check-in", json!({"userId": 8})),
    )
    .await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["record"]["userId"], 8);
    assert_eq!(body["record"]["user"]["name"], "Jane Roe");
}

#[actix_web::test]
async fn realtime_and_http_paths_share_stored_state() {
    let ctx = ctx();
    let app = test_app!(ctx);

    // check in over the realtime path
    let identity = Identity {
        user_id: 7,
        organization_id: Some(1),
        is_active: true,
    };
    let reply = dispatch(
        &ctx.service,
        &ctx.gateway,
        &identity,
        ClientEvent::CheckIn(CheckInData::default()),
    )
    .await;
    assert_eq!(reply.event, "checkin:success");
    let record_id = reply.data["record"]["id"].as_u64().unwrap();

    // the HTTP surface sees the very same record for today
    let body: Value =
        test::call_and_read_body_json(&app, get(&ctx, "/api/v1/attendance/today")).await;
    assert_eq!(body["record"]["id"], record_id);

    // and an HTTP check-in now conflicts with it
    let resp = test::call_service(&app, post(&ctx, "/api/v1/attendance/check-in", json!({}))).await;
    assert_eq!(resp.status(), 400);

    // sanity: the stored day is today's window
    let today = Utc::now().date_naive();
    let stored = ctx.store.find_by_id(record_id).await.unwrap().unwrap();
    assert_eq!(stored.date, today);
}
