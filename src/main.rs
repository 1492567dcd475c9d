use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;

use rollcall::auth::identity::{IdentityProvider, JwtIdentityProvider};
use rollcall::config::Config;
use rollcall::db::init_db;
use rollcall::directory::MySqlUserDirectory;
use rollcall::docs::ApiDoc;
use rollcall::routes;
use rollcall::service::AttendanceService;
use rollcall::store::mysql::MySqlAttendanceStore;
use rollcall::utils::summary_cache::CachedUserDirectory;
use rollcall::ws::gateway::RealtimeGateway;

use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Attendance service is running"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await;

    let directory = Arc::new(CachedUserDirectory::new(Arc::new(MySqlUserDirectory::new(
        pool.clone(),
    ))));
    let service = AttendanceService::new(
        Arc::new(MySqlAttendanceStore::new(pool.clone())),
        directory.clone(),
        config.tz_offset(),
    );
    let gateway = Arc::new(RealtimeGateway::new());
    let provider: Arc<dyn IdentityProvider> =
        Arc::new(JwtIdentityProvider::new(config.jwt_secret.clone()));

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    // Warm up summaries of recently active users
    let warmup_pool = pool.clone();
    let warmup_directory = directory.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = warmup_directory.warmup(&warmup_pool, 30, 250).await {
            eprintln!("Failed to warmup user summary cache: {:?}", e);
        }
    });

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(service.clone()))
            .app_data(Data::from(gateway.clone()))
            .app_data(Data::from(provider.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
