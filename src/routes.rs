use crate::{api::attendance, config::Config, ws};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            (60_000 / requests_per_min as u64).max(1)
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let protected_limiter = build_limiter(config.rate_protected_per_min);

    // Realtime channel; the handshake authenticates inside the handler
    // because the token may arrive as a query parameter.
    cfg.service(web::resource("/ws").route(web::get().to(ws::session::attendance_ws)));

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/attendance")
                    // /attendance (history)
                    .service(web::resource("").route(web::get().to(attendance::history)))
                    // /attendance/check-in
                    .service(
                        web::resource("/check-in").route(web::post().to(attendance::check_in)),
                    )
                    // /attendance/check-out (today's record)
                    .service(
                        web::resource("/check-out")
                            .route(web::post().to(attendance::check_out))
                            .route(web::put().to(attendance::check_out)),
                    )
                    // /attendance/check-out/{id}
                    .service(
                        web::resource("/check-out/{id}")
                            .route(web::post().to(attendance::check_out_by_id))
                            .route(web::put().to(attendance::check_out_by_id)),
                    )
                    // /attendance/today
                    .service(web::resource("/today").route(web::get().to(attendance::today)))
                    // /attendance/stats
                    .service(web::resource("/stats").route(web::get().to(attendance::stats))),
            ),
    );
}
