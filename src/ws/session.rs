use actix_web::{HttpRequest, HttpResponse, error::ErrorUnauthorized, web};
use actix_ws::Message;
use futures_util::StreamExt;
use tokio::sync::mpsc::unbounded_channel;
use tracing::{debug, info};

use crate::auth::identity::IdentityProvider;
use crate::service::AttendanceService;
use crate::ws::events::{Outbound, dispatch, parse_client_event};
use crate::ws::gateway::RealtimeGateway;

/// Realtime handshake: the token comes from the `Authorization` header or a
/// `token` query parameter and must verify before the upgrade; rejected
/// connections never process an event.
pub async fn attendance_ws(
    req: HttpRequest,
    body: web::Payload,
    service: web::Data<AttendanceService>,
    gateway: web::Data<RealtimeGateway>,
    provider: web::Data<dyn IdentityProvider>,
) -> actix_web::Result<HttpResponse> {
    let token = bearer_token(&req)
        .ok_or_else(|| ErrorUnauthorized("Authentication error: No token provided"))?;
    let identity = provider
        .verify(&token)
        .map_err(|e| ErrorUnauthorized(format!("Authentication error: {}", e)))?;

    let (response, mut session, mut stream) = actix_ws::handle(&req, body)?;

    let gateway = gateway.into_inner();
    let service = service.into_inner();

    actix_web::rt::spawn(async move {
        info!(user_id = identity.user_id, "realtime client connected");

        // Auto-join the organization broadcast group; no-op without a tenant.
        // The sender stays alive for the whole session so the forward arm
        // idles instead of ending the loop when there is no membership.
        let (tx, mut rx) = unbounded_channel::<String>();
        let _membership = identity
            .organization_id
            .map(|org| gateway.clone().join(org, tx.clone()));

        loop {
            tokio::select! {
                msg = stream.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match parse_client_event(&text) {
                            Ok(event) => dispatch(&service, &gateway, &identity, event).await,
                            // malformed frames answer an error event, never a close
                            Err(e) => Outbound::new(
                                "error",
                                serde_json::json!({ "message": e.to_string() }),
                            ),
                        };
                        if session.text(reply.to_frame()).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(bytes))) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                },
                forwarded = rx.recv() => match forwarded {
                    Some(frame) => {
                        if session.text(frame).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        debug!(user_id = identity.user_id, "realtime client disconnected");
        let _ = session.close(None).await;
    });

    Ok(response)
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    if let Some(token) = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        return Some(token.to_owned());
    }
    web::Query::<std::collections::HashMap<String, String>>::from_query(req.query_string())
        .ok()
        .and_then(|q| q.get("token").cloned())
}
