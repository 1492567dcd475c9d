use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data};
use futures::future::{Ready, ready};

use crate::auth::identity::IdentityProvider;

/// Authenticated caller, extracted from the bearer token on every HTTP
/// request. Realtime connections resolve the same identity during the
/// handshake instead.
pub struct AuthUser {
    pub user_id: u64,
    pub organization_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let provider = match req.app_data::<Data<dyn IdentityProvider>>() {
            Some(p) => p,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Identity provider missing",
                )));
            }
        };

        match provider.verify(token) {
            Ok(identity) => ready(Ok(AuthUser {
                user_id: identity.user_id,
                organization_id: identity.organization_id,
            })),
            Err(e) => ready(Err(ErrorUnauthorized(e.to_string()))),
        }
    }
}
