use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::error::AttendanceError;
use crate::models::Claims;

/// What token verification resolves to: the caller's identity as the
/// external identity provider sees it.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: u64,
    pub organization_id: Option<u64>,
    pub is_active: bool,
}

/// Verification seam over the external identity provider. Both the HTTP
/// extractor and the realtime handshake go through this trait.
pub trait IdentityProvider: Send + Sync {
    fn verify(&self, token: &str) -> Result<Identity, AttendanceError>;
}

/// HS256 verification of tokens the identity provider signs with the
/// shared secret.
pub struct JwtIdentityProvider {
    secret: String,
}

impl JwtIdentityProvider {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl IdentityProvider for JwtIdentityProvider {
    fn verify(&self, token: &str) -> Result<Identity, AttendanceError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AttendanceError::Auth("Invalid or expired token".into()))?;

        if !data.claims.is_active {
            return Err(AttendanceError::Auth("Account is inactive".into()));
        }

        Ok(Identity {
            user_id: data.claims.user_id,
            organization_id: data.claims.organization_id,
            is_active: data.claims.is_active,
        })
    }
}

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

/// Mints a token the way the identity provider does. Dev tooling and tests
/// only; production tokens come from the provider itself.
pub fn issue_token(
    secret: &str,
    user_id: u64,
    organization_id: Option<u64>,
    is_active: bool,
    ttl: usize,
) -> String {
    let claims = Claims {
        user_id,
        organization_id,
        is_active,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
