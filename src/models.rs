use serde::{Deserialize, Serialize};

/// Claims carried by the identity tokens the external identity provider
/// issues. This service only verifies them; it never mints tokens for
/// real callers.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub organization_id: Option<u64>,
    pub is_active: bool,
    pub exp: usize,
    pub jti: String,
}
