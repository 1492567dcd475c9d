use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The slice of a user profile embedded in attendance responses. Full user
/// CRUD lives in the external user directory, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    #[schema(example = 7)]
    pub id: u64,
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = "john.doe@company.com")]
    pub email: String,
}
