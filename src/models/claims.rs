use serde::{Deserialize, Serialize};

/// Claims carried by an issued bearer token.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    // Registered Claims
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,

    // Private Claims
    #[serde(rename = "userId")]
    pub user_id: String,
}
