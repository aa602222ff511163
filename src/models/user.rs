use serde::{Deserialize, Serialize};

/// A registered account.
///
/// `password` always holds an Argon2 PHC string, never plaintext.
/// `workouts` are weak references by id; nothing cascades on delete.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub workouts: Vec<String>,
}

impl User {
    /// Construct a new User with an empty workout list.
    pub fn new(id: String, username: String, password_hash: String) -> Self {
        User {
            id,
            username,
            password: password_hash,
            workouts: Vec::new(),
        }
    }
}
