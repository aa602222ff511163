//! Credential hashing, bearer token issuance and the request guard built on them.

pub mod extractor;
pub mod password;
pub mod token;

pub use extractor::AuthenticatedUser;
pub use password::PasswordHasher;
pub use token::{TokenError, TokenIssuer, TokenVerifier};
