//! Bearer token issuance and verification (HS256 JWT).

use std::fmt;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

use crate::config::JWTConfig;
use crate::models::Claims;

/// Signs stateless tokens carrying the user id and an absolute expiry.
pub struct TokenIssuer {
    iss: String,
    lifetime: i64,
    encoding_key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(config: &JWTConfig) -> Self {
        TokenIssuer {
            iss: config.iss.clone(),
            lifetime: config.exp,
            encoding_key: EncodingKey::from_secret(config.secret.as_ref()),
        }
    }

    /// Issue a token for `user_id`, valid from now for the configured lifetime.
    pub fn issue(&self, user_id: &str) -> Result<String, String> {
        self.issue_at(user_id, Utc::now().timestamp())
    }

    /// Issue a token as though it had been signed at `issued_at` (unix seconds).
    pub fn issue_at(&self, user_id: &str, issued_at: i64) -> Result<String, String> {
        let claims = Claims {
            sub: user_id.to_string(),
            iss: self.iss.clone(),
            iat: issued_at,
            exp: issued_at + self.lifetime,
            user_id: user_id.to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| format!("Failed to encode JWT: {}", e))
    }
}

/// Why a request failed the bearer check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Header absent, or its scheme is not exactly `Bearer`.
    MissingBearer,
    /// `Bearer` with nothing after it.
    MissingToken,
    /// Bad signature, expired, or undecodable claims.
    Invalid(String),
}

impl TokenError {
    /// The client-facing message.
    pub fn message(&self) -> &'static str {
        match self {
            TokenError::MissingBearer => "Authentication failed (no token or Bearer)",
            TokenError::MissingToken => "Authentication failed (no token)",
            TokenError::Invalid(_) => "Authentication failed (invalid token)",
        }
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Invalid(reason) => write!(f, "{}: {}", self.message(), reason),
            _ => f.write_str(self.message()),
        }
    }
}

/// Checks tokens produced by [`TokenIssuer`] with the same secret.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(config: &JWTConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Valid through `exp` inclusive, rejected strictly after.
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_issuer(&[config.iss.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        TokenVerifier {
            decoding_key: DecodingKey::from_secret(config.secret.as_ref()),
            validation,
        }
    }

    /// Verify the raw value of an `Authorization` header and return the user id.
    pub fn verify_header(&self, header: Option<&str>) -> Result<String, TokenError> {
        let header = header.ok_or(TokenError::MissingBearer)?;
        let mut parts = header.split(' ');
        if parts.next() != Some("Bearer") {
            return Err(TokenError::MissingBearer);
        }
        let token = match parts.next() {
            Some(token) if !token.is_empty() => token,
            _ => return Err(TokenError::MissingToken),
        };
        self.verify(token).map(|claims| claims.user_id)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Rejected bearer token: {}", e);
                TokenError::Invalid(e.to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_config(secret: &str) -> JWTConfig {
        JWTConfig {
            iss: "gymtron-test".to_string(),
            exp: 3600,
            secret: secret.to_string(),
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let config = jwt_config("secret");
        let token = TokenIssuer::new(&config).issue("user-1").unwrap();
        let claims = TokenVerifier::new(&config).verify(&token).unwrap();
        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expiry_boundary() {
        let config = jwt_config("secret");
        let issuer = TokenIssuer::new(&config);
        let verifier = TokenVerifier::new(&config);
        let now = Utc::now().timestamp();

        let fresh_enough = issuer.issue_at("u", now - 3600 + 30).unwrap();
        assert!(verifier.verify(&fresh_enough).is_ok());

        let too_old = issuer.issue_at("u", now - 3600 - 30).unwrap();
        assert!(matches!(
            verifier.verify(&too_old),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = TokenIssuer::new(&jwt_config("one")).issue("u").unwrap();
        let result = TokenVerifier::new(&jwt_config("two")).verify(&token);
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_header_shapes() {
        let config = jwt_config("secret");
        let verifier = TokenVerifier::new(&config);
        let token = TokenIssuer::new(&config).issue("u").unwrap();

        assert_eq!(verifier.verify_header(None), Err(TokenError::MissingBearer));
        assert_eq!(
            verifier.verify_header(Some(&format!("Basic {}", token))),
            Err(TokenError::MissingBearer)
        );
        assert_eq!(
            verifier.verify_header(Some(&format!("bearer {}", token))),
            Err(TokenError::MissingBearer)
        );
        assert_eq!(
            verifier.verify_header(Some("Bearer")),
            Err(TokenError::MissingToken)
        );
        assert_eq!(
            verifier.verify_header(Some("Bearer ")),
            Err(TokenError::MissingToken)
        );
        assert!(matches!(
            verifier.verify_header(Some("Bearer not.a.jwt")),
            Err(TokenError::Invalid(_))
        ));
        assert_eq!(
            verifier.verify_header(Some(&format!("Bearer {}", token))),
            Ok("u".to_string())
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            TokenError::Invalid("boom".to_string()).message(),
            "Authentication failed (invalid token)"
        );
        assert_eq!(
            TokenError::MissingToken.to_string(),
            "Authentication failed (no token)"
        );
    }
}
