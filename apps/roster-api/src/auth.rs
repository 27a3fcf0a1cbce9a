//! JWT authentication module.
//!
//! Validates (and, for operators and tests, issues) HMAC-signed bearer
//! tokens. Only HS256/HS384/HS512 are accepted; a token signed with any
//! other algorithm, including `none`, is rejected before its signature is
//! looked at.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Accepted signing algorithms.
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// JWT claims structure.
///
/// Both claims are optional; when `exp` is present it is enforced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (caller identity)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Expiration (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// JWT token manager.
#[derive(Clone)]
pub struct JwtManager {
    secret: String,
}

impl JwtManager {
    /// Create a new JWT manager around the shared secret.
    pub fn new(secret: impl Into<String>) -> Self {
        JwtManager {
            secret: secret.into(),
        }
    }

    /// Issue an HS256 token for `subject`, valid for `lifetime`.
    pub fn issue_token(&self, subject: &str, lifetime: Duration) -> Result<String, ApiError> {
        let claims = Claims {
            sub: Some(subject.to_string()),
            exp: Some((Utc::now() + lifetime).timestamp()),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to issue token: {}", e)))
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let header = decode_header(token).map_err(|_| ApiError::unauthorized("Invalid token"))?;
        if !HMAC_ALGORITHMS.contains(&header.alg) {
            return Err(ApiError::unauthorized("Invalid token"));
        }

        let mut validation = Validation::new(header.alg);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|_| ApiError::unauthorized("Invalid token"))?;

        Ok(data.claims)
    }

    /// Validate a raw `Authorization` header value.
    ///
    /// Produces the exact rejection messages clients see.
    pub fn authorize(&self, header: Option<&str>) -> Result<Claims, ApiError> {
        let header = header.ok_or_else(|| ApiError::unauthorized("Authorization header required"))?;
        let token =
            extract_bearer_token(header).ok_or_else(|| ApiError::unauthorized("Bearer token required"))?;
        self.validate_token(token)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
