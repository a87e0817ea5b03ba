use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

use crate::config::JwtConfig;
use crate::error::AppError;

/// Payload of a token. Always carries `exp` and `iat` once issued.
pub type Claims = Map<String, Value>;

/// Signs and validates stateless bearer tokens with one process-wide key.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    default_ttl: TimeDuration,
}

impl TokenIssuer {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm: cfg.algorithm,
            default_ttl: TimeDuration::minutes(cfg.ttl_minutes),
        }
    }

    pub fn issue(&self, claims: Claims) -> Result<String, AppError> {
        self.issue_with_ttl(claims, self.default_ttl)
    }

    /// `exp` and `iat` in `claims` are overwritten.
    pub fn issue_with_ttl(&self, mut claims: Claims, ttl: TimeDuration) -> Result<String, AppError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + ttl;
        claims.insert("iat".into(), Value::from(now.unix_timestamp()));
        claims.insert("exp".into(), Value::from(exp.unix_timestamp()));

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("jwt encode: {e}")))?;
        debug!(sub = ?claims.get("sub"), "jwt signed");
        Ok(token)
    }

    /// Fails with [`AppError::InvalidToken`] on a bad signature, a malformed
    /// token or an `exp` in the past. No leeway is granted.
    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            warn!(error = %e, "jwt rejected");
            AppError::InvalidToken
        })?;
        debug!(sub = ?data.claims.get("sub"), "jwt verified");
        Ok(data.claims)
    }
}

/// Builds the claim set for an authenticated subject.
pub fn subject_claims(username: &str) -> Claims {
    let mut claims = Claims::new();
    claims.insert("sub".into(), Value::from(username));
    claims
}

#[cfg(test)]
pub(crate) fn test_issuer(secret: &str) -> TokenIssuer {
    TokenIssuer::new(&JwtConfig {
        secret: secret.into(),
        algorithm: Algorithm::HS256,
        ttl_minutes: 30,
    })
}
