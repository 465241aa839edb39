use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::config::JwtConfig;
use crate::state::AppState;

/// Why a presented token was refused. The two cases map to one public
/// message; the split exists for logs and tests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::from_secs((ttl_minutes as u64) * 60),
        }
    }
}

impl JwtKeys {
    pub fn sign(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    /// Checks signature and expiry. Leeway is zero, so the expiry boundary
    /// is exact to the second.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => {
                debug!(user_id = %data.claims.sub, "jwt verified");
                Ok(data.claims)
            }
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => Err(TokenError::Expired),
            Err(_) => Err(TokenError::Invalid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str) -> JwtKeys {
        JwtKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::from_secs(300),
        }
    }

    fn raw_token(keys: &JwtKeys, sub: Uuid, iat: i64, exp: i64) -> String {
        let claims = Claims {
            sub,
            iat: iat as usize,
            exp: exp as usize,
        };
        encode(&Header::default(), &claims, &keys.encoding).expect("encode")
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = make_keys("dev-secret");
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id).expect("sign");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let keys = make_keys("dev-secret");
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let token = raw_token(&keys, Uuid::new_v4(), now - 7200, now - 3600);
        assert_eq!(keys.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn just_expired_token_is_refused() {
        let keys = make_keys("dev-secret");
        let now = OffsetDateTime::now_utc().unix_timestamp();
        // Lands inside the library's default 60-second leeway; zero leeway
        // refuses it.
        let token = raw_token(&keys, Uuid::new_v4(), now - 300, now - 5);
        assert_eq!(keys.verify(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn token_still_valid_just_before_expiry() {
        let keys = make_keys("dev-secret");
        let now = OffsetDateTime::now_utc().unix_timestamp();
        // Expires comfortably after "now" even if the test is slow.
        let token = raw_token(&keys, Uuid::new_v4(), now - 100, now + 30);
        assert!(keys.verify(&token).is_ok());
    }

    #[test]
    fn token_from_other_secret_is_invalid() {
        let signer = make_keys("secret-a");
        let verifier = make_keys("secret-b");
        let token = signer.sign(Uuid::new_v4()).expect("sign");
        assert_eq!(verifier.verify(&token).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn tampered_token_is_invalid() {
        let keys = make_keys("dev-secret");
        let mut token = keys.sign(Uuid::new_v4()).expect("sign");
        // Flip a character inside the payload segment.
        let mid = token.len() / 2;
        let replacement = if token.as_bytes()[mid] == b'A' { "B" } else { "A" };
        token.replace_range(mid..mid + 1, replacement);
        assert_eq!(keys.verify(&token).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn garbage_token_is_invalid() {
        let keys = make_keys("dev-secret");
        assert_eq!(keys.verify("not-a-jwt").unwrap_err(), TokenError::Invalid);
    }

    #[tokio::test]
    async fn keys_from_state_use_configured_ttl() {
        let state = crate::state::AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        assert_eq!(keys.ttl, Duration::from_secs(5 * 60));
    }
}
