use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::claims::{Claims, TokenKind};
use crate::{config::JwtConfig, state::AppState};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token")]
    Malformed,
    #[error("Token is missing 'sub' field")]
    MissingSubject,
    #[error("Token has incorrect type, expected '{expected}'")]
    WrongType { expected: TokenKind },
}

/// Signing keys plus the per-kind lifetimes.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_minutes: i64,
    confirmation_ttl_minutes: i64,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            access_ttl_minutes: cfg.access_ttl_minutes,
            confirmation_ttl_minutes: cfg.confirmation_ttl_minutes,
        }
    }

    pub fn access_ttl_minutes(&self) -> i64 {
        self.access_ttl_minutes
    }

    pub fn confirmation_ttl_minutes(&self) -> i64 {
        self.confirmation_ttl_minutes
    }

    fn ttl_minutes(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl_minutes,
            TokenKind::Confirmation => self.confirmation_ttl_minutes,
        }
    }

    pub fn issue(&self, email: &str, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::minutes(self.ttl_minutes(kind));
        let claims = Claims {
            sub: Some(email.to_string()),
            kind: Some(kind.as_str().to_string()),
            iat: unix_seconds(now),
            exp: unix_seconds(exp),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(kind = %kind, "jwt signed");
        Ok(token)
    }

    pub fn issue_access(&self, email: &str) -> anyhow::Result<String> {
        self.issue(email, TokenKind::Access)
    }

    pub fn issue_confirmation(&self, email: &str) -> anyhow::Result<String> {
        self.issue(email, TokenKind::Confirmation)
    }

    /// Checks run in order: signature/parse, expiry, subject, type.
    pub fn resolve_subject(&self, token: &str, expected: TokenKind) -> Result<String, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below without leeway, after the signature.
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| {
                debug!(error = %e, "jwt rejected");
                TokenError::Malformed
            })?
            .claims;

        if claims.exp <= unix_seconds(OffsetDateTime::now_utc()) {
            return Err(TokenError::Expired);
        }

        let subject = claims
            .sub
            .filter(|s| !s.is_empty())
            .ok_or(TokenError::MissingSubject)?;

        if claims.kind.as_deref() != Some(expected.as_str()) {
            return Err(TokenError::WrongType { expected });
        }

        debug!(kind = %expected, "jwt verified");
        Ok(subject)
    }
}

fn unix_seconds(t: OffsetDateTime) -> u64 {
    u64::try_from(t.unix_timestamp()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_keys(access: i64, confirmation: i64) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: "dev-secret".into(),
            access_ttl_minutes: access,
            confirmation_ttl_minutes: confirmation,
        })
    }

    fn sign_raw(payload: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn in_an_hour() -> u64 {
        unix_seconds(OffsetDateTime::now_utc() + TimeDuration::hours(1))
    }

    #[test]
    fn lifetimes_are_queryable() {
        let keys = make_keys(30, 1440);
        assert_eq!(keys.access_ttl_minutes(), 30);
        assert_eq!(keys.confirmation_ttl_minutes(), 1440);
    }

    #[test]
    fn access_token_resolves_to_subject() {
        let keys = make_keys(30, 1440);
        let token = keys.issue_access("a@b2.com").unwrap();
        assert_eq!(keys.resolve_subject(&token, TokenKind::Access).unwrap(), "a@b2.com");
    }

    #[test]
    fn confirmation_token_resolves_to_subject() {
        let keys = make_keys(30, 1440);
        let token = keys.issue_confirmation("a@b2.com").unwrap();
        assert_eq!(
            keys.resolve_subject(&token, TokenKind::Confirmation).unwrap(),
            "a@b2.com"
        );
    }

    #[test]
    fn issued_claims_carry_type_and_lifetime() {
        let keys = make_keys(30, 1440);
        let token = keys.issue_confirmation("a@b2.com").unwrap();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        let claims = decode::<Claims>(&token, &keys.decoding, &validation)
            .unwrap()
            .claims;
        assert_eq!(claims.sub.as_deref(), Some("a@b2.com"));
        assert_eq!(claims.kind.as_deref(), Some("confirmation"));
        assert_eq!(claims.exp - claims.iat, 1440 * 60);
    }

    #[test]
    fn kind_mismatch_is_wrong_type_both_ways() {
        let keys = make_keys(30, 1440);
        let confirmation = keys.issue_confirmation("a@b2.com").unwrap();
        assert_eq!(
            keys.resolve_subject(&confirmation, TokenKind::Access),
            Err(TokenError::WrongType { expected: TokenKind::Access })
        );
        let access = keys.issue_access("a@b2.com").unwrap();
        assert_eq!(
            keys.resolve_subject(&access, TokenKind::Confirmation),
            Err(TokenError::WrongType { expected: TokenKind::Confirmation })
        );
    }

    #[test]
    fn non_positive_lifetime_is_immediately_expired() {
        for minutes in [0, -1] {
            let keys = make_keys(minutes, minutes);
            let token = keys.issue_access("a@b2.com").unwrap();
            assert_eq!(
                keys.resolve_subject(&token, TokenKind::Access),
                Err(TokenError::Expired)
            );
        }
    }

    #[test]
    fn expiry_is_reported_before_wrong_type() {
        let keys = make_keys(-1, -1);
        let token = keys.issue_confirmation("a@b2.com").unwrap();
        assert_eq!(
            keys.resolve_subject(&token, TokenKind::Access),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let keys = make_keys(30, 1440);
        assert_eq!(
            keys.resolve_subject("invalid token", TokenKind::Access),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn foreign_signature_is_malformed() {
        let keys = make_keys(30, 1440);
        let token = sign_raw(
            json!({ "sub": "a@b2.com", "type": "access", "iat": 0, "exp": in_an_hour() }),
            "some-other-secret",
        );
        assert_eq!(
            keys.resolve_subject(&token, TokenKind::Access),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn missing_subject_is_reported() {
        let keys = make_keys(30, 1440);
        let token = sign_raw(
            json!({ "type": "access", "iat": 0, "exp": in_an_hour() }),
            "dev-secret",
        );
        assert_eq!(
            keys.resolve_subject(&token, TokenKind::Access),
            Err(TokenError::MissingSubject)
        );
    }

    #[test]
    fn missing_type_is_wrong_type() {
        let keys = make_keys(30, 1440);
        let token = sign_raw(
            json!({ "sub": "a@b2.com", "iat": 0, "exp": in_an_hour() }),
            "dev-secret",
        );
        assert_eq!(
            keys.resolve_subject(&token, TokenKind::Access),
            Err(TokenError::WrongType { expected: TokenKind::Access })
        );
    }

    #[test]
    fn missing_expiry_is_malformed() {
        let keys = make_keys(30, 1440);
        let token = sign_raw(json!({ "sub": "a@b2.com", "type": "access" }), "dev-secret");
        assert_eq!(
            keys.resolve_subject(&token, TokenKind::Access),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn issued_at_is_optional() {
        let keys = make_keys(30, 1440);
        let token = sign_raw(
            json!({ "sub": "a@b.com", "type": "access", "exp": in_an_hour() }),
            "dev-secret",
        );
        assert_eq!(
            keys.resolve_subject(&token, TokenKind::Access),
            Ok("a@b.com".to_string())
        );
    }

    #[test]
    fn wrong_type_message_names_expected_kind() {
        let err = TokenError::WrongType { expected: TokenKind::Access };
        assert!(err.to_string().contains("Token has incorrect type"));
        assert!(err.to_string().contains("access"));
    }
}
