//! Access and refresh JWTs.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthError;
use crate::config::AuthConfig;
use crate::user::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Access => f.write_str("access"),
            TokenKind::Refresh => f.write_str("refresh"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Issued-at unix seconds
    pub iat: i64,
    /// Expiration unix seconds
    pub exp: i64,
}

/// Issues and verifies both token kinds.
#[derive(Clone)]
pub struct TokenIssuer {
    access_secret: String,
    refresh_secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(
        access_secret: impl Into<String>,
        refresh_secret: impl Into<String>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.secret_key.clone(),
            config.refresh_secret_key.clone(),
            Duration::minutes(
                config
                    .access_token_ttl_minutes
                    .clamp(1, AuthConfig::MAX_ACCESS_TOKEN_TTL_MINUTES),
            ),
            Duration::days(
                config
                    .refresh_token_ttl_days
                    .clamp(1, AuthConfig::MAX_REFRESH_TOKEN_TTL_DAYS),
            ),
        )
    }

    pub fn issue_access(&self, user: UserId) -> Result<String, AuthError> {
        self.issue(user, TokenKind::Access)
    }

    pub fn issue_refresh(&self, user: UserId) -> Result<String, AuthError> {
        self.issue(user, TokenKind::Refresh)
    }

    pub fn verify_access(&self, token: &str) -> Result<UserId, AuthError> {
        self.verify(token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<UserId, AuthError> {
        self.verify(token, TokenKind::Refresh)
    }

    fn secret(&self, kind: TokenKind) -> &str {
        match kind {
            TokenKind::Access => &self.access_secret,
            TokenKind::Refresh => &self.refresh_secret,
        }
    }

    fn issue(&self, user: UserId, kind: TokenKind) -> Result<String, AuthError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let now = Utc::now();
        let claims = Claims {
            sub: user.to_string(),
            kind,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret(kind).as_bytes()),
        )?;
        Ok(token)
    }

    fn verify(&self, token: &str, expected: TokenKind) -> Result<UserId, AuthError> {
        let token_data = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret(expected).as_bytes()),
            &Validation::default(),
        )?;
        let claims = token_data.claims;
        if claims.kind != expected {
            return Err(AuthError::WrongTokenType {
                expected,
                found: claims.kind,
            });
        }
        Uuid::parse_str(&claims.sub)
            .map(UserId::from_uuid)
            .map_err(|_| AuthError::InvalidSubject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("access-secret", "refresh-secret", Duration::minutes(5), Duration::days(1))
    }

    #[test]
    fn out_of_range_lifetimes_are_clamped() {
        let config = AuthConfig {
            access_token_ttl_minutes: i64::MAX,
            refresh_token_ttl_days: i64::MAX,
            ..AuthConfig::default()
        };
        let issuer = TokenIssuer::from_config(&config);
        let user = UserId::new();
        let access = issuer.issue_access(user).unwrap();
        assert_eq!(issuer.verify_access(&access).unwrap(), user);
        let refresh = issuer.issue_refresh(user).unwrap();
        assert_eq!(issuer.verify_refresh(&refresh).unwrap(), user);
    }

    #[test]
    fn access_token_round_trip() {
        let user = UserId::new();
        let token = issuer().issue_access(user).unwrap();
        assert_eq!(issuer().verify_access(&token).unwrap(), user);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let issuer = issuer();
        let user = UserId::new();
        let refresh = issuer.issue_refresh(user).unwrap();

        assert_eq!(issuer.verify_refresh(&refresh).unwrap(), user);
        assert!(matches!(
            issuer.verify_access(&refresh),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn type_claim_is_checked_even_with_shared_secret() {
        let issuer = TokenIssuer::new("shared", "shared", Duration::minutes(5), Duration::days(1));
        let refresh = issuer.issue_refresh(UserId::new()).unwrap();
        assert!(matches!(
            issuer.verify_access(&refresh),
            Err(AuthError::WrongTokenType {
                expected: TokenKind::Access,
                found: TokenKind::Refresh
            })
        ));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let issuer = TokenIssuer::new("a", "r", Duration::minutes(-10), Duration::days(1));
        let token = issuer.issue_access(UserId::new()).unwrap();
        assert!(issuer.verify_access(&token).is_err());
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let token = TokenIssuer::new("other", "other-r", Duration::minutes(5), Duration::days(1))
            .issue_access(UserId::new())
            .unwrap();
        assert!(issuer().verify_access(&token).is_err());
    }

    #[test]
    fn claims_carry_type_field() {
        let token = issuer().issue_refresh(UserId::new()).unwrap();
        let decoded = jsonwebtoken::decode::<serde_json::Value>(
            &token,
            &DecodingKey::from_secret(b"refresh-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(decoded.claims["type"], "refresh");
    }
}
