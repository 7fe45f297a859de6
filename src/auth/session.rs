//! Session tokens for logged-in users.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::User;
use crate::error::{InteropError, InteropResult};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "sessionid";

/// Session token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: Uuid,
    /// Username at login time.
    pub username: String,
    /// Whether the user may administer missions.
    pub is_superuser: bool,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at time (Unix timestamp).
    pub iat: i64,
    /// Issuer.
    pub iss: String,
}

/// Issues and validates signed session tokens.
#[derive(Clone)]
pub struct SessionManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    session_duration_hours: i64,
}

impl SessionManager {
    /// Create a new session manager with the given secret.
    pub fn new(secret: &str, issuer: String, session_duration_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            session_duration_hours,
        }
    }

    /// Session lifetime in seconds.
    pub fn session_duration_secs(&self) -> i64 {
        self.session_duration_hours * 3600
    }

    /// Issue a session token for a user.
    pub fn issue_token(&self, user: &User) -> InteropResult<String> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.session_duration_hours);

        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            is_superuser: user.is_superuser,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| InteropError::Internal(format!("Failed to issue session: {}", e)))
    }

    /// Validate and decode a session token.
    pub fn validate_token(&self, token: &str) -> InteropResult<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        let token_data: TokenData<Claims> =
            decode(token, &self.decoding_key, &validation).map_err(|e| {
                tracing::debug!(error = %e, "Session validation failed");
                InteropError::Forbidden("Invalid or expired session".to_string())
            })?;

        Ok(token_data.claims)
    }

    /// `Set-Cookie` value establishing the session in a browser.
    pub fn session_cookie(&self, token: &str) -> String {
        format!(
            "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            token,
            self.session_duration_secs()
        )
    }

    /// `Set-Cookie` value removing the session.
    pub fn expired_cookie(&self) -> String {
        format!("{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
    }
}

/// Operator account from config file.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ConfiguredUser {
    pub username: String,
    pub email: String,
    /// Password hash (SHA256 hex).
    pub password_hash: String,
    #[serde(default)]
    pub is_superuser: bool,
}

impl From<ConfiguredUser> for User {
    fn from(configured: ConfiguredUser) -> Self {
        User::with_password_hash(
            configured.username,
            configured.email,
            configured.password_hash,
            configured.is_superuser,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        SessionManager::new("test-secret-key-12345", "suas-interop".to_string(), 12)
    }

    #[test]
    fn test_session_roundtrip() {
        let manager = manager();
        let user = User::new("testuser".into(), "email@example.com".into(), "testpass");

        let token = manager.issue_token(&user).unwrap();
        let claims = manager.validate_token(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "testuser");
        assert!(!claims.is_superuser);
        assert_eq!(claims.exp - claims.iat, 12 * 3600);
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let user = User::new("testuser".into(), "email@example.com".into(), "testpass");
        let other = SessionManager::new("test-secret-key-12345", "elsewhere".to_string(), 12);
        let token = other.issue_token(&user).unwrap();

        assert!(matches!(
            manager().validate_token(&token),
            Err(InteropError::Forbidden(_))
        ));
    }

    #[test]
    fn test_expired_session_rejected() {
        let user = User::new("testuser".into(), "email@example.com".into(), "testpass");
        let stale = SessionManager::new("test-secret-key-12345", "suas-interop".to_string(), -2);
        let token = stale.issue_token(&user).unwrap();

        assert!(matches!(
            manager().validate_token(&token),
            Err(InteropError::Forbidden(_))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let user = User::new("testuser".into(), "email@example.com".into(), "testpass");
        let other = SessionManager::new("another-secret", "suas-interop".to_string(), 12);
        let token = other.issue_token(&user).unwrap();

        assert!(manager().validate_token(&token).is_err());
        assert!(manager().validate_token("garbage").is_err());
    }

    #[test]
    fn test_cookies() {
        let manager = manager();
        let cookie = manager.session_cookie("abc");
        assert!(cookie.starts_with("sessionid=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=43200"));
        assert!(manager.expired_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn test_configured_user_conversion() {
        let user: User = ConfiguredUser {
            username: "judge".to_string(),
            email: "judge@example.com".to_string(),
            password_hash: crate::domain::hash_password("pw"),
            is_superuser: true,
        }
        .into();

        assert!(user.is_superuser);
        assert!(user.verify_password("pw"));
    }
}
