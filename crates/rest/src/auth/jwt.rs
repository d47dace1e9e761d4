//! HS256 access and refresh tokens.
//!
//! Access tokens are short lived and stateless. Refresh tokens name a
//! stored [`RefreshToken`] row, which is what makes rotation and revocation
//! possible. The two carry different required claims, so neither decodes
//! as the other.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wayfarer_persistence::identity::RefreshToken;
use wayfarer_persistence::{Role, TenantId, UserRecord};

use super::AuthError;

/// JWT signing and verification keys.
struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Keys {
    fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Claims carried by an access token.
///
/// `tenant` and `role` describe the user at issue time and are informational
/// only; authorization always uses the stored user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,
    /// Tenant the user belonged to at issue time.
    pub tenant: TenantId,
    /// Role at issue time.
    pub role: Role,
    /// Issued at (timestamp).
    pub iat: i64,
    /// Expiration time (timestamp).
    pub exp: i64,
}

impl Claims {
    /// The user ID named by the token.
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidToken)
    }
}

/// Value of the `typ` claim of refresh tokens.
const REFRESH_TOKEN_TYPE: &str = "refresh";

/// Claims carried by a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Id of the stored token row.
    pub jti: String,
    /// Always `"refresh"`.
    pub typ: String,
    pub iat: i64,
    pub exp: i64,
}

impl RefreshClaims {
    /// The user ID named by the token.
    pub fn user_id(&self) -> Result<i64, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidRefreshToken)
    }

    /// The stored token row named by the token.
    pub fn token_id(&self) -> Result<i64, AuthError> {
        self.jti.parse().map_err(|_| AuthError::InvalidRefreshToken)
    }
}

/// Login and refresh response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Issues and verifies access and refresh tokens.
pub struct TokenService {
    keys: Keys,
    ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Creates a service signing with `secret`; access tokens live
    /// `ttl_minutes`, refresh tokens seven days.
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            keys: Keys::new(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
            refresh_ttl: Duration::days(7),
        }
    }

    /// Sets the refresh token lifetime.
    pub fn with_refresh_ttl_days(mut self, days: i64) -> Self {
        self.refresh_ttl = Duration::days(days);
        self
    }

    /// When a refresh token issued at `from` expires.
    pub fn refresh_expiry(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        from + self.refresh_ttl
    }

    /// Issues a token for `user`.
    pub fn issue(&self, user: &UserRecord) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            tenant: user.tenant_id,
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let access_token = encode(&Header::default(), &claims, &self.keys.encoding)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))?;
        Ok(IssuedToken {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.ttl.num_seconds(),
            refresh_token: None,
        })
    }

    /// Signs a refresh token naming the stored row `token`.
    pub fn issue_refresh(&self, token: &RefreshToken) -> Result<String, AuthError> {
        let claims = RefreshClaims {
            sub: token.user_id.to_string(),
            jti: token.id.to_string(),
            typ: REFRESH_TOKEN_TYPE.to_string(),
            iat: token.created_at.timestamp(),
            exp: token.expires_at.timestamp(),
        };
        encode(&Header::default(), &claims, &self.keys.encoding)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Verifies a refresh token's signature, expiry and type.
    ///
    /// Whether the named row is still live is for the caller to check.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        let claims = decode::<RefreshClaims>(token, &self.keys.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Refresh token verification failed: {}", e);
                AuthError::InvalidRefreshToken
            })?;
        if claims.typ != REFRESH_TOKEN_TYPE {
            return Err(AuthError::InvalidRefreshToken);
        }
        Ok(claims)
    }

    /// Verifies signature and expiry and returns the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.keys.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Token verification failed: {}", e);
                AuthError::InvalidToken
            })
    }
}
