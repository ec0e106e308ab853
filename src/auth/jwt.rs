use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use super::{Claims, TokenPair, TokenSubject, TokenType};
use crate::{config::AuthConfig, error::AppError};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Invalid token type")]
    InvalidTokenType,
    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidToken | TokenError::InvalidTokenType => {
                AppError::unauthorized(err.to_string())
            }
            TokenError::Encoding(_) => AppError::internal(err.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct JwtKeys {
    pub enc: EncodingKey,
    pub dec: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            enc: EncodingKey::from_secret(secret),
            dec: DecodingKey::from_secret(secret),
        }
    }
}

pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

pub fn encode_token(keys: &JwtKeys, claims: &Claims) -> Result<String, TokenError> {
    let mut header = Header::new(Algorithm::HS256);
    header.typ = Some("JWT".into());

    encode(&header, claims, &keys.enc).map_err(|err| TokenError::Encoding(err.to_string()))
}

/// Signature and expiry check, then the `type` claim must equal `expected`.
pub fn decode_token(keys: &JwtKeys, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let claims = decode::<Claims>(token, &keys.dec, &validation)
        .map_err(|err| {
            tracing::debug!(error = %err, "token rejected");
            TokenError::InvalidToken
        })?
        .claims;

    if claims.token_type != expected {
        return Err(TokenError::InvalidTokenType);
    }
    Ok(claims)
}

/// Mints and verifies the access/refresh pair. Each half has its own secret.
#[derive(Clone)]
pub struct TokenIssuer {
    access: JwtKeys,
    refresh: JwtKeys,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl TokenIssuer {
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl_secs: u64,
        refresh_ttl_secs: u64,
    ) -> Self {
        Self {
            access: JwtKeys::from_secret(access_secret),
            refresh: JwtKeys::from_secret(refresh_secret),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    pub fn from_config(cfg: &AuthConfig) -> Self {
        Self::new(
            cfg.jwt_secret.as_bytes(),
            cfg.jwt_refresh_secret.as_bytes(),
            cfg.access_ttl_secs,
            cfg.refresh_ttl_secs,
        )
    }

    pub fn access_claims(&self, subject: &TokenSubject) -> Claims {
        let iat = now_unix();
        Claims {
            sub: subject.user_id,
            email: subject.email.clone(),
            organization_id: subject.organization_id,
            role_id: subject.role_id,
            permissions: subject.permissions.clone(),
            token_type: TokenType::Access,
            jti: None,
            iat,
            exp: iat + self.access_ttl_secs as i64,
        }
    }

    pub fn refresh_claims(&self, subject: &TokenSubject) -> Claims {
        let iat = now_unix();
        Claims {
            sub: subject.user_id,
            email: subject.email.clone(),
            organization_id: None,
            role_id: None,
            permissions: Vec::new(),
            token_type: TokenType::Refresh,
            jti: Some(Uuid::new_v4()),
            iat,
            exp: iat + self.refresh_ttl_secs as i64,
        }
    }

    pub fn issue_pair(&self, subject: &TokenSubject) -> Result<TokenPair, TokenError> {
        let access_token = encode_token(&self.access, &self.access_claims(subject))?;
        let refresh_claims = self.refresh_claims(subject);
        let refresh_token = encode_token(&self.refresh, &refresh_claims)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.access_ttl_secs,
            refresh_expires_at: unix_to_datetime(refresh_claims.exp)
                .unwrap_or_else(|| Utc::now() + Duration::seconds(self.refresh_ttl_secs as i64)),
        })
    }

    pub fn encode_access(&self, claims: &Claims) -> Result<String, TokenError> {
        encode_token(&self.access, claims)
    }

    pub fn encode_refresh(&self, claims: &Claims) -> Result<String, TokenError> {
        encode_token(&self.refresh, claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        decode_token(&self.access, token, TokenType::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        decode_token(&self.refresh, token, TokenType::Refresh)
    }

    pub fn access_ttl_secs(&self) -> u64 {
        self.access_ttl_secs
    }
}

fn unix_to_datetime(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
}
