use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::config::{AppConfig, JwtConfig};
use crate::error::ApiError;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_DOCTOR: &str = "doctor";
pub const ROLE_PATIENT: &str = "patient";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub jti: Uuid,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub fn issue_access_token(
    jwt: &JwtConfig,
    user_id: Uuid,
    name: &str,
    email: &str,
    roles: &[String],
) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        name: name.to_string(),
        email: email.to_string(),
        roles: roles.to_vec(),
        jti: Uuid::new_v4(),
        iss: jwt.issuer.clone(),
        aud: jwt.audience.clone(),
        exp: (Utc::now() + Duration::days(jwt.token_validity_days)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt.secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
}

fn validation(jwt: &JwtConfig, validate_exp: bool) -> Validation {
    let mut validation = Validation::default();
    validation.set_issuer(&[&jwt.issuer]);
    validation.set_audience(&[&jwt.audience]);
    validation.validate_exp = validate_exp;
    validation
}

pub fn decode_access_token(jwt: &JwtConfig, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt.secret.as_bytes()),
        &validation(jwt, true),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized("token is invalid".to_string()))
}

/// Decode ignoring `exp`; used by the refresh flow, which must accept the
/// expired access token but still check its signature.
pub fn decode_expired_token(jwt: &JwtConfig, token: &str) -> Result<Claims, ApiError> {
    let mut validation = validation(jwt, false);
    // jsonwebtoken still requires exp to be present unless told otherwise.
    validation.required_spec_claims.clear();

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized("token is invalid".to_string()))
}

/// Opaque refresh token: 64 random bytes, hex encoded.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 64];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

type HmacSha256 = Hmac<Sha256>;

/// Stateless code for emailed actions (confirm email, reset password,
/// change email): HMAC over the action, user and payload, keyed by the JWT
/// secret. No server-side token store required.
pub fn action_code(secret: &str, action: &str, user_id: Uuid, payload: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(action.as_bytes());
    mac.update(b":");
    mac.update(user_id.as_bytes());
    mac.update(b":");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

pub fn verify_action_code(
    secret: &str,
    action: &str,
    user_id: Uuid,
    payload: &str,
    code: &str,
) -> bool {
    let Ok(code) = hex::decode(code) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(action.as_bytes());
    mac.update(b":");
    mac.update(user_id.as_bytes());
    mac.update(b":");
    mac.update(payload.as_bytes());
    mac.verify_slice(&code).is_ok()
}

/// Authenticated caller, extracted from the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn require_role(&self, role: &str) -> Result<(), ApiError> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let config = parts
            .extensions
            .get::<Arc<AppConfig>>()
            .ok_or_else(|| ApiError::Internal("config extension missing".to_string()))?
            .clone();

        let token = parts
            .headers
            .get("authorization")
            .and_then(|header| header.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

        let claims = decode_access_token(&config.jwt, token)?;

        Ok(AuthUser {
            id: claims.sub,
            roles: claims.roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_jwt() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            issuer: "bookingcare".to_string(),
            audience: "bookingcare".to_string(),
            token_validity_days: 1,
            refresh_token_validity_days: 7,
        }
    }

    #[test]
    fn access_token_round_trip() {
        let jwt = test_jwt();
        let id = Uuid::new_v4();
        let roles = vec!["patient".to_string()];
        let token = issue_access_token(&jwt, id, "Anna", "anna@example.com", &roles).unwrap();

        let claims = decode_access_token(&jwt, &token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.email, "anna@example.com");
        assert_eq!(claims.roles, roles);
    }

    #[test]
    fn wrong_secret_rejected() {
        let jwt = test_jwt();
        let token =
            issue_access_token(&jwt, Uuid::new_v4(), "Anna", "anna@example.com", &[]).unwrap();

        let mut other = test_jwt();
        other.secret = "other-secret".to_string();
        assert!(decode_access_token(&other, &token).is_err());
        assert!(decode_expired_token(&other, &token).is_err());
    }

    #[test]
    fn expired_token_rejected_but_refresh_decode_accepts() {
        let mut jwt = test_jwt();
        jwt.token_validity_days = -1;
        let token =
            issue_access_token(&jwt, Uuid::new_v4(), "Anna", "anna@example.com", &[]).unwrap();

        assert!(decode_access_token(&jwt, &token).is_err());
        let claims = decode_expired_token(&jwt, &token).unwrap();
        assert!(claims.exp < Utc::now().timestamp());
    }

    #[test]
    fn refresh_tokens_are_unique_hex() {
        let a = generate_refresh_token();
        let b = generate_refresh_token();
        assert_eq!(a.len(), 128);
        assert_ne!(a, b);
        assert!(hex::decode(&a).is_ok());
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("123456a@").unwrap();
        assert!(verify_password("123456a@", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("123456a@", "not-a-hash"));
    }

    #[test]
    fn action_code_verifies_and_rejects_tamper() {
        let id = Uuid::new_v4();
        let code = action_code("secret", "confirm-email", id, "a@b.c");

        assert!(verify_action_code("secret", "confirm-email", id, "a@b.c", &code));
        assert!(!verify_action_code("secret", "reset-password", id, "a@b.c", &code));
        assert!(!verify_action_code("secret", "confirm-email", Uuid::new_v4(), "a@b.c", &code));
        assert!(!verify_action_code("secret", "confirm-email", id, "x@b.c", &code));
        assert!(!verify_action_code("secret", "confirm-email", id, "a@b.c", "zz"));
    }
}
