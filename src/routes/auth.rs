use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Query},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::{
    self, decode_expired_token, generate_refresh_token, hash_password, issue_access_token,
    verify_password,
};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::i18n::{t, t1, Lang};
use crate::mail::Mailer;
use crate::model::enums::Gender;
use crate::model::user::AppUser;
use crate::response::SuccessResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone_number: Option<String>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<chrono::DateTime<Utc>>,
    pub address: Option<String>,
    pub ward_id: Option<i32>,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmEmailQuery {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

pub fn auth_router() -> Router {
    Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/confirm-email", get(confirm_email))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/refresh-token", post(refresh_token))
}

pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<AppUser>, ApiError> {
    let user = sqlx::query_as::<_, AppUser>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<AppUser>, ApiError> {
    let user = sqlx::query_as::<_, AppUser>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn roles_of(pool: &PgPool, user_id: Uuid) -> Result<Vec<String>, ApiError> {
    let roles = sqlx::query_scalar::<_, String>(
        "SELECT r.name FROM roles r JOIN user_roles ur ON ur.role_id = r.id WHERE ur.user_id = $1",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(roles)
}

fn validate_sign_up(request: &SignUpRequest, lang: Lang) -> Result<(), ApiError> {
    if request.email.is_empty() || !request.email.contains('@') {
        return Err(ApiError::validation("email", t(lang, "NotValidValidator")));
    }
    if request.password.len() < 6 {
        return Err(ApiError::validation(
            "password",
            t(lang, "NotValidValidator"),
        ));
    }
    if request.name.is_empty() {
        return Err(ApiError::validation("name", t(lang, "NotNullValidator")));
    }
    if request.name.len() > 50 {
        return Err(ApiError::validation(
            "name",
            t(lang, "MaximumLengthValidator"),
        ));
    }
    if let Some(phone) = &request.phone_number {
        if !is_valid_phone(phone) {
            return Err(ApiError::validation(
                "phoneNumber",
                t(lang, "RegularExpressionValidator"),
            ));
        }
    }
    // Self-registration only ever creates patients; staff accounts come from
    // the admin endpoints.
    if request.roles.iter().any(|role| role != auth::ROLE_PATIENT) {
        return Err(ApiError::validation("roles", t(lang, "NotValidValidator")));
    }
    Ok(())
}

/// Local format: ten digits, leading zero.
pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == 10 && phone.starts_with('0') && phone.chars().all(|c| c.is_ascii_digit())
}

async fn sign_up(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AppConfig>>,
    Extension(mailer): Extension<Mailer>,
    lang: Lang,
    Json(request): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<SuccessResult<AuthResponse>>), ApiError> {
    validate_sign_up(&request, lang)?;

    if find_user_by_email(&pool, &request.email).await?.is_some() {
        return Err(ApiError::BadRequest(t(lang, "UserIsExist")));
    }

    let roles: Vec<String> = if request.roles.is_empty() {
        vec![auth::ROLE_PATIENT.to_string()]
    } else {
        request.roles.clone()
    };

    let user_id = Uuid::new_v4();
    let password_hash = hash_password(&request.password)?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO users (id, email, password_hash, name, phone_number, gender, date_of_birth, address, ward_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(user_id)
    .bind(&request.email)
    .bind(&password_hash)
    .bind(&request.name)
    .bind(&request.phone_number)
    .bind(request.gender)
    .bind(request.date_of_birth)
    .bind(&request.address)
    .bind(request.ward_id)
    .execute(&mut tx)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.constraint().is_some() => {
            ApiError::BadRequest(t(lang, "PhoneNumberIsExist"))
        }
        other => ApiError::Database(other),
    })?;

    for role in &roles {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) SELECT $1, id FROM roles WHERE name = $2",
        )
        .bind(user_id)
        .bind(role)
        .execute(&mut tx)
        .await?;
    }

    tx.commit().await?;

    let token = auth::action_code(&config.jwt.secret, "confirm-email", user_id, &request.email);
    let confirm_url = format!(
        "{}/api/v1/auth/confirm-email?userId={}&token={}",
        config.api_url, user_id, token
    );
    mailer.send_in_background(
        request.email.clone(),
        "Confirm email".to_string(),
        t1(lang, "ConfirmEmail", &confirm_url),
    );

    info!("user {user_id} signed up");

    Ok((
        StatusCode::CREATED,
        Json(SuccessResult::new(AuthResponse {
            id: user_id,
            email: request.email,
            name: request.name,
            roles,
        })),
    ))
}

async fn confirm_email(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AppConfig>>,
    lang: Lang,
    Query(query): Query<ConfirmEmailQuery>,
) -> Result<Json<SuccessResult<()>>, ApiError> {
    let user = find_user_by_id(&pool, query.user_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(t(lang, "UserIsNotExist")))?;

    if !auth::verify_action_code(
        &config.jwt.secret,
        "confirm-email",
        user.id,
        &user.email,
        &query.token,
    ) {
        return Err(ApiError::BadRequest(t(lang, "TokenInValid")));
    }

    sqlx::query("UPDATE users SET email_confirmed = TRUE, updated_at = now() WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await?;

    Ok(Json(SuccessResult::new(())))
}

async fn sign_in(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AppConfig>>,
    lang: Lang,
    Json(request): Json<SignInRequest>,
) -> Result<Json<SuccessResult<TokenResponse>>, ApiError> {
    let user = find_user_by_email(&pool, &request.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(t(lang, "ErrorSignIn")))?;

    if !verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::Unauthorized(t(lang, "ErrorSignIn")));
    }
    if !user.email_confirmed {
        return Err(ApiError::Unauthorized(t(lang, "EmailNotConfirmed")));
    }

    let roles = roles_of(&pool, user.id).await?;
    let access_token = issue_access_token(&config.jwt, user.id, &user.name, &user.email, &roles)?;
    let refresh_token = generate_refresh_token();
    let refresh_expires = Utc::now() + Duration::days(config.jwt.refresh_token_validity_days);

    sqlx::query(
        "UPDATE users SET refresh_token = $2, refresh_token_expires_at = $3, updated_at = now() WHERE id = $1",
    )
    .bind(user.id)
    .bind(&refresh_token)
    .bind(refresh_expires)
    .execute(&pool)
    .await?;

    info!("user {} signed in", user.id);

    Ok(Json(SuccessResult::new(TokenResponse {
        access_token,
        refresh_token,
    })))
}

async fn refresh_token(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AppConfig>>,
    lang: Lang,
    Json(request): Json<TokenRequest>,
) -> Result<Json<SuccessResult<TokenResponse>>, ApiError> {
    let claims = decode_expired_token(&config.jwt, &request.access_token)
        .map_err(|_| ApiError::Unauthorized(t(lang, "TokenInValid")))?;

    let user = find_user_by_email(&pool, &claims.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(t(lang, "TokenInValid")))?;

    let matches_stored = user
        .refresh_token
        .as_deref()
        .map(|stored| stored == request.refresh_token)
        .unwrap_or(false);
    if !matches_stored {
        return Err(ApiError::Unauthorized(t(lang, "RefreshTokenInValid")));
    }
    match user.refresh_token_expires_at {
        Some(expires) if expires > Utc::now() => {}
        _ => return Err(ApiError::Unauthorized(t(lang, "RefreshTokenInValid"))),
    }

    // The refresh flow only applies once the access token has lapsed.
    if claims.exp > Utc::now().timestamp() {
        return Err(ApiError::BadRequest(t(lang, "TokenNotExpire")));
    }

    let roles = roles_of(&pool, user.id).await?;
    let access_token = issue_access_token(&config.jwt, user.id, &user.name, &user.email, &roles)?;
    let new_refresh_token = generate_refresh_token();

    sqlx::query("UPDATE users SET refresh_token = $2, updated_at = now() WHERE id = $1")
        .bind(user.id)
        .bind(&new_refresh_token)
        .execute(&pool)
        .await?;

    Ok(Json(SuccessResult::new(TokenResponse {
        access_token,
        refresh_token: new_refresh_token,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> SignUpRequest {
        SignUpRequest {
            email: "a@b.c".to_string(),
            password: "123456a@".to_string(),
            name: "Anna".to_string(),
            phone_number: Some("0912345678".to_string()),
            gender: None,
            date_of_birth: None,
            address: None,
            ward_id: None,
            roles: vec![],
        }
    }

    #[test]
    fn phone_validation() {
        assert!(is_valid_phone("0912345678"));
        assert!(!is_valid_phone("912345678"));
        assert!(!is_valid_phone("09123456789"));
        assert!(!is_valid_phone("09123a5678"));
    }

    #[test]
    fn sign_up_accepts_valid_request() {
        assert!(validate_sign_up(&base_request(), Lang::En).is_ok());
    }

    #[test]
    fn sign_up_rejects_bad_fields() {
        let mut request = base_request();
        request.email = "nope".to_string();
        assert!(validate_sign_up(&request, Lang::En).is_err());

        let mut request = base_request();
        request.password = "123".to_string();
        assert!(validate_sign_up(&request, Lang::En).is_err());

        let mut request = base_request();
        request.name = "x".repeat(51);
        assert!(validate_sign_up(&request, Lang::En).is_err());

        let mut request = base_request();
        request.phone_number = Some("12345".to_string());
        assert!(validate_sign_up(&request, Lang::En).is_err());
    }

    #[test]
    fn sign_up_only_grants_patient_role() {
        let mut request = base_request();
        request.roles = vec!["patient".to_string()];
        assert!(validate_sign_up(&request, Lang::En).is_ok());

        request.roles = vec!["admin".to_string()];
        assert!(validate_sign_up(&request, Lang::En).is_err());

        request.roles = vec!["patient".to_string(), "doctor".to_string()];
        assert!(validate_sign_up(&request, Lang::En).is_err());
    }
}
