use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Query},
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{action_code, hash_password, verify_action_code, verify_password, AuthUser};
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::i18n::{t, t1, Lang};
use crate::mail::Mailer;
use crate::response::SuccessResult;
use crate::routes::auth::{find_user_by_email, find_user_by_id};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMailResetPasswordQuery {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMailChangeEmailQuery {
    pub new_email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEmailRequest {
    pub user_id: Uuid,
    pub new_email: String,
    pub code: String,
}

pub fn account_router() -> Router {
    Router::new()
        .route(
            "/account/send-mail-reset-password",
            get(send_mail_reset_password),
        )
        .route("/account/reset-password", put(reset_password))
        .route("/account/change-password", put(change_password))
        .route(
            "/account/send-mail-change-email",
            get(send_mail_change_email),
        )
        .route("/account/change-email", put(change_email))
}

async fn send_mail_reset_password(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AppConfig>>,
    Extension(mailer): Extension<Mailer>,
    lang: Lang,
    Query(query): Query<SendMailResetPasswordQuery>,
) -> Result<Json<SuccessResult<()>>, ApiError> {
    let user = find_user_by_email(&pool, &query.email)
        .await?
        .ok_or_else(|| ApiError::BadRequest(t(lang, "UserIsNotExist")))?;

    let code = action_code(&config.jwt.secret, "reset-password", user.id, &user.email);
    let url = format!(
        "{}/reset-password?email={}&code={}",
        config.api_url, user.email, code
    );
    mailer.send_in_background(
        user.email,
        "Reset password".to_string(),
        t1(lang, "ResetPassword", &url),
    );

    Ok(Json(SuccessResult::new(())))
}

async fn reset_password(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AppConfig>>,
    lang: Lang,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<SuccessResult<()>>, ApiError> {
    if request.password.len() < 6 {
        return Err(ApiError::validation(
            "password",
            t(lang, "NotValidValidator"),
        ));
    }

    let user = find_user_by_email(&pool, &request.email)
        .await?
        .ok_or_else(|| ApiError::BadRequest(t(lang, "UserIsNotExist")))?;

    if !verify_action_code(
        &config.jwt.secret,
        "reset-password",
        user.id,
        &user.email,
        &request.code,
    ) {
        return Err(ApiError::BadRequest(t(lang, "CodeInValid")));
    }

    let password_hash = hash_password(&request.password)?;
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
        .bind(user.id)
        .bind(&password_hash)
        .execute(&pool)
        .await?;

    Ok(Json(SuccessResult::new(())))
}

async fn change_password(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    lang: Lang,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<SuccessResult<()>>, ApiError> {
    if request.new_password.len() < 6 {
        return Err(ApiError::validation(
            "newPassword",
            t(lang, "NotValidValidator"),
        ));
    }

    let user = find_user_by_id(&pool, auth_user.id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(t(lang, "UserIsNotExist")))?;

    if !verify_password(&request.old_password, &user.password_hash) {
        return Err(ApiError::BadRequest(t(lang, "OldPasswordIncorrect")));
    }

    let password_hash = hash_password(&request.new_password)?;
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
        .bind(user.id)
        .bind(&password_hash)
        .execute(&pool)
        .await?;

    Ok(Json(SuccessResult::new(())))
}

async fn send_mail_change_email(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AppConfig>>,
    Extension(mailer): Extension<Mailer>,
    auth_user: AuthUser,
    lang: Lang,
    Query(query): Query<SendMailChangeEmailQuery>,
) -> Result<Json<SuccessResult<()>>, ApiError> {
    if query.new_email.is_empty() || !query.new_email.contains('@') {
        return Err(ApiError::validation(
            "newEmail",
            t(lang, "NotValidValidator"),
        ));
    }
    if find_user_by_email(&pool, &query.new_email).await?.is_some() {
        return Err(ApiError::BadRequest(t(lang, "UserIsExist")));
    }

    let code = action_code(
        &config.jwt.secret,
        "change-email",
        auth_user.id,
        &query.new_email,
    );
    let url = format!(
        "{}/change-email?userId={}&newEmail={}&code={}",
        config.api_url, auth_user.id, query.new_email, code
    );
    mailer.send_in_background(
        query.new_email,
        "Change email".to_string(),
        t1(lang, "ChangeEmail", &url),
    );

    Ok(Json(SuccessResult::new(())))
}

async fn change_email(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AppConfig>>,
    lang: Lang,
    Json(request): Json<ChangeEmailRequest>,
) -> Result<Json<SuccessResult<()>>, ApiError> {
    let user = find_user_by_id(&pool, request.user_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(t(lang, "UserIsNotExist")))?;

    if !verify_action_code(
        &config.jwt.secret,
        "change-email",
        user.id,
        &request.new_email,
        &request.code,
    ) {
        return Err(ApiError::BadRequest(t(lang, "CodeInValid")));
    }
    if find_user_by_email(&pool, &request.new_email)
        .await?
        .is_some()
    {
        return Err(ApiError::BadRequest(t(lang, "UserIsExist")));
    }

    sqlx::query(
        "UPDATE users SET email = $2, email_confirmed = TRUE, updated_at = now() WHERE id = $1",
    )
    .bind(user.id)
    .bind(&request.new_email)
    .execute(&pool)
    .await?;

    Ok(Json(SuccessResult::new(())))
}
