use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    routing::get,
    Router,
};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::{AuthUser, ROLE_ADMIN};
use crate::error::ApiError;
use crate::i18n::{t, Lang};
use crate::model::contact::{Contact, CreateContactRequest};
use crate::response::{PaginationRequest, PaginationResponse, SuccessResult};

pub fn contacts_router() -> Router {
    Router::new()
        .route("/contacts", get(get_contacts).post(create_contact))
        .route("/contacts/:id", get(get_contact).delete(delete_contact))
}

async fn get_contacts(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    Query(page): Query<PaginationRequest>,
) -> Result<Json<SuccessResult<PaginationResponse<Contact>>>, ApiError> {
    auth_user.require_role(ROLE_ADMIN)?;

    let total_records = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM contacts")
        .fetch_one(&pool)
        .await?;

    let items = sqlx::query_as::<_, Contact>(
        "SELECT * FROM contacts ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(&pool)
    .await?;

    let response = PaginationResponse::new(items, total_records, &page);
    if response.is_empty() {
        return Err(ApiError::NotFound);
    }

    Ok(Json(SuccessResult::new(response)))
}

async fn get_contact(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResult<Contact>>, ApiError> {
    auth_user.require_role(ROLE_ADMIN)?;

    let contact = sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(SuccessResult::new(contact)))
}

async fn create_contact(
    Extension(pool): Extension<PgPool>,
    lang: Lang,
    Json(request): Json<CreateContactRequest>,
) -> Result<(StatusCode, Json<SuccessResult<Contact>>), ApiError> {
    if request.full_name.is_empty() {
        return Err(ApiError::validation("fullName", t(lang, "NotNullValidator")));
    }
    if request.email.is_empty() || !request.email.contains('@') {
        return Err(ApiError::validation("email", t(lang, "NotValidValidator")));
    }
    if request.message.is_empty() {
        return Err(ApiError::validation("message", t(lang, "NotNullValidator")));
    }

    let contact = sqlx::query_as::<_, Contact>(
        "INSERT INTO contacts (id, full_name, email, message) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&request.full_name)
    .bind(&request.email)
    .bind(&request.message)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(SuccessResult::new(contact))))
}

async fn delete_contact(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResult<()>>, ApiError> {
    auth_user.require_role(ROLE_ADMIN)?;

    let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }

    info!("admin {} deleted contact {id}", auth_user.id);

    Ok(Json(SuccessResult::new(())))
}
