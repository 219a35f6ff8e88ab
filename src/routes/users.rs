use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    routing::get,
    Router,
};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::{hash_password, AuthUser, ROLE_ADMIN};
use crate::error::ApiError;
use crate::i18n::{t, Lang};
use crate::model::user::{
    AppUser, CreateUserRequest, PaginationUserRequest, UpdateUserRequest, UserDetailResponse,
};
use crate::response::{PaginationRequest, PaginationResponse, SuccessResult};
use crate::routes::auth::{find_user_by_email, find_user_by_id, is_valid_phone, roles_of};

pub fn users_router() -> Router {
    Router::new()
        .route("/users", get(get_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

async fn get_users(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    Query(query): Query<PaginationUserRequest>,
) -> Result<Json<SuccessResult<PaginationResponse<UserDetailResponse>>>, ApiError> {
    auth_user.require_role(ROLE_ADMIN)?;

    let page = PaginationRequest {
        page_index: query.page_index,
        page_size: query.page_size,
    };

    let total_records = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%')",
    )
    .bind(&query.name)
    .fetch_one(&pool)
    .await?;

    let users = sqlx::query_as::<_, AppUser>(
        "SELECT * FROM users
         WHERE ($1::text IS NULL OR name ILIKE '%' || $1 || '%')
         ORDER BY created_at DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(&query.name)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(&pool)
    .await?;

    let mut items = Vec::with_capacity(users.len());
    for user in users {
        let roles = roles_of(&pool, user.id).await?;
        items.push(UserDetailResponse::from_user(user, roles));
    }

    let response = PaginationResponse::new(items, total_records, &page);
    if response.is_empty() {
        return Err(ApiError::NotFound);
    }

    Ok(Json(SuccessResult::new(response)))
}

async fn get_user(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResult<UserDetailResponse>>, ApiError> {
    // Admins can read anyone; everyone else only themselves.
    if auth_user.id != id {
        auth_user.require_role(ROLE_ADMIN)?;
    }

    let user = find_user_by_id(&pool, id).await?.ok_or(ApiError::NotFound)?;
    let roles = roles_of(&pool, user.id).await?;

    Ok(Json(SuccessResult::new(UserDetailResponse::from_user(
        user, roles,
    ))))
}

async fn create_user(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    lang: Lang,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<SuccessResult<UserDetailResponse>>), ApiError> {
    auth_user.require_role(ROLE_ADMIN)?;

    if request.email.is_empty() || !request.email.contains('@') {
        return Err(ApiError::validation("email", t(lang, "NotValidValidator")));
    }
    if request.password.len() < 6 {
        return Err(ApiError::validation(
            "password",
            t(lang, "NotValidValidator"),
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
    if find_user_by_email(&pool, &request.email).await?.is_some() {
        return Err(ApiError::BadRequest(t(lang, "UserIsExist")));
    }

    let user_id = Uuid::new_v4();
    let password_hash = hash_password(&request.password)?;

    let mut tx = pool.begin().await?;

    // Admin-created accounts skip the email confirmation round trip.
    sqlx::query(
        "INSERT INTO users (id, email, email_confirmed, password_hash, name, phone_number, gender, date_of_birth, address, ward_id)
         VALUES ($1, $2, TRUE, $3, $4, $5, $6, $7, $8, $9)",
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
    .await?;

    for role in &request.roles {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) SELECT $1, id FROM roles WHERE name = $2",
        )
        .bind(user_id)
        .bind(role)
        .execute(&mut tx)
        .await?;
    }

    tx.commit().await?;

    info!("admin {} created user {user_id}", auth_user.id);

    let user = find_user_by_id(&pool, user_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let roles = roles_of(&pool, user_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(SuccessResult::new(UserDetailResponse::from_user(
            user, roles,
        ))),
    ))
}

async fn update_user(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    lang: Lang,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<SuccessResult<UserDetailResponse>>, ApiError> {
    if auth_user.id != id {
        auth_user.require_role(ROLE_ADMIN)?;
    }
    if request.name.is_empty() {
        return Err(ApiError::validation("name", t(lang, "NotNullValidator")));
    }
    if let Some(phone) = &request.phone_number {
        if !is_valid_phone(phone) {
            return Err(ApiError::validation(
                "phoneNumber",
                t(lang, "RegularExpressionValidator"),
            ));
        }
    }

    let user = find_user_by_id(&pool, id).await?.ok_or(ApiError::NotFound)?;

    sqlx::query(
        "UPDATE users SET name = $2, phone_number = $3, gender = $4, date_of_birth = $5,
         address = $6, ward_id = $7, updated_at = now() WHERE id = $1",
    )
    .bind(user.id)
    .bind(&request.name)
    .bind(&request.phone_number)
    .bind(request.gender)
    .bind(request.date_of_birth)
    .bind(&request.address)
    .bind(request.ward_id)
    .execute(&pool)
    .await?;

    let user = find_user_by_id(&pool, id).await?.ok_or(ApiError::NotFound)?;
    let roles = roles_of(&pool, user.id).await?;

    Ok(Json(SuccessResult::new(UserDetailResponse::from_user(
        user, roles,
    ))))
}

async fn delete_user(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResult<()>>, ApiError> {
    auth_user.require_role(ROLE_ADMIN)?;

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound);
    }

    info!("admin {} deleted user {id}", auth_user.id);

    Ok(Json(SuccessResult::new(())))
}
