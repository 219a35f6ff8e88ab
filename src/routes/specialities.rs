use axum::{
    extract::{Extension, Json, Multipart, Path, Query},
    http::StatusCode,
    routing::get,
    Router,
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::{AuthUser, ROLE_ADMIN};
use crate::error::ApiError;
use crate::i18n::{t, Lang};
use crate::model::clinic::NameResponse;
use crate::model::speciality::{
    CreateSpecialityRequest, PaginationSpecialityRequest, Speciality, SpecialityDetailResponse,
    UpdateSpecialityRequest,
};
use crate::model::text_content::{delete_content, insert_bilingual, update_bilingual};
use crate::response::{PaginationRequest, PaginationResponse, SuccessResult};
use crate::routes::clinics::read_file_field;

const DETAIL_QUERY: &str = "
    SELECT s.id, s.image, nt.content AS name, dt.content AS description, s.created_at
    FROM specialities s
    LEFT JOIN translations nt ON nt.text_content_id = s.name_id AND nt.language_id = $1
    LEFT JOIN translations dt ON dt.text_content_id = s.description_id AND dt.language_id = $1";

#[derive(Debug, Deserialize)]
struct SpecialityCsvRecord {
    en_name: String,
    vi_name: String,
    en_description: String,
    vi_description: String,
}

pub fn specialities_router() -> Router {
    Router::new()
        .route(
            "/specialities",
            get(get_specialities).post(create_speciality),
        )
        .route("/specialities/all", get(get_all_specialities))
        .route("/specialities/list-name", get(list_names))
        .route(
            "/specialities/:id",
            get(get_speciality)
                .put(update_speciality)
                .delete(delete_speciality),
        )
        .route(
            "/specialities/import",
            axum::routing::post(import_specialities),
        )
}

async fn get_specialities(
    Extension(pool): Extension<PgPool>,
    lang: Lang,
    Query(query): Query<PaginationSpecialityRequest>,
) -> Result<Json<SuccessResult<PaginationResponse<SpecialityDetailResponse>>>, ApiError> {
    let page = PaginationRequest {
        page_index: query.page_index,
        page_size: query.page_size,
    };

    let total_records = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*)
         FROM specialities s
         LEFT JOIN translations nt ON nt.text_content_id = s.name_id AND nt.language_id = $1
         WHERE ($2::text IS NULL OR nt.content ILIKE '%' || $2 || '%')",
    )
    .bind(lang.code())
    .bind(&query.name)
    .fetch_one(&pool)
    .await?;

    let items = sqlx::query_as::<_, SpecialityDetailResponse>(&format!(
        "{DETAIL_QUERY}
         WHERE ($2::text IS NULL OR nt.content ILIKE '%' || $2 || '%')
         ORDER BY s.created_at DESC
         LIMIT $3 OFFSET $4"
    ))
    .bind(lang.code())
    .bind(&query.name)
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

async fn get_all_specialities(
    Extension(pool): Extension<PgPool>,
    lang: Lang,
) -> Result<Json<SuccessResult<Vec<SpecialityDetailResponse>>>, ApiError> {
    let items = sqlx::query_as::<_, SpecialityDetailResponse>(&format!(
        "{DETAIL_QUERY} ORDER BY nt.content"
    ))
    .bind(lang.code())
    .fetch_all(&pool)
    .await?;

    Ok(Json(SuccessResult::new(items)))
}

async fn list_names(
    Extension(pool): Extension<PgPool>,
    lang: Lang,
) -> Result<Json<SuccessResult<Vec<NameResponse>>>, ApiError> {
    let names = sqlx::query_as::<_, NameResponse>(
        "SELECT s.id, COALESCE(nt.content, tc.original_text) AS name
         FROM specialities s
         JOIN text_contents tc ON tc.id = s.name_id
         LEFT JOIN translations nt ON nt.text_content_id = s.name_id AND nt.language_id = $1
         ORDER BY name",
    )
    .bind(lang.code())
    .fetch_all(&pool)
    .await?;

    Ok(Json(SuccessResult::new(names)))
}

async fn get_speciality(
    Extension(pool): Extension<PgPool>,
    lang: Lang,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResult<SpecialityDetailResponse>>, ApiError> {
    let speciality = sqlx::query_as::<_, SpecialityDetailResponse>(&format!(
        "{DETAIL_QUERY} WHERE s.id = $2"
    ))
    .bind(lang.code())
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok(Json(SuccessResult::new(speciality)))
}

async fn create_speciality(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    lang: Lang,
    Json(request): Json<CreateSpecialityRequest>,
) -> Result<(StatusCode, Json<SuccessResult<Speciality>>), ApiError> {
    auth_user.require_role(ROLE_ADMIN)?;

    if request.en_name.is_empty() || request.vi_name.is_empty() {
        return Err(ApiError::validation("name", t(lang, "NotNullValidator")));
    }

    let mut tx = pool.begin().await?;
    let speciality = insert_speciality(&mut tx, &request).await?;
    tx.commit().await?;

    info!("admin {} created speciality {}", auth_user.id, speciality.id);

    Ok((StatusCode::CREATED, Json(SuccessResult::new(speciality))))
}

async fn insert_speciality(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    request: &CreateSpecialityRequest,
) -> Result<Speciality, ApiError> {
    let name_id = insert_bilingual(tx, &request.en_name, &request.vi_name).await?;
    let description_id =
        insert_bilingual(tx, &request.en_description, &request.vi_description).await?;

    let speciality = sqlx::query_as::<_, Speciality>(
        "INSERT INTO specialities (id, image, name_id, description_id)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&request.image)
    .bind(name_id)
    .bind(description_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(speciality)
}

async fn update_speciality(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    lang: Lang,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateSpecialityRequest>,
) -> Result<Json<SuccessResult<Speciality>>, ApiError> {
    auth_user.require_role(ROLE_ADMIN)?;

    if request.en_name.is_empty() || request.vi_name.is_empty() {
        return Err(ApiError::validation("name", t(lang, "NotNullValidator")));
    }

    let existing = sqlx::query_as::<_, Speciality>("SELECT * FROM specialities WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::BadRequest(t(lang, "SpecialityIsNotExist")))?;

    let mut tx = pool.begin().await?;

    let speciality = sqlx::query_as::<_, Speciality>(
        "UPDATE specialities SET image = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&request.image)
    .fetch_one(&mut tx)
    .await?;

    update_bilingual(&mut tx, existing.name_id, &request.en_name, &request.vi_name).await?;
    update_bilingual(
        &mut tx,
        existing.description_id,
        &request.en_description,
        &request.vi_description,
    )
    .await?;

    tx.commit().await?;

    Ok(Json(SuccessResult::new(speciality)))
}

async fn delete_speciality(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    lang: Lang,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResult<()>>, ApiError> {
    auth_user.require_role(ROLE_ADMIN)?;

    let existing = sqlx::query_as::<_, Speciality>("SELECT * FROM specialities WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(ApiError::NotFound)?;

    let in_use = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM doctor_infos WHERE speciality_id = $1",
    )
    .bind(id)
    .fetch_one(&pool)
    .await?;
    if in_use > 0 {
        return Err(ApiError::Conflict(t(lang, "SpecialityIsInUse")));
    }

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM specialities WHERE id = $1")
        .bind(id)
        .execute(&mut tx)
        .await?;
    delete_content(&mut tx, existing.name_id).await?;
    delete_content(&mut tx, existing.description_id).await?;

    tx.commit().await?;

    info!("admin {} deleted speciality {id}", auth_user.id);

    Ok(Json(SuccessResult::new(())))
}

async fn import_specialities(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    lang: Lang,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SuccessResult<Vec<Speciality>>>), ApiError> {
    auth_user.require_role(ROLE_ADMIN)?;

    let data = read_file_field(&mut multipart, lang).await?;

    let mut reader = csv::Reader::from_reader(data.as_ref());
    let mut requests = Vec::new();
    for record in reader.deserialize::<SpecialityCsvRecord>() {
        let record = record
            .map_err(|e| ApiError::BadRequest(format!("{}: {e}", t(lang, "CsvInValid"))))?;
        if record.en_name.is_empty() || record.vi_name.is_empty() {
            return Err(ApiError::BadRequest(t(lang, "CsvInValid")));
        }
        requests.push(CreateSpecialityRequest {
            image: None,
            en_name: record.en_name,
            vi_name: record.vi_name,
            en_description: record.en_description,
            vi_description: record.vi_description,
        });
    }
    if requests.is_empty() {
        return Err(ApiError::BadRequest(t(lang, "CsvInValid")));
    }

    let mut tx = pool.begin().await?;
    let mut specialities = Vec::with_capacity(requests.len());
    for request in &requests {
        specialities.push(insert_speciality(&mut tx, request).await?);
    }
    tx.commit().await?;

    info!(
        "admin {} imported {} specialities",
        auth_user.id,
        specialities.len()
    );

    Ok((StatusCode::CREATED, Json(SuccessResult::new(specialities))))
}
