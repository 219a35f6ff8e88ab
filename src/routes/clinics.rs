use axum::{
    body::Bytes,
    extract::{Extension, Json, Multipart, Path, Query},
    http::{header, HeaderMap, HeaderValue, StatusCode},
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
use crate::model::clinic::{
    Clinic, ClinicDetailForAdminResponse, ClinicDetailResponse, CreateClinicRequest, NameResponse,
    PaginationClinicRequest, UpdateClinicRequest,
};
use crate::model::text_content::{delete_content, insert_bilingual, update_bilingual};
use crate::response::{PaginationRequest, PaginationResponse, SuccessResult};

const DETAIL_QUERY: &str = "
    SELECT c.id, c.name, c.address, c.image, c.ward_id,
           w.ward_name, d.district_name, p.province_name,
           tr.content AS description,
           c.created_at
    FROM clinics c
    LEFT JOIN translations tr ON tr.text_content_id = c.description_id AND tr.language_id = $1
    LEFT JOIN wards w ON w.id = c.ward_id
    LEFT JOIN districts d ON d.id = w.district_id
    LEFT JOIN provinces p ON p.id = d.province_id";

/// CSV row for bulk import. Header names match the export.
#[derive(Debug, Deserialize)]
struct ClinicCsvRecord {
    name: String,
    address: String,
    ward_id: Option<i32>,
    en_description: String,
    vi_description: String,
}

pub fn clinics_router() -> Router {
    Router::new()
        .route("/clinics", get(get_clinics).post(create_clinic))
        .route("/clinics/list-name", get(list_names))
        .route(
            "/clinics/:id",
            get(get_clinic).put(update_clinic).delete(delete_clinic),
        )
        .route("/clinics/admin/:id", get(get_clinic_for_admin))
        .route("/clinics/import", axum::routing::post(import_clinics))
        .route("/clinics/export", axum::routing::post(export_clinics))
}

async fn get_clinics(
    Extension(pool): Extension<PgPool>,
    lang: Lang,
    Query(query): Query<PaginationClinicRequest>,
) -> Result<Json<SuccessResult<PaginationResponse<ClinicDetailResponse>>>, ApiError> {
    let page = PaginationRequest {
        page_index: query.page_index,
        page_size: query.page_size,
    };

    let total_records = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM clinics c
         WHERE ($1::text IS NULL OR c.name ILIKE '%' || $1 || '%')
           AND ($2::int IS NULL OR c.ward_id = $2)",
    )
    .bind(&query.name)
    .bind(query.ward_id)
    .fetch_one(&pool)
    .await?;

    let items = sqlx::query_as::<_, ClinicDetailResponse>(&format!(
        "{DETAIL_QUERY}
         WHERE ($2::text IS NULL OR c.name ILIKE '%' || $2 || '%')
           AND ($3::int IS NULL OR c.ward_id = $3)
         ORDER BY c.created_at DESC
         LIMIT $4 OFFSET $5"
    ))
    .bind(lang.code())
    .bind(&query.name)
    .bind(query.ward_id)
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

async fn list_names(
    Extension(pool): Extension<PgPool>,
) -> Result<Json<SuccessResult<Vec<NameResponse>>>, ApiError> {
    let names =
        sqlx::query_as::<_, NameResponse>("SELECT id, name FROM clinics ORDER BY name")
            .fetch_all(&pool)
            .await?;

    Ok(Json(SuccessResult::new(names)))
}

async fn get_clinic(
    Extension(pool): Extension<PgPool>,
    lang: Lang,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResult<ClinicDetailResponse>>, ApiError> {
    let clinic = sqlx::query_as::<_, ClinicDetailResponse>(&format!(
        "{DETAIL_QUERY} WHERE c.id = $2"
    ))
    .bind(lang.code())
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok(Json(SuccessResult::new(clinic)))
}

async fn get_clinic_for_admin(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResult<ClinicDetailForAdminResponse>>, ApiError> {
    auth_user.require_role(ROLE_ADMIN)?;

    let clinic = sqlx::query_as::<_, ClinicDetailForAdminResponse>(
        "SELECT c.id, c.name, c.address, c.image, c.ward_id,
                en.content AS en_description, vi.content AS vi_description,
                c.created_at
         FROM clinics c
         LEFT JOIN translations en ON en.text_content_id = c.description_id AND en.language_id = 'en'
         LEFT JOIN translations vi ON vi.text_content_id = c.description_id AND vi.language_id = 'vi'
         WHERE c.id = $1",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok(Json(SuccessResult::new(clinic)))
}

async fn create_clinic(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    lang: Lang,
    Json(request): Json<CreateClinicRequest>,
) -> Result<(StatusCode, Json<SuccessResult<Clinic>>), ApiError> {
    auth_user.require_role(ROLE_ADMIN)?;

    if request.name.is_empty() {
        return Err(ApiError::validation("name", t(lang, "NotNullValidator")));
    }
    if request.address.is_empty() {
        return Err(ApiError::validation("address", t(lang, "NotNullValidator")));
    }

    let mut tx = pool.begin().await?;
    let clinic = insert_clinic(&mut tx, &request).await?;
    tx.commit().await?;

    info!("admin {} created clinic {}", auth_user.id, clinic.id);

    Ok((StatusCode::CREATED, Json(SuccessResult::new(clinic))))
}

async fn insert_clinic(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    request: &CreateClinicRequest,
) -> Result<Clinic, ApiError> {
    let description_id =
        insert_bilingual(tx, &request.en_description, &request.vi_description).await?;

    let clinic = sqlx::query_as::<_, Clinic>(
        "INSERT INTO clinics (id, name, address, image, ward_id, description_id)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&request.name)
    .bind(&request.address)
    .bind(&request.image)
    .bind(request.ward_id)
    .bind(description_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(clinic)
}

async fn update_clinic(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    lang: Lang,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateClinicRequest>,
) -> Result<Json<SuccessResult<Clinic>>, ApiError> {
    auth_user.require_role(ROLE_ADMIN)?;

    if request.name.is_empty() {
        return Err(ApiError::validation("name", t(lang, "NotNullValidator")));
    }

    let existing = sqlx::query_as::<_, Clinic>("SELECT * FROM clinics WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::BadRequest(t(lang, "ClinicIsNotExist")))?;

    let mut tx = pool.begin().await?;

    let clinic = sqlx::query_as::<_, Clinic>(
        "UPDATE clinics SET name = $2, address = $3, image = $4, ward_id = $5, updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(&request.name)
    .bind(&request.address)
    .bind(&request.image)
    .bind(request.ward_id)
    .fetch_one(&mut tx)
    .await?;

    update_bilingual(
        &mut tx,
        existing.description_id,
        &request.en_description,
        &request.vi_description,
    )
    .await?;

    tx.commit().await?;

    Ok(Json(SuccessResult::new(clinic)))
}

async fn delete_clinic(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    lang: Lang,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResult<()>>, ApiError> {
    auth_user.require_role(ROLE_ADMIN)?;

    let existing = sqlx::query_as::<_, Clinic>("SELECT * FROM clinics WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(ApiError::NotFound)?;

    let in_use = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM doctor_infos WHERE clinic_id = $1",
    )
    .bind(id)
    .fetch_one(&pool)
    .await?;
    if in_use > 0 {
        return Err(ApiError::Conflict(t(lang, "ClinicIsInUse")));
    }

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM clinics WHERE id = $1")
        .bind(id)
        .execute(&mut tx)
        .await?;
    delete_content(&mut tx, existing.description_id).await?;

    tx.commit().await?;

    info!("admin {} deleted clinic {id}", auth_user.id);

    Ok(Json(SuccessResult::new(())))
}

async fn import_clinics(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    lang: Lang,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SuccessResult<Vec<Clinic>>>), ApiError> {
    auth_user.require_role(ROLE_ADMIN)?;

    let data = read_file_field(&mut multipart, lang).await?;

    let mut reader = csv::Reader::from_reader(data.as_ref());
    let mut requests = Vec::new();
    for record in reader.deserialize::<ClinicCsvRecord>() {
        let record = record
            .map_err(|e| ApiError::BadRequest(format!("{}: {e}", t(lang, "CsvInValid"))))?;
        if record.name.is_empty() || record.address.is_empty() {
            return Err(ApiError::BadRequest(t(lang, "CsvInValid")));
        }
        requests.push(CreateClinicRequest {
            name: record.name,
            address: record.address,
            image: None,
            ward_id: record.ward_id,
            en_description: record.en_description,
            vi_description: record.vi_description,
        });
    }
    if requests.is_empty() {
        return Err(ApiError::BadRequest(t(lang, "CsvInValid")));
    }

    // All rows land or none do.
    let mut tx = pool.begin().await?;
    let mut clinics = Vec::with_capacity(requests.len());
    for request in &requests {
        clinics.push(insert_clinic(&mut tx, request).await?);
    }
    tx.commit().await?;

    info!("admin {} imported {} clinics", auth_user.id, clinics.len());

    Ok((StatusCode::CREATED, Json(SuccessResult::new(clinics))))
}

async fn export_clinics(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
) -> Result<(HeaderMap, String), ApiError> {
    auth_user.require_role(ROLE_ADMIN)?;

    let rows = sqlx::query_as::<_, ClinicDetailForAdminResponse>(
        "SELECT c.id, c.name, c.address, c.image, c.ward_id,
                en.content AS en_description, vi.content AS vi_description,
                c.created_at
         FROM clinics c
         LEFT JOIN translations en ON en.text_content_id = c.description_id AND en.language_id = 'en'
         LEFT JOIN translations vi ON vi.text_content_id = c.description_id AND vi.language_id = 'vi'
         ORDER BY c.name",
    )
    .fetch_all(&pool)
    .await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["name", "address", "ward_id", "en_description", "vi_description"])
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    for row in &rows {
        writer
            .write_record([
                row.name.as_str(),
                row.address.as_str(),
                &row.ward_id.map(|w| w.to_string()).unwrap_or_default(),
                row.en_description.as_deref().unwrap_or(""),
                row.vi_description.as_deref().unwrap_or(""),
            ])
            .map_err(|e| ApiError::Internal(e.to_string()))?;
    }
    let body = String::from_utf8(
        writer
            .into_inner()
            .map_err(|e| ApiError::Internal(e.to_string()))?,
    )
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"clinics.csv\""),
    );

    Ok((headers, body))
}

/// Pull the first `file` field out of a multipart upload.
pub async fn read_file_field(multipart: &mut Multipart, lang: Lang) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            return field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()));
        }
    }
    Err(ApiError::validation("file", t(lang, "NotNullValidator")))
}
