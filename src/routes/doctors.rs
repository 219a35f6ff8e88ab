use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    routing::{get, put},
    Router,
};
use chrono::Utc;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::{hash_password, AuthUser, ROLE_ADMIN, ROLE_DOCTOR};
use crate::error::ApiError;
use crate::i18n::{t, Lang};
use crate::model::doctor::{
    CreateDoctorRequest, DoctorInfoDetailResponse, PaginationDoctorRequest, UpdateDoctorRequest,
};
use crate::model::enums::TimeSlot;
use crate::model::schedule::{
    blocked_removals, diff_slots, GetScheduleQuery, Schedule, SetScheduleRequest,
};
use crate::model::text_content::{insert_bilingual, update_bilingual};
use crate::response::{PaginationRequest, PaginationResponse, SuccessResult};
use crate::routes::auth::{find_user_by_email, is_valid_phone};

/// Initial password for doctor accounts created from the admin panel.
const DEFAULT_DOCTOR_PASSWORD: &str = "123456a@";

const DETAIL_COLUMNS: &str = "
    u.id, u.name, u.email, u.phone_number, u.gender, u.date_of_birth, u.address, u.ward_id,
    w.ward_name, d2.district_name, p.province_name,
    di.image, di.max_patient, di.price,
    di.clinic_id, c.name AS clinic_name,
    di.speciality_id, st.content AS speciality_name,
    pt.content AS position, dt.content AS description,
    u.created_at";

const DETAIL_JOINS: &str = "
    FROM users u
    JOIN doctor_infos di ON di.id = u.id
    JOIN clinics c ON c.id = di.clinic_id
    JOIN specialities s ON s.id = di.speciality_id
    LEFT JOIN translations st ON st.text_content_id = s.name_id AND st.language_id = $1
    LEFT JOIN translations pt ON pt.text_content_id = di.position_id AND pt.language_id = $1
    LEFT JOIN translations dt ON dt.text_content_id = di.description_id AND dt.language_id = $1
    LEFT JOIN wards w ON w.id = u.ward_id
    LEFT JOIN districts d2 ON d2.id = w.district_id
    LEFT JOIN provinces p ON p.id = d2.province_id";

pub fn doctors_router() -> Router {
    Router::new()
        .route("/doctors", get(get_doctors).post(create_doctor))
        .route("/doctors/:id", get(get_doctor).put(update_doctor))
        .route("/doctors/get-schedule", get(get_schedule))
        .route("/doctors/set-schedule", put(set_schedule))
}

async fn get_doctors(
    Extension(pool): Extension<PgPool>,
    lang: Lang,
    Query(query): Query<PaginationDoctorRequest>,
) -> Result<Json<SuccessResult<PaginationResponse<DoctorInfoDetailResponse>>>, ApiError> {
    let page = PaginationRequest {
        page_index: query.page_index,
        page_size: query.page_size,
    };

    let filter = "
        WHERE ($2::text IS NULL OR u.name ILIKE '%' || $2 || '%')
          AND ($3::int IS NULL OR u.ward_id = $3)
          AND ($4::uuid IS NULL OR di.clinic_id = $4)
          AND ($5::uuid IS NULL OR di.speciality_id = $5)";

    let total_records = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) {DETAIL_JOINS} {filter}"
    ))
    .bind(lang.code())
    .bind(&query.name)
    .bind(query.ward_id)
    .bind(query.clinic_id)
    .bind(query.speciality_id)
    .fetch_one(&pool)
    .await?;

    let items = sqlx::query_as::<_, DoctorInfoDetailResponse>(&format!(
        "SELECT {DETAIL_COLUMNS} {DETAIL_JOINS} {filter}
         ORDER BY u.created_at DESC
         LIMIT $6 OFFSET $7"
    ))
    .bind(lang.code())
    .bind(&query.name)
    .bind(query.ward_id)
    .bind(query.clinic_id)
    .bind(query.speciality_id)
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

async fn get_doctor(
    Extension(pool): Extension<PgPool>,
    lang: Lang,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResult<DoctorInfoDetailResponse>>, ApiError> {
    let doctor = sqlx::query_as::<_, DoctorInfoDetailResponse>(&format!(
        "SELECT {DETAIL_COLUMNS} {DETAIL_JOINS} WHERE u.id = $2"
    ))
    .bind(lang.code())
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok(Json(SuccessResult::new(doctor)))
}

async fn create_doctor(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    lang: Lang,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<SuccessResult<DoctorInfoDetailResponse>>), ApiError> {
    auth_user.require_role(ROLE_ADMIN)?;

    if request.email.is_empty() || !request.email.contains('@') {
        return Err(ApiError::validation("email", t(lang, "NotValidValidator")));
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
    if request.max_patient <= 0 {
        return Err(ApiError::validation(
            "maxPatient",
            t(lang, "NotValidValidator"),
        ));
    }
    if find_user_by_email(&pool, &request.email).await?.is_some() {
        return Err(ApiError::BadRequest(t(lang, "UserIsExist")));
    }

    let clinic_exists =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clinics WHERE id = $1")
            .bind(request.clinic_id)
            .fetch_one(&pool)
            .await?;
    if clinic_exists == 0 {
        return Err(ApiError::BadRequest(t(lang, "ClinicIsNotExist")));
    }
    let speciality_exists =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM specialities WHERE id = $1")
            .bind(request.speciality_id)
            .fetch_one(&pool)
            .await?;
    if speciality_exists == 0 {
        return Err(ApiError::BadRequest(t(lang, "SpecialityIsNotExist")));
    }

    let user_id = Uuid::new_v4();
    let password_hash = hash_password(DEFAULT_DOCTOR_PASSWORD)?;

    let mut tx = pool.begin().await?;

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

    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id) SELECT $1, id FROM roles WHERE name = $2",
    )
    .bind(user_id)
    .bind(ROLE_DOCTOR)
    .execute(&mut tx)
    .await?;

    let position_id = insert_bilingual(&mut tx, &request.en_position, &request.vi_position).await?;
    let description_id =
        insert_bilingual(&mut tx, &request.en_description, &request.vi_description).await?;

    sqlx::query(
        "INSERT INTO doctor_infos (id, image, max_patient, price, clinic_id, speciality_id, position_id, description_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(user_id)
    .bind(&request.image)
    .bind(request.max_patient)
    .bind(request.price)
    .bind(request.clinic_id)
    .bind(request.speciality_id)
    .bind(position_id)
    .bind(description_id)
    .execute(&mut tx)
    .await?;

    tx.commit().await?;

    info!("admin {} created doctor {user_id}", auth_user.id);

    let doctor = sqlx::query_as::<_, DoctorInfoDetailResponse>(&format!(
        "SELECT {DETAIL_COLUMNS} {DETAIL_JOINS} WHERE u.id = $2"
    ))
    .bind(lang.code())
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(SuccessResult::new(doctor))))
}

async fn update_doctor(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    lang: Lang,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<SuccessResult<DoctorInfoDetailResponse>>, ApiError> {
    if auth_user.id != id {
        auth_user.require_role(ROLE_ADMIN)?;
    }
    if request.name.is_empty() {
        return Err(ApiError::validation("name", t(lang, "NotNullValidator")));
    }
    if request.max_patient <= 0 {
        return Err(ApiError::validation(
            "maxPatient",
            t(lang, "NotValidValidator"),
        ));
    }

    let info = sqlx::query_as::<_, (Uuid, Uuid)>(
        "SELECT position_id, description_id FROM doctor_infos WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::BadRequest(t(lang, "DoctorIsNotExist")))?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE users SET name = $2, phone_number = $3, gender = $4, date_of_birth = $5,
         address = $6, ward_id = $7, updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .bind(&request.name)
    .bind(&request.phone_number)
    .bind(request.gender)
    .bind(request.date_of_birth)
    .bind(&request.address)
    .bind(request.ward_id)
    .execute(&mut tx)
    .await?;

    sqlx::query(
        "UPDATE doctor_infos SET image = $2, max_patient = $3, price = $4, updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .bind(&request.image)
    .bind(request.max_patient)
    .bind(request.price)
    .execute(&mut tx)
    .await?;

    update_bilingual(&mut tx, info.0, &request.en_position, &request.vi_position).await?;
    update_bilingual(
        &mut tx,
        info.1,
        &request.en_description,
        &request.vi_description,
    )
    .await?;

    tx.commit().await?;

    let doctor = sqlx::query_as::<_, DoctorInfoDetailResponse>(&format!(
        "SELECT {DETAIL_COLUMNS} {DETAIL_JOINS} WHERE u.id = $2"
    ))
    .bind(lang.code())
    .bind(id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(SuccessResult::new(doctor)))
}

async fn get_schedule(
    Extension(pool): Extension<PgPool>,
    Query(query): Query<GetScheduleQuery>,
) -> Result<Json<SuccessResult<Vec<Schedule>>>, ApiError> {
    let schedules = sqlx::query_as::<_, Schedule>(
        "SELECT * FROM schedules WHERE doctor_id = $1 AND date = $2 ORDER BY time_slot",
    )
    .bind(query.doctor_id)
    .bind(query.date)
    .fetch_all(&pool)
    .await?;

    Ok(Json(SuccessResult::new(schedules)))
}

async fn set_schedule(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    lang: Lang,
    Json(request): Json<SetScheduleRequest>,
) -> Result<Json<SuccessResult<Vec<Schedule>>>, ApiError> {
    // Doctors manage their own days; admins can manage anyone's.
    if !(auth_user.has_role(ROLE_ADMIN)
        || (auth_user.has_role(ROLE_DOCTOR) && auth_user.id == request.doctor_id))
    {
        return Err(ApiError::Forbidden);
    }
    if request.date < Utc::now().date_naive() {
        return Err(ApiError::validation("date", t(lang, "NotValidValidator")));
    }

    let price = sqlx::query_scalar::<_, i64>("SELECT price FROM doctor_infos WHERE id = $1")
        .bind(request.doctor_id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::BadRequest(t(lang, "DoctorIsNotExist")))?;

    let mut tx = pool.begin().await?;

    let existing = sqlx::query_as::<_, Schedule>(
        "SELECT * FROM schedules WHERE doctor_id = $1 AND date = $2 FOR UPDATE",
    )
    .bind(request.doctor_id)
    .bind(request.date)
    .fetch_all(&mut tx)
    .await?;

    let existing_slots: Vec<_> = existing.iter().map(|s| s.time_slot).collect();
    let (to_add, to_remove) = diff_slots(&request.time_slots, &existing_slots);

    if !to_remove.is_empty() {
        let booked = sqlx::query_scalar::<_, TimeSlot>(
            "SELECT DISTINCT s.time_slot FROM schedules s
             JOIN bookings b ON b.schedule_id = s.id
             WHERE s.doctor_id = $1 AND s.date = $2",
        )
        .bind(request.doctor_id)
        .bind(request.date)
        .fetch_all(&mut tx)
        .await?;

        if !blocked_removals(&to_remove, &booked).is_empty() {
            return Err(ApiError::Conflict(t(lang, "ScheduleIsInUse")));
        }
    }

    for slot in to_add {
        sqlx::query(
            "INSERT INTO schedules (id, doctor_id, date, time_slot, price, current_patient)
             VALUES ($1, $2, $3, $4, $5, 0)",
        )
        .bind(Uuid::new_v4())
        .bind(request.doctor_id)
        .bind(request.date)
        .bind(slot)
        .bind(price)
        .execute(&mut tx)
        .await?;
    }

    for slot in to_remove {
        sqlx::query("DELETE FROM schedules WHERE doctor_id = $1 AND date = $2 AND time_slot = $3")
            .bind(request.doctor_id)
            .bind(request.date)
            .bind(slot)
            .execute(&mut tx)
            .await?;
    }

    tx.commit().await?;

    info!(
        "schedule for doctor {} on {} updated by {}",
        request.doctor_id, request.date, auth_user.id
    );

    let schedules = sqlx::query_as::<_, Schedule>(
        "SELECT * FROM schedules WHERE doctor_id = $1 AND date = $2 ORDER BY time_slot",
    )
    .bind(request.doctor_id)
    .bind(request.date)
    .fetch_all(&pool)
    .await?;

    Ok(Json(SuccessResult::new(schedules)))
}
