use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    routing::get,
    Router,
};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::{AuthUser, ROLE_ADMIN, ROLE_DOCTOR};
use crate::error::ApiError;
use crate::i18n::{t, Lang};
use crate::model::booking::{
    Booking, BookingDetailResponse, CreateBookingRequest, PaginationBookingRequest,
    UpdateStatusBookingRequest,
};
use crate::model::enums::BookingStatus;
use crate::response::{PaginationRequest, PaginationResponse, SuccessResult};
use crate::routes::auth::is_valid_phone;

const DETAIL_QUERY: &str = "
    SELECT b.id, b.doctor_id, u.name AS doctor_name, b.patient_id, b.schedule_id,
           s.date, s.time_slot, s.price,
           b.status, b.name, b.phone_number, b.gender, b.date_of_birth, b.note,
           b.created_at
    FROM bookings b
    JOIN users u ON u.id = b.doctor_id
    JOIN schedules s ON s.id = b.schedule_id";

pub fn bookings_router() -> Router {
    Router::new()
        .route("/bookings", get(get_bookings).post(create_booking))
        .route("/bookings/:id", get(get_booking).put(update_status))
}

async fn get_bookings(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    Query(query): Query<PaginationBookingRequest>,
) -> Result<Json<SuccessResult<PaginationResponse<BookingDetailResponse>>>, ApiError> {
    // Patients only see their own bookings; doctors only their schedule's.
    let mut query = query;
    if !auth_user.has_role(ROLE_ADMIN) {
        if auth_user.has_role(ROLE_DOCTOR) {
            query.doctor_id = Some(auth_user.id);
        } else {
            query.patient_id = Some(auth_user.id);
        }
    }

    let page = PaginationRequest {
        page_index: query.page_index,
        page_size: query.page_size,
    };

    let total_records = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM bookings b
         WHERE ($1::uuid IS NULL OR b.doctor_id = $1)
           AND ($2::uuid IS NULL OR b.patient_id = $2)",
    )
    .bind(query.doctor_id)
    .bind(query.patient_id)
    .fetch_one(&pool)
    .await?;

    let items = sqlx::query_as::<_, BookingDetailResponse>(&format!(
        "{DETAIL_QUERY}
         WHERE ($1::uuid IS NULL OR b.doctor_id = $1)
           AND ($2::uuid IS NULL OR b.patient_id = $2)
         ORDER BY b.created_at DESC
         LIMIT $3 OFFSET $4"
    ))
    .bind(query.doctor_id)
    .bind(query.patient_id)
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

async fn get_booking(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResult<BookingDetailResponse>>, ApiError> {
    let booking = sqlx::query_as::<_, BookingDetailResponse>(&format!(
        "{DETAIL_QUERY} WHERE b.id = $1"
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(ApiError::NotFound)?;

    if !(auth_user.has_role(ROLE_ADMIN)
        || booking.patient_id == auth_user.id
        || booking.doctor_id == auth_user.id)
    {
        return Err(ApiError::Forbidden);
    }

    Ok(Json(SuccessResult::new(booking)))
}

async fn create_booking(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    lang: Lang,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<SuccessResult<Booking>>), ApiError> {
    if request.name.is_empty() {
        return Err(ApiError::validation("name", t(lang, "NotNullValidator")));
    }
    if request.name.len() > 50 {
        return Err(ApiError::validation(
            "name",
            t(lang, "MaximumLengthValidator"),
        ));
    }
    if !is_valid_phone(&request.phone_number) {
        return Err(ApiError::validation(
            "phoneNumber",
            t(lang, "RegularExpressionValidator"),
        ));
    }

    let mut tx = pool.begin().await?;

    // Lock the slot row so the capacity check and the counter bump stay
    // consistent under concurrent bookings.
    let schedule = sqlx::query_as::<_, (Uuid, i32)>(
        "SELECT doctor_id, current_patient FROM schedules WHERE id = $1 FOR UPDATE",
    )
    .bind(request.schedule_id)
    .fetch_optional(&mut tx)
    .await?
    .ok_or_else(|| ApiError::BadRequest(t(lang, "ScheduleIsNotExist")))?;

    if schedule.0 != request.doctor_id {
        return Err(ApiError::BadRequest(t(lang, "ScheduleIsNotExist")));
    }

    let max_patient =
        sqlx::query_scalar::<_, i32>("SELECT max_patient FROM doctor_infos WHERE id = $1")
            .bind(request.doctor_id)
            .fetch_optional(&mut tx)
            .await?
            .ok_or_else(|| ApiError::BadRequest(t(lang, "DoctorIsNotExist")))?;

    if schedule.1 >= max_patient {
        return Err(ApiError::BadRequest(t(lang, "ScheduleIsFull")));
    }

    let booking = sqlx::query_as::<_, Booking>(
        "INSERT INTO bookings (id, doctor_id, patient_id, schedule_id, status, name, phone_number, gender, date_of_birth, note)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(request.doctor_id)
    .bind(auth_user.id)
    .bind(request.schedule_id)
    .bind(BookingStatus::New)
    .bind(&request.name)
    .bind(&request.phone_number)
    .bind(request.gender)
    .bind(request.date_of_birth)
    .bind(&request.note)
    .fetch_one(&mut tx)
    .await?;

    sqlx::query("UPDATE schedules SET current_patient = current_patient + 1, updated_at = now() WHERE id = $1")
        .bind(request.schedule_id)
        .execute(&mut tx)
        .await?;

    tx.commit().await?;

    info!("patient {} booked schedule {}", auth_user.id, request.schedule_id);

    Ok((StatusCode::CREATED, Json(SuccessResult::new(booking))))
}

async fn update_status(
    Extension(pool): Extension<PgPool>,
    auth_user: AuthUser,
    lang: Lang,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusBookingRequest>,
) -> Result<Json<SuccessResult<Booking>>, ApiError> {
    let mut tx = pool.begin().await?;

    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut tx)
        .await?
        .ok_or_else(|| ApiError::BadRequest(t(lang, "BookingIsNotExist")))?;

    // Staff drive the workflow; a patient may only cancel their own booking.
    let is_staff = auth_user.has_role(ROLE_ADMIN)
        || (auth_user.has_role(ROLE_DOCTOR) && booking.doctor_id == auth_user.id);
    let is_own_cancel =
        booking.patient_id == auth_user.id && request.status == BookingStatus::Cancel;
    if !(is_staff || is_own_cancel) {
        return Err(ApiError::Forbidden);
    }

    if !booking.status.can_transition_to(request.status) {
        return Err(ApiError::BadRequest(t(lang, "InvalidStatusTransition")));
    }

    let booking = sqlx::query_as::<_, Booking>(
        "UPDATE bookings SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(request.status)
    .fetch_one(&mut tx)
    .await?;

    // A cancellation frees the seat for someone else.
    if request.status == BookingStatus::Cancel {
        sqlx::query(
            "UPDATE schedules SET current_patient = GREATEST(current_patient - 1, 0), updated_at = now() WHERE id = $1",
        )
        .bind(booking.schedule_id)
        .execute(&mut tx)
        .await?;
    }

    tx.commit().await?;

    info!("booking {id} moved to {:?}", request.status);

    Ok(Json(SuccessResult::new(booking)))
}
