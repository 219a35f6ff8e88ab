use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Query},
    http::HeaderMap,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::i18n::{t, Lang};
use crate::model::booking::Booking;
use crate::model::enums::BookingStatus;
use crate::payment::momo::{self, MomoCallback};
use crate::payment::vnpay::{build_payment_request, VnPayIpnResponse, VnPayParams};
use crate::response::SuccessResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub booking_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentUrlResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReturnResponse {
    pub success: bool,
    pub order_id: String,
    pub order_info: String,
    pub amount: i64,
}

pub fn payments_router() -> Router {
    Router::new()
        .route("/payments/vnpay-create", post(vnpay_create))
        .route("/payments/vnpay-return", get(vnpay_return))
        .route("/payments/vnpay-ipn", get(vnpay_ipn))
        .route("/payments/momo-create", post(momo_create))
        .route("/payments/momo-return", get(momo_return))
        .route("/payments/momo-ipn", get(momo_ipn))
}

/// Booking plus the slot price it is charged at.
async fn booking_with_price(
    pool: &PgPool,
    booking_id: Uuid,
    lang: Lang,
) -> Result<(Booking, i64), ApiError> {
    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
        .bind(booking_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::BadRequest(t(lang, "BookingIsNotExist")))?;

    let price = sqlx::query_scalar::<_, i64>("SELECT price FROM schedules WHERE id = $1")
        .bind(booking.schedule_id)
        .fetch_one(pool)
        .await?;

    Ok((booking, price))
}

/// Gateway order references carry the booking id plus a nanosecond tick so a
/// retried payment gets a fresh reference.
fn order_reference(booking_id: Uuid) -> String {
    format!("{}_{}", booking_id, Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

fn booking_id_from_reference(reference: &str) -> Option<Uuid> {
    reference.split('_').next().and_then(|s| Uuid::parse_str(s).ok())
}

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "127.0.0.1".to_string())
}

/// Terminal bookings stay put; a cancelled booking cannot be paid into
/// Completed.
fn payment_allowed(status: BookingStatus) -> bool {
    !status.is_terminal()
}

async fn mark_booking_paid(pool: &PgPool, booking_id: Uuid) -> Result<bool, ApiError> {
    let result = sqlx::query(
        "UPDATE bookings SET status = $2, updated_at = now() WHERE id = $1 AND status <> $2 AND status <> $3",
    )
    .bind(booking_id)
    .bind(BookingStatus::Completed)
    .bind(BookingStatus::Cancel)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

async fn vnpay_create(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AppConfig>>,
    auth_user: AuthUser,
    lang: Lang,
    headers: HeaderMap,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<Json<SuccessResult<PaymentUrlResponse>>, ApiError> {
    let (booking, price) = booking_with_price(&pool, request.booking_id, lang).await?;
    if booking.patient_id != auth_user.id {
        return Err(ApiError::Forbidden);
    }

    let txn_ref = order_reference(booking.id);
    let url = build_payment_request(&config.vnpay, price, &txn_ref, &client_ip(&headers));

    info!("vnpay payment created for booking {}", booking.id);

    Ok(Json(SuccessResult::new(PaymentUrlResponse { url })))
}

async fn vnpay_return(
    Extension(config): Extension<Arc<AppConfig>>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Json<SuccessResult<PaymentReturnResponse>>, ApiError> {
    let params = VnPayParams::from_query(&query);
    let received_hash = query.get("vnp_SecureHash").cloned().unwrap_or_default();

    if !params.validate_signature(&received_hash, &config.vnpay.hash_secret) {
        return Err(ApiError::BadRequest("invalid signature".to_string()));
    }

    let amount = params
        .get("vnp_Amount")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or_default()
        / 100;

    Ok(Json(SuccessResult::new(PaymentReturnResponse {
        success: params.get("vnp_ResponseCode") == Some("00"),
        order_id: params.get("vnp_TxnRef").unwrap_or_default().to_string(),
        order_info: params.get("vnp_OrderInfo").unwrap_or_default().to_string(),
        amount,
    })))
}

async fn vnpay_ipn(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AppConfig>>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Json<SuccessResult<VnPayIpnResponse>> {
    Json(SuccessResult::new(
        process_vnpay_ipn(&pool, &config, &query).await,
    ))
}

/// The gateway retries on any code other than "00"/"02", so every branch
/// answers 200 with a contract code instead of an HTTP error.
async fn process_vnpay_ipn(
    pool: &PgPool,
    config: &AppConfig,
    query: &BTreeMap<String, String>,
) -> VnPayIpnResponse {
    let params = VnPayParams::from_query(query);
    let received_hash = match query.get("vnp_SecureHash") {
        Some(hash) => hash.clone(),
        None => return VnPayIpnResponse::INPUT_ERROR,
    };

    if !params.validate_signature(&received_hash, &config.vnpay.hash_secret) {
        warn!("vnpay ipn signature mismatch");
        return VnPayIpnResponse::INVALID_SIGNATURE;
    }

    let booking_id = match params.get("vnp_TxnRef").and_then(booking_id_from_reference) {
        Some(id) => id,
        None => return VnPayIpnResponse::INPUT_ERROR,
    };

    let booking = match sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
        .bind(booking_id)
        .fetch_optional(pool)
        .await
    {
        Ok(Some(booking)) => booking,
        Ok(None) => return VnPayIpnResponse::ORDER_NOT_FOUND,
        Err(e) => {
            warn!("vnpay ipn lookup failed: {e}");
            return VnPayIpnResponse::INPUT_ERROR;
        }
    };

    let price = match sqlx::query_scalar::<_, i64>("SELECT price FROM schedules WHERE id = $1")
        .bind(booking.schedule_id)
        .fetch_one(pool)
        .await
    {
        Ok(price) => price,
        Err(e) => {
            warn!("vnpay ipn price lookup failed: {e}");
            return VnPayIpnResponse::INPUT_ERROR;
        }
    };

    let amount = params
        .get("vnp_Amount")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or_default();
    if amount != price * 100 {
        return VnPayIpnResponse::INVALID_AMOUNT;
    }

    if !payment_allowed(booking.status) {
        return if booking.status == BookingStatus::Completed {
            VnPayIpnResponse::ALREADY_CONFIRMED
        } else {
            // Cancelled: nothing left to confirm against.
            VnPayIpnResponse::ORDER_NOT_FOUND
        };
    }

    if params.get("vnp_ResponseCode") == Some("00") {
        match mark_booking_paid(pool, booking.id).await {
            Ok(_) => {
                info!("booking {} paid via vnpay", booking.id);
                VnPayIpnResponse::CONFIRM_SUCCESS
            }
            Err(e) => {
                warn!("vnpay ipn update failed: {e}");
                VnPayIpnResponse::INPUT_ERROR
            }
        }
    } else {
        // Failed payment acknowledged so the gateway stops retrying.
        VnPayIpnResponse::CONFIRM_SUCCESS
    }
}

async fn momo_create(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AppConfig>>,
    auth_user: AuthUser,
    lang: Lang,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<Json<SuccessResult<PaymentUrlResponse>>, ApiError> {
    let (booking, price) = booking_with_price(&pool, request.booking_id, lang).await?;
    if booking.patient_id != auth_user.id {
        return Err(ApiError::Forbidden);
    }

    let order_id = order_reference(booking.id);
    let request_id = Uuid::new_v4().to_string();
    let url = momo::create_payment(&config.momo, price, &order_id, &request_id).await?;

    info!("momo payment created for booking {}", booking.id);

    Ok(Json(SuccessResult::new(PaymentUrlResponse { url })))
}

async fn momo_return(
    Extension(config): Extension<Arc<AppConfig>>,
    Query(callback): Query<MomoCallback>,
) -> Result<Json<SuccessResult<PaymentReturnResponse>>, ApiError> {
    if !callback.validate_signature(&config.momo.access_key, &config.momo.secret_key) {
        return Err(ApiError::BadRequest("invalid signature".to_string()));
    }

    let success = callback.succeeded();
    Ok(Json(SuccessResult::with_message(
        PaymentReturnResponse {
            success,
            order_id: callback.order_id,
            order_info: callback.order_info,
            amount: callback.amount,
        },
        callback.message,
    )))
}

async fn momo_ipn(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Arc<AppConfig>>,
    lang: Lang,
    Query(callback): Query<MomoCallback>,
) -> Result<Json<SuccessResult<()>>, ApiError> {
    if !callback.validate_signature(&config.momo.access_key, &config.momo.secret_key) {
        warn!("momo ipn signature mismatch");
        return Err(ApiError::BadRequest("invalid signature".to_string()));
    }

    let booking_id = booking_id_from_reference(&callback.order_id)
        .ok_or_else(|| ApiError::BadRequest(t(lang, "BookingIsNotExist")))?;

    if callback.succeeded() {
        let updated = mark_booking_paid(&pool, booking_id).await?;
        if updated {
            info!("booking {booking_id} paid via momo");
        }
    }

    Ok(Json(SuccessResult::new(())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_bookings_are_not_payable() {
        assert!(payment_allowed(BookingStatus::New));
        assert!(payment_allowed(BookingStatus::Confirmed));
        assert!(payment_allowed(BookingStatus::Done));

        assert!(!payment_allowed(BookingStatus::Completed));
        assert!(!payment_allowed(BookingStatus::Cancel));
    }

    #[test]
    fn order_reference_round_trip() {
        let id = Uuid::new_v4();
        let reference = order_reference(id);

        assert_eq!(booking_id_from_reference(&reference), Some(id));
        assert_eq!(booking_id_from_reference("garbage"), None);
        assert_eq!(booking_id_from_reference(""), None);
    }
}
