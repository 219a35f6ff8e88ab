use axum::{extract::Json, routing::get, Router};

use crate::i18n::Lang;
use crate::model::enums::{BookingStatus, EnumEntry, Gender, TimeSlot};
use crate::response::SuccessResult;

pub fn enums_router() -> Router {
    Router::new()
        .route("/enums/gender", get(get_genders))
        .route("/enums/time-select", get(get_time_slots))
        .route("/enums/status", get(get_statuses))
}

async fn get_genders(lang: Lang) -> Json<SuccessResult<Vec<EnumEntry>>> {
    Json(SuccessResult::new(Gender::listing(lang)))
}

async fn get_time_slots(lang: Lang) -> Json<SuccessResult<Vec<EnumEntry>>> {
    Json(SuccessResult::new(TimeSlot::listing(lang)))
}

async fn get_statuses(lang: Lang) -> Json<SuccessResult<Vec<EnumEntry>>> {
    Json(SuccessResult::new(BookingStatus::listing(lang)))
}
