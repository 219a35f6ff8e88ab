use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::{BookingStatus, Gender, TimeSlot};
use crate::response::default_page_size;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub schedule_id: Uuid,
    pub status: BookingStatus,
    pub name: String,
    pub phone_number: String,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Booking joined with its doctor and schedule for list/detail responses.
#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetailResponse {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub patient_id: Uuid,
    pub schedule_id: Uuid,
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
    pub price: i64,
    pub status: BookingStatus,
    pub name: String,
    pub phone_number: String,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub doctor_id: Uuid,
    pub schedule_id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBookingRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationBookingRequest {
    #[serde(default)]
    pub page_index: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
}
