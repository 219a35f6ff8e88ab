use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::Gender;
use crate::response::default_page_size;

/// Doctor profile joined with user, clinic, speciality and the localized
/// position/description texts.
#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorInfoDetailResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<DateTime<Utc>>,
    pub address: Option<String>,
    pub ward_id: Option<i32>,
    pub ward_name: Option<String>,
    pub district_name: Option<String>,
    pub province_name: Option<String>,
    pub image: Option<String>,
    pub max_patient: i32,
    pub price: i64,
    pub clinic_id: Uuid,
    pub clinic_name: Option<String>,
    pub speciality_id: Uuid,
    pub speciality_name: Option<String>,
    pub position: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDoctorRequest {
    pub email: String,
    pub name: String,
    pub phone_number: Option<String>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<DateTime<Utc>>,
    pub address: Option<String>,
    pub ward_id: Option<i32>,
    pub image: Option<String>,
    pub max_patient: i32,
    pub price: i64,
    pub clinic_id: Uuid,
    pub speciality_id: Uuid,
    pub en_position: String,
    pub vi_position: String,
    pub en_description: String,
    pub vi_description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDoctorRequest {
    pub name: String,
    pub phone_number: Option<String>,
    pub gender: Option<Gender>,
    pub date_of_birth: Option<DateTime<Utc>>,
    pub address: Option<String>,
    pub ward_id: Option<i32>,
    pub image: Option<String>,
    pub max_patient: i32,
    pub price: i64,
    pub en_position: String,
    pub vi_position: String,
    pub en_description: String,
    pub vi_description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDoctorRequest {
    #[serde(default)]
    pub page_index: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    pub name: Option<String>,
    pub ward_id: Option<i32>,
    pub clinic_id: Option<Uuid>,
    pub speciality_id: Option<Uuid>,
}
