use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::response::default_page_size;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Clinic {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub image: Option<String>,
    pub ward_id: Option<i32>,
    pub description_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Clinic with its description resolved in the request language plus the
/// denormalized address chain.
#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicDetailResponse {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub image: Option<String>,
    pub ward_id: Option<i32>,
    pub ward_name: Option<String>,
    pub district_name: Option<String>,
    pub province_name: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Admin view: both translations are exposed for editing.
#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicDetailForAdminResponse {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub image: Option<String>,
    pub ward_id: Option<i32>,
    pub en_description: Option<String>,
    pub vi_description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameResponse {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClinicRequest {
    pub name: String,
    pub address: String,
    pub image: Option<String>,
    pub ward_id: Option<i32>,
    pub en_description: String,
    pub vi_description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClinicRequest {
    pub name: String,
    pub address: String,
    pub image: Option<String>,
    pub ward_id: Option<i32>,
    pub en_description: String,
    pub vi_description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationClinicRequest {
    #[serde(default)]
    pub page_index: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    pub name: Option<String>,
    pub ward_id: Option<i32>,
}
