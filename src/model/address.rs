use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Province {
    pub id: i32,
    pub province_name: String,
}

#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct District {
    pub id: i32,
    pub district_name: String,
    pub province_id: i32,
}

#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ward {
    pub id: i32,
    pub ward_name: String,
    pub district_id: i32,
}
