use axum::{
    extract::{Extension, Json, Path},
    routing::get,
    Router,
};
use sqlx::PgPool;

use crate::error::ApiError;
use crate::model::address::{District, Province, Ward};
use crate::response::SuccessResult;

pub fn address_router() -> Router {
    Router::new()
        .route("/address/provinces", get(get_provinces))
        .route("/address/districts/:province_id", get(get_districts))
        .route("/address/wards/:district_id", get(get_wards))
}

async fn get_provinces(
    Extension(pool): Extension<PgPool>,
) -> Result<Json<SuccessResult<Vec<Province>>>, ApiError> {
    let provinces =
        sqlx::query_as::<_, Province>("SELECT * FROM provinces ORDER BY province_name")
            .fetch_all(&pool)
            .await?;

    Ok(Json(SuccessResult::new(provinces)))
}

async fn get_districts(
    Extension(pool): Extension<PgPool>,
    Path(province_id): Path<i32>,
) -> Result<Json<SuccessResult<Vec<District>>>, ApiError> {
    let districts = sqlx::query_as::<_, District>(
        "SELECT * FROM districts WHERE province_id = $1 ORDER BY district_name",
    )
    .bind(province_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(SuccessResult::new(districts)))
}

async fn get_wards(
    Extension(pool): Extension<PgPool>,
    Path(district_id): Path<i32>,
) -> Result<Json<SuccessResult<Vec<Ward>>>, ApiError> {
    let wards = sqlx::query_as::<_, Ward>(
        "SELECT * FROM wards WHERE district_id = $1 ORDER BY ward_name",
    )
    .bind(district_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(SuccessResult::new(wards)))
}
