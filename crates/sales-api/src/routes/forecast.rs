//! 단일 매장 예측 endpoint.
//!
//! - `GET /api/forecast/{store_id}` - 최근 월간 이력과 다음 달 예측

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use sales_core::StoreId;
use sales_data::DatasetProvider;
use serde::Deserialize;

use crate::error::{artifacts_not_loaded, internal_error, schema_error, ApiResult};
use crate::routes::query::parse_int;
use crate::services::store_forecast::{store_forecast, ForecastResponse};
use crate::state::AppState;

/// 예측 쿼리.
#[derive(Debug, Default, Deserialize)]
pub struct ForecastQuery {
    pub min_year: Option<String>,
}

/// 매장 예측 조회.
///
/// GET /api/forecast/{store_id}
///
/// 이력이 부족하거나 모르는 매장이면 빈 배열을 반환합니다.
pub async fn get_forecast(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    Query(query): Query<ForecastQuery>,
) -> ApiResult<Json<ForecastResponse>> {
    let min_year = parse_int::<i32>("min_year", query.min_year.as_deref())
        .unwrap_or(state.config.forecast.default_min_year);
    let history_months = state.config.forecast.history_months;
    let artifacts = state.artifacts.clone().ok_or_else(artifacts_not_loaded)?;

    let Some(store_id) = StoreId::parse(&raw_id) else {
        return Ok(Json(ForecastResponse::default()));
    };

    let response = tokio::task::spawn_blocking(move || {
        let table = artifacts.dataset().normalized()?;
        Ok::<_, sales_core::SchemaError>(store_forecast(
            &table,
            artifacts.model(),
            artifacts.feature_list(),
            &store_id,
            min_year,
            history_months,
        ))
    })
    .await
    .map_err(|e| internal_error("Failed to build forecast", e))?
    .map_err(|e| schema_error(&e))?;

    Ok(Json(response))
}

/// 예측 라우터 생성.
pub fn forecast_router() -> Router<Arc<AppState>> {
    Router::new().route("/{store_id}", get(get_forecast))
}
