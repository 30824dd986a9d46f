//! 매장 목록 endpoint.
//!
//! - `GET /api/stores` - 예측 가능한 매장 목록 (선택적으로 다음 달 미리보기 포함)

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use sales_core::ForecastConfig;
use serde::Deserialize;

use crate::error::{artifacts_not_loaded, internal_error, schema_error, ApiResult};
use crate::routes::query::{parse_flag, parse_int};
use crate::services::store_list::{cached_store_list, StoreEntry, StoreListParams};
use crate::state::AppState;

/// 매장 목록 쿼리 (원문 문자열).
#[derive(Debug, Default, Deserialize)]
pub struct StoreListQuery {
    pub min_year: Option<String>,
    pub min_points: Option<String>,
    pub limit: Option<String>,
    pub preview: Option<String>,
    pub require_forecast: Option<String>,
}

impl StoreListQuery {
    /// 기본값을 적용해 파라미터로 변환.
    pub fn into_params(
        self,
        defaults: &ForecastConfig,
    ) -> Result<StoreListParams, (axum::http::StatusCode, Json<crate::error::ApiErrorResponse>)> {
        let min_year = parse_int::<i32>("min_year", self.min_year.as_deref())
            .unwrap_or(defaults.default_min_year);
        // 음수 기준은 0과 같음 (모든 매장 통과)
        let min_points = parse_int::<i64>("min_points", self.min_points.as_deref())
            .map_or(defaults.default_min_points, |n| usize::try_from(n).unwrap_or(0));
        let limit = parse_int::<i64>("limit", self.limit.as_deref());
        let preview = parse_flag("preview", self.preview.as_deref(), false)?;
        let require_forecast =
            parse_flag("require_forecast", self.require_forecast.as_deref(), false)?;

        Ok(StoreListParams::new(
            min_year,
            min_points,
            limit,
            preview,
            require_forecast,
        ))
    }
}

/// 매장 목록 조회.
///
/// GET /api/stores?min_year=2020&min_points=5&limit=10&preview=1
pub async fn list_stores(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StoreListQuery>,
) -> ApiResult<Json<Vec<StoreEntry>>> {
    let params = query.into_params(&state.config.forecast)?;
    let artifacts = state.artifacts.clone().ok_or_else(artifacts_not_loaded)?;
    let cache = Arc::clone(&state.store_cache);

    let entries = tokio::task::spawn_blocking(move || {
        cached_store_list(artifacts.as_ref(), &cache, &params)
    })
    .await
    .map_err(|e| internal_error("Failed to build store list", e))?
    .map_err(|e| schema_error(&e))?;

    Ok(Json(entries.as_ref().clone()))
}

/// 매장 목록 라우터 생성.
pub fn stores_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_stores))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let params = StoreListQuery::default()
            .into_params(&ForecastConfig::default())
            .unwrap();
        assert_eq!(params.min_year, 2020);
        assert_eq!(params.min_points, 5);
        assert_eq!(params.limit, None);
        assert!(!params.preview);
        assert!(!params.require_forecast);
    }

    #[test]
    fn test_require_forecast_ignored_without_preview() {
        let query = StoreListQuery {
            require_forecast: Some("yes".into()),
            ..Default::default()
        };
        let params = query.into_params(&ForecastConfig::default()).unwrap();
        assert!(!params.require_forecast);
    }

    #[test]
    fn test_malformed_ints_use_defaults() {
        let query = StoreListQuery {
            min_year: Some("twenty".into()),
            min_points: Some("five".into()),
            limit: Some("ten".into()),
            ..Default::default()
        };
        let params = query.into_params(&ForecastConfig::default()).unwrap();
        assert_eq!(params.min_year, 2020);
        assert_eq!(params.min_points, 5);
        assert_eq!(params.limit, None);
    }

    #[test]
    fn test_negative_min_points_is_zero() {
        let query = StoreListQuery {
            min_points: Some("-2".into()),
            ..Default::default()
        };
        let params = query.into_params(&ForecastConfig::default()).unwrap();
        assert_eq!(params.min_points, 0);
    }

    #[test]
    fn test_invalid_flag_is_rejected() {
        let query = StoreListQuery {
            preview: Some("maybe".into()),
            ..Default::default()
        };
        assert!(query.into_params(&ForecastConfig::default()).is_err());
    }
}
