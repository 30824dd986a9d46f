//! 헬스 체크 endpoint.
//!
//! 로드밸런서나 오케스트레이션 시스템에서 사용하는 상태 확인과 루트 인사말을 제공합니다.

use axum::{extract::State, routing::get, Json, Router};
use sales_data::DatasetProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

/// 헬스 체크 응답 구조체.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// 서버 응답 가능 여부
    pub ok: bool,

    /// 로드된 데이터셋 행 수
    pub rows: usize,

    /// 모델 로드 여부
    pub model_loaded: bool,

    /// 피처 개수
    pub features: usize,

    /// 데이터셋 버전 (아티팩트가 없으면 생략)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_version: Option<String>,

    /// 매장 목록 캐시 항목 수
    pub cache_entries: usize,

    /// 서버 업타임(초)
    pub uptime_secs: i64,
}

/// 루트 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct HomeResponse {
    pub message: String,
}

/// 헬스 체크.
///
/// GET /api/health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let artifacts = state.artifacts.as_deref();

    Json(HealthResponse {
        ok: true,
        rows: artifacts.map(|a| a.dataset().row_count()).unwrap_or(0),
        model_loaded: artifacts.is_some(),
        features: artifacts.map(|a| a.feature_list().len()).unwrap_or(0),
        dataset_version: artifacts.map(|a| a.version().to_string()),
        cache_entries: state.store_cache.len(),
        uptime_secs: state.uptime_secs(),
    })
}

/// 루트 인사말.
///
/// GET /
pub async fn home() -> Json<HomeResponse> {
    Json(HomeResponse {
        message: "Hello from the store sales forecast API!".to_string(),
    })
}

/// 헬스 체크 라우터 생성.
pub fn health_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(health_check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use sales_core::AppConfig;
    use tower::ServiceExt;

    async fn get_json(state: AppState) -> serde_json::Value {
        let app = Router::new()
            .route("/api/health", get(health_check))
            .with_state(Arc::new(state));

        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_with_artifacts() {
        use crate::state::create_test_state;

        let json = get_json(create_test_state()).await;
        assert_eq!(json["ok"], true);
        assert_eq!(json["rows"], 9);
        assert_eq!(json["model_loaded"], true);
        assert_eq!(json["features"], 1);
        assert!(json["dataset_version"].is_string());
        assert_eq!(json["cache_entries"], 0);
    }

    #[tokio::test]
    async fn test_health_without_artifacts() {
        let json = get_json(AppState::new(AppConfig::default())).await;
        assert_eq!(json["ok"], true);
        assert_eq!(json["rows"], 0);
        assert_eq!(json["model_loaded"], false);
        assert!(json.get("dataset_version").is_none());
    }

    #[tokio::test]
    async fn test_home_message() {
        let app = Router::new().route("/", get(home));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["message"].as_str().unwrap().starts_with("Hello"));
    }
}
