//! 예측 설명 endpoint.
//!
//! - `POST /api/explain_forecast` - 타임라인을 짧은 요약 문장으로 설명

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{api_error, ApiResult, INVALID_TIMELINE};
use crate::services::explain::explain_forecast;
use crate::state::AppState;

/// 설명 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExplainResponse {
    pub summary: String,
}

/// 타임라인 설명 생성.
///
/// POST /api/explain_forecast
///
/// 본문은 포인트 배열 또는 `{timeline, focus}` 객체입니다.
pub async fn post_explain(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<ExplainResponse>> {
    let body: Value = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Explain request body is not JSON");
        api_error(StatusCode::BAD_REQUEST, INVALID_TIMELINE, "Invalid JSON body")
    })?;

    let summary = explain_forecast(state.explain_client.as_ref(), &body)
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, INVALID_TIMELINE, e.to_string()))?;

    Ok(Json(ExplainResponse { summary }))
}

/// 설명 라우터 생성.
pub fn explain_router() -> Router<Arc<AppState>> {
    Router::new().route("/", post(post_explain))
}
