//! 통합 API 에러 응답 타입.
//!
//! 모든 엔드포인트는 실패 시 같은 형식을 반환합니다:
//!
//! ```json
//! { "error": "No recognizable store column", "code": "SCHEMA_ERROR" }
//! ```
//!
//! 내부 원인(스택 등)은 로그에만 남기고 응답에는 넣지 않습니다.

use axum::http::StatusCode;
use axum::Json;
use sales_core::SchemaError;
use serde::{Deserialize, Serialize};
use tracing::error;

/// 아티팩트(데이터셋/모델)가 로드되지 않음.
pub const ARTIFACTS_NOT_LOADED: &str = "ARTIFACTS_NOT_LOADED";
/// 데이터셋 스키마 문제.
pub const SCHEMA_ERROR: &str = "SCHEMA_ERROR";
/// 잘못된 쿼리 파라미터.
pub const INVALID_QUERY: &str = "INVALID_QUERY";
/// 잘못된 설명 요청 본문.
pub const INVALID_TIMELINE: &str = "INVALID_TIMELINE";
/// 그 밖의 내부 에러.
pub const INTERNAL: &str = "INTERNAL";

/// 통합 API 에러 응답.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 사람이 읽을 수 있는 에러 메시지
    pub error: String,
    /// 에러 코드 (예: "SCHEMA_ERROR", "INVALID_QUERY")
    pub code: String,
}

impl ApiErrorResponse {
    /// 에러 생성.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
        }
    }

    /// 에러 코드 반환.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// 에러 메시지 반환.
    pub fn message(&self) -> &str {
        &self.error
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.error)
    }
}

impl std::error::Error for ApiErrorResponse {}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiErrorResponse>)>;

/// 핸들러 에러 응답 구성.
pub fn api_error(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
) -> (StatusCode, Json<ApiErrorResponse>) {
    (status, Json(ApiErrorResponse::new(code, message)))
}

/// 아티팩트 미로드 (500).
pub fn artifacts_not_loaded() -> (StatusCode, Json<ApiErrorResponse>) {
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        ARTIFACTS_NOT_LOADED,
        "Required data not loaded",
    )
}

/// 스키마 에러 (500, 메시지 노출).
pub fn schema_error(err: &SchemaError) -> (StatusCode, Json<ApiErrorResponse>) {
    error!(error = %err, "Dataset schema error");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, SCHEMA_ERROR, err.to_string())
}

/// 잘못된 쿼리 (400).
pub fn invalid_query(message: impl Into<String>) -> (StatusCode, Json<ApiErrorResponse>) {
    api_error(StatusCode::BAD_REQUEST, INVALID_QUERY, message)
}

/// 내부 에러 (500). 원인은 로그에만 남김.
pub fn internal_error(
    context: &str,
    err: impl std::fmt::Display,
) -> (StatusCode, Json<ApiErrorResponse>) {
    error!(error = %err, "{}", context);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL, context)
}
