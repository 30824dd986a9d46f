//! HTTP 요청 metrics middleware.

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::{Duration, Instant};
use tracing::warn;

use crate::metrics::{
    normalize_path, record_http_duration, record_http_request, record_http_response,
};

/// 처리 시간 응답 헤더 (밀리초).
pub const RESPONSE_TIME_HEADER: &str = "x-response-time-ms";

/// 이 시간을 넘긴 요청은 경고 로그를 남김.
pub const SLOW_REQUEST_THRESHOLD: Duration = Duration::from_secs(2);

/// 메트릭 수집에서 제외하는 경로 (Prometheus 스크레이프 자체).
const SCRAPE_PATH: &str = "/metrics";

/// HTTP 메트릭을 수집하는 미들웨어 레이어.
///
/// 요청/응답 카운터와 처리 시간 히스토그램을 기록하고, 응답에
/// [`RESPONSE_TIME_HEADER`]를 붙입니다. 매장 목록 계산처럼 느린 요청은 경고로 남깁니다.
pub async fn metrics_layer(request: Request, next: Next) -> Response {
    if request.uri().path() == SCRAPE_PATH {
        return next.run(request).await;
    }

    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    record_http_request(&method, &path);

    let mut response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    record_http_response(&method, &path, status);
    record_http_duration(&method, &path, elapsed.as_secs_f64());

    if elapsed > SLOW_REQUEST_THRESHOLD {
        warn!(
            %method,
            %path,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Slow request"
        );
    }

    if let Ok(value) = HeaderValue::from_str(&elapsed.as_millis().to_string()) {
        response.headers_mut().insert(RESPONSE_TIME_HEADER, value);
    }

    response
}
