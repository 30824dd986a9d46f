//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! HTTP 요청 메트릭, 예측 파이프라인 메트릭을 수집하고 `/metrics` 엔드포인트로 노출합니다.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Prometheus 메트릭 레코더를 설정하고 핸들을 반환합니다.
///
/// 레코더가 이미 설치되어 있으면 에러를 반환합니다.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )?
        .set_buckets_for_metric(
            Matcher::Full("store_list_build_seconds".to_string()),
            &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0],
        )?
        .install_recorder()
}

// ============================================================================
// HTTP 메트릭 헬퍼 함수
// ============================================================================

/// HTTP 요청 카운터 증가.
pub fn record_http_request(method: &str, path: &str) {
    counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string())
        .increment(1);
}

/// HTTP 응답 카운터 증가.
pub fn record_http_response(method: &str, path: &str, status: u16) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// HTTP 요청 지속 시간 기록.
pub fn record_http_duration(method: &str, path: &str, duration_secs: f64) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

// ============================================================================
// 예측 파이프라인 메트릭 헬퍼 함수
// ============================================================================

/// 매장 목록 캐시 조회 결과.
pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("store_list_cache_total", "result" => result).increment(1);
}

/// 캐시 항목 수.
pub fn set_cache_entries(count: usize) {
    gauge!("store_list_cache_entries").set(count as f64);
}

/// 매장 목록 계산 시간.
pub fn record_store_list_duration(duration_secs: f64) {
    histogram!("store_list_build_seconds").record(duration_secs);
}

/// 선택된 추론 전략.
pub fn record_strategy(strategy: &'static str) {
    counter!("preview_strategy_total", "strategy" => strategy).increment(1);
}

/// 매장별 미리보기 결과.
pub fn record_preview_outcome(outcome: &'static str) {
    counter!("preview_outcomes_total", "outcome" => outcome).increment(1);
}

/// 설명 API 호출 결과.
pub fn record_explain_call(result: &'static str) {
    counter!("explain_requests_total", "result" => result).increment(1);
}

// ============================================================================
// 경로 정규화 유틸리티
// ============================================================================

/// 경로에서 동적 파라미터를 정규화합니다.
///
/// `/api/forecast/{store_id}` 아래 세그먼트는 모두 `:id`로 바꾸고,
/// 그 밖의 경로는 숫자 세그먼트만 바꿉니다.
pub fn normalize_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("/api/forecast/") {
        if !rest.is_empty() {
            return "/api/forecast/:id".to_string();
        }
    }

    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
