//! 쿼리 파라미터 파싱.
//!
//! 값은 문자열로 받아 직접 파싱합니다. 정수 값이 잘못되면 기본값을 쓰고,
//! 불리언 값이 잘못되면 통합 에러 형식의 400이 됩니다.

use axum::http::StatusCode;
use axum::Json;
use tracing::debug;

use crate::error::{invalid_query, ApiErrorResponse};

type QueryError = (StatusCode, Json<ApiErrorResponse>);

/// 불리언 성격의 값 파싱 (`1/0`, `true/false`, `yes/no`, `on/off`).
pub fn parse_flag(name: &str, value: Option<&str>, default: bool) -> Result<bool, QueryError> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid_query(format!(
            "Invalid value for '{}': expected a boolean, got '{}'",
            name, raw
        ))),
    }
}

/// 정수 파라미터 파싱.
///
/// 비어 있거나 정수가 아니면 `None`이 되어 호출자의 기본값이 쓰입니다.
pub fn parse_int<T: std::str::FromStr>(name: &str, value: Option<&str>) -> Option<T> {
    let raw = value.map(str::trim).filter(|v| !v.is_empty())?;
    match raw.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            debug!(param = name, value = raw, "Ignoring non-integer query value");
            None
        }
    }
}
