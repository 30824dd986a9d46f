//! 셀 값 파싱 (날짜, 숫자).
//!
//! CSV에서 읽은 문자열 셀을 해석합니다. 해석할 수 없는 값은 `None`이며
//! 에러로 취급하지 않습니다.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// 결측값으로 취급하는 표기 (소문자 비교).
const MISSING_MARKERS: &[&str] = &["", "nan", "nat", "null", "none", "na", "n/a"];

/// 날짜만 있는 형식.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// 시간이 포함된 형식.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
];

/// 셀이 결측값인지 확인.
pub fn is_missing(cell: &str) -> bool {
    let trimmed = cell.trim();
    MISSING_MARKERS
        .iter()
        .any(|marker| trimmed.eq_ignore_ascii_case(marker))
}

/// 날짜 셀 파싱.
///
/// 지원 형식: `YYYY-MM-DD`, `YYYY/MM/DD`, `MM/DD/YYYY`, `DD.MM.YYYY`,
/// 시간 포함 형식, RFC 3339, 그리고 `YYYY-MM` (해당 월 1일).
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    if is_missing(cell) {
        return None;
    }
    let value = cell.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.date());
        }
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.date_naive());
    }

    // YYYY-MM (월 단위 데이터)
    NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d").ok()
}

/// 숫자 셀 파싱.
///
/// 천 단위 구분자(`,`)와 앞쪽 통화 기호(`$`)를 허용합니다.
/// 유한하지 않은 값(NaN, inf)은 `None`입니다.
pub fn parse_number(cell: &str) -> Option<f64> {
    if is_missing(cell) {
        return None;
    }

    let trimmed = cell.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let body = body.strip_prefix('$').unwrap_or(body);
    let cleaned: String = body.chars().filter(|c| *c != ',').collect();

    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}
