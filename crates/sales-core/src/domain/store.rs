//! 매장 식별자.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::parse::is_missing;

/// 매장 식별자 (정수 또는 문자열).
///
/// 정렬 순서는 숫자 ID가 문자열 ID보다 앞이며, 같은 종류끼리는 값 순서입니다.
/// JSON으로는 태그 없이 `7` 또는 `"A-12"`로 직렬화됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreId {
    /// 숫자 매장 번호
    Number(i64),
    /// 문자열 매장 코드
    Text(String),
}

impl StoreId {
    /// 셀 값에서 매장 ID 파싱.
    ///
    /// 정수 리터럴과 소수부가 0인 실수 리터럴(`"7.0"`)은 숫자 ID가 되고,
    /// 그 외 비어있지 않은 값은 문자열 ID가 됩니다. 결측값은 `None`.
    pub fn parse(cell: &str) -> Option<Self> {
        if is_missing(cell) {
            return None;
        }
        let value = cell.trim();

        if let Ok(number) = value.parse::<i64>() {
            return Some(StoreId::Number(number));
        }

        if let Ok(float) = value.parse::<f64>() {
            if float.is_finite()
                && float.fract() == 0.0
                && float >= i64::MIN as f64
                && float <= i64::MAX as f64
            {
                return Some(StoreId::Number(float as i64));
            }
        }

        Some(StoreId::Text(value.to_string()))
    }

    /// 숫자 ID인 경우 값 반환.
    pub fn as_number(&self) -> Option<i64> {
        match self {
            StoreId::Number(n) => Some(*n),
            StoreId::Text(_) => None,
        }
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreId::Number(n) => write!(f, "{n}"),
            StoreId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for StoreId {
    fn from(value: i64) -> Self {
        StoreId::Number(value)
    }
}

impl From<&str> for StoreId {
    fn from(value: &str) -> Self {
        StoreId::parse(value).unwrap_or_else(|| StoreId::Text(value.to_string()))
    }
}
