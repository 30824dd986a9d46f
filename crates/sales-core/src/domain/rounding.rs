//! 금액 반올림.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// 소수점 둘째 자리 반올림 (0에서 먼 쪽으로).
///
/// `f64`의 최단 십진 표현을 기준으로 계산하므로 `1234.565`는 `1234.57`이 됩니다.
/// `Decimal` 범위를 벗어나는 값(소수부가 의미 없는 크기)은 그대로 돌려줍니다.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }

    let decimal = Decimal::from_str(&value.to_string())
        .ok()
        .or_else(|| Decimal::from_f64(value));

    match decimal {
        Some(d) => d
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .to_f64()
            .unwrap_or(value),
        None => value,
    }
}
