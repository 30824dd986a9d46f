//! 예측 대상 매장 선별.

use std::collections::BTreeSet;

use super::aggregate::MonthlySeries;
use super::store::StoreId;

/// 기본 최소 월 수.
pub const DEFAULT_MIN_POINTS: usize = 5;

/// 서로 다른 월이 `min_points`개 이상 있는 매장.
///
/// 연속성은 보지 않습니다. 집계에는 (매장, 월)당 하나의 항목만 있으므로
/// 매장별 집계 개수가 곧 월 수입니다.
pub fn eligible_stores(series: &MonthlySeries, min_points: usize) -> BTreeSet<StoreId> {
    series
        .stores()
        .into_iter()
        .filter(|store| series.for_store(store).len() >= min_points)
        .cloned()
        .collect()
}
