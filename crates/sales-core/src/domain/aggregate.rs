//! 매장별 월간 집계.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::store::StoreId;
use super::table::{CanonicalTable, SalesRow};

/// 매장-월 단위 집계.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    /// 매장 ID
    pub store_id: StoreId,
    /// 해당 월의 1일
    pub month: NaiveDate,
    /// 총매출 합계
    pub total_sales: f64,
    /// 카테고리별 매출 합계 (canonical 키)
    pub categories: BTreeMap<String, f64>,
    /// 집계에 포함된 행 수
    pub row_count: usize,
}

/// (매장, 월) 오름차순으로 정렬된 집계 목록.
///
/// 거래가 없는 월은 0이 아니라 아예 존재하지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlySeries {
    aggregates: Vec<MonthlyAggregate>,
}

impl MonthlySeries {
    /// 전체 집계 (정렬된 상태).
    pub fn as_slice(&self) -> &[MonthlyAggregate] {
        &self.aggregates
    }

    /// 집계 개수.
    pub fn len(&self) -> usize {
        self.aggregates.len()
    }

    /// 집계가 없는지 확인.
    pub fn is_empty(&self) -> bool {
        self.aggregates.is_empty()
    }

    /// 특정 매장의 월간 집계 (월 오름차순).
    pub fn for_store(&self, store_id: &StoreId) -> &[MonthlyAggregate] {
        let start = self
            .aggregates
            .partition_point(|agg| agg.store_id < *store_id);
        let end = self
            .aggregates
            .partition_point(|agg| agg.store_id <= *store_id);
        &self.aggregates[start..end]
    }

    /// 집계가 존재하는 매장 목록 (오름차순, 중복 없음).
    pub fn stores(&self) -> Vec<&StoreId> {
        let mut stores: Vec<&StoreId> = Vec::new();
        for agg in &self.aggregates {
            if stores.last() != Some(&&agg.store_id) {
                stores.push(&agg.store_id);
            }
        }
        stores
    }
}

/// 날짜가 속한 월의 1일.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// 월간 집계 생성.
///
/// `date.year >= min_year`인 행만 포함하며, 결측 매출 값은 합계에 기여하지 않습니다.
pub fn aggregate_monthly(table: &CanonicalTable, min_year: i32) -> MonthlySeries {
    let mut buckets: BTreeMap<(StoreId, NaiveDate), MonthlyAggregate> = BTreeMap::new();

    for row in table.rows.iter().filter(|row| row.date.year() >= min_year) {
        let month = month_start(row.date);
        let entry = buckets
            .entry((row.store_id.clone(), month))
            .or_insert_with(|| MonthlyAggregate {
                store_id: row.store_id.clone(),
                month,
                total_sales: 0.0,
                categories: table
                    .category_columns
                    .iter()
                    .map(|key| (key.clone(), 0.0))
                    .collect(),
                row_count: 0,
            });

        entry.total_sales += row.total_sales.unwrap_or(0.0);
        for (key, value) in &row.categories {
            *entry.categories.entry(key.clone()).or_insert(0.0) += value;
        }
        entry.row_count += 1;
    }

    MonthlySeries {
        aggregates: buckets.into_values().collect(),
    }
}

/// 매장별 최신 행.
///
/// `date.year >= min_year`인 행 중 날짜가 가장 늦은 행을 고르며,
/// 같은 날짜면 원본 순서가 뒤인 행을 택합니다.
pub fn latest_rows<'a>(
    table: &'a CanonicalTable,
    min_year: i32,
    stores: &BTreeSet<StoreId>,
) -> BTreeMap<StoreId, &'a SalesRow> {
    let mut latest: BTreeMap<StoreId, &SalesRow> = BTreeMap::new();

    for row in table.rows.iter().filter(|row| row.date.year() >= min_year) {
        if !stores.contains(&row.store_id) {
            continue;
        }
        match latest.get(&row.store_id) {
            Some(current) if (current.date, current.position) > (row.date, row.position) => {}
            _ => {
                latest.insert(row.store_id.clone(), row);
            }
        }
    }

    latest
}
