//! 단일 매장 예측.
//!
//! 최근 몇 달의 월간 이력과 그 다음 달 예측값 하나를 돌려줍니다.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Months, NaiveDate};
use sales_analytics::ml::{PreviewEngine, Regressor};
use sales_core::{
    aggregate_monthly, latest_rows, round2, CanonicalTable, MonthlyAggregate, StoreId,
    CATEGORY_SUFFIX,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metrics::record_preview_outcome;

/// 예측을 만들 수 있는 최소 이력 개월 수.
pub const MIN_HISTORY_MONTHS: usize = 2;

const SOURCE_HISTORY: &str = "history";
const SOURCE_FORECAST: &str = "forecast";

/// 월간 이력 포인트.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub date: String,
    pub label: String,
    pub total_sales: f64,
    pub source: String,
    /// `_sales` 접미사를 뗀 카테고리 키
    pub categories: BTreeMap<String, f64>,
}

/// 예측 포인트.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: String,
    pub label: String,
    pub predicted: f64,
    pub sales: f64,
    pub source: String,
}

/// 단일 매장 예측 응답.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub history: Vec<HistoryPoint>,
    pub forecast: Vec<ForecastPoint>,
}

impl ForecastResponse {
    pub fn is_empty(&self) -> bool {
        self.history.is_empty() && self.forecast.is_empty()
    }
}

fn date_string(month: NaiveDate) -> String {
    month.format("%Y-%m-%d").to_string()
}

/// `Jan 21` 형식의 월 라벨.
pub fn month_label(month: NaiveDate) -> String {
    month.format("%b %y").to_string()
}

fn category_name(key: &str) -> &str {
    key.strip_suffix(CATEGORY_SUFFIX).unwrap_or(key)
}

impl From<&MonthlyAggregate> for HistoryPoint {
    fn from(agg: &MonthlyAggregate) -> Self {
        Self {
            date: date_string(agg.month),
            label: month_label(agg.month),
            total_sales: round2(agg.total_sales),
            source: SOURCE_HISTORY.to_string(),
            categories: agg
                .categories
                .iter()
                .map(|(key, value)| (category_name(key).to_string(), round2(*value)))
                .collect(),
        }
    }
}

/// 매장 하나의 이력과 다음 달 예측 계산.
///
/// 이력이 2개월 미만이거나 매장을 모르면 빈 응답을 돌려줍니다.
/// 예측이 건너뛰어지면 이력만 채워집니다.
pub fn store_forecast(
    table: &CanonicalTable,
    model: &dyn Regressor,
    features: &[String],
    store_id: &StoreId,
    min_year: i32,
    history_months: usize,
) -> ForecastResponse {
    let _span = sales_core::forecast_span!("store_forecast", store_id, min_year).entered();

    let series = aggregate_monthly(table, min_year);
    let months = series.for_store(store_id);
    if months.len() < MIN_HISTORY_MONTHS {
        debug!(months = months.len(), "Not enough history for forecast");
        return ForecastResponse::default();
    }

    let recent = &months[months.len().saturating_sub(history_months.max(1))..];
    let history: Vec<HistoryPoint> = recent.iter().map(HistoryPoint::from).collect();

    let Some(last_month) = recent.last().map(|agg| agg.month) else {
        return ForecastResponse::default();
    };
    let Some(next_month) = last_month.checked_add_months(Months::new(1)) else {
        return ForecastResponse {
            history,
            forecast: Vec::new(),
        };
    };

    let stores: BTreeSet<StoreId> = std::iter::once(store_id.clone()).collect();
    let latest = latest_rows(table, min_year, &stores);
    let forecast = match latest.get(store_id) {
        Some(row) => {
            let engine = PreviewEngine::new(model, table, features);
            let outcome = engine.preview_one(row);
            record_preview_outcome(outcome.label());
            outcome
                .value()
                .map(|value| ForecastPoint {
                    date: date_string(next_month),
                    label: month_label(next_month),
                    predicted: value,
                    sales: value,
                    source: SOURCE_FORECAST.to_string(),
                })
                .into_iter()
                .collect()
        }
        None => Vec::new(),
    };

    debug!(
        history = history.len(),
        forecast = forecast.len(),
        "Store forecast computed"
    );
    ForecastResponse { history, forecast }
}
