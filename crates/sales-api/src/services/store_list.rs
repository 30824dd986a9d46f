//! 매장 목록 조립.
//!
//! 정규화 → 월간 집계 → 적격 매장 → (미리보기) 순서로 목록을 만들고,
//! 완성된 목록을 파라미터와 데이터셋 버전 키로 캐시합니다.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use sales_analytics::ml::{PreviewEngine, PreviewOutcome, Regressor};
use sales_core::{
    aggregate_monthly, eligible_stores, latest_rows, CanonicalTable, SalesRow, SchemaError,
    StoreId,
};
use sales_data::{DatasetProvider, DatasetVersion, TtlCache};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::metrics::{
    record_cache_lookup, record_preview_outcome, record_store_list_duration, record_strategy,
    set_cache_entries,
};

/// 매장 목록 요청 파라미터 (기본값 적용 후).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreListParams {
    pub min_year: i32,
    pub min_points: usize,
    /// 최대 개수 (`None`이면 제한 없음)
    pub limit: Option<usize>,
    pub preview: bool,
    /// 예측값이 없는 매장 제외 (미리보기일 때만 의미 있음)
    pub require_forecast: bool,
}

impl StoreListParams {
    /// 파라미터 생성. `limit <= 0`은 제한 없음과 같습니다.
    pub fn new(
        min_year: i32,
        min_points: usize,
        limit: Option<i64>,
        preview: bool,
        require_forecast: bool,
    ) -> Self {
        Self {
            min_year,
            min_points,
            limit: limit
                .filter(|limit| *limit > 0)
                .and_then(|limit| usize::try_from(limit).ok()),
            preview,
            require_forecast: preview && require_forecast,
        }
    }

    /// 캐시 키 생성.
    pub fn cache_key<P: DatasetProvider + ?Sized>(&self, provider: &P) -> StoreListKey {
        StoreListKey {
            min_year: self.min_year,
            min_points: self.min_points,
            limit: self.limit,
            preview: self.preview,
            require_forecast: self.require_forecast,
            dataset_version: provider.version().clone(),
            feature_signature: provider.feature_signature(),
        }
    }
}

/// 매장 목록 캐시 키.
///
/// 같은 유효 파라미터와 같은 데이터셋 버전이면 같은 항목을 가리킵니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreListKey {
    pub min_year: i32,
    pub min_points: usize,
    pub limit: Option<usize>,
    pub preview: bool,
    pub require_forecast: bool,
    pub dataset_version: DatasetVersion,
    pub feature_signature: String,
}

/// 매장 목록 항목.
///
/// `forecast`는 미리보기를 끈 요청에서는 아예 직렬화되지 않고,
/// 미리보기를 켰지만 값이 없으면 `null`입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub value: StoreId,
    pub label: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "nullable_forecast"
    )]
    pub forecast: Option<Option<f64>>,
}

mod nullable_forecast {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Option<f64>>, s: S) -> Result<S::Ok, S::Error> {
        value.flatten().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Option<f64>>, D::Error> {
        Option::<f64>::deserialize(d).map(Some)
    }
}

/// 매장 라벨 (`Store 7 – AMES, STORY`).
pub fn store_label(store_id: &StoreId, city: Option<&str>, county: Option<&str>) -> String {
    let place: Vec<&str> = [city, county].into_iter().flatten().collect();
    if place.is_empty() {
        format!("Store {}", store_id)
    } else {
        format!("Store {} – {}", store_id, place.join(", "))
    }
}

/// 매장별 최신 도시/카운티 (비어있지 않은 값 중 가장 늦은 행 기준).
fn store_places(table: &CanonicalTable) -> BTreeMap<&StoreId, (Option<&SalesRow>, Option<&SalesRow>)> {
    let mut places: BTreeMap<&StoreId, (Option<&SalesRow>, Option<&SalesRow>)> = BTreeMap::new();
    let later = |current: Option<&SalesRow>, row: &SalesRow| match current {
        Some(current) => (row.date, row.position) > (current.date, current.position),
        None => true,
    };

    for row in &table.rows {
        let entry = places.entry(&row.store_id).or_default();
        if row.city.is_some() && later(entry.0, row) {
            entry.0 = Some(row);
        }
        if row.county.is_some() && later(entry.1, row) {
            entry.1 = Some(row);
        }
    }
    places
}

fn labels(table: &CanonicalTable, stores: &BTreeSet<StoreId>) -> BTreeMap<StoreId, String> {
    let places = store_places(table);
    stores
        .iter()
        .map(|store_id| {
            let (city_row, county_row) = places.get(store_id).copied().unwrap_or_default();
            let city = city_row.and_then(|row| row.city.as_deref());
            let county = county_row.and_then(|row| row.county.as_deref());
            (store_id.clone(), store_label(store_id, city, county))
        })
        .collect()
}

/// 캐시 없이 매장 목록 계산.
pub fn build_store_list(
    table: &CanonicalTable,
    model: &dyn Regressor,
    features: &[String],
    params: &StoreListParams,
) -> Vec<StoreEntry> {
    let series = aggregate_monthly(table, params.min_year);
    let eligible = eligible_stores(&series, params.min_points);
    let labels = labels(table, &eligible);
    let cap = params.limit.unwrap_or(usize::MAX);

    debug!(
        eligible = eligible.len(),
        months = series.len(),
        min_year = params.min_year,
        min_points = params.min_points,
        "Eligible stores computed"
    );

    let entry = |store_id: &StoreId, forecast: Option<Option<f64>>| StoreEntry {
        value: store_id.clone(),
        label: labels.get(store_id).cloned().unwrap_or_default(),
        forecast,
    };

    if !params.preview {
        return eligible
            .iter()
            .take(cap)
            .map(|store_id| entry(store_id, None))
            .collect();
    }

    let latest = latest_rows(table, params.min_year, &eligible);
    let candidates: Vec<(&StoreId, &SalesRow)> = latest.iter().map(|(id, row)| (id, *row)).collect();
    let mut engine = PreviewEngine::new(model, table, features);
    record_strategy(engine.strategy().name());

    let mut results = Vec::new();
    let mut cursor = 0;
    while results.len() < cap && cursor < candidates.len() {
        // 예측값이 필요 없으면 남은 자리만큼만 계산하면 됨
        let chunk_len = (cap - results.len()).min(candidates.len() - cursor);
        let chunk = &candidates[cursor..cursor + chunk_len];
        cursor += chunk_len;

        let rows: Vec<&SalesRow> = chunk.iter().map(|(_, row)| *row).collect();
        let outcomes = engine.preview(&rows);

        for (&(store_id, _), outcome) in chunk.iter().zip(outcomes) {
            record_preview_outcome(outcome.label());
            if let PreviewOutcome::Skipped(reason) = &outcome {
                debug!(store_id = %store_id, %reason, "Store has no forecast value");
                if params.require_forecast {
                    continue;
                }
            }
            results.push(entry(store_id, Some(outcome.value())));
        }
    }

    results
}

/// 캐시를 거쳐 매장 목록 조회.
///
/// 캐시 확인이 집계보다 먼저 일어나며, 계산 결과 전체가 한 항목으로 저장됩니다.
pub fn cached_store_list<P>(
    provider: &P,
    cache: &TtlCache<StoreListKey, Vec<StoreEntry>>,
    params: &StoreListParams,
) -> Result<std::sync::Arc<Vec<StoreEntry>>, SchemaError>
where
    P: DatasetProvider<Model = dyn Regressor> + ?Sized,
{
    let key = params.cache_key(provider);

    let (entries, lookup) = cache.lookup_or_compute(key, || {
        let started = Instant::now();
        let table = provider.dataset().normalized()?;
        let entries = build_store_list(&table, provider.model(), provider.feature_list(), params);
        record_store_list_duration(started.elapsed().as_secs_f64());
        info!(
            stores = entries.len(),
            preview = params.preview,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Store list computed"
        );
        Ok::<_, SchemaError>(entries)
    })?;

    record_cache_lookup(lookup.is_hit());
    set_cache_entries(cache.len());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sales_analytics::ml::MockRegressor;
    use sales_core::{normalize, RawTable};

    fn table(rows: &[&[&str]]) -> CanonicalTable {
        normalize(&RawTable::from_strs(
            &["Store Number", "Date", "Total_Sales", "City", "County"],
            rows,
        ))
        .unwrap()
    }

    fn months(store: &str, count: u32, city: &str) -> Vec<Vec<String>> {
        (1..=count)
            .map(|m| {
                vec![
                    store.to_string(),
                    format!("2021-{:02}-01", m),
                    format!("{}", m * 10),
                    city.to_string(),
                    "Story".to_string(),
                ]
            })
            .collect()
    }

    fn table_from(rows: Vec<Vec<String>>) -> CanonicalTable {
        let refs: Vec<Vec<&str>> = rows
            .iter()
            .map(|r| r.iter().map(String::as_str).collect())
            .collect();
        let slices: Vec<&[&str]> = refs.iter().map(Vec::as_slice).collect();
        table(&slices)
    }

    #[test]
    fn test_params_normalize_limit() {
        let a = StoreListParams::new(2020, 5, Some(0), false, false);
        let b = StoreListParams::new(2020, 5, None, false, false);
        let c = StoreListParams::new(2020, 5, Some(-3), false, true);
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(StoreListParams::new(2020, 5, Some(3), true, true).limit, Some(3));
    }

    #[test]
    fn test_store_label_parts() {
        let id = StoreId::Number(7);
        assert_eq!(store_label(&id, Some("AMES"), Some("STORY")), "Store 7 – AMES, STORY");
        assert_eq!(store_label(&id, Some("AMES"), None), "Store 7 – AMES");
        assert_eq!(store_label(&id, None, None), "Store 7");
    }

    #[test]
    fn test_eligibility_threshold_in_list() {
        let mut rows = months("7", 6, "Ames");
        rows.extend(months("8", 3, "Boone"));
        let table = table_from(rows);
        let model = MockRegressor::new();

        let params = StoreListParams::new(2020, 5, None, false, false);
        let list = build_store_list(&table, &model, &[], &params);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].value, StoreId::Number(7));
        assert_eq!(list[0].label, "Store 7 – AMES, STORY");
        assert_eq!(list[0].forecast, None);
        assert_eq!(model.calls(), 0);
    }

    #[test]
    fn test_label_uses_latest_non_blank_place() {
        let mut rows = months("7", 5, "Ames");
        rows[4][3] = String::new();
        rows[3][3] = "Nevada".to_string();
        let table = table_from(rows);
        let params = StoreListParams::new(2020, 5, None, false, false);
        let list = build_store_list(&table, &MockRegressor::new(), &[], &params);
        assert_eq!(list[0].label, "Store 7 – NEVADA, STORY");
    }

    #[test]
    fn test_preview_limit_bounds_inference() {
        let mut rows = Vec::new();
        for store in 1..=10 {
            rows.extend(months(&store.to_string(), 5, "Ames"));
        }
        let table = table_from(rows);
        let model = MockRegressor::new();
        let features = vec!["Total_Sales".to_string()];

        let params = StoreListParams::new(2020, 5, Some(3), true, false);
        let list = build_store_list(&table, &model, &features, &params);
        assert_eq!(list.len(), 3);
        assert_eq!(model.rows_seen(), 3);
        assert_eq!(list[0].forecast, Some(Some(50.0)));
    }

    #[test]
    fn test_require_forecast_fills_cap_from_later_chunks() {
        let mut rows = Vec::new();
        for store in 1..=6 {
            let mut store_rows = months(&store.to_string(), 5, "Ames");
            if store <= 2 {
                store_rows[4][2] = "13".to_string();
            }
            rows.extend(store_rows);
        }
        let table = table_from(rows);
        let model = MockRegressor::new().failing_on_value(13.0);
        let features = vec!["Total_Sales".to_string()];

        let params = StoreListParams::new(2020, 5, Some(4), true, true);
        let list = build_store_list(&table, &model, &features, &params);
        let ids: Vec<StoreId> = list.iter().map(|e| e.value.clone()).collect();
        assert_eq!(
            ids,
            (3..=6).map(StoreId::Number).collect::<Vec<_>>()
        );
        assert!(list.iter().all(|e| e.forecast == Some(Some(50.0))));
    }

    #[test]
    fn test_skipped_store_kept_as_null_without_require_forecast() {
        let mut rows = months("1", 5, "Ames");
        rows[4][2] = "13".to_string();
        rows.extend(months("2", 5, "Ames"));
        let table = table_from(rows);
        let model = MockRegressor::new().failing_on_value(13.0);
        let features = vec!["Total_Sales".to_string()];

        let params = StoreListParams::new(2020, 5, None, true, false);
        let list = build_store_list(&table, &model, &features, &params);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].forecast, Some(None));
        assert_eq!(list[1].forecast, Some(Some(50.0)));
    }

    fn stores_with_failures(count: u32, failing: &[u32]) -> CanonicalTable {
        let mut rows = Vec::new();
        for store in 1..=count {
            let mut store_rows = months(&store.to_string(), 5, "Ames");
            if failing.contains(&store) {
                store_rows[4][2] = "13".to_string();
            }
            rows.extend(store_rows);
        }
        table_from(rows)
    }

    #[test]
    fn test_limit_does_not_change_failed_stores() {
        let table = stores_with_failures(5, &[4, 5]);
        let model = MockRegressor::new().failing_on_value(13.0);
        let features = vec!["Total_Sales".to_string()];
        let ids = |limit: Option<i64>| -> Vec<StoreId> {
            let params = StoreListParams::new(2020, 5, limit, true, true);
            build_store_list(&table, &model, &features, &params)
                .into_iter()
                .map(|e| e.value)
                .collect()
        };

        let expected: Vec<StoreId> = (1..=3).map(StoreId::Number).collect();
        assert_eq!(ids(None), expected);
        // 마지막 청크가 한 행(매장 5)이어도 매출 값이 예측으로 둔갑하지 않음
        assert_eq!(ids(Some(4)), expected);
    }

    #[test]
    fn test_single_failing_store_has_null_forecast() {
        let table = stores_with_failures(1, &[1]);
        let model = MockRegressor::new().failing_on_value(13.0);
        let features = vec!["Total_Sales".to_string()];

        let params = StoreListParams::new(2020, 5, None, true, false);
        let list = build_store_list(&table, &model, &features, &params);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].forecast, Some(None));
    }

    #[test]
    fn test_forecast_field_serialization() {
        let without = StoreEntry {
            value: StoreId::Number(1),
            label: "Store 1".into(),
            forecast: None,
        };
        let json = serde_json::to_string(&without).unwrap();
        assert!(!json.contains("forecast"));

        let null = StoreEntry {
            forecast: Some(None),
            ..without.clone()
        };
        assert!(serde_json::to_string(&null)
            .unwrap()
            .contains(r#""forecast":null"#));

        let value = StoreEntry {
            forecast: Some(Some(12.5)),
            ..without
        };
        assert!(serde_json::to_string(&value)
            .unwrap()
            .contains(r#""forecast":12.5"#));
    }
}
