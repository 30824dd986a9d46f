//! 모델 입력 피처 구성.
//!
//! 피처 이름은 요청마다 한 번 [`FeaturePlan`]으로 해석되고,
//! 이후 각 행에서는 해석된 위치만 읽습니다.

use sales_core::{canonical_key, CanonicalTable, SalesRow, COL_STORE_ID, COL_TOTAL_SALES};
use serde::Serialize;

/// 피처 값의 출처.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "column", rename_all = "snake_case")]
pub enum FeatureSource {
    /// 매장 번호 (문자열 ID는 값 없음)
    StoreId,
    /// 총매출
    Total,
    /// 카테고리 매출 (canonical 키)
    Category(String),
    /// 기타 숫자 컬럼 (원본 이름)
    Extra(String),
    /// 테이블에 없는 피처 (값 0)
    Missing,
}

impl FeatureSource {
    /// 행에서 값 읽기. 셀이 비어있으면 `None`.
    pub fn value(&self, row: &SalesRow) -> Option<f64> {
        match self {
            FeatureSource::StoreId => row.store_id.as_number().map(|n| n as f64),
            FeatureSource::Total => row.total_sales,
            FeatureSource::Category(key) => row.categories.get(key).copied(),
            FeatureSource::Extra(name) => row.extras.get(name).copied(),
            FeatureSource::Missing => None,
        }
    }

    /// 테이블에 없는 피처인지 확인.
    pub fn is_missing(&self) -> bool {
        matches!(self, FeatureSource::Missing)
    }

    fn resolve(table: &CanonicalTable, name: &str) -> Self {
        let by_canonical = |canonical: &str| {
            if canonical == COL_STORE_ID {
                Some(FeatureSource::StoreId)
            } else if canonical == COL_TOTAL_SALES {
                Some(FeatureSource::Total)
            } else if table.category_columns.iter().any(|key| key == canonical) {
                Some(FeatureSource::Category(canonical.to_string()))
            } else {
                None
            }
        };

        // 원본 또는 canonical 이름 그대로
        if let Some(source) = table.canonical_name(name).and_then(by_canonical) {
            return source;
        }
        if table.extra_columns.iter().any(|column| column == name) {
            return FeatureSource::Extra(name.to_string());
        }

        // 대소문자만 다른 원본 이름
        if let Some(source) = table
            .column_map
            .iter()
            .find(|(original, _)| original.eq_ignore_ascii_case(name))
            .and_then(|(_, canonical)| by_canonical(canonical))
        {
            return source;
        }
        if let Some(column) = table
            .extra_columns
            .iter()
            .find(|column| column.eq_ignore_ascii_case(name))
        {
            return FeatureSource::Extra(column.clone());
        }

        // 표기만 다른 이름 ("Liquor Sales" ↔ "liquor_sales")
        by_canonical(&canonical_key(name)).unwrap_or(FeatureSource::Missing)
    }
}

/// 행 우선(row-major) 피처 행렬.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl FeatureMatrix {
    /// 행 우선 데이터로 행렬 생성.
    ///
    /// `data.len() != rows * cols`이면 `None`.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Option<Self> {
        (data.len() == rows * cols).then_some(Self { rows, cols, data })
    }

    /// 행 벡터들로 행렬 생성. 길이가 다른 행이 있으면 `None`.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != cols) {
            return None;
        }
        Some(Self {
            rows: rows.len(),
            cols,
            data: rows.iter().flatten().copied().collect(),
        })
    }

    /// 행 수.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// 열 수 (피처 수).
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// i번째 행.
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        (index < self.rows).then(|| &self.data[index * self.cols..(index + 1) * self.cols])
    }

    /// 행 순회.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.rows).map(move |i| &self.data[i * self.cols..(i + 1) * self.cols])
    }

    /// 행 하나만 담은 행렬.
    pub fn single_row(&self, index: usize) -> Option<Self> {
        self.row(index).map(|row| Self {
            rows: 1,
            cols: self.cols,
            data: row.to_vec(),
        })
    }

    /// 전체 데이터 (행 우선).
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// f32 텐서용 데이터.
    pub fn to_f32(&self) -> Vec<f32> {
        self.data.iter().map(|v| *v as f32).collect()
    }
}

/// 피처 이름 → 값 출처 해석 결과.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeaturePlan {
    names: Vec<String>,
    sources: Vec<FeatureSource>,
}

impl FeaturePlan {
    /// 테이블 기준으로 피처 목록 해석.
    pub fn resolve<S: AsRef<str>>(table: &CanonicalTable, features: &[S]) -> Self {
        let names: Vec<String> = features.iter().map(|f| f.as_ref().to_string()).collect();
        let sources = names
            .iter()
            .map(|name| FeatureSource::resolve(table, name))
            .collect();
        Self { names, sources }
    }

    /// 피처 수.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// 피처가 없는지 확인.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// 피처 이름 (입력 순서).
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// 피처별 출처.
    pub fn sources(&self) -> &[FeatureSource] {
        &self.sources
    }

    /// 모든 피처가 테이블에 없는지 확인 (빈 목록 포함).
    pub fn all_missing(&self) -> bool {
        self.sources.iter().all(FeatureSource::is_missing)
    }

    /// 테이블에 없는 피처 이름.
    pub fn missing_features(&self) -> Vec<&str> {
        self.names
            .iter()
            .zip(&self.sources)
            .filter(|(_, source)| source.is_missing())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// 한 행의 입력 벡터. 없는 피처와 빈 셀은 0.
    pub fn row_vector(&self, row: &SalesRow) -> Vec<f64> {
        self.sources
            .iter()
            .map(|source| source.value(row).unwrap_or(0.0))
            .collect()
    }

    /// 여러 행의 입력 행렬.
    pub fn matrix(&self, rows: &[&SalesRow]) -> FeatureMatrix {
        FeatureMatrix {
            rows: rows.len(),
            cols: self.len(),
            data: rows.iter().flat_map(|row| self.row_vector(row)).collect(),
        }
    }

    /// 순서상 처음으로 값이 있는 피처의 값.
    pub fn first_present(&self, row: &SalesRow) -> Option<f64> {
        self.sources.iter().find_map(|source| source.value(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sales_core::{normalize, RawTable};

    fn table() -> CanonicalTable {
        let raw = RawTable::from_strs(
            &["Store Number", "Date", "Total_Sales", "Liquor Sales", "Bottles", "Amount"],
            &[&["7", "2021-01-01", "100", "40", "3", ""]],
        );
        normalize(&raw).unwrap()
    }

    #[test]
    fn test_resolve_sources() {
        let table = table();
        let plan = FeaturePlan::resolve(
            &table,
            &[
                "Total_Sales",
                "total_sales",
                "Liquor Sales",
                "liquor_sales",
                "LIQUOR_SALES",
                "Bottles",
                "bottles",
                "Store Number",
                "Nope",
            ],
        );

        assert_eq!(
            plan.sources(),
            &[
                FeatureSource::Total,
                FeatureSource::Total,
                FeatureSource::Category("liquor_sales".into()),
                FeatureSource::Category("liquor_sales".into()),
                FeatureSource::Category("liquor_sales".into()),
                FeatureSource::Extra("Bottles".into()),
                FeatureSource::Extra("Bottles".into()),
                FeatureSource::StoreId,
                FeatureSource::Missing,
            ]
        );
        assert_eq!(plan.missing_features(), vec!["Nope"]);
    }

    #[test]
    fn test_store_number_feature_uses_store_id() {
        let raw = RawTable::from_strs(
            &["Store Number", "Date", "Total_Sales"],
            &[&["2633", "2021-01-01", "5"], &["A-1", "2021-01-01", "6"]],
        );
        let table = normalize(&raw).unwrap();
        let plan = FeaturePlan::resolve(&table, &["Store Number", "Total_Sales"]);

        assert_eq!(plan.row_vector(&table.rows[0]), vec![2633.0, 5.0]);
        // 문자열 매장 코드는 숫자 값이 없어 0
        assert_eq!(plan.row_vector(&table.rows[1]), vec![0.0, 6.0]);
        assert_eq!(
            FeaturePlan::resolve(&table, &["store_id"]).sources(),
            &[FeatureSource::StoreId]
        );
    }

    #[test]
    fn test_row_vector_fills_zero() {
        let table = table();
        let plan = FeaturePlan::resolve(&table, &["Nope", "Total_Sales", "Amount", "Bottles"]);
        // Amount 컬럼은 숫자 값이 없어 기타 컬럼으로 잡히지 않음
        assert_eq!(plan.row_vector(&table.rows[0]), vec![0.0, 100.0, 0.0, 3.0]);
    }

    #[test]
    fn test_matrix_layout() {
        let table = table();
        let plan = FeaturePlan::resolve(&table, &["Total_Sales", "Bottles"]);
        let row = &table.rows[0];
        let matrix = plan.matrix(&[row, row]);

        assert_eq!(matrix.rows(), 2);
        assert_eq!(matrix.cols(), 2);
        assert_eq!(matrix.row(1), Some(&[100.0, 3.0][..]));
        assert_eq!(matrix.row(2), None);
        assert_eq!(matrix.single_row(0).unwrap().rows(), 1);
        assert_eq!(matrix.to_f32(), vec![100.0f32, 3.0, 100.0, 3.0]);
    }

    #[test]
    fn test_all_missing_and_first_present() {
        let table = table();
        let plan = FeaturePlan::resolve(&table, &["a", "b"]);
        assert!(plan.all_missing());
        assert_eq!(plan.first_present(&table.rows[0]), None);

        let plan = FeaturePlan::resolve(&table, &["a", "Bottles", "Total_Sales"]);
        assert!(!plan.all_missing());
        assert_eq!(plan.first_present(&table.rows[0]), Some(3.0));

        let empty: [&str; 0] = [];
        assert!(FeaturePlan::resolve(&table, &empty).all_missing());
    }

    #[test]
    fn test_matrix_constructors() {
        assert!(FeatureMatrix::new(2, 2, vec![1.0; 3]).is_none());
        assert!(FeatureMatrix::from_rows(&[vec![1.0], vec![1.0, 2.0]]).is_none());
        let m = FeatureMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.iter_rows().count(), 2);
        assert_eq!(m.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }
}
