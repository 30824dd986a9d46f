//! 원본 테이블과 정규화된(canonical) 테이블.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::parse::is_missing;
use super::store::StoreId;

/// 정규화 후 매장 ID 컬럼명.
pub const COL_STORE_ID: &str = "store_id";
/// 정규화 후 날짜 컬럼명.
pub const COL_DATE: &str = "date";
/// 정규화 후 총매출 컬럼명.
pub const COL_TOTAL_SALES: &str = "total_sales";
/// 정규화 후 도시 컬럼명.
pub const COL_CITY: &str = "city";
/// 정규화 후 카운티 컬럼명.
pub const COL_COUNTY: &str = "county";

/// 원본 테이블.
///
/// CSV 등에서 읽은 그대로의 문자열 셀을 보관합니다.
/// 각 행의 길이는 항상 컬럼 수와 같습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    /// 컬럼 헤더로 빈 테이블 생성.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// 컬럼과 행으로 테이블 생성.
    pub fn with_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// `&str` 리터럴로 테이블 생성 (테스트/예제용).
    pub fn from_strs(columns: &[&str], rows: &[&[&str]]) -> Self {
        Self::with_rows(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    /// 행 추가. 컬럼 수에 맞게 빈 셀로 채우거나 잘라냅니다.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    /// 컬럼 헤더.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// 모든 행.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// 행 수.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 행이 없는지 확인.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 셀 값. 결측값이면 `None`.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .filter(|value| !is_missing(value))
    }
}

/// 정규화된 매출 행.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRow {
    /// 매장 ID
    pub store_id: StoreId,
    /// 거래/집계 일자
    pub date: NaiveDate,
    /// 총매출 (해석 불가 시 `None`)
    pub total_sales: Option<f64>,
    /// 도시 (대문자)
    pub city: Option<String>,
    /// 카운티 (대문자)
    pub county: Option<String>,
    /// 카테고리 매출 (`<category>_sales` → 값)
    pub categories: BTreeMap<String, f64>,
    /// 그 밖의 숫자 컬럼 (원본 컬럼명 → 값)
    pub extras: BTreeMap<String, f64>,
    /// 정규화 후 행 순서 (동일 날짜 tie-break 용)
    pub position: usize,
}

/// 정규화 과정에서 제외된 행 집계.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationReport {
    /// 입력 행 수
    pub input_rows: usize,
    /// 매장 ID 결측으로 제외된 행
    pub dropped_missing_store: usize,
    /// 날짜 해석 실패로 제외된 행
    pub dropped_invalid_date: usize,
}

impl NormalizationReport {
    /// 제외된 전체 행 수.
    pub fn dropped_rows(&self) -> usize {
        self.dropped_missing_store + self.dropped_invalid_date
    }
}

/// 정규화된 테이블.
///
/// 동등성 비교는 행과 컬럼 구성만 봅니다.
/// 원본 컬럼명 매핑(`column_map`)과 정규화 리포트는 출처 정보라서 제외됩니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanonicalTable {
    /// 정규화된 행 (원본 순서 유지)
    pub rows: Vec<SalesRow>,
    /// 카테고리 컬럼 키 (`<category>_sales`, 원본 컬럼 순서)
    pub category_columns: Vec<String>,
    /// 기타 숫자 컬럼 (원본 컬럼명, 원본 컬럼 순서)
    pub extra_columns: Vec<String>,
    /// 원본 컬럼명 → canonical 컬럼명
    pub column_map: BTreeMap<String, String>,
    /// 제외된 행 집계
    pub report: NormalizationReport,
}

impl PartialEq for CanonicalTable {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
            && self.category_columns == other.category_columns
            && self.extra_columns == other.extra_columns
    }
}

impl CanonicalTable {
    /// 행 수.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 행이 없는지 확인.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 원본 또는 canonical 컬럼명을 canonical 이름으로 변환.
    ///
    /// 알 수 없는 이름이면 `None`.
    pub fn canonical_name(&self, column: &str) -> Option<&str> {
        if let Some(mapped) = self.column_map.get(column) {
            return Some(mapped.as_str());
        }
        let known = [COL_STORE_ID, COL_DATE, COL_TOTAL_SALES, COL_CITY, COL_COUNTY];
        if let Some(name) = known.iter().find(|name| **name == column) {
            return Some(*name);
        }
        self.category_columns
            .iter()
            .find(|key| key.as_str() == column)
            .map(String::as_str)
    }

    /// 원본 테이블에 해당 역할의 컬럼이 있었는지 확인.
    pub fn has_role(&self, canonical: &str) -> bool {
        self.column_map.values().any(|name| name == canonical)
    }

    /// canonical 형태를 다시 원본 테이블로 내보내기.
    ///
    /// 재정규화하면 같은 테이블이 나옵니다. 정규화 단계에서 canonical 컬럼을
    /// 가리는 이름은 기타 컬럼으로 남기지 않으므로, 기타 컬럼은 모두 그대로 내보냅니다.
    pub fn to_raw(&self) -> RawTable {
        let has_city = self.has_role(COL_CITY) || self.rows.iter().any(|r| r.city.is_some());
        let has_county =
            self.has_role(COL_COUNTY) || self.rows.iter().any(|r| r.county.is_some());

        let mut columns = vec![
            COL_STORE_ID.to_string(),
            COL_DATE.to_string(),
            COL_TOTAL_SALES.to_string(),
        ];
        if has_city {
            columns.push(COL_CITY.to_string());
        }
        if has_county {
            columns.push(COL_COUNTY.to_string());
        }
        columns.extend(self.category_columns.iter().cloned());
        columns.extend(self.extra_columns.iter().cloned());

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut cells = vec![
                    row.store_id.to_string(),
                    row.date.format("%Y-%m-%d").to_string(),
                    format_number(row.total_sales),
                ];
                if has_city {
                    cells.push(row.city.clone().unwrap_or_default());
                }
                if has_county {
                    cells.push(row.county.clone().unwrap_or_default());
                }
                for key in &self.category_columns {
                    cells.push(format_number(row.categories.get(key).copied()));
                }
                for name in &self.extra_columns {
                    cells.push(format_number(row.extras.get(name).copied()));
                }
                cells
            })
            .collect();

        RawTable::with_rows(columns, rows)
    }
}

fn format_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
