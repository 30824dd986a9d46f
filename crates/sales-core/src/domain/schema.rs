//! 스키마 정규화.
//!
//! 컬럼명이 제각각인 원본 테이블을 canonical 스키마
//! (`store_id`, `date`, `total_sales`, `city`, `county`, `<category>_sales`)로 변환합니다.
//!
//! # 컬럼 탐색 규칙
//!
//! 역할별 별칭 목록을 순서대로 시도하며, 세 단계로 진행합니다:
//!
//! 1. 정확히 같은 이름
//! 2. compact 형태(소문자 영숫자만)가 같은 이름
//! 3. compact 컬럼명이 compact 별칭을 포함 (별칭이 4글자 이상일 때만)
//!
//! 앞 단계에서 찾으면 다음 단계는 시도하지 않습니다. 먼저 해석된 역할이
//! 차지한 컬럼은 건너뜁니다. 역할 해석 순서는 store → date → total → city → county.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, OnceLock};

use chrono::NaiveDate;
use tracing::debug;

use super::parse::{is_missing, parse_date, parse_number};
use super::store::StoreId;
use super::table::{
    CanonicalTable, NormalizationReport, RawTable, SalesRow, COL_CITY, COL_COUNTY, COL_DATE,
    COL_STORE_ID, COL_TOTAL_SALES,
};
use crate::error::{RowParseError, SchemaError, SchemaResult};

/// 매장 ID 컬럼 별칭.
pub const STORE_ALIASES: &[&str] = &[
    "Store Number",
    "store_id",
    "Store",
    "Store #",
    "StoreNumber",
    "Location ID",
    "LocationID",
    "location_id",
    "store",
];

/// 날짜 컬럼 별칭.
pub const DATE_ALIASES: &[&str] = &[
    "Date",
    "date",
    "Period",
    "Month",
    "Transaction Date",
    "order_date",
    "ds",
];

/// 총매출 컬럼 별칭.
pub const TOTAL_ALIASES: &[&str] = &["Total_Sales", "Total Sales", "total_sales", "Sales", "Revenue"];

/// 도시 컬럼 별칭.
pub const CITY_ALIASES: &[&str] = &["City", "city", "Store City", "Town"];

/// 카운티 컬럼 별칭.
pub const COUNTY_ALIASES: &[&str] = &["County", "county", "Region"];

/// 카테고리 매출 컬럼 접미사 (canonical 키 기준).
pub const CATEGORY_SUFFIX: &str = "_sales";

/// 부분 일치(3단계)에 쓰는 별칭의 최소 compact 길이.
const MIN_SUBSTRING_ALIAS_LEN: usize = 4;

/// 소문자 영숫자만 남긴 compact 형태.
///
/// `"Store #"` → `"store"`, `"Location ID"` → `"locationid"`.
pub fn compact(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// canonical 컬럼 키.
///
/// 소문자로 바꾸고 영숫자가 아닌 연속 구간을 `_` 하나로 치환합니다.
/// `"Liquor Sales"` → `"liquor_sales"`.
pub fn canonical_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut pending_separator = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !key.is_empty() {
                key.push('_');
            }
            pending_separator = false;
            key.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    key
}

/// 별칭 목록으로 컬럼 위치 탐색.
///
/// `claimed`에 포함된 위치는 후보에서 제외합니다. 찾지 못하면 `None`.
pub fn resolve_column(
    columns: &[String],
    aliases: &[&str],
    claimed: &HashSet<usize>,
) -> Option<usize> {
    let candidates: Vec<(usize, &String)> = columns
        .iter()
        .enumerate()
        .filter(|(idx, _)| !claimed.contains(idx))
        .collect();

    // 1) 정확히 일치
    for alias in aliases {
        if let Some((idx, _)) = candidates.iter().find(|(_, col)| col.as_str() == *alias) {
            return Some(*idx);
        }
    }

    // 2) compact 형태 일치
    let compact_columns: Vec<(usize, String)> = candidates
        .iter()
        .map(|(idx, col)| (*idx, compact(col)))
        .collect();
    for alias in aliases {
        let alias = compact(alias);
        if let Some((idx, _)) = compact_columns.iter().find(|(_, col)| *col == alias) {
            return Some(*idx);
        }
    }

    // 3) 부분 일치
    for alias in aliases {
        let alias = compact(alias);
        if alias.len() < MIN_SUBSTRING_ALIAS_LEN {
            continue;
        }
        if let Some((idx, _)) = compact_columns.iter().find(|(_, col)| col.contains(&alias)) {
            return Some(*idx);
        }
    }

    None
}

/// 역할별로 해석된 컬럼 위치.
struct ColumnRoles {
    store: usize,
    date: usize,
    total: usize,
    city: Option<usize>,
    county: Option<usize>,
    /// (컬럼 위치, canonical 키)
    categories: Vec<(usize, String)>,
    /// 기타 컬럼 위치
    others: Vec<usize>,
}

impl ColumnRoles {
    fn resolve(columns: &[String]) -> SchemaResult<Self> {
        if columns.is_empty() {
            return Err(SchemaError::EmptyTable);
        }

        let mut claimed = HashSet::new();
        let claim = |aliases: &[&str], claimed: &mut HashSet<usize>| {
            let found = resolve_column(columns, aliases, claimed);
            if let Some(idx) = found {
                claimed.insert(idx);
            }
            found
        };

        let store = claim(STORE_ALIASES, &mut claimed)
            .ok_or_else(|| SchemaError::missing("store", columns))?;
        let date = claim(DATE_ALIASES, &mut claimed)
            .ok_or_else(|| SchemaError::missing("date", columns))?;
        let total = claim(TOTAL_ALIASES, &mut claimed)
            .ok_or_else(|| SchemaError::missing("total_sales", columns))?;
        let city = claim(CITY_ALIASES, &mut claimed);
        let county = claim(COUNTY_ALIASES, &mut claimed);

        let mut categories = Vec::new();
        let mut seen_keys = BTreeSet::new();
        let mut others = Vec::new();
        for (idx, name) in columns.iter().enumerate() {
            if claimed.contains(&idx) {
                continue;
            }
            let key = canonical_key(name);
            let is_category = key.len() > CATEGORY_SUFFIX.len()
                && key.ends_with(CATEGORY_SUFFIX)
                && key != COL_TOTAL_SALES
                && !seen_keys.contains(&key);
            if is_category {
                seen_keys.insert(key.clone());
                categories.push((idx, key));
            } else {
                others.push(idx);
            }
        }

        // 역할 별칭이나 카테고리 키와 같은 이름은 재정규화 때 다른 컬럼을 가리므로 버림
        others.retain(|idx| {
            let name = columns[*idx].as_str();
            let shadows = is_role_alias(name) || seen_keys.contains(name);
            if shadows {
                debug!(column = name, "Unclaimed column shadows a canonical column, ignored");
            }
            !shadows
        });

        Ok(Self {
            store,
            date,
            total,
            city,
            county,
            categories,
            others,
        })
    }
}

fn is_role_alias(name: &str) -> bool {
    [
        STORE_ALIASES,
        DATE_ALIASES,
        TOTAL_ALIASES,
        CITY_ALIASES,
        COUNTY_ALIASES,
    ]
    .iter()
    .any(|aliases| aliases.contains(&name))
}

fn row_key(
    raw: &RawTable,
    row_idx: usize,
    roles: &ColumnRoles,
) -> Result<(StoreId, NaiveDate), RowParseError> {
    let store_id = raw
        .cell(row_idx, roles.store)
        .and_then(StoreId::parse)
        .ok_or(RowParseError::MissingStoreId)?;
    let date = raw
        .cell(row_idx, roles.date)
        .and_then(parse_date)
        .ok_or(RowParseError::InvalidDate)?;
    Ok((store_id, date))
}

/// 원본 테이블을 canonical 테이블로 정규화.
///
/// 매장 ID가 없거나 날짜를 해석할 수 없는 행은 제외합니다.
/// 매장/날짜/총매출 컬럼을 찾지 못하면 [`SchemaError`].
pub fn normalize(raw: &RawTable) -> SchemaResult<CanonicalTable> {
    let columns = raw.columns();
    let roles = ColumnRoles::resolve(columns)?;

    let mut report = NormalizationReport {
        input_rows: raw.len(),
        ..Default::default()
    };
    let mut rows = Vec::with_capacity(raw.len());

    for row_idx in 0..raw.len() {
        let (store_id, date) = match row_key(raw, row_idx, &roles) {
            Ok(key) => key,
            Err(RowParseError::MissingStoreId) => {
                report.dropped_missing_store += 1;
                continue;
            }
            Err(RowParseError::InvalidDate) => {
                report.dropped_invalid_date += 1;
                continue;
            }
        };

        let text = |column: Option<usize>| {
            column
                .and_then(|idx| raw.cell(row_idx, idx))
                .filter(|value| !is_missing(value))
                .map(|value| value.trim().to_uppercase())
        };

        let categories = roles
            .categories
            .iter()
            .filter_map(|(idx, key)| {
                raw.cell(row_idx, *idx)
                    .and_then(parse_number)
                    .map(|value| (key.clone(), value))
            })
            .collect();

        let extras = roles
            .others
            .iter()
            .filter_map(|idx| {
                raw.cell(row_idx, *idx)
                    .and_then(parse_number)
                    .map(|value| (columns[*idx].clone(), value))
            })
            .collect();

        rows.push(SalesRow {
            store_id,
            date,
            total_sales: raw.cell(row_idx, roles.total).and_then(parse_number),
            city: text(roles.city),
            county: text(roles.county),
            categories,
            extras,
            position: rows.len(),
        });
    }

    // 유지된 행에서 숫자 값이 하나라도 있는 기타 컬럼만 남김
    let extra_columns: Vec<String> = roles
        .others
        .iter()
        .map(|idx| columns[*idx].clone())
        .filter(|name| rows.iter().any(|row| row.extras.contains_key(name)))
        .collect();

    let mut column_map = BTreeMap::new();
    column_map.insert(columns[roles.store].clone(), COL_STORE_ID.to_string());
    column_map.insert(columns[roles.date].clone(), COL_DATE.to_string());
    column_map.insert(columns[roles.total].clone(), COL_TOTAL_SALES.to_string());
    if let Some(idx) = roles.city {
        column_map.insert(columns[idx].clone(), COL_CITY.to_string());
    }
    if let Some(idx) = roles.county {
        column_map.insert(columns[idx].clone(), COL_COUNTY.to_string());
    }
    for (idx, key) in &roles.categories {
        column_map.insert(columns[*idx].clone(), key.clone());
    }

    debug!(
        input_rows = report.input_rows,
        kept_rows = rows.len(),
        dropped_missing_store = report.dropped_missing_store,
        dropped_invalid_date = report.dropped_invalid_date,
        categories = roles.categories.len(),
        "Table normalized"
    );

    Ok(CanonicalTable {
        rows,
        category_columns: roles.categories.into_iter().map(|(_, key)| key).collect(),
        extra_columns,
        column_map,
        report,
    })
}

/// 정규화 결과를 함께 보관하는 데이터셋.
///
/// 처음 [`Dataset::normalized`]를 호출할 때 한 번만 정규화하고,
/// 이후 호출은 (다른 스레드에서도) 같은 `Arc`를 돌려줍니다.
#[derive(Debug)]
pub struct Dataset {
    raw: RawTable,
    normalized: OnceLock<SchemaResult<Arc<CanonicalTable>>>,
}

impl Dataset {
    /// 원본 테이블로 데이터셋 생성.
    pub fn new(raw: RawTable) -> Self {
        Self {
            raw,
            normalized: OnceLock::new(),
        }
    }

    /// 원본 테이블.
    pub fn raw(&self) -> &RawTable {
        &self.raw
    }

    /// 원본 행 수.
    pub fn row_count(&self) -> usize {
        self.raw.len()
    }

    /// 정규화된 테이블 (최초 1회 계산 후 재사용).
    pub fn normalized(&self) -> SchemaResult<Arc<CanonicalTable>> {
        self.normalized
            .get_or_init(|| normalize(&self.raw).map(Arc::new))
            .clone()
    }

    /// 정규화가 이미 수행되었는지 확인.
    pub fn is_normalized(&self) -> bool {
        self.normalized.get().is_some()
    }
}

impl From<RawTable> for Dataset {
    fn from(raw: RawTable) -> Self {
        Self::new(raw)
    }
}
