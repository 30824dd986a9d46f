//! 매출 도메인 모델.
//!
//! 원본 테이블에서 예측 미리보기까지 이어지는 데이터 흐름의 앞단을 담당합니다.
//!
//! ```text
//! RawTable ──normalize──▶ CanonicalTable ──aggregate_monthly──▶ MonthlySeries
//!                                                                   │
//!                                              eligible_stores ◀────┘
//! ```

pub mod aggregate;
pub mod eligibility;
pub mod parse;
pub mod rounding;
pub mod schema;
pub mod store;
pub mod table;

pub use aggregate::{aggregate_monthly, latest_rows, month_start, MonthlyAggregate, MonthlySeries};
pub use eligibility::{eligible_stores, DEFAULT_MIN_POINTS};
pub use parse::{parse_date, parse_number};
pub use rounding::round2;
pub use schema::{
    canonical_key, compact, normalize, resolve_column, Dataset, CATEGORY_SUFFIX, CITY_ALIASES,
    COUNTY_ALIASES, DATE_ALIASES, STORE_ALIASES, TOTAL_ALIASES,
};
pub use store::StoreId;
pub use table::{
    CanonicalTable, NormalizationReport, RawTable, SalesRow, COL_CITY, COL_COUNTY, COL_DATE,
    COL_STORE_ID, COL_TOTAL_SALES,
};
