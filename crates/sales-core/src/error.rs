//! 스키마 정규화 에러 타입.
//!
//! 정규화 단계의 에러는 두 종류로 나뉩니다:
//! - [`SchemaError`]: 매장/날짜/매출 컬럼을 찾지 못한 경우 (요청 실패)
//! - [`RowParseError`]: 개별 행을 해석하지 못한 경우 (행만 제외, 요청은 계속)

use thiserror::Error;

/// 복구 불가능한 스키마 에러.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// 필수 역할의 컬럼을 별칭 목록에서 찾지 못함
    #[error("no recognizable {role} column (columns: {})", .columns.join(", "))]
    MissingColumn {
        /// 컬럼 역할 ("store", "date", "total_sales")
        role: &'static str,
        /// 테이블에 존재하는 컬럼 (앞쪽 20개까지)
        columns: Vec<String>,
    },

    /// 컬럼 헤더가 없는 테이블
    #[error("table has no columns")]
    EmptyTable,
}

impl SchemaError {
    /// 누락된 역할과 현재 컬럼 목록으로 에러 생성.
    pub fn missing(role: &'static str, columns: &[String]) -> Self {
        SchemaError::MissingColumn {
            role,
            columns: columns.iter().take(20).cloned().collect(),
        }
    }
}

/// 행 단위 파싱 실패.
///
/// 정규화는 이 에러가 발생한 행을 조용히 제외하고
/// [`NormalizationReport`](crate::domain::NormalizationReport)에 집계만 남깁니다.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum RowParseError {
    /// 매장 식별자가 비어있음
    #[error("missing store identifier")]
    MissingStoreId,

    /// 날짜를 해석할 수 없음
    #[error("unparseable date")]
    InvalidDate,
}

/// 스키마 작업을 위한 Result 타입.
pub type SchemaResult<T> = Result<T, SchemaError>;
