//! 요청 처리 서비스.
//!
//! 라우트 핸들러는 입력 검증과 응답 변환만 하고 계산은 여기서 합니다.

pub mod explain;
pub mod store_forecast;
pub mod store_list;

pub use explain::{explain_forecast, ExplainClient, ExplainError, GroqClient, FALLBACK_SUMMARY};
pub use store_forecast::{store_forecast, ForecastPoint, ForecastResponse, HistoryPoint};
pub use store_list::{
    build_store_list, cached_store_list, StoreEntry, StoreListKey, StoreListParams,
};
