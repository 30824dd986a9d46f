//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/` - 인사말
//! - `/api/health` - 헬스 체크
//! - `/api/stores` - 매장 목록 (선택적 미리보기)
//! - `/api/forecast/{store_id}` - 단일 매장 이력 + 다음 달 예측
//! - `/api/explain_forecast` - 타임라인 설명

pub mod explain;
pub mod forecast;
pub mod health;
pub mod query;
pub mod stores;

pub use explain::{explain_router, ExplainResponse};
pub use forecast::{forecast_router, ForecastQuery};
pub use health::{health_router, home, HealthResponse, HomeResponse};
pub use stores::{stores_router, StoreListQuery};

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::state::AppState;

/// 전체 API 라우터 생성.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(home))
        .nest("/api/health", health_router())
        .nest("/api/stores", stores_router())
        .nest("/api/forecast", forecast_router())
        .nest("/api/explain_forecast", explain_router())
}
