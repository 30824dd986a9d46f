//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 Arc로 래핑되어 여러 요청 간에 공유됩니다.
//! 결과 캐시는 시작 시 한 번 만들어지며, 테스트는 각자 새 상태를 만듭니다.

use std::sync::Arc;

use sales_analytics::ml::Regressor;
use sales_core::AppConfig;
use sales_data::{LoadedArtifacts, TtlCache};

use crate::services::explain::{ExplainClient, GroqClient};
use crate::services::store_list::{StoreEntry, StoreListKey};

/// 프로세스가 로드한 아티팩트 (데이터셋 + 모델 + 피처 목록).
pub type Artifacts = LoadedArtifacts<dyn Regressor>;

/// 매장 목록 결과 캐시.
pub type StoreListCache = TtlCache<StoreListKey, Vec<StoreEntry>>;

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 애플리케이션 설정
    pub config: Arc<AppConfig>,

    /// 로드된 아티팩트 (로드 실패 시 `None`, 요청은 500 응답)
    pub artifacts: Option<Arc<Artifacts>>,

    /// 매장 목록 결과 캐시 (프로세스 단위)
    pub store_cache: Arc<StoreListCache>,

    /// 예측 설명 클라이언트
    pub explain_client: Arc<dyn ExplainClient>,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 새로운 AppState 생성.
    ///
    /// 아티팩트 없이 시작하며, 설명 클라이언트는 `GROQ_API_KEY`를 읽어 만듭니다.
    pub fn new(config: AppConfig) -> Self {
        let store_cache = Arc::new(TtlCache::new(config.cache_ttl()));
        let explain_client: Arc<dyn ExplainClient> =
            match GroqClient::from_env(&config.explain) {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    tracing::warn!(error = %e, "Explanation client unavailable");
                    Arc::new(UnavailableClient)
                }
            };

        Self {
            config: Arc::new(config),
            artifacts: None,
            store_cache,
            explain_client,
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 아티팩트 설정.
    pub fn with_artifacts(mut self, artifacts: Arc<Artifacts>) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// 설명 클라이언트 교체.
    pub fn with_explain_client(mut self, client: Arc<dyn ExplainClient>) -> Self {
        self.explain_client = client;
        self
    }

    /// 결과 캐시 교체.
    pub fn with_store_cache(mut self, cache: Arc<StoreListCache>) -> Self {
        self.store_cache = cache;
        self
    }

    /// 아티팩트가 로드되었는지 확인.
    pub fn has_artifacts(&self) -> bool {
        self.artifacts.is_some()
    }

    /// 서버 업타임(초).
    pub fn uptime_secs(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }
}

/// HTTP 클라이언트를 만들 수 없을 때 쓰는 설명 클라이언트.
struct UnavailableClient;

#[async_trait::async_trait]
impl ExplainClient for UnavailableClient {
    async fn complete(
        &self,
        _system: &str,
        _prompt: &str,
    ) -> Result<String, crate::services::explain::ExplainError> {
        Err(crate::services::explain::ExplainError::Config(
            "explanation client unavailable".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// 테스트용 AppState 생성.
///
/// 작은 예시 데이터셋(매장 7: 2021년 1~6월, 매장 8: 2021년 1~3월)과
/// 테스트용 모델, `Total_Sales` 피처 하나를 가진 상태를 만듭니다.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> AppState {
    use sales_analytics::ml::MockRegressor;
    use sales_core::RawTable;

    let mut rows: Vec<Vec<String>> = Vec::new();
    for month in 1..=6 {
        rows.push(vec![
            "7".into(),
            format!("2021-{:02}-10", month),
            format!("{}", 1000 + month * 10),
            format!("{}", 100 + month),
            "Ames".into(),
            "Story".into(),
        ]);
    }
    for month in 1..=3 {
        rows.push(vec![
            "8".into(),
            format!("2021-{:02}-20", month),
            "500".into(),
            "50".into(),
            "Boone".into(),
            String::new(),
        ]);
    }
    let table = RawTable::with_rows(
        vec![
            "Store Number".into(),
            "Date".into(),
            "Total_Sales".into(),
            "Liquor_Sales".into(),
            "City".into(),
            "County".into(),
        ],
        rows,
    );

    let model: Arc<dyn Regressor> = Arc::new(MockRegressor::new().with_offset(0.5));
    let artifacts = LoadedArtifacts::new(table, model, vec!["Total_Sales".to_string()], None);

    AppState::new(AppConfig::default()).with_artifacts(Arc::new(artifacts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sales_data::DatasetProvider;

    #[test]
    fn test_state_without_artifacts() {
        let state = AppState::new(AppConfig::default());
        assert!(!state.has_artifacts());
        assert!(state.store_cache.is_empty());
        assert!(state.uptime_secs() >= 0);
    }

    #[test]
    fn test_create_test_state() {
        let state = create_test_state();
        let artifacts = state.artifacts.as_ref().unwrap();
        assert_eq!(artifacts.dataset().row_count(), 9);
        assert_eq!(artifacts.feature_list(), &["Total_Sales".to_string()]);
        assert_eq!(artifacts.model().model_name(), "mock_regressor");
    }
}
