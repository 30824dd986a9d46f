//! 설정 관리.
//!
//! 기본값 → `config/default.toml`(선택) → `SALES__` 환경 변수 순으로 덮어씁니다.
//! 예: `SALES__CACHE__TTL_SECS=60`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 환경 변수 접두사.
pub const ENV_PREFIX: &str = "SALES";

/// 기본 설정 파일 경로.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 서버 설정
    pub server: ServerConfig,
    /// 데이터/모델 아티팩트 경로
    pub data: DataConfig,
    /// 예측 기본값
    pub forecast: ForecastConfig,
    /// 결과 캐시 설정
    pub cache: CacheConfig,
    /// 예측 설명 API 설정
    pub explain: ExplainConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// 아티팩트 경로 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataConfig {
    /// 매출 데이터셋 (CSV)
    pub dataset_path: PathBuf,
    /// 모델 입력 피처 목록 (JSON 배열)
    pub features_path: PathBuf,
    /// 모델 파일 (`.json` 선형 모델 또는 `.onnx`)
    pub model_path: PathBuf,
    /// 명시적 데이터셋 버전 (없으면 행 수와 컬럼 구성으로 계산)
    pub dataset_version: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("data/sales.csv"),
            features_path: PathBuf::from("data/features.json"),
            model_path: PathBuf::from("data/model.json"),
            dataset_version: None,
        }
    }
}

/// 예측 요청 기본값.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// 기본 최소 연도
    pub default_min_year: i32,
    /// 기본 최소 월 수
    pub default_min_points: usize,
    /// 단일 매장 응답에 포함할 최근 이력 월 수
    pub history_months: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            default_min_year: 2020,
            default_min_points: crate::domain::DEFAULT_MIN_POINTS,
            history_months: 5,
        }
    }
}

/// 결과 캐시 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 항목 만료 시간 (초)
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

/// 예측 설명(LLM) API 설정.
///
/// API 키는 설정 파일에 두지 않고 `GROQ_API_KEY` 환경 변수에서 읽습니다.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExplainConfig {
    /// OpenAI 호환 chat completion 엔드포인트
    pub api_url: String,
    /// 모델 이름
    pub model: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 최대 생성 토큰
    pub max_tokens: u32,
    /// 샘플링 온도
    pub temperature: f32,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            timeout_secs: 20,
            max_tokens: 700,
            temperature: 0.2,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
    /// span 종료 시 소요 시간 기록 (예측 span 추적용)
    pub span_events: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            span_events: false,
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없으면 기본값과 환경 변수만 사용합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        Self::load_with_env(path, Self::environment())
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load(DEFAULT_CONFIG_PATH)
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
    }

    fn load_with_env<P: AsRef<Path>>(
        path: P,
        environment: config::Environment,
    ) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // 파일에서 로드 (없어도 됨)
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(environment);

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// 캐시 TTL.
    pub fn cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cache.ttl_secs)
    }
}
